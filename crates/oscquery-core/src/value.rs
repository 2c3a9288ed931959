//! Declared argument values
//!
//! Values are tracked so they can be reported through `VALUE`; nothing here
//! encodes OSC binary packets.

use crate::types::{OscType, TypeToken};

/// Value held by one method argument
#[derive(Debug, Clone, PartialEq)]
pub enum OscValue {
    Int(i32),
    Float(f32),
    String(String),
    Blob(Vec<u8>),
    Long(i64),
    TimeTag(u64),
    Double(f64),
    Symbol(String),
    Char(char),
    /// RGBA packed as 0xRRGGBBAA
    Color(u32),
    /// port id, status, data1, data2
    Midi([u8; 4]),
    True,
    False,
    Nil,
    Infinitum,
    Array(Vec<OscValue>),
}

impl OscValue {
    /// Check the value against a declared type token.
    ///
    /// `T` and `F` slots both accept either boolean.
    pub fn matches(&self, token: &TypeToken) -> bool {
        match (token, self) {
            (TypeToken::Array(types), OscValue::Array(items)) => {
                types.len() == items.len()
                    && types.iter().zip(items).all(|(t, v)| v.matches(t))
            }
            (TypeToken::Array(_), _) => false,
            (TypeToken::Single(ty), value) => matches!(
                (ty, value),
                (OscType::Int32, OscValue::Int(_))
                    | (OscType::Float32, OscValue::Float(_))
                    | (OscType::String, OscValue::String(_))
                    | (OscType::Blob, OscValue::Blob(_))
                    | (OscType::Int64, OscValue::Long(_))
                    | (OscType::TimeTag, OscValue::TimeTag(_))
                    | (OscType::Float64, OscValue::Double(_))
                    | (OscType::Symbol, OscValue::Symbol(_))
                    | (OscType::Char, OscValue::Char(_))
                    | (OscType::Color, OscValue::Color(_))
                    | (OscType::Midi, OscValue::Midi(_))
                    | (OscType::True | OscType::False, OscValue::True | OscValue::False)
                    | (OscType::Nil, OscValue::Nil)
                    | (OscType::Infinitum, OscValue::Infinitum)
            ),
        }
    }

    /// Fit a value into a declared slot, widening numeric literals where the
    /// slot is wider or floating point. Returns `None` if it cannot fit.
    pub fn conform(self, token: &TypeToken) -> Option<OscValue> {
        if self.matches(token) {
            return Some(self);
        }
        match (token, self) {
            (TypeToken::Single(OscType::Float32), OscValue::Int(i)) => Some(OscValue::Float(i as f32)),
            (TypeToken::Single(OscType::Float64), OscValue::Int(i)) => Some(OscValue::Double(i as f64)),
            (TypeToken::Single(OscType::Float64), OscValue::Float(f)) => Some(OscValue::Double(f as f64)),
            (TypeToken::Single(OscType::Int64), OscValue::Int(i)) => Some(OscValue::Long(i as i64)),
            (TypeToken::Single(OscType::Symbol), OscValue::String(s)) => Some(OscValue::Symbol(s)),
            (TypeToken::Single(OscType::String), OscValue::Symbol(s)) => Some(OscValue::String(s)),
            (TypeToken::Array(types), OscValue::Array(items)) if types.len() == items.len() => items
                .into_iter()
                .zip(types)
                .map(|(v, t)| v.conform(t))
                .collect::<Option<Vec<_>>>()
                .map(OscValue::Array),
            _ => None,
        }
    }

    /// JSON projection used for the `VALUE` attribute
    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value as Json;

        match self {
            OscValue::Int(i) => Json::from(*i),
            OscValue::Float(f) => float_json(*f as f64),
            OscValue::String(s) | OscValue::Symbol(s) => Json::String(s.clone()),
            OscValue::Blob(bytes) => Json::Array(bytes.iter().map(|&b| Json::from(b)).collect()),
            OscValue::Long(i) => Json::from(*i),
            OscValue::TimeTag(t) => Json::from(*t),
            OscValue::Double(d) => float_json(*d),
            OscValue::Char(c) => Json::String(c.to_string()),
            OscValue::Color(rgba) => Json::String(format!("#{:08x}", rgba)),
            OscValue::Midi(bytes) => Json::Array(bytes.iter().map(|&b| Json::from(b)).collect()),
            OscValue::True => Json::Bool(true),
            OscValue::False => Json::Bool(false),
            OscValue::Nil | OscValue::Infinitum => Json::Null,
            OscValue::Array(items) => Json::Array(items.iter().map(OscValue::to_json).collect()),
        }
    }

    /// Read a JSON value according to its declared type.
    ///
    /// Returns `None` when the JSON does not fit the type, which callers
    /// treat as "no value" for that argument.
    pub fn from_json(token: &TypeToken, json: &serde_json::Value) -> Option<OscValue> {
        let ty = match token {
            TypeToken::Array(types) => {
                let items = json.as_array()?;
                if items.len() != types.len() {
                    return None;
                }
                return types
                    .iter()
                    .zip(items)
                    .map(|(t, j)| OscValue::from_json(t, j))
                    .collect::<Option<Vec<_>>>()
                    .map(OscValue::Array);
            }
            TypeToken::Single(ty) => *ty,
        };

        match ty {
            OscType::Int32 => json
                .as_i64()
                .and_then(|i| i32::try_from(i).ok())
                .map(OscValue::Int),
            OscType::Float32 => json.as_f64().map(|f| OscValue::Float(f as f32)),
            OscType::String => json.as_str().map(|s| OscValue::String(s.to_string())),
            OscType::Symbol => json.as_str().map(|s| OscValue::Symbol(s.to_string())),
            OscType::Blob => byte_array(json).map(OscValue::Blob),
            OscType::Int64 => json.as_i64().map(OscValue::Long),
            OscType::TimeTag => json.as_u64().map(OscValue::TimeTag),
            OscType::Float64 => json.as_f64().map(OscValue::Double),
            OscType::Char => {
                let mut chars = json.as_str()?.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(OscValue::Char(c)),
                    _ => None,
                }
            }
            OscType::Color => {
                let hex = json.as_str()?.strip_prefix('#')?;
                if hex.len() != 8 {
                    return None;
                }
                u32::from_str_radix(hex, 16).ok().map(OscValue::Color)
            }
            OscType::Midi => {
                let bytes = byte_array(json)?;
                <[u8; 4]>::try_from(bytes.as_slice()).ok().map(OscValue::Midi)
            }
            OscType::True | OscType::False => json.as_bool().map(OscValue::from),
            OscType::Nil => json.is_null().then_some(OscValue::Nil),
            OscType::Infinitum => json.is_null().then_some(OscValue::Infinitum),
        }
    }
}

fn float_json(f: f64) -> serde_json::Value {
    serde_json::Number::from_f64(f)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

fn byte_array(json: &serde_json::Value) -> Option<Vec<u8>> {
    json.as_array()?
        .iter()
        .map(|b| b.as_u64().and_then(|b| u8::try_from(b).ok()))
        .collect()
}

impl From<i32> for OscValue {
    fn from(v: i32) -> Self {
        OscValue::Int(v)
    }
}

impl From<f32> for OscValue {
    fn from(v: f32) -> Self {
        OscValue::Float(v)
    }
}

impl From<i64> for OscValue {
    fn from(v: i64) -> Self {
        OscValue::Long(v)
    }
}

impl From<f64> for OscValue {
    fn from(v: f64) -> Self {
        OscValue::Double(v)
    }
}

impl From<bool> for OscValue {
    fn from(v: bool) -> Self {
        if v {
            OscValue::True
        } else {
            OscValue::False
        }
    }
}

impl From<&str> for OscValue {
    fn from(v: &str) -> Self {
        OscValue::String(v.to_string())
    }
}

impl From<String> for OscValue {
    fn from(v: String) -> Self {
        OscValue::String(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::parse_type_string;
    use serde_json::json;

    fn token(s: &str) -> TypeToken {
        parse_type_string(s).remove(0)
    }

    #[test]
    fn test_bool_slots_accept_either() {
        assert!(OscValue::False.matches(&token("T")));
        assert!(OscValue::True.matches(&token("F")));
        assert!(!OscValue::Int(1).matches(&token("T")));
    }

    #[test]
    fn test_conform_widens_numbers() {
        assert_eq!(OscValue::Int(5).conform(&token("f")), Some(OscValue::Float(5.0)));
        assert_eq!(OscValue::Int(5).conform(&token("h")), Some(OscValue::Long(5)));
        assert_eq!(OscValue::Float(1.5).conform(&token("i")), None);
    }

    #[test]
    fn test_conform_array() {
        let value = OscValue::Array(vec![OscValue::Int(1), OscValue::Int(2)]);
        assert_eq!(
            value.conform(&token("[if]")),
            Some(OscValue::Array(vec![OscValue::Int(1), OscValue::Float(2.0)]))
        );
        let short = OscValue::Array(vec![OscValue::Int(1)]);
        assert_eq!(short.conform(&token("[ii]")), None);
    }

    #[test]
    fn test_json_projection() {
        assert_eq!(OscValue::Int(5).to_json(), json!(5));
        assert_eq!(OscValue::Color(0xff00_80ff).to_json(), json!("#ff0080ff"));
        assert_eq!(OscValue::Midi([0, 144, 60, 127]).to_json(), json!([0, 144, 60, 127]));
        assert_eq!(OscValue::Infinitum.to_json(), json!(null));
        assert_eq!(OscValue::Double(f64::NAN).to_json(), json!(null));
    }

    #[test]
    fn test_from_json_by_type() {
        assert_eq!(OscValue::from_json(&token("i"), &json!(7)), Some(OscValue::Int(7)));
        assert_eq!(OscValue::from_json(&token("f"), &json!(7)), Some(OscValue::Float(7.0)));
        assert_eq!(OscValue::from_json(&token("T"), &json!(false)), Some(OscValue::False));
        assert_eq!(OscValue::from_json(&token("c"), &json!("x")), Some(OscValue::Char('x')));
        assert_eq!(OscValue::from_json(&token("c"), &json!("xy")), None);
        assert_eq!(
            OscValue::from_json(&token("r"), &json!("#11223344")),
            Some(OscValue::Color(0x1122_3344))
        );
        assert_eq!(OscValue::from_json(&token("i"), &json!("nope")), None);
    }

    #[test]
    fn test_from_json_nested() {
        let value = OscValue::from_json(&token("[i[s]]"), &json!([1, ["a"]]));
        assert_eq!(
            value,
            Some(OscValue::Array(vec![
                OscValue::Int(1),
                OscValue::Array(vec![OscValue::String("a".into())]),
            ]))
        );
    }
}
