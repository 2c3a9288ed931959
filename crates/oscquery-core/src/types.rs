//! OSC type codes and the OSCQuery `TYPE` string grammar
//!
//! A type string lists one character per argument. Bracketed groups declare
//! an array argument whose element types are themselves a type string:
//!
//! ```text
//! if[ii]s   ->  [Int32, Float32, [Int32, Int32], String]
//! ```

use std::fmt;

/// Single-character OSC type codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OscType {
    /// `i`
    Int32,
    /// `f`
    Float32,
    /// `s`
    String,
    /// `b`
    Blob,
    /// `h`
    Int64,
    /// `t`
    TimeTag,
    /// `d`
    Float64,
    /// `S` alternate string / symbol
    Symbol,
    /// `c`
    Char,
    /// `r` 32-bit RGBA
    Color,
    /// `m` 4-byte MIDI message
    Midi,
    /// `T`
    True,
    /// `F`
    False,
    /// `N`
    Nil,
    /// `I`
    Infinitum,
}

impl OscType {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            'i' => Some(OscType::Int32),
            'f' => Some(OscType::Float32),
            's' => Some(OscType::String),
            'b' => Some(OscType::Blob),
            'h' => Some(OscType::Int64),
            't' => Some(OscType::TimeTag),
            'd' => Some(OscType::Float64),
            'S' => Some(OscType::Symbol),
            'c' => Some(OscType::Char),
            'r' => Some(OscType::Color),
            'm' => Some(OscType::Midi),
            'T' => Some(OscType::True),
            'F' => Some(OscType::False),
            'N' => Some(OscType::Nil),
            'I' => Some(OscType::Infinitum),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            OscType::Int32 => 'i',
            OscType::Float32 => 'f',
            OscType::String => 's',
            OscType::Blob => 'b',
            OscType::Int64 => 'h',
            OscType::TimeTag => 't',
            OscType::Float64 => 'd',
            OscType::Symbol => 'S',
            OscType::Char => 'c',
            OscType::Color => 'r',
            OscType::Midi => 'm',
            OscType::True => 'T',
            OscType::False => 'F',
            OscType::Nil => 'N',
            OscType::Infinitum => 'I',
        }
    }
}

/// One parsed element of a type string
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeToken {
    Single(OscType),
    /// Bracketed group
    Array(Vec<TypeToken>),
}

impl TypeToken {
    pub fn is_array(&self) -> bool {
        matches!(self, TypeToken::Array(_))
    }
}

impl From<OscType> for TypeToken {
    fn from(ty: OscType) -> Self {
        TypeToken::Single(ty)
    }
}

impl fmt::Display for TypeToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeToken::Single(ty) => write!(f, "{}", ty.as_char()),
            TypeToken::Array(_) => f.write_str(&format_type_string(std::slice::from_ref(self))),
        }
    }
}

/// Deepest bracket nesting kept by [`parse_type_string`]
pub const MAX_TYPE_DEPTH: usize = 32;

/// Parse an OSCQuery `TYPE` string.
///
/// Unrecognized characters are skipped so vendor extensions never fail the
/// parse. A `[` that is never closed swallows the rest of the input. Groups
/// nested deeper than [`MAX_TYPE_DEPTH`] are skipped along with their
/// contents.
pub fn parse_type_string(s: &str) -> Vec<TypeToken> {
    // one frame per open group, the top level at the bottom
    let mut frames: Vec<Vec<TypeToken>> = vec![Vec::new()];
    let mut skipped = 0usize;

    for c in s.chars() {
        if skipped > 0 {
            match c {
                '[' => skipped += 1,
                ']' => skipped -= 1,
                _ => {}
            }
            continue;
        }

        match c {
            '[' if frames.len() > MAX_TYPE_DEPTH => skipped = 1,
            '[' => frames.push(Vec::new()),
            ']' if frames.len() > 1 => {
                let group = frames.pop().unwrap_or_default();
                if let Some(parent) = frames.last_mut() {
                    parent.push(TypeToken::Array(group));
                }
            }
            _ => {
                if let (Some(ty), Some(frame)) = (OscType::from_char(c), frames.last_mut()) {
                    frame.push(TypeToken::Single(ty));
                }
            }
        }
    }

    frames.truncate(1);
    frames.pop().unwrap_or_default()
}

/// Render tokens back into a type string, re-wrapping groups in brackets
pub fn format_type_string(tokens: &[TypeToken]) -> String {
    let mut out = String::new();
    let mut stack = vec![tokens.iter()];

    while let Some(iter) = stack.last_mut() {
        match iter.next() {
            Some(TypeToken::Single(ty)) => out.push(ty.as_char()),
            Some(TypeToken::Array(inner)) => {
                out.push('[');
                stack.push(inner.iter());
            }
            None => {
                stack.pop();
                if !stack.is_empty() {
                    out.push(']');
                }
            }
        }
    }

    out
}
