//! Method arguments, access codes and ranges

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::types::{parse_type_string, TypeToken};
use crate::value::OscValue;
use crate::Error;

/// Read/write capability of a method's value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[repr(u8)]
pub enum Access {
    #[default]
    NoValue = 0,
    ReadOnly = 1,
    WriteOnly = 2,
    ReadWrite = 3,
}

impl Access {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(Access::NoValue),
            1 => Some(Access::ReadOnly),
            2 => Some(Access::WriteOnly),
            3 => Some(Access::ReadWrite),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        *self as u8
    }

    /// Whether `VALUE` can be read back
    pub fn is_readable(&self) -> bool {
        matches!(self, Access::ReadOnly | Access::ReadWrite)
    }
}

impl TryFrom<u8> for Access {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Error> {
        Access::from_code(code).ok_or(Error::UnknownAccess(code))
    }
}

/// Numeric bounds and/or a discrete value set for one argument
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Range {
    #[serde(rename = "MIN", default, skip_serializing_if = "Option::is_none")]
    pub min: Option<serde_json::Value>,
    #[serde(rename = "MAX", default, skip_serializing_if = "Option::is_none")]
    pub max: Option<serde_json::Value>,
    #[serde(rename = "VALS", default, skip_serializing_if = "Option::is_none")]
    pub vals: Option<Vec<serde_json::Value>>,
}

impl Range {
    pub fn bounds(min: impl Into<serde_json::Value>, max: impl Into<serde_json::Value>) -> Self {
        Self {
            min: Some(min.into()),
            max: Some(max.into()),
            vals: None,
        }
    }

    pub fn values(vals: Vec<serde_json::Value>) -> Self {
        Self {
            min: None,
            max: None,
            vals: Some(vals),
        }
    }
}

/// Range of a single argument, or per-element ranges of an array argument
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RangeSpec {
    // Tried first: a derived struct also accepts a JSON sequence.
    Nested(Vec<Option<RangeSpec>>),
    Bounds(Range),
}

impl From<Range> for RangeSpec {
    fn from(range: Range) -> Self {
        RangeSpec::Bounds(range)
    }
}

/// One parameter of a method node
#[derive(Debug, Clone, PartialEq)]
pub struct Argument {
    pub ty: TypeToken,
    pub range: Option<RangeSpec>,
    pub clipmode: Option<String>,
    pub value: Option<OscValue>,
}

impl Argument {
    pub fn new(ty: impl Into<TypeToken>) -> Self {
        Self {
            ty: ty.into(),
            range: None,
            clipmode: None,
            value: None,
        }
    }

    pub fn with_range(mut self, range: impl Into<RangeSpec>) -> Self {
        self.range = Some(range.into());
        self
    }

    pub fn with_clipmode(mut self, clipmode: &str) -> Self {
        self.clipmode = Some(clipmode.to_string());
        self
    }

    /// Set an initial value; values that do not fit the type are dropped
    pub fn with_value(mut self, value: impl Into<OscValue>) -> Self {
        self.value = value.into().conform(&self.ty);
        self
    }
}

/// Everything `set_opts` replaces on a node.
///
/// The default value carries no fields and turns a method back into an
/// empty container.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodOptions {
    pub description: Option<String>,
    pub access: Option<Access>,
    pub tags: Option<BTreeSet<String>>,
    pub critical: Option<bool>,
    pub arguments: Option<Vec<Argument>>,
}

impl MethodOptions {
    /// One argument per top-level token of `type_string`
    pub fn with_type(type_string: &str, access: Access) -> Self {
        Self {
            access: Some(access),
            arguments: Some(
                parse_type_string(type_string)
                    .into_iter()
                    .map(Argument::new)
                    .collect(),
            ),
            ..Default::default()
        }
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_string());
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = Some(tags.into_iter().map(Into::into).collect());
        self
    }

    pub fn critical(mut self, critical: bool) -> Self {
        self.critical = Some(critical);
        self
    }

    pub fn arguments(mut self, arguments: Vec<Argument>) -> Self {
        self.arguments = Some(arguments);
        self
    }
}
