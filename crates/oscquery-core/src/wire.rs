//! JSON documents exchanged over HTTP
//!
//! A node is described by an object whose keys are OSCQuery attribute names:
//!
//! ```text
//! {"FULL_PATH": "/avatar/parameters/Foo", "TYPE": "i", "ACCESS": 3, "VALUE": [5]}
//! ```
//!
//! All attributes except `FULL_PATH` are optional; absent ones take their
//! default instead of failing the parse.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::argument::RangeSpec;
use crate::Error;

/// Serialized form of one node and, through `CONTENTS`, its subtree
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeDescription {
    #[serde(rename = "FULL_PATH", default)]
    pub full_path: String,
    #[serde(rename = "CONTENTS", default, skip_serializing_if = "Option::is_none")]
    pub contents: Option<BTreeMap<String, NodeDescription>>,
    #[serde(rename = "TYPE", default, skip_serializing_if = "Option::is_none")]
    pub type_string: Option<String>,
    #[serde(rename = "ACCESS", default, skip_serializing_if = "Option::is_none")]
    pub access: Option<u8>,
    #[serde(rename = "RANGE", default, skip_serializing_if = "Option::is_none")]
    pub range: Option<Vec<Option<RangeSpec>>>,
    #[serde(rename = "DESCRIPTION", default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "TAGS", default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(rename = "CRITICAL", default, skip_serializing_if = "Option::is_none")]
    pub critical: Option<bool>,
    #[serde(rename = "CLIPMODE", default, skip_serializing_if = "Option::is_none")]
    pub clipmode: Option<Vec<Option<String>>>,
    #[serde(rename = "VALUE", default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Vec<serde_json::Value>>,
}

impl NodeDescription {
    /// Project a single attribute as `{ATTR: value}`; absent attributes map
    /// to `null`.
    pub fn attribute(&self, attr: Attribute) -> serde_json::Value {
        let value = serde_json::to_value(self)
            .ok()
            .and_then(|mut doc| doc.get_mut(attr.as_str()).map(serde_json::Value::take))
            .unwrap_or(serde_json::Value::Null);

        let mut map = serde_json::Map::new();
        map.insert(attr.as_str().to_string(), value);
        serde_json::Value::Object(map)
    }
}

/// Which optional attributes a host supports
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE", default)]
pub struct Extensions {
    pub access: bool,
    pub value: bool,
    pub range: bool,
    pub description: bool,
    pub tags: bool,
    pub critical: bool,
    pub clipmode: bool,
}

impl Extensions {
    /// Every extension a node tree can carry
    pub fn all() -> Self {
        Self {
            access: true,
            value: true,
            range: true,
            description: true,
            tags: true,
            critical: true,
            clipmode: true,
        }
    }
}

/// Transport the advertised OSC port listens on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OscTransport {
    #[default]
    Udp,
    Tcp,
}

impl fmt::Display for OscTransport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OscTransport::Udp => write!(f, "UDP"),
            OscTransport::Tcp => write!(f, "TCP"),
        }
    }
}

/// The `?HOST_INFO` document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostInfo {
    #[serde(rename = "NAME")]
    pub name: String,
    #[serde(rename = "EXTENSIONS")]
    pub extensions: Extensions,
    #[serde(rename = "OSC_IP")]
    pub osc_ip: String,
    #[serde(rename = "OSC_PORT")]
    pub osc_port: u16,
    #[serde(rename = "OSC_TRANSPORT")]
    pub osc_transport: OscTransport,
}

/// Query attributes accepted by the HTTP endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Attribute {
    FullPath,
    Contents,
    Type,
    Access,
    Range,
    Description,
    Tags,
    Critical,
    Clipmode,
    Value,
    HostInfo,
}

impl Attribute {
    pub const ALL: [Attribute; 11] = [
        Attribute::FullPath,
        Attribute::Contents,
        Attribute::Type,
        Attribute::Access,
        Attribute::Range,
        Attribute::Description,
        Attribute::Tags,
        Attribute::Critical,
        Attribute::Clipmode,
        Attribute::Value,
        Attribute::HostInfo,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Attribute::FullPath => "FULL_PATH",
            Attribute::Contents => "CONTENTS",
            Attribute::Type => "TYPE",
            Attribute::Access => "ACCESS",
            Attribute::Range => "RANGE",
            Attribute::Description => "DESCRIPTION",
            Attribute::Tags => "TAGS",
            Attribute::Critical => "CRITICAL",
            Attribute::Clipmode => "CLIPMODE",
            Attribute::Value => "VALUE",
            Attribute::HostInfo => "HOST_INFO",
        }
    }
}

impl FromStr for Attribute {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Error> {
        Attribute::ALL
            .into_iter()
            .find(|attr| attr.as_str() == s)
            .ok_or_else(|| Error::UnknownAttribute(s.to_string()))
    }
}

impl fmt::Display for Attribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
