//! OSCQuery Core
//!
//! Namespace model and wire schema shared by the query server and the
//! discovery client.
//!
//! This crate provides:
//! - OSC type codes and the `TYPE` string grammar ([`OscType`], [`parse_type_string`])
//! - Typed argument values ([`OscValue`])
//! - The addressable node tree ([`NodeTree`], [`NodeRef`])
//! - JSON documents served over HTTP ([`NodeDescription`], [`HostInfo`])

pub mod argument;
pub mod error;
pub mod node;
pub mod path;
pub mod types;
pub mod value;
pub mod wire;

pub use argument::{Access, Argument, MethodOptions, Range, RangeSpec};
pub use error::{Error, Result};
pub use node::{Methods, Node, NodeId, NodeRef, NodeTree};
pub use types::{format_type_string, parse_type_string, OscType, TypeToken, MAX_TYPE_DEPTH};
pub use value::OscValue;
pub use wire::{Attribute, Extensions, HostInfo, NodeDescription, OscTransport};

/// mDNS service type used to advertise and browse OSCQuery endpoints
pub const SERVICE_TYPE: &str = "_oscjson._tcp.local.";
