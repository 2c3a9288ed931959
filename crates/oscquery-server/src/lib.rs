//! OSCQuery Server
//!
//! Publishes a live [`NodeTree`](oscquery_core::NodeTree) over HTTP with
//! OSCQuery attribute selection and advertises it as `_oscjson._tcp` via mDNS.
//!
//! ```no_run
//! use oscquery_core::{Access, MethodOptions};
//! use oscquery_server::{QueryServer, QueryServerConfig};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let server = QueryServer::new(QueryServerConfig {
//!     osc_port: Some(9000),
//!     ..Default::default()
//! })?;
//! server.add_method(
//!     "/avatar/parameters/Foo",
//!     MethodOptions::with_type("i", Access::ReadWrite),
//! )?;
//! let host_info = server.start().await?;
//! println!("serving {} on port {:?}", host_info.name, server.port());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
mod handler;
pub mod server;

#[cfg(feature = "mdns")]
pub mod advertise;

pub use config::QueryServerConfig;
pub use error::{Result, ServerError};
pub use server::{QueryServer, ServerEvent};
