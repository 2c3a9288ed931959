//! Query server error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, ServerError>;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("server is already binding")]
    AlreadyBinding,

    #[error("no free port in range {start}-{end}")]
    NoFreePort { start: u16, end: u16 },

    #[error("mDNS error: {0}")]
    Mdns(String),

    #[error("tree error: {0}")]
    Tree(#[from] oscquery_core::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("server error: {0}")]
    Other(String),
}
