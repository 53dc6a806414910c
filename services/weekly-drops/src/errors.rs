//!
//! src/errors.rs  Oct 19th, 2026
//!
//! Defines enums and methods of error conversion
//! for errors the curator and its transport use
//!
//!

use thiserror::Error;

/// Failures of the stdio JSON-RPC channel to the catalog server
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("spawn error: {0}")]
    Spawn(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server closed stdout before responding to request {0}")]
    Closed(u64),
    #[error("malformed response: {0}")]
    Malformed(String),
    #[error("rpc error {code}: {message}")]
    Rpc { code: i64, message: String },
    #[error("no response to {method} within {ms}ms")]
    Timeout { method: String, ms: u128 }
}

#[derive(Error, Debug)]
pub enum DropsError {
    #[error("config error: {0}")]
    Config(String),
    #[error("transport error: {0}")]
    Transport(#[from] TransportError),
    #[error("protocol error: {0}")]
    Protocol(String),
    #[error("tool error: {0}")]
    Tool(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("run cancelled")]
    Cancelled,
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl From<serde_json::Error> for DropsError {
    fn from(e: serde_json::Error) -> Self { DropsError::Parse(e.to_string()) }
}

impl From<serde_json::Error> for TransportError {
    fn from(e: serde_json::Error) -> Self { TransportError::Malformed(e.to_string()) }
}
