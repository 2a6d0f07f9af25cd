//! Error types for the client.
//!
//! Only channel closure is ever recovered from (by reconnecting). Everything
//! else is reported through `log` and dropped, the same way an uncaught
//! exception in a page is reported and forgotten.

use thiserror::Error;

/// Failure to turn a text frame into a [`crate::protocol::Message`].
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("malformed frame: {0}")]
    Json(#[from] serde_json::Error),
    #[error("frame is not a JSON object")]
    NotAnObject,
    #[error("frame has no string \"op\" field")]
    MissingOp,
}

/// Failure raised while running code in the page's JS context.
#[derive(Debug, Clone, Error)]
pub enum ScriptError {
    #[error("uncaught exception: {0}")]
    Exception(String),
    #[error("JS engine is not running")]
    EngineUnavailable,
}

/// Failure to dispatch a single inbound frame.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Decode(#[from] DecodeError),
    #[error("no handler for {0}")]
    NoHandler(String),
    #[error("invalid params for {op}: {source}")]
    InvalidParams {
        op: String,
        #[source]
        source: serde_json::Error,
    },
    #[error(transparent)]
    Script(#[from] ScriptError),
}

/// Failure to queue an outbound frame.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("WebSocket is not open")]
    NotOpen,
    #[error("failed to encode message: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Invalid page location.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid page URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("page URL {0} has no host")]
    MissingHost(String),
}

/// The JS engine could not be brought up.
#[derive(Debug, Error)]
pub enum EngineStartError {
    #[error("failed to start JS engine thread: {0}")]
    Spawn(#[from] std::io::Error),
    #[error("failed to build JS context: {0}")]
    Context(String),
    #[error("JS engine thread exited before it was ready")]
    Exited,
}
