//! JavaScript Engine Module
//!
//! The page's JS context: a Boa engine on its own thread with an RPC-style
//! client. Extensions install the browser globals scripts rely on.

mod builder;
mod client;
mod engine;
mod send_msg;
mod shim;

pub use builder::{JsEngineBuilder, JsEngineExtension};
pub use client::JsEngineClient;
pub use engine::{JsCommand, JsEngine};
pub use send_msg::SendMsgExtension;
pub use shim::EnvironmentExtension;
