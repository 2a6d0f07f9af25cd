//! # wszero client
//!
//! A client for the wszero protocol: it connects to `ws://<page host>/ws`,
//! dispatches each JSON frame to an operation handler, and reconnects two
//! seconds after every closure, indefinitely.
//!
//! The browser page is modelled by [`Page`]: an embedded JavaScript context
//! (Boa) that server-sent `eval_js` scripts run in, plus the
//! [`ConnectionManager`] that feeds it.
//!
//! **`eval_js` executes arbitrary server-supplied code.** It exists as a
//! development hook. Do not point a page at a server you do not trust.
//!
//! ## Example
//!
//! ```no_run
//! use wszero_client::{ClientConfig, Page};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let page = Page::load(ClientConfig::from_page_url("http://localhost:8000/")?)?;
//!     page.run().await;
//!     Ok(())
//! }
//! ```

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod js;
pub mod manager;
pub mod page;
pub mod protocol;

pub use channel::{CloseEvent, Outbox, ReadyState};
pub use config::{ClientConfig, DEFAULT_RECONNECT_DELAY};
pub use dispatch::{Console, Dispatcher, LogConsole};
pub use error::{ConfigError, DecodeError, DispatchError, EngineStartError, ScriptError, SendError};
pub use manager::ConnectionManager;
pub use page::Page;
pub use protocol::{Message, Operation};
