//! Operation dispatch.
//!
//! The set of handlers is closed: [`Operation`] is matched exhaustively and an
//! unknown `op` is rejected before any handler runs.

use std::sync::Arc;

use crate::error::DispatchError;
use crate::js::JsEngineClient;
use crate::protocol::{Message, Operation};

/// Diagnostic output of the page.
pub trait Console: Send + Sync {
    fn log(&self, line: &str);
    fn error(&self, line: &str);
}

/// Console that writes through the `log` facade.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogConsole;

impl Console for LogConsole {
    fn log(&self, line: &str) {
        log::info!(target: "wszero::console", "{}", line);
    }

    fn error(&self, line: &str) {
        log::error!(target: "wszero::console", "{}", line);
    }
}

#[derive(Clone)]
pub struct Dispatcher {
    page: JsEngineClient,
    console: Arc<dyn Console>,
}

impl Dispatcher {
    pub fn new(page: JsEngineClient, console: Arc<dyn Console>) -> Self {
        Self { page, console }
    }

    pub fn console(&self) -> &dyn Console {
        self.console.as_ref()
    }

    /// Decode one text frame and run its handler to completion.
    pub async fn dispatch_text(&self, text: &str) -> Result<(), DispatchError> {
        let message = Message::decode(text)?;
        let operation = Operation::from_message(message)?;
        self.dispatch(operation).await
    }

    pub async fn dispatch(&self, operation: Operation) -> Result<(), DispatchError> {
        log::debug!("Dispatching {}", operation.name());
        match operation {
            Operation::EvalJs { script } => {
                self.page.run(script).await?;
            }
            Operation::Error { msg } => self.console.error(&msg),
        }
        Ok(())
    }

    /// Report a failure nobody handled, the way a page reports an uncaught error.
    pub fn report(&self, error: &DispatchError) {
        self.console.error(&format!("Uncaught {error}"));
    }
}
