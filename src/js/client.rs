use std::sync::mpsc;
use tokio::sync::oneshot;

use crate::error::ScriptError;
use crate::js::JsCommand;

/// Client handle for communicating with the JS engine thread.
///
/// Cheap to clone and safe to share across threads and tasks.
#[derive(Clone, Debug)]
pub struct JsEngineClient {
    pub(crate) sender: mpsc::Sender<JsCommand>,
}

impl JsEngineClient {
    /// Send a tick command to flush the JS event loop.
    pub fn flush_event_loop(&self) {
        if let Err(e) = self.sender.send(JsCommand::FlushEventLoop) {
            log::warn!("Failed to send flush event loop command: {}", e);
        }
    }

    /// Execute a script without waiting for it. Failures are only logged.
    pub fn execute(&self, source: impl Into<String>) {
        if let Err(e) = self.sender.send(JsCommand::Execute {
            source: source.into(),
            reply: None,
        }) {
            log::error!("Failed to send execute command: {}", e);
        }
    }

    /// Execute a script and wait for its completion value, converted with
    /// JS `String(value)` semantics.
    pub async fn evaluate(&self, source: impl Into<String>) -> Result<String, ScriptError> {
        let (reply, result) = oneshot::channel();
        self.sender
            .send(JsCommand::Execute {
                source: source.into(),
                reply: Some(reply),
            })
            .map_err(|_| ScriptError::EngineUnavailable)?;

        result.await.map_err(|_| ScriptError::EngineUnavailable)?
    }

    /// Run a script for its side effects and wait until it has finished.
    /// Fails only when the script throws.
    pub async fn run(&self, source: impl Into<String>) -> Result<(), ScriptError> {
        let (reply, result) = oneshot::channel();
        self.sender
            .send(JsCommand::Run {
                source: source.into(),
                reply,
            })
            .map_err(|_| ScriptError::EngineUnavailable)?;

        result.await.map_err(|_| ScriptError::EngineUnavailable)?
    }

    /// Shutdown the JS engine.
    pub fn shutdown(&self) {
        let _ = self.sender.send(JsCommand::Shutdown);
    }
}
