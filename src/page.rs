use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::channel::Outbox;
use crate::config::ClientConfig;
use crate::dispatch::{Console, Dispatcher, LogConsole};
use crate::error::EngineStartError;
use crate::js::{EnvironmentExtension, JsEngine, JsEngineBuilder, JsEngineClient, SendMsgExtension};
use crate::manager::ConnectionManager;

/// A loaded page: a JS context plus the connection that drives it.
///
/// Scripts arriving as `eval_js` run in this page's context, and may call
/// `send_msg` to reach the server over whichever channel is live.
pub struct Page {
    engine: JsEngine,
    manager: Arc<ConnectionManager>,
}

impl Page {
    pub fn load(config: ClientConfig) -> Result<Self, EngineStartError> {
        Self::with_console(config, Arc::new(LogConsole))
    }

    pub fn with_console(config: ClientConfig, console: Arc<dyn Console>) -> Result<Self, EngineStartError> {
        log::info!("Loading page {}", config.page_url());

        let outbox = Outbox::new();
        let engine = JsEngineBuilder::new()
            .with_extension(EnvironmentExtension::new(config.page_url()))
            .with_extension(SendMsgExtension::new(outbox.clone()))
            .build()?;

        let dispatcher = Dispatcher::new(engine.client(), console);
        let manager = Arc::new(ConnectionManager::new(config, dispatcher, outbox));

        Ok(Self { engine, manager })
    }

    pub fn js(&self) -> JsEngineClient {
        self.engine.client()
    }

    pub fn manager(&self) -> &Arc<ConnectionManager> {
        &self.manager
    }

    /// Connect and keep reconnecting. Never returns.
    pub async fn run(&self) {
        self.manager.run().await;
    }

    /// Run the connection loop on a background task. Aborting the task stops it.
    pub fn spawn(&self) -> JoinHandle<()> {
        let manager = self.manager.clone();
        tokio::spawn(async move { manager.run().await })
    }
}
