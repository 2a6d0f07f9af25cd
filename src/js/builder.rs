use std::sync::mpsc::{self, Receiver};
use std::thread;

use boa_engine::{Context, JsError};
use boa_runtime::extensions::{ConsoleExtension, MicrotaskExtension, TimeoutExtension};

use crate::error::EngineStartError;
use crate::js::engine::run_js_loop;
use crate::js::{JsCommand, JsEngine, JsEngineClient};

/// Hook for installing globals into a freshly built page context.
pub trait JsEngineExtension: Send + Sync + 'static {
    fn register(&self, context: &mut Context, client: JsEngineClient) -> Result<(), JsError>;
}

pub struct JsEngineBuilder {
    extensions: Vec<Box<dyn JsEngineExtension>>,
    client: JsEngineClient,
    receiver: Receiver<JsCommand>,
}

impl Default for JsEngineBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl JsEngineBuilder {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        JsEngineBuilder {
            extensions: vec![],
            client: JsEngineClient { sender },
            receiver,
        }
    }

    pub fn with_extension(mut self, extension: impl JsEngineExtension) -> Self {
        self.extensions.push(Box::new(extension));
        self
    }

    /// Spawn the worker thread and wait until the context built on it is
    /// ready. Any extension failure is returned here.
    pub fn build(self) -> Result<JsEngine, EngineStartError> {
        let client = self.client.clone();
        let extensions = self.extensions;
        let receiver = self.receiver;
        let (ready_tx, ready_rx) = mpsc::sync_channel(1);

        let handle = thread::Builder::new()
            .name("wszero-js".to_string())
            .spawn(move || {
                let context = match build_context(&extensions, client) {
                    Ok(context) => context,
                    Err(e) => {
                        log::error!("Failed to build JS context: {}", e);
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };
                let _ = ready_tx.send(Ok(()));

                let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
                    run_js_loop(receiver, context);
                }));

                if let Err(e) = result {
                    log::error!("JS engine panicked: {:?}", e);
                }
            })?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(EngineStartError::Context(e)),
            Err(_) => return Err(EngineStartError::Exited),
        }

        Ok(JsEngine {
            client: self.client,
            _handle: handle,
        })
    }
}

fn build_context(
    extensions: &[Box<dyn JsEngineExtension>],
    client: JsEngineClient,
) -> Result<Context, JsError> {
    let mut context = Context::builder().build()?;

    // Register Boa runtime extensions
    boa_runtime::register(
        (
            ConsoleExtension::default(),
            TimeoutExtension {},
            MicrotaskExtension {},
        ),
        None,
        &mut context,
    )?;

    for extension in extensions {
        extension.register(&mut context, client.clone())?;
    }

    Ok(context)
}

#[cfg(test)]
mod tests {
    use boa_engine::JsNativeError;

    use super::*;

    struct FailingExtension;

    impl JsEngineExtension for FailingExtension {
        fn register(&self, _context: &mut Context, _client: JsEngineClient) -> Result<(), JsError> {
            Err(JsNativeError::typ().with_message("cannot install").into())
        }
    }

    struct GlobalExtension;

    impl JsEngineExtension for GlobalExtension {
        fn register(&self, context: &mut Context, _client: JsEngineClient) -> Result<(), JsError> {
            context.eval(boa_engine::Source::from_bytes("globalThis.installed = 'yes';"))?;
            Ok(())
        }
    }

    #[test]
    fn failing_extension_fails_the_build() {
        let err = JsEngineBuilder::new()
            .with_extension(FailingExtension)
            .build()
            .err()
            .expect("build should fail");

        assert!(matches!(err, EngineStartError::Context(ref msg) if msg.contains("cannot install")));
    }

    #[tokio::test]
    async fn extensions_run_before_build_returns() {
        let engine = JsEngineBuilder::new().with_extension(GlobalExtension).build().unwrap();
        assert_eq!(engine.client().evaluate("installed").await.unwrap(), "yes");
    }
}
