//! JavaScript Engine
//!
//! Runs the page's Boa context on a dedicated worker thread. The context is
//! `!Send`, so every interaction goes through [`JsCommand`]s.

use boa_engine::{Context, JsError, JsValue, Source};
use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::ScriptError;
use crate::js::JsEngineClient;

/// How often the idle worker flushes jobs and timers.
const TICK_INTERVAL: Duration = Duration::from_millis(16);

/// Commands that can be sent to the JS engine thread.
#[derive(Debug)]
pub enum JsCommand {
    /// Evaluate a classic script in the global scope. When `reply` is set it
    /// receives the stringified completion value or the thrown error.
    Execute {
        source: String,
        reply: Option<oneshot::Sender<Result<String, ScriptError>>>,
    },
    /// Run a classic script for its side effects only. The completion value
    /// is discarded; only a thrown exception counts as failure.
    Run {
        source: String,
        reply: oneshot::Sender<Result<(), ScriptError>>,
    },
    /// Run pending jobs and timers.
    FlushEventLoop,
    /// Shutdown the JS engine.
    Shutdown,
}

/// JavaScript engine with dedicated worker thread.
///
/// Dropping the engine shuts the worker down.
pub struct JsEngine {
    pub(crate) client: JsEngineClient,
    pub(crate) _handle: JoinHandle<()>,
}

impl JsEngine {
    /// Get a client handle for communicating with the engine.
    pub fn client(&self) -> JsEngineClient {
        self.client.clone()
    }
}

impl Drop for JsEngine {
    fn drop(&mut self) {
        self.client.shutdown();
    }
}

/// Main loop for the JS engine thread.
pub(crate) fn run_js_loop(receiver: Receiver<JsCommand>, mut context: Context) {
    log::info!("JS engine thread started");

    loop {
        match receiver.recv_timeout(TICK_INTERVAL) {
            Ok(JsCommand::Execute { source, reply }) => {
                log::debug!("Executing script ({} bytes)...", source.len());

                let result = evaluate(&mut context, &source);
                flush_event_loop(&mut context);

                match reply {
                    Some(reply) => {
                        let _ = reply.send(result);
                    }
                    None => {
                        if let Err(e) = result {
                            log::error!("Failed to execute script: {}", e);
                        }
                    }
                }
            }
            Ok(JsCommand::Run { source, reply }) => {
                log::debug!("Running script ({} bytes)...", source.len());

                let result = run_script(&mut context, &source).map(|_| ());
                flush_event_loop(&mut context);
                let _ = reply.send(result);
            }
            Ok(JsCommand::FlushEventLoop) | Err(RecvTimeoutError::Timeout) => {
                flush_event_loop(&mut context);
            }
            Ok(JsCommand::Shutdown) => {
                log::info!("JS engine shutting down");
                break;
            }
            Err(RecvTimeoutError::Disconnected) => {
                log::warn!("JS engine channel closed");
                break;
            }
        }
    }

    log::info!("JS engine thread stopped");
}

fn run_script(context: &mut Context, source: &str) -> Result<JsValue, ScriptError> {
    context
        .eval(Source::from_bytes(source.as_bytes()))
        .map_err(exception)
}

fn evaluate(context: &mut Context, source: &str) -> Result<String, ScriptError> {
    let value = run_script(context, source)?;
    let text = value.to_string(context).map_err(exception)?;
    Ok(text.to_std_string_escaped())
}

fn exception(error: JsError) -> ScriptError {
    ScriptError::Exception(error.to_string())
}

/// Flush the event loop: run microtasks (Jobs) and due macrotasks (timers).
fn flush_event_loop(context: &mut Context) {
    if let Err(e) = context.run_jobs() {
        if let Some(e) = e.as_opaque() {
            let msg = e.to_json(context).unwrap_or_default();
            log::error!("Error running Boa jobs: {:?}", msg);
        } else {
            log::error!("Error running Boa jobs: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::error::ScriptError;
    use crate::js::JsEngineBuilder;

    #[tokio::test]
    async fn evaluates_in_global_scope() {
        let engine = JsEngineBuilder::new().build().unwrap();
        let js = engine.client();

        assert_eq!(js.evaluate("globalThis.__t = 42").await.unwrap(), "42");
        assert_eq!(js.evaluate("typeof __t === 'number' && __t === 42").await.unwrap(), "true");
    }

    #[tokio::test]
    async fn reports_exceptions() {
        let engine = JsEngineBuilder::new().build().unwrap();
        let js = engine.client();

        let err = js.evaluate("throw new Error('kaput')").await.unwrap_err();
        assert!(matches!(err, ScriptError::Exception(ref msg) if msg.contains("kaput")));

        assert!(js.evaluate("this is not javascript").await.is_err());
        // The context survives failures.
        assert_eq!(js.evaluate("1 + 1").await.unwrap(), "2");
    }

    #[tokio::test]
    async fn run_ignores_unprintable_completion_values() {
        let engine = JsEngineBuilder::new().build().unwrap();
        let js = engine.client();

        js.run("globalThis.o = Object.create(null)").await.unwrap();
        js.run("globalThis.s = Symbol('x')").await.unwrap();
        assert_eq!(js.evaluate("typeof o + ',' + typeof s").await.unwrap(), "object,symbol");

        let err = js.run("throw new Error('kaput')").await.unwrap_err();
        assert!(matches!(err, ScriptError::Exception(ref msg) if msg.contains("kaput")));
    }

    #[tokio::test]
    async fn fire_and_forget_runs_in_order() {
        let engine = JsEngineBuilder::new().build().unwrap();
        let js = engine.client();

        js.execute("globalThis.order = []; order.push('a');");
        js.execute("order.push('b');");
        assert_eq!(js.evaluate("order.join(',')").await.unwrap(), "a,b");
    }

    #[tokio::test]
    async fn dead_engine_is_unavailable() {
        let engine = JsEngineBuilder::new().build().unwrap();
        let js = engine.client();
        drop(engine);

        // Either the send fails or the reply is dropped; both mean the same thing.
        let err = tokio::time::timeout(std::time::Duration::from_secs(5), js.evaluate("1"))
            .await
            .expect("evaluate should not hang after shutdown")
            .unwrap_err();
        assert!(matches!(err, ScriptError::EngineUnavailable));
    }
}
