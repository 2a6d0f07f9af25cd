//! Connection Manager
//!
//! Owns the channel lifecycle: connect to `ws://<page host>/ws`, dispatch every
//! text frame, and after any closure wait a fixed delay and connect again.
//! There is no retry cap and no backoff; the loop only ends when the task
//! running it is dropped.

use futures_util::{SinkExt, StreamExt};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::http::HeaderValue;
use tokio_tungstenite::tungstenite::http::header::ORIGIN;

use crate::channel::{ChannelHandle, CloseEvent, Outbox, ReadyState};
use crate::config::ClientConfig;
use crate::dispatch::Dispatcher;
use crate::error::SendError;

/// How long to wait for the server to drop the connection after it closed it.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(5);

pub struct ConnectionManager {
    config: ClientConfig,
    dispatcher: Dispatcher,
    outbox: Outbox,
    attempts: AtomicU64,
}

impl ConnectionManager {
    pub fn new(config: ClientConfig, dispatcher: Dispatcher, outbox: Outbox) -> Self {
        Self {
            config,
            dispatcher,
            outbox,
            attempts: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn outbox(&self) -> &Outbox {
        &self.outbox
    }

    /// Serialize `msg` and send it as one text frame on the live channel.
    pub fn send_msg<T: Serialize + ?Sized>(&self, msg: &T) -> Result<(), SendError> {
        self.outbox.send_msg(msg)
    }

    pub fn ready_state(&self) -> ReadyState {
        self.outbox.ready_state()
    }

    /// Connection attempts started so far, including the live one.
    pub fn attempts(&self) -> u64 {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Connect, and reconnect after every closure, forever.
    pub async fn run(&self) {
        loop {
            let event = self.connect().await;
            self.dispatcher
                .console()
                .log(&format!("Connection closed: {}", event));
            tokio::time::sleep(self.config.reconnect_delay()).await;
        }
    }

    /// Open a fresh channel, make it the live one, and serve it until it closes.
    pub async fn connect(&self) -> CloseEvent {
        let id = self.attempts.fetch_add(1, Ordering::SeqCst) + 1;
        let (handle, outgoing) = ChannelHandle::new(id);
        self.outbox.replace(handle.clone());

        let event = self.serve(&handle, outgoing).await;

        handle.set_ready_state(ReadyState::Closed);
        self.outbox.clear(id);
        log::info!("[Channel {}] Closed: {}", id, event);
        event
    }

    async fn serve(
        &self,
        handle: &ChannelHandle,
        mut outgoing: mpsc::UnboundedReceiver<String>,
    ) -> CloseEvent {
        let id = handle.id();
        let url = self.config.websocket_url();
        let addr = self.config.socket_addr();

        log::info!("[Channel {}] Connecting to {}", id, url);

        let tcp_stream = match TcpStream::connect(&addr).await {
            Ok(stream) => stream,
            Err(e) => {
                log::error!("[Channel {}] TCP connection to {} failed: {}", id, addr, e);
                return CloseEvent::abnormal("Connection failed");
            }
        };

        let mut request = match url.as_str().into_client_request() {
            Ok(req) => req,
            Err(e) => {
                log::error!("[Channel {}] Failed to create request: {}", id, e);
                return CloseEvent::abnormal("Invalid request");
            }
        };

        // Browsers always send the page origin.
        match self.config.origin().parse::<HeaderValue>() {
            Ok(origin) => {
                request.headers_mut().insert(ORIGIN, origin);
            }
            Err(e) => log::warn!("[Channel {}] Skipping Origin header: {}", id, e),
        }

        let ws_stream = match tokio_tungstenite::client_async(request, tcp_stream).await {
            Ok((stream, response)) => {
                log::debug!("[Channel {}] Handshake status {}", id, response.status());
                stream
            }
            Err(e) => {
                log::error!("[Channel {}] Handshake failed: {}", id, e);
                return CloseEvent::abnormal("Handshake failed");
            }
        };

        handle.set_ready_state(ReadyState::Open);
        self.dispatcher.console().log("Connection established");

        let (mut write, mut read) = ws_stream.split();

        let send_task = tokio::spawn(async move {
            while let Some(text) = outgoing.recv().await {
                if let Err(e) = write.send(WsMessage::Text(text.into())).await {
                    log::error!("[Channel {}] Send error: {}", id, e);
                    break;
                }
            }
        });

        // Frames are handled one at a time; the next is not read until the
        // current handler has finished.
        let event = loop {
            match read.next().await {
                Some(Ok(WsMessage::Text(text))) => {
                    log::debug!("[Channel {}] Received: {}", id, preview(&text));
                    if let Err(e) = self.dispatcher.dispatch_text(&text).await {
                        self.dispatcher.report(&e);
                    }
                }
                Some(Ok(WsMessage::Binary(data))) => {
                    log::debug!("[Channel {}] Ignoring binary frame ({} bytes)", id, data.len());
                }
                Some(Ok(WsMessage::Close(frame))) => {
                    handle.set_ready_state(ReadyState::Closing);
                    let event = frame
                        .map(|f| CloseEvent {
                            code: f.code.into(),
                            reason: f.reason.as_str().to_string(),
                        })
                        .unwrap_or_else(CloseEvent::no_status);

                    // The echoed close frame is queued by tungstenite and only
                    // flushed by further reads. Keep reading until the server
                    // drops the connection.
                    let drain = async { while let Some(Ok(_)) = read.next().await {} };
                    if tokio::time::timeout(CLOSE_TIMEOUT, drain).await.is_err() {
                        log::warn!("[Channel {}] Server did not finish the closing handshake", id);
                    }
                    break event;
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    log::error!("[Channel {}] Read error: {}", id, e);
                    break CloseEvent::abnormal("Connection error");
                }
                None => break CloseEvent::abnormal("Connection ended"),
            }
        };

        send_task.abort();
        event
    }
}

fn preview(text: &str) -> &str {
    match text.char_indices().nth(100) {
        Some((end, _)) => &text[..end],
        None => text,
    }
}
