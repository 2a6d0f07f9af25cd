//! A single connection instance and the shared reference to the live one.

use boa_gc::{Finalize, Trace, empty_trace};
use serde::Serialize;
use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tokio::sync::mpsc;

use crate::error::SendError;
use crate::protocol;

/// WebSocket ready states (matching browser API)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ReadyState {
    Connecting = 0,
    Open = 1,
    Closing = 2,
    Closed = 3,
}

impl From<u32> for ReadyState {
    fn from(value: u32) -> Self {
        match value {
            0 => ReadyState::Connecting,
            1 => ReadyState::Open,
            2 => ReadyState::Closing,
            _ => ReadyState::Closed,
        }
    }
}

/// Why a channel closed, as a browser `CloseEvent` would report it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloseEvent {
    pub code: u16,
    pub reason: String,
}

impl CloseEvent {
    /// The peer closed without a status code.
    pub const NO_STATUS: u16 = 1005;
    /// The connection dropped without a close handshake.
    pub const ABNORMAL: u16 = 1006;

    pub fn no_status() -> Self {
        Self {
            code: Self::NO_STATUS,
            reason: String::new(),
        }
    }

    pub fn abnormal(reason: impl Into<String>) -> Self {
        Self {
            code: Self::ABNORMAL,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for CloseEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.code, self.reason)
    }
}

/// A handle to send messages to one WebSocket connection
#[derive(Clone, Debug)]
pub struct ChannelHandle {
    id: u64,
    sender: mpsc::UnboundedSender<String>,
    ready_state: Arc<AtomicU32>,
}

impl ChannelHandle {
    pub(crate) fn new(id: u64) -> (Self, mpsc::UnboundedReceiver<String>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let handle = Self {
            id,
            sender,
            ready_state: Arc::new(AtomicU32::new(ReadyState::Connecting as u32)),
        };
        (handle, receiver)
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn ready_state(&self) -> ReadyState {
        ReadyState::from(self.ready_state.load(Ordering::SeqCst))
    }

    pub(crate) fn set_ready_state(&self, state: ReadyState) {
        self.ready_state.store(state as u32, Ordering::SeqCst);
    }

    /// Queue one text frame.
    pub fn send(&self, text: String) -> Result<(), SendError> {
        if self.ready_state() != ReadyState::Open {
            return Err(SendError::NotOpen);
        }
        self.sender.send(text).map_err(|_| SendError::NotOpen)
    }
}

/// The replaceable reference to the live channel.
///
/// Shared between the connection manager, which swaps the channel on every
/// reconnect, and anything that wants to send, including the page's JS
/// `send_msg`.
#[derive(Clone, Debug, Default, Finalize)]
pub struct Outbox {
    current: Arc<Mutex<Option<ChannelHandle>>>,
}

// Holds no GC-managed values.
unsafe impl Trace for Outbox {
    empty_trace!();
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Option<ChannelHandle>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn replace(&self, handle: ChannelHandle) {
        *self.lock() = Some(handle);
    }

    /// Forget the channel `id`, unless a newer one has already replaced it.
    pub(crate) fn clear(&self, id: u64) {
        let mut current = self.lock();
        if current.as_ref().is_some_and(|handle| handle.id() == id) {
            *current = None;
        }
    }

    pub fn current(&self) -> Option<ChannelHandle> {
        self.lock().clone()
    }

    pub fn ready_state(&self) -> ReadyState {
        self.lock()
            .as_ref()
            .map_or(ReadyState::Closed, ChannelHandle::ready_state)
    }

    /// Queue an already encoded frame on the live channel.
    pub fn send_text(&self, text: String) -> Result<(), SendError> {
        match self.lock().as_ref() {
            Some(handle) => handle.send(text),
            None => Err(SendError::NotOpen),
        }
    }

    /// Serialize `msg` as JSON and queue it as a single text frame.
    pub fn send_msg<T: Serialize + ?Sized>(&self, msg: &T) -> Result<(), SendError> {
        let text = protocol::encode(msg)?;
        self.send_text(text)
    }
}
