//! Push channel for live timer updates.
//!
//! A connection is scoped to exactly one timer: the client joins
//! `{project_id, timer_id}` right after connecting and from then on receives
//! `timer_update` events until the connection is closed. There is no
//! reconnection; a dropped channel is reported once and the reader ends.

pub mod codec;
mod mock;
mod socketio;

pub use mock::MockPushTransport;
pub use socketio::SocketIoTransport;

use async_trait::async_trait;
use countdown_core::models::{ProjectId, TimerId, TimerPayload};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Event name the client emits after connecting.
pub const JOIN_EVENT: &str = "join_timer";

/// Event name the server uses for timer state changes.
pub const UPDATE_EVENT: &str = "timer_update";

/// Push transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("connection refused by server: {0}")]
    Rejected(String),

    #[error("connection closed")]
    ConnectionClosed,

    #[error("send failed: {0}")]
    SendFailed(String),

    #[error("protocol error: {0}")]
    Protocol(#[from] codec::CodecError),

    #[error("connection timeout")]
    Timeout,
}

/// Join payload, emitted as the `join_timer` event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinRequest {
    pub project_id: ProjectId,
    pub timer_id: TimerId,
}

impl JoinRequest {
    pub fn new(project_id: ProjectId, timer_id: TimerId) -> Self {
        Self {
            project_id,
            timer_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PushEvent {
    /// A `timer_update` event. May carry any subset of the timer fields.
    TimerUpdate(TimerPayload),

    /// The channel is gone. Always the last event of a connection.
    Disconnected(String),
}

/// One live push connection.
///
/// Dropping it has the same effect as [`PushConnection::close`].
#[derive(Debug)]
pub struct PushConnection {
    events: mpsc::Receiver<PushEvent>,
    task: Option<JoinHandle<()>>,
}

impl PushConnection {
    pub fn new(events: mpsc::Receiver<PushEvent>, task: Option<JoinHandle<()>>) -> Self {
        Self { events, task }
    }

    /// Next event, or `None` once the connection is finished or closed.
    pub async fn recv(&mut self) -> Option<PushEvent> {
        self.events.recv().await
    }

    /// Stop delivery immediately. Buffered events are discarded.
    pub fn close(&mut self) {
        self.events.close();
        while self.events.try_recv().is_ok() {}

        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for PushConnection {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

#[async_trait]
pub trait PushTransport: Send + Sync {
    /// Connect and join the given timer's room.
    async fn connect(&self, join: &JoinRequest) -> Result<PushConnection, TransportError>;
}
