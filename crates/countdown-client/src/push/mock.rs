//! In-memory push transport for testing.

use async_trait::async_trait;
use countdown_core::models::TimerPayload;
use std::sync::{Arc, Mutex};
use tokio::sync::mpsc;

use super::{JoinRequest, PushConnection, PushEvent, PushTransport, TransportError};

/// Push transport that hands every connection's sender to the test.
///
/// Clones share state.
#[derive(Debug, Clone, Default)]
pub struct MockPushTransport {
    inner: Arc<Mutex<MockPushInner>>,
}

#[derive(Debug, Default)]
struct MockPushInner {
    joins: Vec<JoinRequest>,
    senders: Vec<mpsc::Sender<PushEvent>>,
    fail_next_connect: Option<String>,
    fail_all: Option<String>,
}

impl MockPushTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every connect fails.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        let transport = Self::new();
        transport.inner.lock().unwrap().fail_all = Some(reason.into());
        transport
    }

    pub fn fail_next_connect(&self, reason: impl Into<String>) {
        self.inner.lock().unwrap().fail_next_connect = Some(reason.into());
    }

    /// Joins in connect order.
    pub fn joins(&self) -> Vec<JoinRequest> {
        self.inner.lock().unwrap().joins.clone()
    }

    pub fn connection_count(&self) -> usize {
        self.inner.lock().unwrap().senders.len()
    }

    /// Sender for the `index`-th connection.
    pub fn sender(&self, index: usize) -> Option<mpsc::Sender<PushEvent>> {
        self.inner.lock().unwrap().senders.get(index).cloned()
    }

    /// Whether the `index`-th connection has been closed by its owner.
    pub fn is_closed(&self, index: usize) -> bool {
        self.sender(index).map(|tx| tx.is_closed()).unwrap_or(true)
    }

    /// Push an update on the most recent connection. Returns false if that
    /// connection is gone.
    pub async fn push_update(&self, payload: TimerPayload) -> bool {
        let sender = self.inner.lock().unwrap().senders.last().cloned();
        match sender {
            Some(tx) => tx.send(PushEvent::TimerUpdate(payload)).await.is_ok(),
            None => false,
        }
    }

    /// Drop the most recent connection from the server side.
    pub async fn disconnect(&self, reason: impl Into<String>) -> bool {
        let sender = self.inner.lock().unwrap().senders.last().cloned();
        match sender {
            Some(tx) => tx.send(PushEvent::Disconnected(reason.into())).await.is_ok(),
            None => false,
        }
    }
}

#[async_trait]
impl PushTransport for MockPushTransport {
    async fn connect(&self, join: &JoinRequest) -> Result<PushConnection, TransportError> {
        let mut inner = self.inner.lock().unwrap();

        if let Some(reason) = inner.fail_all.clone() {
            return Err(TransportError::ConnectionFailed(reason));
        }
        if let Some(reason) = inner.fail_next_connect.take() {
            return Err(TransportError::ConnectionFailed(reason));
        }

        let (tx, rx) = mpsc::channel(32);
        inner.joins.push(join.clone());
        inner.senders.push(tx);

        Ok(PushConnection::new(rx, None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_records_joins_and_delivers() {
        let transport = MockPushTransport::new();
        let join = JoinRequest::new("1".into(), "7".into());

        let mut conn = transport.connect(&join).await.unwrap();
        assert_eq!(transport.joins(), vec![join]);

        assert!(transport.push_update(TimerPayload::new("7")).await);
        assert_eq!(
            conn.recv().await,
            Some(PushEvent::TimerUpdate(TimerPayload::new("7")))
        );

        conn.close();
        assert!(transport.is_closed(0));
        assert!(!transport.push_update(TimerPayload::new("7")).await);
    }

    #[tokio::test]
    async fn test_fail_next_connect() {
        let transport = MockPushTransport::new();
        transport.fail_next_connect("boom");
        let join = JoinRequest::new("1".into(), "7".into());

        assert!(transport.connect(&join).await.is_err());
        assert!(transport.connect(&join).await.is_ok());
        assert_eq!(transport.connection_count(), 1);
    }
}
