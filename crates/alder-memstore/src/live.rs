//! Dedicated subscriber and log-reader connections.

use std::sync::Arc;

use alder_core::ChannelSubscriber;
use alder_core::LogEntry;
use alder_core::LogReader;
use alder_core::StoreError;
use alder_core::StreamId;
use async_trait::async_trait;
use tokio::sync::Notify;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use tracing::warn;

use crate::store::Inner;

/// One subscriber's dedicated channel connection.
pub(crate) struct MemorySubscriber {
    channel: String,
    rx: broadcast::Receiver<String>,
}

impl MemorySubscriber {
    pub(crate) fn new(channel: String, rx: broadcast::Receiver<String>) -> Self {
        Self { channel, rx }
    }
}

#[async_trait]
impl ChannelSubscriber for MemorySubscriber {
    async fn next_message(&mut self) -> Result<Option<String>, StoreError> {
        loop {
            match self.rx.recv().await {
                Ok(payload) => return Ok(Some(payload)),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(channel = %self.channel, skipped, "subscriber lagged, messages dropped");
                }
                Err(RecvError::Closed) => return Ok(None),
            }
        }
    }
}

/// One subscriber's dedicated log-tailing connection.
pub(crate) struct MemoryLogReader {
    inner: Arc<Inner>,
    key: String,
    cursor: StreamId,
    wakeup: Arc<Notify>,
}

impl MemoryLogReader {
    pub(crate) fn new(inner: Arc<Inner>, key: String, cursor: StreamId, wakeup: Arc<Notify>) -> Self {
        Self {
            inner,
            key,
            cursor,
            wakeup,
        }
    }
}

#[async_trait]
impl LogReader for MemoryLogReader {
    async fn next_entries(&mut self) -> Result<Vec<LogEntry>, StoreError> {
        loop {
            // Register for the wakeup before checking the log, so an append
            // that lands between the check and the await is not missed.
            let notified = self.wakeup.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            {
                let state = self.inner.state.read().await;
                let fresh: Vec<LogEntry> = state
                    .logs
                    .get(&self.key)
                    .map(|entries| entries.iter().filter(|entry| entry.id > self.cursor).cloned().collect())
                    .unwrap_or_default();

                if let Some(last) = fresh.last() {
                    self.cursor = last.id;
                    return Ok(fresh);
                }
            }

            notified.await;
        }
    }

    fn last_id(&self) -> StreamId {
        self.cursor
    }
}
