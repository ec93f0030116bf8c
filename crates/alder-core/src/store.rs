//! The store backend interface.
//!
//! One implementation of [`Store`] serves all of an index's request/response
//! traffic over a shared connection. Blocking consumption (channel
//! subscriptions and log tailing) goes through dedicated per-subscriber
//! connections instead, because a blocking read on the shared connection
//! would stall every other operation. Dropping a dedicated connection is its
//! teardown.

use async_trait::async_trait;

use crate::command::LogEntry;
use crate::command::StoreCommand;
use crate::command::StoreReply;
use crate::command::StreamId;
use crate::error::StoreError;
use crate::error::UnexpectedReplySnafu;

/// A key-value store providing hashes, sorted sets, expiry, pub/sub
/// channels, append logs, and all-or-nothing batches.
#[async_trait]
pub trait Store: Send + Sync {
    /// Apply one command.
    async fn apply(&self, command: StoreCommand) -> Result<StoreReply, StoreError> {
        let replies = self.apply_batch(vec![command]).await?;
        match replies.into_iter().next() {
            Some(reply) => Ok(reply),
            None => UnexpectedReplySnafu { expected: "one reply" }.fail(),
        }
    }

    /// Apply a batch of commands atomically.
    ///
    /// Either every command applies and the replies come back positionally,
    /// or none do. An aborted batch reports an empty reply vector.
    async fn apply_batch(&self, commands: Vec<StoreCommand>) -> Result<Vec<StoreReply>, StoreError>;

    /// Open a dedicated connection subscribed to one channel.
    ///
    /// Messages published before the subscription is established are lost;
    /// delivery is at-most-once with no backlog.
    async fn subscriber(&self, channel: &str) -> Result<Box<dyn ChannelSubscriber>, StoreError>;

    /// Open a dedicated connection tailing the log at `key`.
    ///
    /// `after` positions the cursor; `None` starts at the current end of the
    /// log so only future entries are observed.
    async fn log_reader(&self, key: &str, after: Option<StreamId>) -> Result<Box<dyn LogReader>, StoreError>;

    /// The store's clock, unix milliseconds.
    fn now_unix_ms(&self) -> u64;
}

#[async_trait]
impl<T: Store + ?Sized> Store for std::sync::Arc<T> {
    async fn apply(&self, command: StoreCommand) -> Result<StoreReply, StoreError> {
        (**self).apply(command).await
    }

    async fn apply_batch(&self, commands: Vec<StoreCommand>) -> Result<Vec<StoreReply>, StoreError> {
        (**self).apply_batch(commands).await
    }

    async fn subscriber(&self, channel: &str) -> Result<Box<dyn ChannelSubscriber>, StoreError> {
        (**self).subscriber(channel).await
    }

    async fn log_reader(&self, key: &str, after: Option<StreamId>) -> Result<Box<dyn LogReader>, StoreError> {
        (**self).log_reader(key, after).await
    }

    fn now_unix_ms(&self) -> u64 {
        (**self).now_unix_ms()
    }
}

/// A dedicated connection delivering messages from one channel.
#[async_trait]
pub trait ChannelSubscriber: Send {
    /// Wait for the next message.
    ///
    /// Returns `Ok(None)` once the connection is closed.
    async fn next_message(&mut self) -> Result<Option<String>, StoreError>;
}

/// A dedicated connection tailing one append log.
#[async_trait]
pub trait LogReader: Send {
    /// Block until entries past the cursor arrive, then return them in id
    /// order and advance the cursor past the last one.
    async fn next_entries(&mut self) -> Result<Vec<LogEntry>, StoreError>;

    /// The cursor: the id of the last entry handed out.
    fn last_id(&self) -> StreamId;
}
