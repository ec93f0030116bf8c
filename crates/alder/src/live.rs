//! Cancellable subscription and log-tailing sequences.
//!
//! Both flavors share one shape: a lazy, infinite sequence of decoded items
//! over a dedicated store connection, ended by a [`CancellationToken`]. The
//! connection is dropped on every exit path (cancellation, connection
//! close, retrieval error) so no subscriber leaks its connection.
//!
//! Malformed inbound envelopes are logged and skipped; a listener must not
//! die because of bad traffic on its channel. Retrieval errors are logged
//! and end the sequence without retry: a consumer seeing end-of-sequence
//! checks its cancellation state rather than assuming success.

use std::collections::VecDeque;
use std::marker::PhantomData;

use alder_core::ChannelSubscriber;
use alder_core::Envelope;
use alder_core::LogEntry;
use alder_core::LogReader;
use alder_core::Record;
use alder_core::Ref;
use alder_core::StreamId;
use regex::Regex;
use snafu::ResultExt;
use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::warn;

use crate::error::FilterPatternSnafu;
use crate::error::Result;
use crate::index::Index;

/// Subscriber-side filter on the envelope's message field.
#[derive(Debug, Clone)]
pub enum MessageFilter {
    /// Deliver only envelopes whose message equals this string.
    Exact(String),
    /// Deliver only envelopes whose message matches this pattern.
    Pattern(Regex),
}

impl MessageFilter {
    /// Filter on an exact message.
    pub fn exact(message: impl Into<String>) -> Self {
        MessageFilter::Exact(message.into())
    }

    /// Filter on a regex pattern.
    ///
    /// # Errors
    ///
    /// Fails if `pattern` is not a valid regex.
    pub fn pattern(pattern: &str) -> Result<Self> {
        Ok(MessageFilter::Pattern(Regex::new(pattern).context(FilterPatternSnafu)?))
    }

    fn passes(&self, message: &str) -> bool {
        match self {
            MessageFilter::Exact(expected) => expected == message,
            MessageFilter::Pattern(pattern) => pattern.is_match(message),
        }
    }
}

/// A cancellable sequence of envelopes from one channel.
///
/// Messages published before the subscription was established are lost;
/// delivery is at-most-once with no backlog or replay.
pub struct Subscription {
    channel: String,
    conn: Option<Box<dyn ChannelSubscriber>>,
    filter: Option<MessageFilter>,
    cancel: CancellationToken,
}

impl Subscription {
    /// The resolved channel key this subscription listens on.
    pub fn channel(&self) -> &str {
        &self.channel
    }

    /// Wait for the next envelope passing the filter.
    ///
    /// Returns `None` once the sequence has ended (cancellation, connection
    /// close, or a logged retrieval error) and on every later call.
    pub async fn next(&mut self) -> Option<Envelope> {
        loop {
            let inbound = {
                let conn = self.conn.as_mut()?;
                tokio::select! {
                    _ = self.cancel.cancelled() => None,
                    inbound = conn.next_message() => Some(inbound),
                }
            };

            match inbound {
                None => {
                    self.conn = None;
                    return None;
                }
                Some(Ok(Some(payload))) => match Envelope::decode(&payload) {
                    Ok(envelope) => {
                        if self.filter.as_ref().map_or(true, |filter| filter.passes(&envelope.message)) {
                            return Some(envelope);
                        }
                    }
                    Err(error) => {
                        warn!(channel = %self.channel, error = %error, "skipping malformed event");
                    }
                },
                Some(Ok(None)) => {
                    self.conn = None;
                    return None;
                }
                Some(Err(error)) => {
                    warn!(channel = %self.channel, error = %error, "subscription read failed, ending sequence");
                    self.conn = None;
                    return None;
                }
            }
        }
    }
}

/// One decoded entry of a tailed log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamItem<T> {
    /// The store-assigned id, unique and monotonic within the log.
    pub id: StreamId,
    /// The decoded payload.
    pub data: T,
}

/// A cancellable sequence of decoded entries from one append log.
///
/// The cursor is caller-visible through [`LogTail::last_id`], so tailing is
/// resumable across process restarts by passing it back as the starting id.
pub struct LogTail<T> {
    key: String,
    reader: Option<Box<dyn LogReader>>,
    pending: VecDeque<LogEntry>,
    last_id: Option<StreamId>,
    cancel: CancellationToken,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> LogTail<T> {
    /// The resolved log key being tailed.
    pub fn key(&self) -> &str {
        &self.key
    }

    /// The cursor: the id of the last entry retrieved, or the explicit
    /// starting id before anything arrived.
    pub fn last_id(&self) -> Option<StreamId> {
        self.last_id
    }

    /// Wait for the next decodable entry.
    ///
    /// Entries whose decode yields nothing are dropped from the sequence.
    /// Returns `None` once the sequence has ended (cancellation or a logged
    /// retrieval error) and on every later call.
    pub async fn next(&mut self) -> Option<StreamItem<T>> {
        loop {
            while let Some(entry) = self.pending.pop_front() {
                match T::from_fields(&entry.fields) {
                    Some(data) => return Some(StreamItem { id: entry.id, data }),
                    None => {
                        debug!(key = %self.key, id = %entry.id, "dropping log entry with empty decode");
                    }
                }
            }

            let batch = {
                let reader = self.reader.as_mut()?;
                tokio::select! {
                    _ = self.cancel.cancelled() => None,
                    batch = reader.next_entries() => Some(batch),
                }
            };

            match batch {
                None => {
                    self.reader = None;
                    return None;
                }
                Some(Ok(entries)) => {
                    if let Some(last) = entries.last() {
                        self.last_id = Some(last.id);
                    }
                    self.pending.extend(entries);
                }
                Some(Err(error)) => {
                    warn!(key = %self.key, error = %error, "log read failed, ending sequence");
                    self.reader = None;
                    return None;
                }
            }
        }
    }
}

impl<T: Record> Index<T> {
    /// Subscribe to `target`'s channel over a dedicated connection.
    ///
    /// The connection is torn down when the sequence ends or the
    /// subscription is dropped.
    pub async fn subscribe(
        &self,
        target: &Ref,
        filter: Option<MessageFilter>,
        cancel: CancellationToken,
    ) -> Result<Subscription> {
        let channel = self.storage_key(target);
        let conn = self.store.subscriber(&channel).await?;
        debug!(index = %self.name, channel = %channel, "subscription established");
        Ok(Subscription {
            channel,
            conn: Some(conn),
            filter,
            cancel,
        })
    }

    /// Tail the log at `target` over a dedicated connection.
    ///
    /// `after` positions the cursor; `None` observes only future entries.
    pub async fn tail(&self, target: &Ref, after: Option<StreamId>, cancel: CancellationToken) -> Result<LogTail<T>> {
        let key = self.storage_key(target);
        let reader = self.store.log_reader(&key, after).await?;
        debug!(index = %self.name, key = %key, "log tail established");
        Ok(LogTail {
            key,
            reader: Some(reader),
            pending: VecDeque::new(),
            last_id: after,
            cancel,
            _record: PhantomData,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_exact() {
        let filter = MessageFilter::exact("joined");
        assert!(filter.passes("joined"));
        assert!(!filter.passes("left"));
        assert!(!filter.passes("joined-late"));
    }

    #[test]
    fn test_filter_pattern() {
        let filter = MessageFilter::pattern("^user:[0-9]+$").unwrap();
        assert!(filter.passes("user:42"));
        assert!(!filter.passes("user:abc"));
    }

    #[test]
    fn test_filter_pattern_rejects_bad_regex() {
        assert!(MessageFilter::pattern("(unclosed").is_err());
    }
}
