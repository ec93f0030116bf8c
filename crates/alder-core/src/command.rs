//! Store commands, replies, and log entry types.
//!
//! Commands are plain data so any number of them can travel in one
//! all-or-nothing batch; replies come back positionally, one per command.

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::STREAM_ID_SEPARATOR;
use crate::error::InvalidStreamIdSnafu;
use crate::error::StoreError;
use crate::error::StreamIdParseError;
use crate::error::UnexpectedReplySnafu;
use crate::ttl::Score;

/// A store-assigned position in one append log.
///
/// Ids are monotonic within a log and unique to one entry. The string form
/// `<ms>-<seq>` is stable, so a tailing cursor can be persisted and resumed
/// across process restarts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StreamId {
    /// Millisecond half of the id.
    pub ms: u64,
    /// Sequence half, disambiguating entries within one millisecond.
    pub seq: u64,
}

impl StreamId {
    /// The id below every store-assigned id.
    pub const ZERO: StreamId = StreamId { ms: 0, seq: 0 };

    /// Create an id from its halves.
    pub const fn new(ms: u64, seq: u64) -> Self {
        Self { ms, seq }
    }
}

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}{}", self.ms, STREAM_ID_SEPARATOR, self.seq)
    }
}

impl FromStr for StreamId {
    type Err = StreamIdParseError;

    fn from_str(input: &str) -> Result<Self, StreamIdParseError> {
        let parsed = input.split_once(STREAM_ID_SEPARATOR).and_then(|(ms, seq)| {
            let ms = ms.parse().ok()?;
            let seq = seq.parse().ok()?;
            Some(StreamId { ms, seq })
        });

        match parsed {
            Some(id) => Ok(id),
            None => InvalidStreamIdSnafu { input }.fail(),
        }
    }
}

/// One entry of an append log: a store-assigned id plus flat field pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    /// The store-assigned id.
    pub id: StreamId,
    /// The entry's field/value pairs.
    pub fields: Vec<(String, String)>,
}

/// A primitive store operation.
///
/// Exactly the primitives the engine composes: hash get/set, sorted-set
/// add/remove/range/trim, expiry, publish, and log append. Anything issued
/// together in one batch commits all-or-nothing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreCommand {
    /// Merge field/value pairs into the hash at `key`, creating it if absent.
    HashPut {
        key: String,
        fields: Vec<(String, String)>,
    },
    /// Read every field of the hash at `key`; absent keys read as no fields.
    HashGetAll { key: String },
    /// Remove `key` and all state stored under it.
    Remove { key: String },
    /// Upsert `member` into the sorted set at `key` with `score`.
    SortedPut {
        key: String,
        member: String,
        score: Score,
    },
    /// Remove `member` from the sorted set at `key`.
    SortedRemove { key: String, member: String },
    /// All members of the sorted set at `key`, in ascending score order.
    SortedRange { key: String },
    /// Remove members whose score has elapsed by `cutoff_ms`.
    SortedPruneBefore { key: String, cutoff_ms: u64 },
    /// Keep only the `keep` highest-scored members, dropping the oldest
    /// surplus by rank.
    SortedTrim { key: String, keep: u32 },
    /// Set `key` to expire at the deadline, or clear its expiry when `None`.
    ExpireAt { key: String, deadline_ms: Option<u64> },
    /// Publish `payload` on `channel`.
    Publish { channel: String, payload: String },
    /// Append an entry to the log at `key`; the store assigns the id.
    StreamAppend {
        key: String,
        fields: Vec<(String, String)>,
    },
}

/// The positional reply to one [`StoreCommand`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StoreReply {
    /// The command has no meaningful reply value.
    Unit,
    /// A count of affected members, receivers, or removed keys.
    Count(u64),
    /// The fields of a hash; empty for an absent key.
    Fields(Vec<(String, String)>),
    /// Sorted-set members in ascending score order.
    Members(Vec<String>),
    /// The id assigned to an appended log entry.
    Appended(StreamId),
}

impl StoreReply {
    /// Decode as hash fields.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::UnexpectedReply`] for any other shape.
    pub fn into_fields(self) -> Result<Vec<(String, String)>, StoreError> {
        match self {
            StoreReply::Fields(fields) => Ok(fields),
            _ => UnexpectedReplySnafu { expected: "fields" }.fail(),
        }
    }

    /// Decode as sorted-set members.
    pub fn into_members(self) -> Result<Vec<String>, StoreError> {
        match self {
            StoreReply::Members(members) => Ok(members),
            _ => UnexpectedReplySnafu { expected: "members" }.fail(),
        }
    }

    /// Decode as an affected count.
    pub fn into_count(self) -> Result<u64, StoreError> {
        match self {
            StoreReply::Count(count) => Ok(count),
            StoreReply::Unit => Ok(0),
            _ => UnexpectedReplySnafu { expected: "count" }.fail(),
        }
    }

    /// Decode as an appended log id.
    pub fn into_appended(self) -> Result<StreamId, StoreError> {
        match self {
            StoreReply::Appended(id) => Ok(id),
            _ => UnexpectedReplySnafu { expected: "appended id" }.fail(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stream_id_display_roundtrip() {
        let id = StreamId::new(1_700_000_000_000, 3);
        assert_eq!(id.to_string(), "1700000000000-3");
        assert_eq!(id.to_string().parse::<StreamId>().unwrap(), id);
    }

    #[test]
    fn test_stream_id_parse_rejects_garbage() {
        assert!("".parse::<StreamId>().is_err());
        assert!("123".parse::<StreamId>().is_err());
        assert!("a-b".parse::<StreamId>().is_err());
    }

    #[test]
    fn test_stream_id_ordering() {
        assert!(StreamId::new(1, 5) < StreamId::new(2, 0));
        assert!(StreamId::new(1, 0) < StreamId::new(1, 1));
        assert!(StreamId::ZERO < StreamId::new(0, 1));
    }

    #[test]
    fn test_reply_decoding() {
        assert!(StoreReply::Fields(vec![]).into_fields().is_ok());
        assert!(StoreReply::Unit.into_fields().is_err());
        assert_eq!(StoreReply::Count(2).into_count().unwrap(), 2);
        assert_eq!(StoreReply::Unit.into_count().unwrap(), 0);
        assert!(StoreReply::Members(vec![]).into_appended().is_err());
    }
}
