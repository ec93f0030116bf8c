//! The batch accumulator.
//!
//! A [`Batch`] composes any number of prepared index operations into one
//! atomic round trip. Each [`Batch::add`] binds the operation's deferred
//! extractor to the pipeline slots it will occupy once executed; after
//! [`Batch::exec`], every label maps to the ordered outputs of the
//! operations added under it.

use std::collections::BTreeMap;
use std::sync::Arc;

use alder_core::Record;
use alder_core::Store;
use alder_core::StoreCommand;
use alder_core::StoreReply;
use alder_core::StreamId;
use snafu::OptionExt;

use crate::error::ReplyMissingSnafu;
use crate::error::Result;

/// One index operation prepared for execution, alone or inside a batch.
///
/// Holds the operation's store commands plus the extractor that turns its
/// slice of the positional reply array into a [`BatchOutput`].
pub struct BatchOp {
    commands: Vec<StoreCommand>,
    extract: Extract,
}

impl BatchOp {
    pub(crate) fn unit(commands: Vec<StoreCommand>) -> Self {
        Self {
            commands,
            extract: Extract::Unit,
        }
    }

    pub(crate) fn count(commands: Vec<StoreCommand>, slot: usize) -> Self {
        Self {
            commands,
            extract: Extract::Count { slot },
        }
    }

    pub(crate) fn fields(commands: Vec<StoreCommand>, slot: usize) -> Self {
        Self {
            commands,
            extract: Extract::Fields { slot },
        }
    }

    pub(crate) fn members(commands: Vec<StoreCommand>, slot: usize) -> Self {
        Self {
            commands,
            extract: Extract::Members { slot },
        }
    }

    pub(crate) fn appended(commands: Vec<StoreCommand>, slot: usize) -> Self {
        Self {
            commands,
            extract: Extract::Appended { slot },
        }
    }

    pub(crate) fn into_parts(self) -> (Vec<StoreCommand>, Extract) {
        (self.commands, self.extract)
    }

    /// The number of pipeline slots this operation occupies.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether the operation carries no commands at all.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// A deferred extractor: which of an operation's slots becomes its output,
/// and how to decode it.
#[derive(Debug, Clone, Copy)]
pub(crate) enum Extract {
    Unit,
    Count { slot: usize },
    Fields { slot: usize },
    Members { slot: usize },
    Appended { slot: usize },
}

impl Extract {
    /// Decode against the positional replies, offset by the base slot the
    /// operation was bound to.
    pub(crate) fn output(self, base: usize, replies: &[StoreReply]) -> Result<BatchOutput> {
        let fetch = |slot: usize| {
            replies
                .get(base + slot)
                .cloned()
                .context(ReplyMissingSnafu { slot: base + slot })
        };

        match self {
            Extract::Unit => Ok(BatchOutput::Unit),
            Extract::Count { slot } => Ok(BatchOutput::Count(fetch(slot)?.into_count()?)),
            Extract::Fields { slot } => Ok(BatchOutput::Fields(fetch(slot)?.into_fields()?)),
            Extract::Members { slot } => Ok(BatchOutput::Members(fetch(slot)?.into_members()?)),
            Extract::Appended { slot } => Ok(BatchOutput::Appended(fetch(slot)?.into_appended()?)),
        }
    }
}

/// The decoded result of one operation in an executed batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOutput {
    /// The operation has no result value.
    Unit,
    /// An affected-count result.
    Count(u64),
    /// A raw record read; decode with [`BatchOutput::record`].
    Fields(Vec<(String, String)>),
    /// Bucket membership in score order.
    Members(Vec<String>),
    /// The id assigned to an appended log entry.
    Appended(StreamId),
}

impl BatchOutput {
    /// Decode a record read; `None` for absent or undecodable records.
    pub fn record<T: Record>(&self) -> Option<T> {
        match self {
            BatchOutput::Fields(fields) if !fields.is_empty() => T::from_fields(fields),
            _ => None,
        }
    }

    /// The affected count, if this was a counting operation.
    pub fn count(&self) -> Option<u64> {
        match self {
            BatchOutput::Count(count) => Some(*count),
            _ => None,
        }
    }

    /// The assigned log id, if this was an append.
    pub fn appended(&self) -> Option<StreamId> {
        match self {
            BatchOutput::Appended(id) => Some(*id),
            _ => None,
        }
    }

    /// Bucket membership, if this was a membership read.
    pub fn into_members(self) -> Vec<String> {
        match self {
            BatchOutput::Members(members) => members,
            _ => Vec::new(),
        }
    }
}

/// An accumulating atomic batch of index operations.
pub struct Batch {
    store: Arc<dyn Store>,
    commands: Vec<StoreCommand>,
    bindings: Vec<(String, usize, Extract)>,
}

impl Batch {
    pub(crate) fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            commands: Vec::new(),
            bindings: Vec::new(),
        }
    }

    /// Append an operation under `label`.
    ///
    /// The operation's extractor is bound to the pipeline's current length;
    /// repeated adds under one label accumulate an ordered output list.
    pub fn add(&mut self, label: impl Into<String>, op: BatchOp) {
        let base = self.commands.len();
        let (commands, extract) = op.into_parts();
        self.bindings.push((label.into(), base, extract));
        self.commands.extend(commands);
    }

    /// The number of commands accumulated so far.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing has been added yet.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Execute everything as one atomic round trip.
    ///
    /// Returns `None` when the store reports no results, e.g. an aborted
    /// transaction; otherwise each label maps to the ordered outputs of its
    /// operations.
    pub async fn exec(self) -> Result<Option<BTreeMap<String, Vec<BatchOutput>>>> {
        if self.commands.is_empty() {
            return Ok(Some(BTreeMap::new()));
        }

        let replies = self.store.apply_batch(self.commands).await?;
        if replies.is_empty() {
            return Ok(None);
        }

        let mut outputs: BTreeMap<String, Vec<BatchOutput>> = BTreeMap::new();
        for (label, base, extract) in self.bindings {
            outputs.entry(label).or_default().push(extract.output(base, &replies)?);
        }
        Ok(Some(outputs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_offsets_by_base() {
        let replies = vec![
            StoreReply::Unit,
            StoreReply::Count(7),
            StoreReply::Members(vec!["a".to_string()]),
        ];

        let output = Extract::Count { slot: 0 }.output(1, &replies).unwrap();
        assert_eq!(output, BatchOutput::Count(7));

        let output = Extract::Members { slot: 1 }.output(1, &replies).unwrap();
        assert_eq!(output, BatchOutput::Members(vec!["a".to_string()]));
    }

    #[test]
    fn test_extract_reports_missing_slot() {
        let replies = vec![StoreReply::Unit];
        let err = Extract::Count { slot: 3 }.output(0, &replies).unwrap_err();
        assert!(err.to_string().contains("slot 3"));
    }

    #[test]
    fn test_extract_rejects_shape_mismatch() {
        let replies = vec![StoreReply::Unit];
        assert!(Extract::Members { slot: 0 }.output(0, &replies).is_err());
    }
}
