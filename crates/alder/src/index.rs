//! The index facade.
//!
//! An [`Index`] bundles the store handle, the entity codec seam, and the
//! bucket configuration into one explicit context value; every operation
//! takes it by reference, so ownership of the shared connection is visible
//! at each call site.

use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use alder_core::Envelope;
use alder_core::GlobalRef;
use alder_core::IndexName;
use alder_core::Record;
use alder_core::Ref;
use alder_core::RelationName;
use alder_core::RelationProjection;
use alder_core::Store;
use alder_core::StoreCommand;
use alder_core::StreamId;
use snafu::OptionExt;

use crate::batch::Batch;
use crate::batch::BatchOp;
use crate::batch::BatchOutput;
use crate::error::ReplyMissingSnafu;
use crate::error::Result;
use crate::touch::Touch;

/// Bucket and expiry configuration for one index.
#[derive(Debug, Clone, Default)]
pub(crate) struct IndexOptions {
    pub(crate) default_ttl: Option<Duration>,
    pub(crate) bucket_max_len: Option<u32>,
    pub(crate) relation_limits: BTreeMap<RelationName, u32>,
}

/// Builder for an [`Index`].
pub struct IndexBuilder<T> {
    name: IndexName,
    options: IndexOptions,
    _record: PhantomData<fn() -> T>,
}

impl<T: Record> IndexBuilder<T> {
    /// Start a builder for the named index.
    ///
    /// # Errors
    ///
    /// Fails fast with a name error if `name` is not a valid index name.
    pub fn new(name: impl AsRef<str>) -> Result<Self> {
        Ok(Self {
            name: IndexName::new(name.as_ref())?,
            options: IndexOptions::default(),
            _record: PhantomData,
        })
    }

    /// Expiry applied when an operation passes [`alder_core::Ttl::Default`].
    pub fn default_ttl(mut self, ttl: Duration) -> Self {
        self.options.default_ttl = Some(ttl);
        self
    }

    /// Length limit applied to every bucket without a per-relation override.
    pub fn bucket_max_len(mut self, keep: u32) -> Self {
        self.options.bucket_max_len = Some(keep);
        self
    }

    /// Register a relation with its own bucket length limit.
    ///
    /// # Errors
    ///
    /// Fails fast with a name error if `relation` is not a valid relation
    /// name; registration is the validation point, never first use.
    pub fn relation(mut self, relation: impl AsRef<str>, keep: u32) -> Result<Self> {
        let relation = RelationName::new(relation.as_ref())?;
        self.options.relation_limits.insert(relation, keep);
        Ok(self)
    }

    /// Build the index over `store`.
    pub fn build(self, store: Arc<dyn Store>) -> Index<T> {
        Index {
            name: self.name,
            store,
            options: self.options,
            _record: PhantomData,
        }
    }
}

/// A secondary index over one entity type.
///
/// Mutations run the touch protocol in the same atomic batch as their
/// primitive writes, keeping bucket membership consistent with the most
/// recently committed relation projection.
///
/// # Concurrency
///
/// The prior projection is read *before* a mutation's batch is built, not
/// inside it. Two concurrent mutations of the same primary key can therefore
/// interleave so that the later commit diffs against a superseded
/// projection, stranding a stale bucket membership until the next mutation.
/// Callers needing strict consistency serialize writes per primary key.
pub struct Index<T> {
    pub(crate) name: IndexName,
    pub(crate) store: Arc<dyn Store>,
    pub(crate) options: IndexOptions,
    pub(crate) _record: PhantomData<fn() -> T>,
}

impl<T> Clone for Index<T> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            store: Arc::clone(&self.store),
            options: self.options.clone(),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Index<T> {
    /// Build an index with default options.
    ///
    /// # Errors
    ///
    /// Fails fast with a name error if `name` is invalid.
    pub fn new(name: impl AsRef<str>, store: Arc<dyn Store>) -> Result<Self> {
        Ok(IndexBuilder::new(name)?.build(store))
    }

    /// Start a configured build.
    pub fn builder(name: impl AsRef<str>) -> Result<IndexBuilder<T>> {
        IndexBuilder::new(name)
    }

    /// The index name.
    pub fn name(&self) -> &IndexName {
        &self.name
    }

    /// Qualify a ref with this index.
    pub fn global(&self, target: Ref) -> GlobalRef {
        GlobalRef::new(self.name.clone(), target)
    }

    /// The flat store key a ref resolves to under this index.
    pub fn storage_key(&self, target: &Ref) -> String {
        target.storage_key(&self.name)
    }

    /// Start an empty batch bound to this index's store.
    pub fn batch(&self) -> Batch {
        Batch::new(Arc::clone(&self.store))
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    /// Read an entity by primary key.
    ///
    /// Absent and undecodable records both read as `None`.
    pub async fn get(&self, pkey: &str) -> Result<Option<T>> {
        let fields = self.read_fields(pkey).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(T::from_fields(&fields))
    }

    /// Read an entity and touch it as a side effect: the record and bucket
    /// expiries refresh from the current projection, and a supplied message
    /// republishes.
    pub async fn get_touched(&self, pkey: &str, touch: Touch) -> Result<Option<T>> {
        let fields = self.read_fields(pkey).await?;
        let record = if fields.is_empty() { None } else { T::from_fields(&fields) };

        let projection = record.as_ref().map(Record::relations);
        let commands = self.touch_commands(pkey, projection.as_ref(), projection.as_ref(), &touch)?;
        self.store.apply_batch(commands).await?;

        Ok(record)
    }

    /// Whether a record exists under `pkey`.
    pub async fn exists(&self, pkey: &str) -> Result<bool> {
        Ok(!self.read_fields(pkey).await?.is_empty())
    }

    /// Primary keys related to `fkey` via `relation`, in bucket score order.
    ///
    /// # Errors
    ///
    /// Fails fast with a name error if `relation` is invalid.
    pub async fn pkeys_via(&self, relation: impl AsRef<str>, fkey: &str) -> Result<Vec<String>> {
        let op = self.pkeys_via_op(relation, fkey)?;
        Ok(self.run(op).await?.into_members())
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Replace the record under `pkey` and reconcile bucket membership from
    /// the prior projection to the value's, in one atomic batch.
    pub async fn set(&self, pkey: &str, value: &T, touch: Touch) -> Result<()> {
        let op = self.set_op(pkey, value, touch).await?;
        self.run(op).await?;
        Ok(())
    }

    /// Merge the value's fields into the record under `pkey`; the next
    /// projection is computed from the merged record.
    pub async fn update(&self, pkey: &str, value: &T, touch: Touch) -> Result<()> {
        let op = self.update_op(pkey, value, touch).await?;
        self.run(op).await?;
        Ok(())
    }

    /// Append the value to the log at `pkey`'s primary ref and touch.
    ///
    /// Returns the store-assigned entry id.
    pub async fn append(&self, pkey: &str, value: &T, touch: Touch) -> Result<StreamId> {
        let op = self.append_op(pkey, value, touch)?;
        let output = self.run(op).await?;
        output.appended().context(ReplyMissingSnafu { slot: 0usize })
    }

    /// Delete the record and strip its membership from every bucket of the
    /// last-known projection. A supplied message is published on the primary
    /// channel and the previously-related bucket channels.
    ///
    /// Returns whether a record existed. The buckets themselves persist
    /// until their own expiry or trim.
    pub async fn remove(&self, pkey: &str, message: Option<&str>) -> Result<bool> {
        let op = self.remove_op(pkey, message).await?;
        let output = self.run(op).await?;
        let removed = output.count().context(ReplyMissingSnafu { slot: 0usize })?;
        Ok(removed > 0)
    }

    /// Touch without reading: refresh expiry and bucket scores from the
    /// current projection, republishing a supplied message.
    pub async fn touch(&self, pkey: &str, touch: Touch) -> Result<()> {
        let op = self.touch_op(pkey, touch).await?;
        self.run(op).await?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Batchable operation constructors
    // ------------------------------------------------------------------

    /// The batchable form of [`set`](Self::set).
    pub async fn set_op(&self, pkey: &str, value: &T, touch: Touch) -> Result<BatchOp> {
        let prev = self.current_projection(pkey).await?;
        let next = value.relations();
        let key = self.storage_key(&Ref::primary(pkey));

        let mut commands = vec![
            StoreCommand::Remove { key: key.clone() },
            StoreCommand::HashPut {
                key,
                fields: value.to_fields(),
            },
        ];
        commands.extend(self.touch_commands(pkey, prev.as_ref(), Some(&next), &touch)?);
        Ok(BatchOp::unit(commands))
    }

    /// The batchable form of [`update`](Self::update).
    pub async fn update_op(&self, pkey: &str, value: &T, touch: Touch) -> Result<BatchOp> {
        let existing = self.read_fields(pkey).await?;
        let prev = if existing.is_empty() {
            None
        } else {
            T::from_fields(&existing).map(|record| record.relations())
        };

        let patch = value.to_fields();
        let mut merged: BTreeMap<String, String> = existing.into_iter().collect();
        merged.extend(patch.iter().cloned());
        let merged: Vec<(String, String)> = merged.into_iter().collect();
        let next = T::from_fields(&merged).map(|record| record.relations());

        let key = self.storage_key(&Ref::primary(pkey));
        let mut commands = vec![StoreCommand::HashPut { key, fields: patch }];
        commands.extend(self.touch_commands(pkey, prev.as_ref(), next.as_ref(), &touch)?);
        Ok(BatchOp::unit(commands))
    }

    /// The batchable form of [`append`](Self::append).
    pub fn append_op(&self, pkey: &str, value: &T, touch: Touch) -> Result<BatchOp> {
        let key = self.storage_key(&Ref::primary(pkey));
        let next = value.relations();

        let mut commands = vec![StoreCommand::StreamAppend {
            key,
            fields: value.to_fields(),
        }];
        commands.extend(self.touch_commands(pkey, None, Some(&next), &touch)?);
        Ok(BatchOp::appended(commands, 0))
    }

    /// The batchable form of [`remove`](Self::remove).
    pub async fn remove_op(&self, pkey: &str, message: Option<&str>) -> Result<BatchOp> {
        let prev = self.current_projection(pkey).await?;
        let key = self.storage_key(&Ref::primary(pkey));

        let mut commands = vec![StoreCommand::Remove { key: key.clone() }];
        if let Some(prev) = &prev {
            for (relation, fkey) in prev.pairs() {
                commands.push(StoreCommand::SortedRemove {
                    key: self.storage_key(&Ref::bucket(relation.clone(), fkey)),
                    member: pkey.to_string(),
                });
            }
        }

        if let Some(message) = message {
            let payload = Envelope::new(self.global(Ref::primary(pkey)), message).encode()?;
            commands.push(StoreCommand::Publish {
                channel: key,
                payload: payload.clone(),
            });
            if let Some(prev) = &prev {
                for (relation, fkey) in prev.pairs() {
                    commands.push(StoreCommand::Publish {
                        channel: self.storage_key(&Ref::bucket(relation.clone(), fkey)),
                        payload: payload.clone(),
                    });
                }
            }
        }

        Ok(BatchOp::count(commands, 0))
    }

    /// The batchable form of [`touch`](Self::touch).
    pub async fn touch_op(&self, pkey: &str, touch: Touch) -> Result<BatchOp> {
        let current = self.current_projection(pkey).await?;
        let commands = self.touch_commands(pkey, current.as_ref(), current.as_ref(), &touch)?;
        Ok(BatchOp::unit(commands))
    }

    /// The batchable form of [`get`](Self::get); decode the output with
    /// [`BatchOutput::record`].
    pub fn get_op(&self, pkey: &str) -> BatchOp {
        let key = self.storage_key(&Ref::primary(pkey));
        BatchOp::fields(vec![StoreCommand::HashGetAll { key }], 0)
    }

    /// The batchable form of [`pkeys_via`](Self::pkeys_via).
    pub fn pkeys_via_op(&self, relation: impl AsRef<str>, fkey: &str) -> Result<BatchOp> {
        let relation = RelationName::new(relation.as_ref())?;
        let key = self.storage_key(&Ref::bucket(relation, fkey));
        Ok(BatchOp::members(vec![StoreCommand::SortedRange { key }], 0))
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Run one prepared op directly as its own atomic batch.
    pub(crate) async fn run(&self, op: BatchOp) -> Result<BatchOutput> {
        let (commands, extract) = op.into_parts();
        let replies = self.store.apply_batch(commands).await?;
        extract.output(0, &replies)
    }

    pub(crate) async fn read_fields(&self, pkey: &str) -> Result<Vec<(String, String)>> {
        let key = self.storage_key(&Ref::primary(pkey));
        Ok(self.store.apply(StoreCommand::HashGetAll { key }).await?.into_fields()?)
    }

    /// The committed projection under `pkey`, if a decodable record exists.
    pub(crate) async fn current_projection(&self, pkey: &str) -> Result<Option<RelationProjection>> {
        let fields = self.read_fields(pkey).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        Ok(T::from_fields(&fields).map(|record| record.relations()))
    }
}
