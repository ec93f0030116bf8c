//! Pub/sub fan-out.
//!
//! A notification about a primary ref goes to the entity's own channel and
//! to every bucket channel of its *current* relation projection. A
//! notification addressed to a bucket ref fans the same logic out across the
//! bucket's current members. The cross form keeps an explicit source ref
//! while fanning out to a different target's channels.

use std::collections::HashSet;

use alder_core::Envelope;
use alder_core::GlobalRef;
use alder_core::Record;
use alder_core::Ref;
use alder_core::StoreCommand;
use tracing::debug;

use crate::error::Result;
use crate::index::Index;

impl<T: Record> Index<T> {
    /// Publish `message` sourced from and addressed to `target`.
    pub async fn publish(&self, target: &Ref, message: &str) -> Result<()> {
        let source = self.global(target.clone());
        self.publish_from(&source, target, message).await
    }

    /// Publish `message` sourced from `source` on `target`'s channels.
    ///
    /// The envelope carries `source` even when the addressed channels belong
    /// to a different entity or bucket.
    pub async fn publish_from(&self, source: &GlobalRef, target: &Ref, message: &str) -> Result<()> {
        let payload = Envelope::new(source.clone(), message).encode()?;

        let mut channels = Vec::new();
        match target {
            Ref::Primary { pkey } => {
                self.collect_entity_channels(pkey, &mut channels).await?;
            }
            Ref::Bucket { .. } => {
                let members = self
                    .store
                    .apply(StoreCommand::SortedRange {
                        key: self.storage_key(target),
                    })
                    .await?
                    .into_members()?;
                for pkey in &members {
                    self.collect_entity_channels(pkey, &mut channels).await?;
                }
            }
        }

        let mut seen = HashSet::new();
        let commands: Vec<StoreCommand> = channels
            .into_iter()
            .filter(|channel| seen.insert(channel.clone()))
            .map(|channel| StoreCommand::Publish {
                channel,
                payload: payload.clone(),
            })
            .collect();

        debug!(
            index = %self.name,
            target = %self.storage_key(target),
            channels = commands.len(),
            "publishing envelope"
        );
        self.store.apply_batch(commands).await?;
        Ok(())
    }

    /// An entity's own channel plus the bucket channels of its current
    /// projection.
    async fn collect_entity_channels(&self, pkey: &str, out: &mut Vec<String>) -> Result<()> {
        out.push(self.storage_key(&Ref::primary(pkey)));

        let fields = self.read_fields(pkey).await?;
        if fields.is_empty() {
            return Ok(());
        }

        if let Some(record) = T::from_fields(&fields) {
            let projection = record.relations();
            for (relation, fkey) in projection.pairs() {
                out.push(self.storage_key(&Ref::bucket(relation.clone(), fkey)));
            }
        }
        Ok(())
    }
}
