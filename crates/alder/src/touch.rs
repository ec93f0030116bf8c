//! The touch protocol: the atomic unit run after every mutation.
//!
//! One touch bundles, in a single all-or-nothing batch:
//!
//! 1. the primary record's expiry refresh;
//! 2. the notification publish on the primary channel, if a message was
//!    supplied;
//! 3. bucket removals computed by the relation diff;
//! 4. bucket upserts for the next projection: member score set to the
//!    resolved expiry, bucket expiry refreshed, elapsed members pruned, and
//!    the oldest surplus trimmed when the bucket has a length limit;
//! 5. the same notification on every bucket channel touched in step 4.
//!
//! A concurrent reader can never observe a removal without its matching
//! addition. The *read* of the prior projection happens before the batch is
//! built, though; see the concurrency note on [`Index::set`].

use alder_core::Envelope;
use alder_core::Record;
use alder_core::Ref;
use alder_core::RelationName;
use alder_core::RelationProjection;
use alder_core::Score;
use alder_core::StoreCommand;
use alder_core::Ttl;
use alder_core::diff;
use tracing::debug;

use crate::error::Result;
use crate::index::Index;

/// Options for the touch run after a mutation or read.
#[derive(Debug, Clone, Default)]
pub struct Touch {
    /// Expiry policy; [`Ttl::Default`] defers to the index's configuration.
    pub ttl: Ttl,
    /// Notification published on the primary channel and every bucket
    /// channel touched.
    pub message: Option<String>,
}

impl Touch {
    /// Touch with the index's default TTL and no notification.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the expiry policy.
    pub fn with_ttl(mut self, ttl: Ttl) -> Self {
        self.ttl = ttl;
        self
    }

    /// Set the notification message.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }
}

impl<T: Record> Index<T> {
    /// Assemble the touch batch for one entity.
    ///
    /// `prev`/`next` are the relation projections before and after the
    /// mutation; a read-side touch passes the current projection as both,
    /// and a plain expiry refresh passes neither.
    pub(crate) fn touch_commands(
        &self,
        pkey: &str,
        prev: Option<&RelationProjection>,
        next: Option<&RelationProjection>,
        touch: &Touch,
    ) -> Result<Vec<StoreCommand>> {
        let now_ms = self.store.now_unix_ms();
        let deadline_ms = touch.ttl.resolve(self.options.default_ttl, now_ms);
        let score = Score::from_deadline(deadline_ms);
        let primary_key = self.storage_key(&Ref::primary(pkey));

        let payload = match &touch.message {
            Some(message) => Some(Envelope::new(self.global(Ref::primary(pkey)), message).encode()?),
            None => None,
        };

        let mut commands = vec![StoreCommand::ExpireAt {
            key: primary_key.clone(),
            deadline_ms,
        }];

        if let Some(payload) = &payload {
            commands.push(StoreCommand::Publish {
                channel: primary_key,
                payload: payload.clone(),
            });
        }

        let removed = diff(prev, next);
        for (relation, fkey) in removed.pairs() {
            commands.push(StoreCommand::SortedRemove {
                key: self.storage_key(&Ref::bucket(relation.clone(), fkey)),
                member: pkey.to_string(),
            });
        }

        let mut touched_buckets = Vec::new();
        if let Some(next) = next {
            for (relation, fkey) in next.pairs() {
                let bucket_key = self.storage_key(&Ref::bucket(relation.clone(), fkey));
                commands.push(StoreCommand::SortedPut {
                    key: bucket_key.clone(),
                    member: pkey.to_string(),
                    score,
                });
                commands.push(StoreCommand::ExpireAt {
                    key: bucket_key.clone(),
                    deadline_ms,
                });
                commands.push(StoreCommand::SortedPruneBefore {
                    key: bucket_key.clone(),
                    cutoff_ms: now_ms,
                });
                if let Some(keep) = self.bucket_limit(relation) {
                    commands.push(StoreCommand::SortedTrim {
                        key: bucket_key.clone(),
                        keep,
                    });
                }
                touched_buckets.push(bucket_key);
            }
        }

        if let Some(payload) = &payload {
            for channel in touched_buckets {
                commands.push(StoreCommand::Publish {
                    channel,
                    payload: payload.clone(),
                });
            }
        }

        debug!(
            index = %self.name,
            pkey = %pkey,
            removals = removed.len(),
            commands = commands.len(),
            "assembled touch batch"
        );
        Ok(commands)
    }

    pub(crate) fn bucket_limit(&self, relation: &RelationName) -> Option<u32> {
        self.options.relation_limits.get(relation).copied().or(self.options.bucket_max_len)
    }
}
