//! Command application against the staged state.

use std::collections::BTreeMap;

use alder_core::LogEntry;
use alder_core::Score;
use alder_core::StoreCommand;
use alder_core::StoreReply;
use alder_core::StreamId;
use tokio::sync::broadcast;

/// The whole store, cloneable so a batch can stage against a snapshot.
#[derive(Debug, Clone, Default)]
pub(crate) struct State {
    pub hashes: BTreeMap<String, BTreeMap<String, String>>,
    pub sorted: BTreeMap<String, BTreeMap<String, Score>>,
    pub expiries: BTreeMap<String, u64>,
    pub logs: BTreeMap<String, Vec<LogEntry>>,
    /// Last assigned id per log. Survives key removal so a re-created log
    /// stays monotonic.
    pub last_ids: BTreeMap<String, StreamId>,
}

/// Side effects collected during a batch, delivered only after commit.
#[derive(Debug, Default)]
pub(crate) struct Effects {
    /// `(channel, payload)` pairs to broadcast.
    pub publishes: Vec<(String, String)>,
    /// Log keys with new entries, needing reader wakeups.
    pub appended: Vec<String>,
}

impl State {
    /// Drop `key` if its expiry has elapsed.
    fn purge_expired(&mut self, key: &str, now_ms: u64) {
        if self.expiries.get(key).is_some_and(|deadline| *deadline <= now_ms) {
            self.expiries.remove(key);
            self.hashes.remove(key);
            self.sorted.remove(key);
            self.logs.remove(key);
        }
    }

    fn key_exists(&self, key: &str) -> bool {
        self.hashes.contains_key(key) || self.sorted.contains_key(key) || self.logs.contains_key(key)
    }

    /// Members of the sorted set at `key` with their scores, rank order.
    fn ranked(&self, key: &str) -> Vec<(String, Score)> {
        let mut members: Vec<(String, Score)> = self
            .sorted
            .get(key)
            .map(|set| set.iter().map(|(member, score)| (member.clone(), *score)).collect())
            .unwrap_or_default();
        members.sort_by(|a, b| (a.1, &a.0).cmp(&(b.1, &b.0)));
        members
    }

    /// Apply one command to this state, recording deferred side effects.
    pub fn apply(
        &mut self,
        command: &StoreCommand,
        now_ms: u64,
        channels: &BTreeMap<String, broadcast::Sender<String>>,
        effects: &mut Effects,
    ) -> StoreReply {
        match command {
            StoreCommand::HashPut { key, fields } => {
                self.purge_expired(key, now_ms);
                self.hashes.entry(key.clone()).or_default().extend(fields.iter().cloned());
                StoreReply::Unit
            }
            StoreCommand::HashGetAll { key } => {
                self.purge_expired(key, now_ms);
                let fields = self
                    .hashes
                    .get(key)
                    .map(|hash| hash.iter().map(|(field, value)| (field.clone(), value.clone())).collect())
                    .unwrap_or_default();
                StoreReply::Fields(fields)
            }
            StoreCommand::Remove { key } => {
                self.purge_expired(key, now_ms);
                let existed = self.key_exists(key);
                self.hashes.remove(key);
                self.sorted.remove(key);
                self.logs.remove(key);
                self.expiries.remove(key);
                StoreReply::Count(u64::from(existed))
            }
            StoreCommand::SortedPut { key, member, score } => {
                self.purge_expired(key, now_ms);
                let added = self.sorted.entry(key.clone()).or_default().insert(member.clone(), *score).is_none();
                StoreReply::Count(u64::from(added))
            }
            StoreCommand::SortedRemove { key, member } => {
                self.purge_expired(key, now_ms);
                let removed = self.sorted.get_mut(key).is_some_and(|set| set.remove(member).is_some());
                self.drop_if_empty(key);
                StoreReply::Count(u64::from(removed))
            }
            StoreCommand::SortedRange { key } => {
                self.purge_expired(key, now_ms);
                let members = self.ranked(key).into_iter().map(|(member, _)| member).collect();
                StoreReply::Members(members)
            }
            StoreCommand::SortedPruneBefore { key, cutoff_ms } => {
                self.purge_expired(key, now_ms);
                let mut removed = 0;
                if let Some(set) = self.sorted.get_mut(key) {
                    let before = set.len();
                    set.retain(|_, score| !score.elapsed_by(*cutoff_ms));
                    removed = before - set.len();
                }
                self.drop_if_empty(key);
                StoreReply::Count(removed as u64)
            }
            StoreCommand::SortedTrim { key, keep } => {
                self.purge_expired(key, now_ms);
                let ranked = self.ranked(key);
                let surplus = ranked.len().saturating_sub(*keep as usize);
                if let Some(set) = self.sorted.get_mut(key) {
                    for (member, _) in ranked.iter().take(surplus) {
                        set.remove(member);
                    }
                }
                self.drop_if_empty(key);
                StoreReply::Count(surplus as u64)
            }
            StoreCommand::ExpireAt { key, deadline_ms } => {
                self.purge_expired(key, now_ms);
                match deadline_ms {
                    Some(deadline_ms) if self.key_exists(key) => {
                        self.expiries.insert(key.clone(), *deadline_ms);
                    }
                    _ => {
                        self.expiries.remove(key);
                    }
                }
                StoreReply::Unit
            }
            StoreCommand::Publish { channel, payload } => {
                let receivers = channels.get(channel).map(|sender| sender.receiver_count()).unwrap_or(0);
                effects.publishes.push((channel.clone(), payload.clone()));
                StoreReply::Count(receivers as u64)
            }
            StoreCommand::StreamAppend { key, fields } => {
                self.purge_expired(key, now_ms);
                let id = self.next_stream_id(key, now_ms);
                self.logs.entry(key.clone()).or_default().push(LogEntry {
                    id,
                    fields: fields.clone(),
                });
                self.last_ids.insert(key.clone(), id);
                effects.appended.push(key.clone());
                StoreReply::Appended(id)
            }
        }
    }

    fn drop_if_empty(&mut self, key: &str) {
        if self.sorted.get(key).is_some_and(BTreeMap::is_empty) {
            self.sorted.remove(key);
        }
    }

    fn next_stream_id(&self, key: &str, now_ms: u64) -> StreamId {
        match self.last_ids.get(key) {
            Some(last) if last.ms >= now_ms => StreamId::new(last.ms, last.seq + 1),
            _ => StreamId::new(now_ms, 0),
        }
    }
}
