//! The in-memory store and its clock.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU64;
use std::sync::atomic::Ordering;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use alder_core::ChannelSubscriber;
use alder_core::LogReader;
use alder_core::Store;
use alder_core::StoreCommand;
use alder_core::StoreError;
use alder_core::StoreReply;
use alder_core::StreamId;
use async_trait::async_trait;
use tokio::sync::Mutex;
use tokio::sync::Notify;
use tokio::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

use crate::constants::CHANNEL_BUFFER;
use crate::live::MemoryLogReader;
use crate::live::MemorySubscriber;
use crate::state::Effects;
use crate::state::State;

/// A deterministic in-memory [`Store`].
///
/// Cloning is cheap and clones share the same state, like handles to one
/// server.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Inner>,
}

#[derive(Default)]
pub(crate) struct Inner {
    pub(crate) state: RwLock<State>,
    pub(crate) channels: Mutex<BTreeMap<String, broadcast::Sender<String>>>,
    pub(crate) wakeups: Mutex<BTreeMap<String, Arc<Notify>>>,
    frozen: AtomicBool,
    now_ms: AtomicU64,
}

impl MemoryStore {
    /// Create a store on the wall clock.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store with the clock frozen at `now_ms`.
    pub fn frozen(now_ms: u64) -> Self {
        let store = Self::default();
        store.inner.frozen.store(true, Ordering::Relaxed);
        store.inner.now_ms.store(now_ms, Ordering::Relaxed);
        store
    }

    /// Advance the clock by `delta_ms`.
    ///
    /// A wall-clock store freezes at the current instant first.
    pub fn advance(&self, delta_ms: u64) {
        if !self.inner.frozen.swap(true, Ordering::Relaxed) {
            self.inner.now_ms.store(wall_clock_ms(), Ordering::Relaxed);
        }
        self.inner.now_ms.fetch_add(delta_ms, Ordering::Relaxed);
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn apply_batch(&self, commands: Vec<StoreCommand>) -> Result<Vec<StoreReply>, StoreError> {
        let now_ms = self.now_unix_ms();
        let channels = self.inner.channels.lock().await;

        let mut effects = Effects::default();
        let mut replies = Vec::with_capacity(commands.len());
        {
            let mut state = self.inner.state.write().await;
            // Stage against a snapshot so the batch commits all-or-nothing.
            let mut staged = state.clone();
            for command in &commands {
                replies.push(staged.apply(command, now_ms, &channels, &mut effects));
            }
            *state = staged;
        }

        for (channel, payload) in effects.publishes {
            if let Some(sender) = channels.get(&channel) {
                let _ = sender.send(payload);
            }
        }
        drop(channels);

        if !effects.appended.is_empty() {
            let wakeups = self.inner.wakeups.lock().await;
            for key in effects.appended {
                if let Some(wakeup) = wakeups.get(&key) {
                    wakeup.notify_waiters();
                }
            }
        }

        Ok(replies)
    }

    async fn subscriber(&self, channel: &str) -> Result<Box<dyn ChannelSubscriber>, StoreError> {
        let mut channels = self.inner.channels.lock().await;
        let sender = channels
            .entry(channel.to_string())
            .or_insert_with(|| broadcast::channel(CHANNEL_BUFFER).0);
        debug!(channel = %channel, "opening dedicated subscriber connection");
        Ok(Box::new(MemorySubscriber::new(channel.to_string(), sender.subscribe())))
    }

    async fn log_reader(&self, key: &str, after: Option<StreamId>) -> Result<Box<dyn LogReader>, StoreError> {
        let wakeup = {
            let mut wakeups = self.inner.wakeups.lock().await;
            Arc::clone(wakeups.entry(key.to_string()).or_insert_with(|| Arc::new(Notify::new())))
        };
        let cursor = match after {
            Some(id) => id,
            // No explicit cursor: start at the current end of the log so
            // only future entries are observed.
            None => self.inner.state.read().await.last_ids.get(key).copied().unwrap_or(StreamId::ZERO),
        };
        debug!(key = %key, cursor = %cursor, "opening dedicated log reader connection");
        Ok(Box::new(MemoryLogReader::new(Arc::clone(&self.inner), key.to_string(), cursor, wakeup)))
    }

    fn now_unix_ms(&self) -> u64 {
        if self.inner.frozen.load(Ordering::Relaxed) {
            self.inner.now_ms.load(Ordering::Relaxed)
        } else {
            wall_clock_ms()
        }
    }
}

fn wall_clock_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
        .unwrap_or(0)
}
