//! Deterministic in-memory backend for the alder engine.
//!
//! [`MemoryStore`] implements every primitive the engine composes (hashes,
//! score-ordered sets, key expiry, pub/sub channels, append logs, and
//! all-or-nothing batches) entirely in process. It backs the engine's test
//! suites and works as an embedded store for single-process callers.
//!
//! Batches stage their writes against a snapshot and commit atomically, so a
//! reader never observes a half-applied batch. Expiry is lazy: an expired
//! key is dropped the next time any command touches it. The clock is the
//! wall clock by default; [`MemoryStore::frozen`] and
//! [`MemoryStore::advance`] pin it for deterministic expiry tests.

mod constants;
mod live;
mod state;
mod store;

pub use constants::CHANNEL_BUFFER;
pub use store::MemoryStore;
