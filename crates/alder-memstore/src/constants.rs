//! Bounds for the in-memory store.

/// Buffered messages per pub/sub channel before slow subscribers lag.
pub const CHANNEL_BUFFER: usize = 1024;
