//! Bounds shared across the alder crates.

/// Maximum length in bytes of an index or relation name.
pub const MAX_NAME_LENGTH: usize = 128;

/// Separator between the address segment and the key segment of a ref.
pub const KEY_SEPARATOR: char = ':';

/// Separator between the index segment and the relation segment of a bucket ref.
pub const RELATION_SEPARATOR: char = '@';

/// Separator between the millisecond and sequence halves of a stream id.
pub const STREAM_ID_SEPARATOR: char = '-';
