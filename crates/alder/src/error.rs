//! Error type for engine operations.
//!
//! Structural failures (names, ref parsing) surface before any store
//! traffic; store transport errors pass through unreinterpreted.

use alder_core::EnvelopeError;
use alder_core::NameError;
use alder_core::RefParseError;
use alder_core::StoreError;
use snafu::Snafu;

/// Errors surfaced by index operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum IndexError {
    /// An index or relation name failed validation.
    #[snafu(display("name validation failed: {source}"))]
    Name {
        /// The underlying validation failure.
        source: NameError,
    },

    /// A portable ref string failed to parse.
    #[snafu(display("ref parse failed: {source}"))]
    RefParse {
        /// The underlying parse failure.
        source: RefParseError,
    },

    /// The store reported an error; surfaced unmodified, no retries.
    #[snafu(display("store operation failed: {source}"))]
    StoreFailed {
        /// The underlying store error.
        source: StoreError,
    },

    /// A notification envelope failed to encode.
    #[snafu(display("envelope encoding failed: {source}"))]
    Envelope {
        /// The underlying envelope error.
        source: EnvelopeError,
    },

    /// A subscriber message filter pattern failed to compile.
    #[snafu(display("invalid message filter pattern: {source}"))]
    FilterPattern {
        /// The underlying regex error.
        source: regex::Error,
    },

    /// A batch reply vector was shorter than the bound extractors expect.
    #[snafu(display("batch reply missing slot {slot}"))]
    ReplyMissing {
        /// The absent slot.
        slot: usize,
    },
}

impl From<NameError> for IndexError {
    fn from(source: NameError) -> Self {
        IndexError::Name { source }
    }
}

impl From<RefParseError> for IndexError {
    fn from(source: RefParseError) -> Self {
        IndexError::RefParse { source }
    }
}

impl From<StoreError> for IndexError {
    fn from(source: StoreError) -> Self {
        IndexError::StoreFailed { source }
    }
}

impl From<EnvelopeError> for IndexError {
    fn from(source: EnvelopeError) -> Self {
        IndexError::Envelope { source }
    }
}

/// Result type for engine operations.
pub type Result<T, E = IndexError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_from_conversions() {
        fn accepts_error(_: IndexError) {}

        let _ = |e: NameError| accepts_error(e.into());
        let _ = |e: RefParseError| accepts_error(e.into());
        let _ = |e: StoreError| accepts_error(e.into());
        let _ = |e: EnvelopeError| accepts_error(e.into());
    }

    #[test]
    fn test_error_display() {
        let err = IndexError::ReplyMissing { slot: 4 };
        assert!(err.to_string().contains('4'));
    }
}
