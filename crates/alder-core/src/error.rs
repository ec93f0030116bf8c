//! Error types for the core reference, envelope, and store model.
//!
//! Uses snafu for structured error handling with context.

use snafu::Snafu;

use crate::constants::MAX_NAME_LENGTH;

/// An index or relation name failed validation.
///
/// Raised synchronously at construction, never deferred to first use.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum NameError {
    /// The name is empty.
    #[snafu(display("name cannot be empty"))]
    NameEmpty,

    /// The name exceeds the maximum length.
    #[snafu(display("name '{name}' exceeds maximum length of {MAX_NAME_LENGTH}"))]
    NameTooLong {
        /// The offending name.
        name: String,
    },

    /// The name contains a character outside `[a-zA-Z0-9_./]`.
    #[snafu(display("name '{name}' contains invalid character '{character}'"))]
    NameInvalidCharacter {
        /// The offending name.
        name: String,
        /// The first invalid character.
        character: char,
    },
}

/// A portable ref string failed to parse.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum RefParseError {
    /// The input has no `:` between the address and key segments.
    #[snafu(display("ref '{input}' is missing the ':' separator"))]
    MissingSeparator {
        /// The unparsed input.
        input: String,
    },

    /// The index segment is empty.
    #[snafu(display("ref '{input}' has an empty index segment"))]
    EmptyIndex {
        /// The unparsed input.
        input: String,
    },

    /// The key segment is empty.
    #[snafu(display("ref '{input}' has an empty key segment"))]
    EmptyKey {
        /// The unparsed input.
        input: String,
    },

    /// The embedded index name failed validation.
    #[snafu(display("ref '{input}' has an invalid index name: {source}"))]
    BadIndexName {
        /// The unparsed input.
        input: String,
        /// The underlying name validation failure.
        source: NameError,
    },

    /// The embedded relation name failed validation.
    #[snafu(display("ref '{input}' has an invalid relation name: {source}"))]
    BadRelationName {
        /// The unparsed input.
        input: String,
        /// The underlying name validation failure.
        source: NameError,
    },
}

/// An inbound notification payload failed envelope decoding.
///
/// Listeners log these and skip the item rather than terminating.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum EnvelopeError {
    /// The payload is not a valid envelope document.
    #[snafu(display("malformed event envelope: {source}"))]
    MalformedEnvelope {
        /// The underlying JSON error.
        source: serde_json::Error,
    },
}

/// A stream id string failed to parse.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StreamIdParseError {
    /// The input is not of the form `<ms>-<seq>`.
    #[snafu(display("invalid stream id '{input}'"))]
    InvalidStreamId {
        /// The unparsed input.
        input: String,
    },
}

/// Errors surfaced by a store backend.
///
/// This layer performs no retry, backoff, or reinterpretation; transport
/// failures pass through to the caller of the operation that hit them.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub))]
pub enum StoreError {
    /// The underlying client reported a transport failure.
    #[snafu(display("store transport error: {message}"))]
    Transport {
        /// The client's error text.
        message: String,
    },

    /// A dedicated subscriber or reader connection was closed.
    #[snafu(display("store connection closed"))]
    ConnectionClosed,

    /// A reply did not have the shape the command calls for.
    #[snafu(display("unexpected store reply, expected {expected}"))]
    UnexpectedReply {
        /// What the caller was decoding.
        expected: &'static str,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = NameError::NameInvalidCharacter {
            name: "bad name".to_string(),
            character: ' ',
        };
        assert!(err.to_string().contains("bad name"));

        let err = RefParseError::MissingSeparator {
            input: "no-separator".to_string(),
        };
        assert!(err.to_string().contains("no-separator"));

        let err = StoreError::UnexpectedReply { expected: "fields" };
        assert!(err.to_string().contains("fields"));
    }

    #[test]
    fn test_parse_error_carries_cause() {
        let err = RefParseError::BadIndexName {
            input: "bad name:1".to_string(),
            source: NameError::NameInvalidCharacter {
                name: "bad name".to_string(),
                character: ' ',
            },
        };
        assert!(std::error::Error::source(&err).is_some());
    }
}
