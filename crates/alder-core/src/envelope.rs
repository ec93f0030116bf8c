//! The notification envelope.
//!
//! Every published notification is a JSON object pairing the originating
//! reference with an opaque, caller-defined message:
//!
//! ```json
//! {"source":"sessions@room:lobby","message":"joined"}
//! ```
//!
//! The engine never interprets `message` beyond optional subscriber-side
//! filtering.

use serde::Deserialize;
use serde::Serialize;
use snafu::ResultExt;

use crate::error::EnvelopeError;
use crate::error::MalformedEnvelopeSnafu;
use crate::refs::GlobalRef;

/// A notification payload tagged with its originating reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// The reference the notification is about.
    pub source: GlobalRef,
    /// Opaque caller-defined payload.
    pub message: String,
}

impl Envelope {
    /// Create an envelope.
    pub fn new(source: GlobalRef, message: impl Into<String>) -> Self {
        Self {
            source,
            message: message.into(),
        }
    }

    /// Encode to the wire form.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvelopeError`] if JSON encoding fails.
    pub fn encode(&self) -> Result<String, EnvelopeError> {
        serde_json::to_string(self).context(MalformedEnvelopeSnafu)
    }

    /// Decode from the wire form.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvelopeError`] if the payload is not a valid envelope;
    /// subscribers log and skip such traffic rather than terminating.
    pub fn decode(payload: &str) -> Result<Self, EnvelopeError> {
        serde_json::from_str(payload).context(MalformedEnvelopeSnafu)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::name::IndexName;
    use crate::name::RelationName;
    use crate::refs::Ref;

    fn source() -> GlobalRef {
        GlobalRef::new(
            IndexName::new("sessions").unwrap(),
            Ref::bucket(RelationName::new("room").unwrap(), "lobby"),
        )
    }

    #[test]
    fn test_wire_shape() {
        let envelope = Envelope::new(source(), "joined");
        let encoded = envelope.encode().unwrap();
        assert_eq!(encoded, r#"{"source":"sessions@room:lobby","message":"joined"}"#);
    }

    #[test]
    fn test_roundtrip() {
        let envelope = Envelope::new(source(), "joined");
        let decoded = Envelope::decode(&envelope.encode().unwrap()).unwrap();
        assert_eq!(envelope, decoded);
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(Envelope::decode("not json"), Err(EnvelopeError::MalformedEnvelope { .. })));
        assert!(matches!(Envelope::decode(r#"{"message":"x"}"#), Err(EnvelopeError::MalformedEnvelope { .. })));
        assert!(matches!(
            Envelope::decode(r#"{"source":"bad name:1","message":"x"}"#),
            Err(EnvelopeError::MalformedEnvelope { .. })
        ));
    }
}
