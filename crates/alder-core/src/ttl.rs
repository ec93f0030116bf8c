//! Expiry policy and bucket member scores.
//!
//! Instants are unix milliseconds throughout. A resolved deadline feeds both
//! the key expiry refresh and the score of every bucket membership the touch
//! protocol writes, so a bucket is always ordered by its members' expiry.

use std::time::Duration;

use serde::Deserialize;
use serde::Serialize;

/// Expiry policy for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Ttl {
    /// No expiry; bucket member scores become [`Score::Infinite`].
    None,
    /// Use the index's configured default, or none if it has no default.
    #[default]
    Default,
    /// Expire at an absolute instant, unix milliseconds.
    At(u64),
    /// Expire this long after now.
    In(Duration),
}

impl Ttl {
    /// Resolve the policy to a concrete deadline.
    ///
    /// Resolution order is explicit override, then the index default, then
    /// none. `None` means the record does not expire.
    pub fn resolve(self, index_default: Option<Duration>, now_ms: u64) -> Option<u64> {
        match self {
            Ttl::None => None,
            Ttl::At(deadline_ms) => Some(deadline_ms),
            Ttl::In(window) => Some(deadline_after(now_ms, window)),
            Ttl::Default => index_default.map(|window| deadline_after(now_ms, window)),
        }
    }
}

fn deadline_after(now_ms: u64, window: Duration) -> u64 {
    now_ms.saturating_add(u64::try_from(window.as_millis()).unwrap_or(u64::MAX))
}

/// Score of a bucket member: its expiry instant, or infinite when the
/// membership does not expire.
///
/// Ordering puts every finite instant below [`Score::Infinite`], so bucket
/// rank order is expiry order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Score {
    /// Expires at this instant, unix milliseconds.
    At(u64),
    /// Never expires.
    Infinite,
}

impl Score {
    /// The score for a resolved deadline.
    pub fn from_deadline(deadline_ms: Option<u64>) -> Self {
        match deadline_ms {
            Some(deadline_ms) => Score::At(deadline_ms),
            None => Score::Infinite,
        }
    }

    /// Whether this score has elapsed at `now_ms`.
    pub fn elapsed_by(self, now_ms: u64) -> bool {
        match self {
            Score::At(deadline_ms) => deadline_ms <= now_ms,
            Score::Infinite => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_precedence() {
        let default = Some(Duration::from_secs(10));

        assert_eq!(Ttl::None.resolve(default, 1_000), None);
        assert_eq!(Ttl::At(5_000).resolve(default, 1_000), Some(5_000));
        assert_eq!(Ttl::In(Duration::from_secs(2)).resolve(default, 1_000), Some(3_000));
        assert_eq!(Ttl::Default.resolve(default, 1_000), Some(11_000));
        assert_eq!(Ttl::Default.resolve(None, 1_000), None);
    }

    #[test]
    fn test_score_ordering() {
        assert!(Score::At(1) < Score::At(2));
        assert!(Score::At(u64::MAX) < Score::Infinite);
    }

    #[test]
    fn test_score_elapsed() {
        assert!(Score::At(1_000).elapsed_by(1_000));
        assert!(Score::At(999).elapsed_by(1_000));
        assert!(!Score::At(1_001).elapsed_by(1_000));
        assert!(!Score::Infinite.elapsed_by(u64::MAX));
    }
}
