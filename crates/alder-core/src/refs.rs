//! Reference and key codec.
//!
//! A [`Ref`] addresses either a single entity's primary record or a bucket of
//! entities related through a foreign key. A [`GlobalRef`] qualifies a ref
//! with its owning index so it can travel outside that index's context, e.g.
//! inside event envelopes.
//!
//! The string grammar doubles as the flat key namespace of the store:
//!
//! | form | string |
//! |---|---|
//! | primary key | `<index>:<pkey>` |
//! | bucket | `<index>@<relation>:<fkey>` |

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;
use serde::Deserializer;
use serde::Serialize;
use serde::Serializer;
use snafu::OptionExt;
use snafu::ResultExt;

use crate::constants::KEY_SEPARATOR;
use crate::constants::RELATION_SEPARATOR;
use crate::error::BadIndexNameSnafu;
use crate::error::BadRelationNameSnafu;
use crate::error::EmptyIndexSnafu;
use crate::error::EmptyKeySnafu;
use crate::error::MissingSeparatorSnafu;
use crate::error::RefParseError;
use crate::name::IndexName;
use crate::name::RelationName;

/// A reference to an addressable record within one index.
///
/// Exactly one of the two shapes exists; the ambiguous both/neither states of
/// a field-bag encoding are unrepresentable here.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Ref {
    /// A single entity's primary record.
    Primary {
        /// The entity's primary key.
        pkey: String,
    },
    /// A bucket of entities related via `relation` to the foreign key `fkey`.
    Bucket {
        /// The relation the bucket indexes.
        relation: RelationName,
        /// The foreign key the bucket is keyed by.
        fkey: String,
    },
}

impl Ref {
    /// Reference a primary record.
    pub fn primary(pkey: impl Into<String>) -> Self {
        Ref::Primary { pkey: pkey.into() }
    }

    /// Reference a relation bucket.
    pub fn bucket(relation: RelationName, fkey: impl Into<String>) -> Self {
        Ref::Bucket {
            relation,
            fkey: fkey.into(),
        }
    }

    /// Whether this is a primary-record ref.
    pub fn is_primary(&self) -> bool {
        matches!(self, Ref::Primary { .. })
    }

    /// Whether this is a bucket ref.
    pub fn is_bucket(&self) -> bool {
        matches!(self, Ref::Bucket { .. })
    }

    /// The flat store key this ref resolves to under `index`.
    ///
    /// The mapping is deterministic and injective: validated names cannot
    /// contain `:` or `@`, so the first separator of each kind is
    /// unambiguous.
    pub fn storage_key(&self, index: &IndexName) -> String {
        match self {
            Ref::Primary { pkey } => format!("{index}{KEY_SEPARATOR}{pkey}"),
            Ref::Bucket { relation, fkey } => {
                format!("{index}{RELATION_SEPARATOR}{relation}{KEY_SEPARATOR}{fkey}")
            }
        }
    }
}

/// A [`Ref`] qualified with its owning index.
///
/// # Examples
///
/// ```
/// use alder_core::{GlobalRef, IndexName, Ref};
///
/// let index = IndexName::new("sessions").unwrap();
/// let gref = GlobalRef::new(index, Ref::primary("42"));
/// assert_eq!(gref.to_string(), "sessions:42");
/// assert_eq!(gref.to_string().parse::<GlobalRef>().unwrap(), gref);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalRef {
    /// The owning index.
    pub index: IndexName,
    /// The addressed record.
    pub target: Ref,
}

impl GlobalRef {
    /// Qualify a ref with its owning index.
    pub fn new(index: IndexName, target: Ref) -> Self {
        Self { index, target }
    }

    /// The flat store key this ref resolves to.
    pub fn storage_key(&self) -> String {
        self.target.storage_key(&self.index)
    }
}

impl fmt::Display for GlobalRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.storage_key())
    }
}

impl FromStr for GlobalRef {
    type Err = RefParseError;

    fn from_str(input: &str) -> Result<Self, RefParseError> {
        let (address, key) = input.split_once(KEY_SEPARATOR).context(MissingSeparatorSnafu { input })?;

        if key.is_empty() {
            return EmptyKeySnafu { input }.fail();
        }

        match address.split_once(RELATION_SEPARATOR) {
            Some((index, relation)) => {
                if index.is_empty() {
                    return EmptyIndexSnafu { input }.fail();
                }
                let index = IndexName::new(index).context(BadIndexNameSnafu { input })?;
                let relation = RelationName::new(relation).context(BadRelationNameSnafu { input })?;
                Ok(GlobalRef::new(index, Ref::bucket(relation, key)))
            }
            None => {
                if address.is_empty() {
                    return EmptyIndexSnafu { input }.fail();
                }
                let index = IndexName::new(address).context(BadIndexNameSnafu { input })?;
                Ok(GlobalRef::new(index, Ref::primary(key)))
            }
        }
    }
}

impl Serialize for GlobalRef {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GlobalRef {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        text.parse().map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::NameError;

    fn index(name: &str) -> IndexName {
        IndexName::new(name).unwrap()
    }

    fn relation(name: &str) -> RelationName {
        RelationName::new(name).unwrap()
    }

    #[test]
    fn test_primary_storage_key() {
        let r = Ref::primary("42");
        assert_eq!(r.storage_key(&index("sessions")), "sessions:42");
    }

    #[test]
    fn test_bucket_storage_key() {
        let r = Ref::bucket(relation("room"), "lobby");
        assert_eq!(r.storage_key(&index("sessions")), "sessions@room:lobby");
    }

    #[test]
    fn test_global_ref_roundtrip() {
        let gref = GlobalRef::new(index("sessions"), Ref::primary("42"));
        let decoded: GlobalRef = gref.to_string().parse().unwrap();
        assert_eq!(gref, decoded);

        let gref = GlobalRef::new(index("app/v2"), Ref::bucket(relation("room"), "lobby"));
        let decoded: GlobalRef = gref.to_string().parse().unwrap();
        assert_eq!(gref, decoded);
    }

    #[test]
    fn test_roundtrip_with_separator_in_key() {
        // The key segment runs to the end of the string, so it may itself
        // contain separators.
        let gref = GlobalRef::new(index("sessions"), Ref::primary("a:b@c"));
        let decoded: GlobalRef = gref.to_string().parse().unwrap();
        assert_eq!(gref, decoded);
    }

    #[test]
    fn test_parse_missing_separator() {
        assert!(matches!(
            "no-separator".parse::<GlobalRef>(),
            Err(RefParseError::MissingSeparator { .. })
        ));
    }

    #[test]
    fn test_parse_empty_segments() {
        assert!(matches!(":42".parse::<GlobalRef>(), Err(RefParseError::EmptyIndex { .. })));
        assert!(matches!("@room:42".parse::<GlobalRef>(), Err(RefParseError::EmptyIndex { .. })));
        assert!(matches!("sessions:".parse::<GlobalRef>(), Err(RefParseError::EmptyKey { .. })));
    }

    #[test]
    fn test_parse_bad_names_wrap_cause() {
        let err = "bad name:42".parse::<GlobalRef>().unwrap_err();
        assert!(matches!(
            err,
            RefParseError::BadIndexName {
                source: NameError::NameInvalidCharacter { .. },
                ..
            }
        ));

        let err = "sessions@bad relation:42".parse::<GlobalRef>().unwrap_err();
        assert!(matches!(err, RefParseError::BadRelationName { .. }));

        let err = "sessions@:42".parse::<GlobalRef>().unwrap_err();
        assert!(matches!(
            err,
            RefParseError::BadRelationName {
                source: NameError::NameEmpty,
                ..
            }
        ));
    }

    #[test]
    fn test_serde_as_string() {
        let gref = GlobalRef::new(index("sessions"), Ref::bucket(relation("room"), "lobby"));
        let json = serde_json::to_string(&gref).unwrap();
        assert_eq!(json, "\"sessions@room:lobby\"");

        let decoded: GlobalRef = serde_json::from_str(&json).unwrap();
        assert_eq!(gref, decoded);
    }
}
