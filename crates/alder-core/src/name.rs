//! Validated index and relation names.
//!
//! Names address keyspace segments, so the allowed alphabet is restricted to
//! `[a-zA-Z0-9_./]`. Validation runs at construction; a name value that
//! exists is a name value that is valid.

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

use crate::constants::MAX_NAME_LENGTH;
use crate::error::NameEmptySnafu;
use crate::error::NameError;
use crate::error::NameInvalidCharacterSnafu;
use crate::error::NameTooLongSnafu;

/// The name of an index.
///
/// # Examples
///
/// ```
/// use alder_core::IndexName;
///
/// let name = IndexName::new("sessions").unwrap();
/// assert_eq!(name.as_str(), "sessions");
/// assert!(IndexName::new("no spaces").is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct IndexName(String);

impl IndexName {
    /// Create a validated index name.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if the name is empty, too long, or contains a
    /// character outside `[a-zA-Z0-9_./]`.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// The name of a relation within an index.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RelationName(String);

impl RelationName {
    /// Create a validated relation name.
    ///
    /// # Errors
    ///
    /// Returns a [`NameError`] if the name is empty, too long, or contains a
    /// character outside `[a-zA-Z0-9_./]`.
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// Get the name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Validate a name against the allowed character class.
pub fn validate_name(name: &str) -> Result<(), NameError> {
    if name.is_empty() {
        return NameEmptySnafu.fail();
    }

    if name.len() > MAX_NAME_LENGTH {
        return NameTooLongSnafu { name }.fail();
    }

    for character in name.chars() {
        if !character.is_ascii_alphanumeric() && !matches!(character, '_' | '.' | '/') {
            return NameInvalidCharacterSnafu { name, character }.fail();
        }
    }

    Ok(())
}

macro_rules! name_conversions {
    ($name:ident) => {
        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }

        impl TryFrom<String> for $name {
            type Error = NameError;

            fn try_from(name: String) -> Result<Self, NameError> {
                Self::new(name)
            }
        }

        impl From<$name> for String {
            fn from(name: $name) -> Self {
                name.0
            }
        }
    };
}

name_conversions!(IndexName);
name_conversions!(RelationName);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(IndexName::new("sessions").is_ok());
        assert!(IndexName::new("app/v2.sessions").is_ok());
        assert!(IndexName::new("a_b.c/d").is_ok());
        assert!(RelationName::new("room").is_ok());
        assert!(RelationName::new("0").is_ok());
    }

    #[test]
    fn test_empty_name() {
        assert!(matches!(IndexName::new(""), Err(NameError::NameEmpty)));
        assert!(matches!(RelationName::new(""), Err(NameError::NameEmpty)));
    }

    #[test]
    fn test_invalid_characters() {
        assert!(matches!(
            IndexName::new("no spaces"),
            Err(NameError::NameInvalidCharacter { character: ' ', .. })
        ));
        assert!(matches!(
            IndexName::new("colon:here"),
            Err(NameError::NameInvalidCharacter { character: ':', .. })
        ));
        assert!(matches!(
            RelationName::new("at@here"),
            Err(NameError::NameInvalidCharacter { character: '@', .. })
        ));
        assert!(matches!(
            RelationName::new("dash-here"),
            Err(NameError::NameInvalidCharacter { character: '-', .. })
        ));
    }

    #[test]
    fn test_name_too_long() {
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        assert!(matches!(IndexName::new(long), Err(NameError::NameTooLong { .. })));
    }

    #[test]
    fn test_serde_rejects_invalid() {
        let decoded: Result<IndexName, _> = serde_json::from_str("\"ok.name\"");
        assert!(decoded.is_ok());

        let decoded: Result<IndexName, _> = serde_json::from_str("\"bad name\"");
        assert!(decoded.is_err());
    }
}
