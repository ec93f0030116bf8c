//! Property tests for the ref string grammar.
//!
//! The portable string form must satisfy `parse(stringify(r)) == r` for
//! every valid ref, and name validation must accept exactly the allowed
//! character class.

use alder_core::GlobalRef;
use alder_core::IndexName;
use alder_core::Ref;
use alder_core::RelationName;
use proptest::prelude::*;

fn valid_name() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9_./]{1,24}"
}

fn arbitrary_key() -> impl Strategy<Value = String> {
    any::<String>().prop_filter("key segment must be non-empty", |key| !key.is_empty())
}

proptest! {
    #[test]
    fn primary_refs_roundtrip(index in valid_name(), pkey in arbitrary_key()) {
        let index = IndexName::new(index).unwrap();
        let gref = GlobalRef::new(index, Ref::primary(pkey));

        let decoded: GlobalRef = gref.to_string().parse().unwrap();
        prop_assert_eq!(gref, decoded);
    }

    #[test]
    fn bucket_refs_roundtrip(index in valid_name(), relation in valid_name(), fkey in arbitrary_key()) {
        let index = IndexName::new(index).unwrap();
        let relation = RelationName::new(relation).unwrap();
        let gref = GlobalRef::new(index, Ref::bucket(relation, fkey));

        let decoded: GlobalRef = gref.to_string().parse().unwrap();
        prop_assert_eq!(gref, decoded);
    }

    #[test]
    fn allowed_names_always_construct(name in valid_name()) {
        prop_assert!(IndexName::new(name.clone()).is_ok());
        prop_assert!(RelationName::new(name).is_ok());
    }

    #[test]
    fn names_with_outside_characters_fail(name in "[a-zA-Z0-9_./]{0,8}[^a-zA-Z0-9_./][a-zA-Z0-9_./]{0,8}") {
        prop_assert!(IndexName::new(name.clone()).is_err());
        prop_assert!(RelationName::new(name).is_err());
    }
}
