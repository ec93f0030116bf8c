//! Relation projections and the membership diff.
//!
//! A relation projection maps relation names to the foreign keys an entity
//! currently belongs to. It is derived from the entity's value by the
//! caller's codec ([`crate::Record::relations`]) and is what drives bucket
//! membership; the entity value itself is never inspected here.

use std::collections::BTreeMap;
use std::collections::HashSet;

use crate::name::RelationName;

/// Mapping from relation name to the foreign keys an entity belongs to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelationProjection(BTreeMap<RelationName, Vec<String>>);

impl RelationProjection {
    /// An empty projection.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of [`set`](Self::set).
    pub fn with<I, K>(mut self, relation: RelationName, fkeys: I) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<String>,
    {
        self.set(relation, fkeys.into_iter().map(Into::into).collect());
        self
    }

    /// Set the foreign keys for one relation.
    ///
    /// An explicit empty list means "belongs to no bucket of this relation";
    /// omitting the relation entirely means "unchanged" to the diff.
    pub fn set(&mut self, relation: RelationName, fkeys: Vec<String>) {
        self.0.insert(relation, fkeys);
    }

    /// The foreign keys recorded for `relation`, if present.
    pub fn get(&self, relation: &RelationName) -> Option<&[String]> {
        self.0.get(relation).map(Vec::as_slice)
    }

    /// Whether the projection holds no relations at all.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The number of relations present.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Iterate over `(relation, fkeys)` entries.
    pub fn iter(&self) -> impl Iterator<Item = (&RelationName, &Vec<String>)> {
        self.0.iter()
    }

    /// Iterate over flattened `(relation, fkey)` pairs.
    pub fn pairs(&self) -> impl Iterator<Item = (&RelationName, &str)> {
        self.0
            .iter()
            .flat_map(|(relation, fkeys)| fkeys.iter().map(move |fkey| (relation, fkey.as_str())))
    }
}

impl FromIterator<(RelationName, Vec<String>)> for RelationProjection {
    fn from_iter<I: IntoIterator<Item = (RelationName, Vec<String>)>>(entries: I) -> Self {
        Self(entries.into_iter().collect())
    }
}

/// Compute the bucket memberships that must be removed when an entity moves
/// from the `prev` projection to the `next` one.
///
/// Per relation present in `prev`:
/// - `next` absent entirely, or missing that relation: no removals (the
///   relation is treated as unchanged; pass an explicit empty list to clear
///   it);
/// - otherwise the removal set is the set difference `prev - next`, compared
///   by string form since buckets key members by string.
///
/// Relations present only in `next` are pure additions and contribute
/// nothing here; an entity with no prior record removes nothing.
pub fn diff(prev: Option<&RelationProjection>, next: Option<&RelationProjection>) -> RelationProjection {
    let mut removed = RelationProjection::new();

    let Some(prev) = prev else {
        return removed;
    };

    for (relation, before) in prev.iter() {
        let Some(after) = next.and_then(|next| next.get(relation)) else {
            continue;
        };

        let keep: HashSet<&str> = after.iter().map(String::as_str).collect();
        let mut seen: HashSet<&str> = HashSet::new();
        let gone: Vec<String> = before
            .iter()
            .filter(|fkey| !keep.contains(fkey.as_str()) && seen.insert(fkey.as_str()))
            .cloned()
            .collect();

        if !gone.is_empty() {
            removed.set(relation.clone(), gone);
        }
    }

    removed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn relation(name: &str) -> RelationName {
        RelationName::new(name).unwrap()
    }

    fn projection(entries: &[(&str, &[&str])]) -> RelationProjection {
        entries
            .iter()
            .map(|(name, fkeys)| (relation(name), fkeys.iter().map(ToString::to_string).collect()))
            .collect()
    }

    #[test]
    fn test_diff_set_difference() {
        let prev = projection(&[("room", &["a", "b", "c"])]);
        let next = projection(&[("room", &["b", "c", "d"])]);

        let removed = diff(Some(&prev), Some(&next));
        assert_eq!(removed.get(&relation("room")), Some(&["a".to_string()][..]));
    }

    #[test]
    fn test_diff_omitted_relation_is_unchanged() {
        let prev = projection(&[("room", &["a"]), ("team", &["x"])]);
        let next = projection(&[("room", &["a"])]);

        let removed = diff(Some(&prev), Some(&next));
        assert!(removed.get(&relation("team")).is_none());
        assert!(removed.is_empty());
    }

    #[test]
    fn test_diff_explicit_empty_clears() {
        let prev = projection(&[("room", &["a", "b"])]);
        let next = projection(&[("room", &[])]);

        let removed = diff(Some(&prev), Some(&next));
        assert_eq!(removed.get(&relation("room")), Some(&["a".to_string(), "b".to_string()][..]));
    }

    #[test]
    fn test_diff_absent_next_is_unchanged() {
        let prev = projection(&[("room", &["a"])]);
        let removed = diff(Some(&prev), None);
        assert!(removed.is_empty());
    }

    #[test]
    fn test_diff_absent_prev_removes_nothing() {
        let next = projection(&[("room", &["a"])]);
        let removed = diff(None, Some(&next));
        assert!(removed.is_empty());
    }

    #[test]
    fn test_diff_addition_only_relation() {
        let prev = projection(&[("room", &["a"])]);
        let next = projection(&[("room", &["a"]), ("team", &["x"])]);

        let removed = diff(Some(&prev), Some(&next));
        assert!(removed.is_empty());
    }

    #[test]
    fn test_diff_deduplicates_members() {
        let prev = projection(&[("room", &["a", "a", "b"])]);
        let next = projection(&[("room", &["b"])]);

        let removed = diff(Some(&prev), Some(&next));
        assert_eq!(removed.get(&relation("room")), Some(&["a".to_string()][..]));
    }

    #[test]
    fn test_pairs_flattens() {
        let projection = projection(&[("room", &["a", "b"]), ("team", &["x"])]);
        let pairs: Vec<(String, String)> = projection.pairs().map(|(r, f)| (r.to_string(), f.to_string())).collect();
        assert_eq!(pairs, vec![
            ("room".to_string(), "a".to_string()),
            ("room".to_string(), "b".to_string()),
            ("team".to_string(), "x".to_string()),
        ]);
    }
}
