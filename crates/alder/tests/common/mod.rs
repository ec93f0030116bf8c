//! Shared test record for the integration suites.

#![allow(dead_code)]

use alder_core::Record;
use alder_core::RelationName;
use alder_core::RelationProjection;

/// A test entity with one scalar relation (`baz`) and one list relation
/// (`room`). The `room` projection entry is always present, so an empty
/// room list explicitly clears bucket membership, while an absent `baz`
/// simply contributes no relation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Doc {
    pub foo: String,
    pub bar: i64,
    pub baz: Option<i64>,
    pub rooms: Vec<String>,
}

impl Doc {
    pub fn new(foo: &str, bar: i64) -> Self {
        Doc {
            foo: foo.to_string(),
            bar,
            ..Doc::default()
        }
    }

    pub fn with_baz(mut self, baz: i64) -> Self {
        self.baz = Some(baz);
        self
    }

    pub fn with_room(mut self, room: &str) -> Self {
        self.rooms.push(room.to_string());
        self
    }
}

impl Record for Doc {
    fn to_fields(&self) -> Vec<(String, String)> {
        let mut fields = vec![
            ("foo".to_string(), self.foo.clone()),
            ("bar".to_string(), self.bar.to_string()),
        ];
        if let Some(baz) = self.baz {
            fields.push(("baz".to_string(), baz.to_string()));
        }
        if !self.rooms.is_empty() {
            fields.push(("rooms".to_string(), self.rooms.join(",")));
        }
        fields
    }

    fn from_fields(fields: &[(String, String)]) -> Option<Self> {
        if fields.is_empty() {
            return None;
        }

        let mut doc = Doc::default();
        for (field, value) in fields {
            match field.as_str() {
                "foo" => doc.foo = value.clone(),
                "bar" => doc.bar = value.parse().ok()?,
                "baz" => doc.baz = Some(value.parse().ok()?),
                "rooms" => doc.rooms = value.split(',').map(ToString::to_string).collect(),
                _ => {}
            }
        }
        Some(doc)
    }

    fn relations(&self) -> RelationProjection {
        let mut projection =
            RelationProjection::new().with(RelationName::new("room").unwrap(), self.rooms.clone());
        if let Some(baz) = self.baz {
            projection.set(RelationName::new("baz").unwrap(), vec![baz.to_string()]);
        }
        projection
    }
}
