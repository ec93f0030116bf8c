//! The injected value codec seam.

use crate::relations::RelationProjection;

/// Field-level codec for one entity type, plus its relation projection.
///
/// The engine stores records as flat field/value pairs and never looks
/// inside them; this trait is the seam where the caller supplies the
/// serializer/deserializer pair and the pure projection function that
/// drives bucket membership.
pub trait Record: Sized + Send + Sync {
    /// Serialize the value to flat field/value pairs.
    fn to_fields(&self) -> Vec<(String, String)>;

    /// Deserialize a value from flat field/value pairs.
    ///
    /// Returning `None` marks the record as undecodable; readers treat it as
    /// absent and streaming sequences drop the item.
    fn from_fields(fields: &[(String, String)]) -> Option<Self>;

    /// The relation projection of this value.
    ///
    /// Defaults to no relations for record types that are never bucketed.
    fn relations(&self) -> RelationProjection {
        RelationProjection::new()
    }
}
