//! Secondary indexing and change notification over a key-value store.
//!
//! Alder sits on top of a store that natively provides hashes, time-ordered
//! sets, pub/sub channels, an append-only log, and all-or-nothing batches
//! (the [`alder_core::Store`] trait). It lets a caller address an entity by
//! primary key, maintain derived relation memberships in foreign-key
//! buckets, and receive notifications when an entity changes, composed into
//! atomic server-side batches.
//!
//! The moving parts:
//!
//! - [`Index`], the facade: set/update/append/get/remove/touch/pkeys_via
//!   over one entity type, bundling the store handle, codec seam, and bucket
//!   configuration.
//! - the touch protocol ([`Touch`]): the atomic unit run after every
//!   mutation: expiry refresh, bucket reconciliation via the relation diff,
//!   and optional notification.
//! - fan-out ([`Index::publish`]): notifications reach the entity's own
//!   channel and every bucket channel of its current projection.
//! - [`Subscription`] and [`LogTail`], cancellable sequences over dedicated
//!   connections.
//! - [`Batch`], which composes multiple operations into one atomic round trip
//!   with label-addressed results.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use alder::{Index, Touch};
//! use alder_core::{Record, RelationName, RelationProjection};
//! use alder_memstore::MemoryStore;
//!
//! struct Session {
//!     user: String,
//!     room: String,
//! }
//!
//! impl Record for Session {
//!     fn to_fields(&self) -> Vec<(String, String)> {
//!         vec![("user".into(), self.user.clone()), ("room".into(), self.room.clone())]
//!     }
//!
//!     fn from_fields(fields: &[(String, String)]) -> Option<Self> {
//!         let field = |name: &str| {
//!             fields.iter().find(|(f, _)| f == name).map(|(_, v)| v.clone())
//!         };
//!         Some(Session {
//!             user: field("user")?,
//!             room: field("room")?,
//!         })
//!     }
//!
//!     fn relations(&self) -> RelationProjection {
//!         RelationProjection::new().with(RelationName::new("room").unwrap(), [self.room.clone()])
//!     }
//! }
//!
//! # async fn demo() -> alder::Result<()> {
//! let store = Arc::new(MemoryStore::new());
//! let sessions: Index<Session> = Index::new("sessions", store)?;
//!
//! let session = Session { user: "ada".into(), room: "lobby".into() };
//! sessions.set("42", &session, Touch::new().with_message("joined")).await?;
//!
//! assert_eq!(sessions.pkeys_via("room", "lobby").await?, vec!["42".to_string()]);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod error;
pub mod index;
pub mod live;
mod publish;
pub mod touch;

pub use alder_core::Envelope;
pub use alder_core::GlobalRef;
pub use alder_core::IndexName;
pub use alder_core::Record;
pub use alder_core::Ref;
pub use alder_core::RelationName;
pub use alder_core::RelationProjection;
pub use alder_core::Score;
pub use alder_core::Store;
pub use alder_core::StreamId;
pub use alder_core::Ttl;
pub use batch::Batch;
pub use batch::BatchOp;
pub use batch::BatchOutput;
pub use error::IndexError;
pub use error::Result;
pub use index::Index;
pub use index::IndexBuilder;
pub use live::LogTail;
pub use live::MessageFilter;
pub use live::StreamItem;
pub use live::Subscription;
pub use touch::Touch;
