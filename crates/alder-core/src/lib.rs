//! Core model for the alder indexing and notification engine.
//!
//! This crate holds everything the engine and store backends share:
//!
//! - the reference/key codec ([`Ref`], [`GlobalRef`]) and validated names;
//! - relation projections and the membership [`diff`];
//! - the notification [`Envelope`];
//! - expiry policy ([`Ttl`]) and bucket member scores ([`Score`]);
//! - the [`Store`] trait with its command/reply model and dedicated
//!   subscriber/reader connections;
//! - the [`Record`] codec seam;
//! - the error taxonomy.

pub mod command;
pub mod constants;
pub mod envelope;
pub mod error;
pub mod name;
pub mod record;
pub mod refs;
pub mod relations;
pub mod store;
pub mod ttl;

pub use command::LogEntry;
pub use command::StoreCommand;
pub use command::StoreReply;
pub use command::StreamId;
pub use envelope::Envelope;
pub use error::EnvelopeError;
pub use error::NameError;
pub use error::RefParseError;
pub use error::StoreError;
pub use error::StreamIdParseError;
pub use name::IndexName;
pub use name::RelationName;
pub use name::validate_name;
pub use record::Record;
pub use refs::GlobalRef;
pub use refs::Ref;
pub use relations::RelationProjection;
pub use relations::diff;
pub use store::ChannelSubscriber;
pub use store::LogReader;
pub use store::Store;
pub use ttl::Score;
pub use ttl::Ttl;
