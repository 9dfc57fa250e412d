//! # rowlink: record lifecycle and relation-linking engine
//!
//! The state machine underneath an object-relational mapping layer:
//! tracking an entity's current vs. persisted attribute state, deciding
//! what must be written back, enforcing optimistic-concurrency guarantees,
//! and maintaining bidirectional associations including join-table pivots.
//!
//! SQL generation, connections, schema discovery and validation rules are
//! deliberately outside: they live behind the [`executor`] collaborator
//! traits.

pub mod error;
pub mod events;
pub mod executor;
pub mod record;
pub mod relations;
pub mod schema;

// Re-export the core surface
pub use error::{RecordError, RecordResult};
pub use events::{LifecycleGate, RecordObserver};
pub use executor::{CommandExecutor, Filter, QueryExecutor, RecordContext, Row, Validator};
pub use record::{KeyValue, Record, Related, SaveOutcome};
pub use relations::{Multiplicity, Relation, Via};
pub use schema::{Schema, SchemaBuilder};
