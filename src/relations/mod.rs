//! Relations - declared associations, lazy resolution, and linking
//!
//! Descriptors are declared on the schema; resolution, the per-record
//! cache, and link/unlink bookkeeping live on [`crate::record::Record`].

pub mod descriptor;
pub mod linker;
pub mod loader;

pub use descriptor::{Multiplicity, Relation, Via};
