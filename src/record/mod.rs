//! Record - one entity instance tracking current vs. persisted state
//!
//! A [`Record`] holds the working attribute values, the snapshot taken at
//! the last load/save (absent for a never-persisted record), and a lazily
//! populated relation cache. All storage access goes through the
//! collaborators in a [`crate::executor::RecordContext`].
//!
//! A record is not safe for concurrent mutation: attribute writes, dirty
//! diffing and commit are not atomic across calls. Share across threads
//! only with external synchronization.

pub mod attributes;
pub mod persistence;
pub mod primary_key;

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;

use crate::error::{RecordError, RecordResult};
use crate::events::LifecycleGate;
use crate::executor::Row;
use crate::schema::Schema;

pub use persistence::SaveOutcome;
pub use primary_key::KeyValue;

/// A resolved relation cache entry. Empty results are cached as empty,
/// distinct from a never-resolved entry which is simply absent.
#[derive(Debug, Clone)]
pub enum Related {
    One(Option<Record>),
    Many(Vec<Record>),
}

impl Related {
    pub fn as_one(&self) -> Option<&Record> {
        match self {
            Related::One(record) => record.as_ref(),
            Related::Many(_) => None,
        }
    }

    pub fn as_many(&self) -> Option<&[Record]> {
        match self {
            Related::Many(records) => Some(records),
            Related::One(_) => None,
        }
    }
}

/// One entity instance bound to its declared [`Schema`]
#[derive(Debug, Clone)]
pub struct Record {
    pub(crate) schema: Arc<Schema>,
    pub(crate) attributes: HashMap<String, Value>,
    pub(crate) old_attributes: Option<HashMap<String, Value>>,
    pub(crate) related: HashMap<String, Related>,
}

impl Record {
    /// Instantiate a raw, empty, never-persisted record. Fires `init`.
    pub fn new(schema: Arc<Schema>) -> Self {
        let mut record = Self {
            schema,
            attributes: HashMap::new(),
            old_attributes: None,
            related: HashMap::new(),
        };
        record.fire_init();
        record
    }

    /// Populate a record from a storage row, seeding both the current and
    /// the persisted snapshot. Fires `after_find`. A row column the schema
    /// does not declare is an error, not a silent store.
    pub fn from_row(schema: Arc<Schema>, row: Row) -> RecordResult<Self> {
        for name in row.keys() {
            if !schema.has_attribute(name) {
                return Err(RecordError::unknown_attribute(schema.table(), name));
            }
        }
        let mut record = Self {
            schema,
            attributes: row.clone(),
            old_attributes: Some(row),
            related: HashMap::new(),
        };
        record.fire_after_find();
        Ok(record)
    }

    pub fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    pub fn table(&self) -> &str {
        self.schema.table()
    }

    /// Two records refer to the same storage row iff they map the same
    /// table, both have been persisted, and their primary keys are equal.
    /// Other attribute differences do not matter; two never-persisted
    /// records are never equal.
    pub fn equals(&self, other: &Record) -> bool {
        if self.is_new_record() || other.is_new_record() {
            return false;
        }
        if self.schema.table() != other.schema.table() {
            return false;
        }
        match (self.primary_key(true), other.primary_key(true)) {
            (Ok(mine), Ok(theirs)) => mine == theirs,
            _ => false,
        }
    }

    // Observer dispatch. The observer list is cloned out of the schema so
    // listeners can take `&mut Record`.

    pub(crate) fn fire_init(&mut self) {
        for observer in self.schema.observers() {
            observer.init(self);
        }
    }

    pub(crate) fn fire_after_find(&mut self) {
        for observer in self.schema.observers() {
            observer.after_find(self);
        }
    }

    pub(crate) fn fire_before_insert(&mut self) -> bool {
        let mut gate = LifecycleGate::new();
        for observer in self.schema.observers() {
            observer.before_insert(self, &mut gate);
        }
        gate.is_allowed()
    }

    pub(crate) fn fire_after_insert(&mut self) {
        for observer in self.schema.observers() {
            observer.after_insert(self);
        }
    }

    pub(crate) fn fire_before_update(&mut self) -> bool {
        let mut gate = LifecycleGate::new();
        for observer in self.schema.observers() {
            observer.before_update(self, &mut gate);
        }
        gate.is_allowed()
    }

    pub(crate) fn fire_after_update(&mut self) {
        for observer in self.schema.observers() {
            observer.after_update(self);
        }
    }

    pub(crate) fn fire_before_delete(&mut self) -> bool {
        let mut gate = LifecycleGate::new();
        for observer in self.schema.observers() {
            observer.before_delete(self, &mut gate);
        }
        gate.is_allowed()
    }

    pub(crate) fn fire_after_delete(&mut self) {
        for observer in self.schema.observers() {
            observer.after_delete(self);
        }
    }
}
