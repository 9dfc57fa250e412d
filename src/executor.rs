//! Collaborator interfaces - the storage and validation boundary
//!
//! The engine never builds SQL or holds connections. Reads go through a
//! [`QueryExecutor`], writes through a [`CommandExecutor`], and rule
//! evaluation through a [`Validator`]. Implementations own dialects,
//! pooling and retry policy; the engine issues at most one call per
//! lifecycle phase and propagates failures unmodified.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::RecordResult;
use crate::record::Record;

/// A storage row or value set: attribute name to value
pub type Row = HashMap<String, Value>;

/// An attribute-equality filter. A `Value::Array` entry means set
/// membership (the storage-side equivalent of an IN list); any other value
/// means plain equality.
pub type Filter = HashMap<String, Value>;

/// Read access to storage
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Fetch a single row matching the filter, if any
    async fn one(&self, table: &str, filter: &Filter) -> RecordResult<Option<Row>>;

    /// Fetch all rows matching the filter
    async fn all(&self, table: &str, filter: &Filter) -> RecordResult<Vec<Row>>;
}

/// Write access to storage
#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Insert a row and return any server-generated values (auto keys,
    /// defaults) keyed by attribute name. An empty map is a valid result.
    async fn insert(&self, table: &str, values: &Row) -> RecordResult<Row>;

    /// Update rows matching the condition, returning the affected count
    async fn update(&self, table: &str, values: &Row, condition: &Filter) -> RecordResult<u64>;

    /// Delete rows matching the condition, returning the affected count
    async fn delete(&self, table: &str, condition: &Filter) -> RecordResult<u64>;
}

/// Validation collaborator. Returns whether the record passed; failure
/// details stay queryable on the implementor.
#[async_trait]
pub trait Validator: Send + Sync {
    async fn validate(&self, record: &mut Record, scope: Option<&[&str]>) -> RecordResult<bool>;
}

/// Bundle of collaborators handed to the lifecycle operations.
///
/// The validator is optional; without one, validated saves always pass the
/// validation gate.
#[derive(Clone)]
pub struct RecordContext {
    query: Arc<dyn QueryExecutor>,
    command: Arc<dyn CommandExecutor>,
    validator: Option<Arc<dyn Validator>>,
}

impl RecordContext {
    pub fn new(query: Arc<dyn QueryExecutor>, command: Arc<dyn CommandExecutor>) -> Self {
        Self {
            query,
            command,
            validator: None,
        }
    }

    pub fn with_validator(mut self, validator: Arc<dyn Validator>) -> Self {
        self.validator = Some(validator);
        self
    }

    pub fn query(&self) -> &dyn QueryExecutor {
        self.query.as_ref()
    }

    pub fn command(&self) -> &dyn CommandExecutor {
        self.command.as_ref()
    }

    pub(crate) async fn validate(
        &self,
        record: &mut Record,
        scope: Option<&[&str]>,
    ) -> RecordResult<bool> {
        match &self.validator {
            Some(validator) => validator.validate(record, scope).await,
            None => Ok(true),
        }
    }
}
