//! Primary key resolution - scalar and composite key extraction
//!
//! Update and delete conditions use the key from the persisted snapshot so
//! that mutating the key attributes in memory cannot change which row a
//! write targets.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{RecordError, RecordResult};
use crate::record::Record;

/// A primary key value: a bare scalar for single-attribute keys, a
/// name-to-value map otherwise. Composite keys are always maps regardless
/// of how they were requested.
#[derive(Debug, Clone, PartialEq)]
pub enum KeyValue {
    Scalar(Value),
    Map(HashMap<String, Value>),
}

impl KeyValue {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            KeyValue::Scalar(value) => Some(value),
            KeyValue::Map(_) => None,
        }
    }

    pub fn as_map(&self) -> Option<&HashMap<String, Value>> {
        match self {
            KeyValue::Map(map) => Some(map),
            KeyValue::Scalar(_) => None,
        }
    }
}

impl Record {
    /// The key read from the current attribute values
    pub fn primary_key(&self, as_map: bool) -> RecordResult<KeyValue> {
        self.key_from(Source::Current, as_map)
    }

    /// The key read from the persisted snapshot; null values when the
    /// record has never been persisted
    pub fn old_primary_key(&self, as_map: bool) -> RecordResult<KeyValue> {
        self.key_from(Source::Old, as_map)
    }

    /// True iff `names` is exactly the declared primary-key attribute set:
    /// order-independent, same cardinality.
    pub fn is_primary_key(&self, names: &[&str]) -> bool {
        let declared = self.schema.primary_key();
        if names.len() != declared.len() || declared.is_empty() {
            return false;
        }
        let candidate: std::collections::HashSet<&str> = names.iter().copied().collect();
        candidate.len() == declared.len()
            && declared.iter().all(|name| candidate.contains(name.as_str()))
    }

    /// The persisted key as a condition map, for update/delete targeting
    pub(crate) fn old_primary_key_map(&self) -> RecordResult<HashMap<String, Value>> {
        self.key_map(Source::Old)
    }

    /// The current key as a condition map, for refresh
    pub(crate) fn primary_key_map(&self) -> RecordResult<HashMap<String, Value>> {
        self.key_map(Source::Current)
    }

    /// Current key values keyed by attribute name, or `None` when the
    /// schema declares no key. Used for value-equality comparison of cache
    /// entries.
    pub(crate) fn primary_key_values(&self) -> Option<HashMap<String, Value>> {
        let declared = self.schema.primary_key();
        if declared.is_empty() {
            return None;
        }
        Some(
            declared
                .iter()
                .map(|name| (name.clone(), self.key_value(Source::Current, name)))
                .collect(),
        )
    }

    fn key_from(&self, source: Source, as_map: bool) -> RecordResult<KeyValue> {
        let declared = self.declared_key()?;
        if !as_map && declared.len() == 1 {
            return Ok(KeyValue::Scalar(self.key_value(source, &declared[0])));
        }
        Ok(KeyValue::Map(self.key_map(source)?))
    }

    fn key_map(&self, source: Source) -> RecordResult<HashMap<String, Value>> {
        let declared = self.declared_key()?;
        Ok(declared
            .iter()
            .map(|name| (name.clone(), self.key_value(source, name)))
            .collect())
    }

    fn declared_key(&self) -> RecordResult<Vec<String>> {
        let declared = self.schema.primary_key();
        if declared.is_empty() {
            return Err(RecordError::schema(&format!(
                "table '{}' declares no primary key",
                self.schema.table()
            )));
        }
        Ok(declared.to_vec())
    }

    fn key_value(&self, source: Source, name: &str) -> Value {
        let map = match source {
            Source::Current => Some(&self.attributes),
            Source::Old => self.old_attributes.as_ref(),
        };
        map.and_then(|m| m.get(name)).cloned().unwrap_or(Value::Null)
    }
}

#[derive(Clone, Copy)]
enum Source {
    Current,
    Old,
}
