//! Attribute state - current values, persisted snapshot, dirty diffing
//!
//! The dirty set is what `update` writes: for a never-persisted record it
//! is every current value, otherwise every attribute whose current value
//! differs from the persisted snapshot by strict value equality, with a
//! missing snapshot entry counting as different.

use std::collections::HashMap;

use serde_json::Value;

use crate::error::{RecordError, RecordResult};
use crate::record::Record;

impl Record {
    /// Read a current attribute value. `Ok(None)` means declared but not
    /// yet set; an undeclared name is an error.
    pub fn get(&self, name: &str) -> RecordResult<Option<&Value>> {
        if !self.schema.has_attribute(name) {
            return Err(RecordError::unknown_attribute(self.schema.table(), name));
        }
        Ok(self.attributes.get(name))
    }

    /// Set a current attribute value. Undeclared names are rejected, never
    /// silently stored.
    pub fn set(&mut self, name: &str, value: Value) -> RecordResult<()> {
        if !self.schema.has_attribute(name) {
            return Err(RecordError::unknown_attribute(self.schema.table(), name));
        }
        self.attributes.insert(name.to_string(), value);
        Ok(())
    }

    /// The value recorded at last load/save, if any
    pub fn old_attribute(&self, name: &str) -> Option<&Value> {
        self.old_attributes.as_ref().and_then(|old| old.get(name))
    }

    /// The full persisted snapshot; `None` marks the record as new
    pub fn old_attributes(&self) -> Option<&HashMap<String, Value>> {
        self.old_attributes.as_ref()
    }

    /// A record is new iff it has no persisted snapshot. This flag alone
    /// gates whether `save` inserts or updates.
    pub fn is_new_record(&self) -> bool {
        self.old_attributes.is_none()
    }

    /// Toggle the new-record flag: `false` snapshots current into
    /// persisted, `true` clears the snapshot.
    pub fn set_is_new_record(&mut self, is_new: bool) {
        self.old_attributes = if is_new {
            None
        } else {
            Some(self.attributes.clone())
        };
    }

    /// Attributes whose current value differs from the persisted snapshot,
    /// optionally restricted to the given names. Comparison is strict
    /// value equality; no coercion.
    pub fn dirty_attributes(&self, restrict_to: Option<&[&str]>) -> HashMap<String, Value> {
        let allowed = |name: &str| match restrict_to {
            None => true,
            Some(names) => names.contains(&name),
        };
        let mut dirty = HashMap::new();
        match &self.old_attributes {
            None => {
                for (name, value) in &self.attributes {
                    if allowed(name) {
                        dirty.insert(name.clone(), value.clone());
                    }
                }
            }
            Some(old) => {
                for (name, value) in &self.attributes {
                    if allowed(name) && old.get(name) != Some(value) {
                        dirty.insert(name.clone(), value.clone());
                    }
                }
            }
        }
        dirty
    }

    /// Force the next dirty diff to report `name` even if unchanged, by
    /// dropping it from the persisted snapshot. Used to force a no-op
    /// update through to storage.
    pub fn mark_attribute_dirty(&mut self, name: &str) -> RecordResult<()> {
        if !self.schema.has_attribute(name) {
            return Err(RecordError::unknown_attribute(self.schema.table(), name));
        }
        if let Some(old) = &mut self.old_attributes {
            old.remove(name);
        }
        Ok(())
    }

    /// After a successful write: copy each written name's current value
    /// into the persisted snapshot. Other snapshot entries are untouched.
    pub(crate) fn commit_values(&mut self, values: &HashMap<String, Value>) {
        let old = self.old_attributes.get_or_insert_with(HashMap::new);
        for (name, written) in values {
            let current = self
                .attributes
                .get(name)
                .cloned()
                .unwrap_or_else(|| written.clone());
            old.insert(name.clone(), current);
        }
    }
}
