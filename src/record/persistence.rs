//! Persistence lifecycle - guarded insert/update/delete phases
//!
//! Each guarded phase runs before-hook, mutate, write, commit, after-hook
//! in that order. Validation failure and hook veto reject the save without
//! touching storage; the optimistic-lock compare-and-swap is the only
//! cross-writer conflict detection the engine performs.

use std::collections::HashMap;

use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{RecordError, RecordResult};
use crate::executor::RecordContext;
use crate::record::Record;

/// Outcome of a guarded save phase. `Rejected` covers both validation
/// failure and hook veto; storage failures surface as errors instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved { rows: u64 },
    Rejected,
}

impl SaveOutcome {
    pub fn is_saved(&self) -> bool {
        matches!(self, SaveOutcome::Saved { .. })
    }

    /// Affected row count, zero when rejected. A saved zero is a benign
    /// no-op update, distinct from rejection.
    pub fn rows(&self) -> u64 {
        match self {
            SaveOutcome::Saved { rows } => *rows,
            SaveOutcome::Rejected => 0,
        }
    }
}

impl Record {
    /// Insert or update depending solely on the new-record flag
    pub async fn save(
        &mut self,
        ctx: &RecordContext,
        validate: bool,
        scope: Option<&[&str]>,
    ) -> RecordResult<SaveOutcome> {
        if self.is_new_record() {
            self.insert(ctx, validate, scope).await
        } else {
            self.update(ctx, validate, scope).await
        }
    }

    /// Insert the current attribute values, restricted to `scope` when
    /// given. Server-generated values are merged back into the record, and
    /// the written set becomes the persisted snapshot, flipping the record
    /// from new to not-new.
    pub async fn insert(
        &mut self,
        ctx: &RecordContext,
        validate: bool,
        scope: Option<&[&str]>,
    ) -> RecordResult<SaveOutcome> {
        if validate && !ctx.validate(self, scope).await? {
            return Ok(SaveOutcome::Rejected);
        }
        if !self.fire_before_insert() {
            return Ok(SaveOutcome::Rejected);
        }

        let values: HashMap<String, Value> = match scope {
            None => self.attributes.clone(),
            Some(names) => names
                .iter()
                .filter_map(|name| {
                    self.attributes
                        .get(*name)
                        .map(|value| (name.to_string(), value.clone()))
                })
                .collect(),
        };

        debug!(table = self.schema.table(), "inserting record");
        let generated = ctx.command().insert(self.schema.table(), &values).await?;

        // the row exists from here on; snapshot the written values before
        // inspecting the generated columns so a malformed executor reply
        // cannot leave the record marked new
        self.old_attributes = Some(values);
        for (name, value) in generated {
            if !self.schema.has_attribute(&name) {
                return Err(RecordError::unknown_attribute(self.schema.table(), &name));
            }
            self.attributes.insert(name.clone(), value.clone());
            if let Some(snapshot) = self.old_attributes.as_mut() {
                snapshot.insert(name, value);
            }
        }

        self.fire_after_insert();
        Ok(SaveOutcome::Saved { rows: 1 })
    }

    /// Write the dirty attributes (restricted to `scope` when given) under
    /// the persisted-key condition. An empty dirty set skips the storage
    /// call entirely and reports zero rows. With an optimistic lock
    /// configured, zero affected rows is a [`RecordError::StaleRecord`].
    pub async fn update(
        &mut self,
        ctx: &RecordContext,
        validate: bool,
        scope: Option<&[&str]>,
    ) -> RecordResult<SaveOutcome> {
        if validate && !ctx.validate(self, scope).await? {
            return Ok(SaveOutcome::Rejected);
        }
        if !self.fire_before_update() {
            return Ok(SaveOutcome::Rejected);
        }

        let mut values = self.dirty_attributes(scope);
        if values.is_empty() {
            self.fire_after_update();
            return Ok(SaveOutcome::Saved { rows: 0 });
        }

        let mut condition = self.old_primary_key_map()?;
        let lock = self.schema.optimistic_lock().map(str::to_string);
        let mut advanced_lock = None;
        if let Some(lock) = &lock {
            let current = self.attributes.get(lock).cloned().unwrap_or(Value::Null);
            if !values.contains_key(lock) {
                values.insert(lock.clone(), next_lock_value(&current));
            }
            advanced_lock = values.get(lock).cloned();
            // compare-and-swap on the pre-increment value
            condition.insert(lock.clone(), current);
        }

        debug!(table = self.schema.table(), "updating record");
        let rows = ctx
            .command()
            .update(self.schema.table(), &values, &condition)
            .await?;
        if lock.is_some() && rows == 0 {
            warn!(table = self.schema.table(), "optimistic lock conflict");
            return Err(RecordError::stale(self.schema.table()));
        }

        if let (Some(lock), Some(value)) = (&lock, advanced_lock) {
            self.attributes.insert(lock.clone(), value);
        }
        self.commit_values(&values);
        self.fire_after_update();
        Ok(SaveOutcome::Saved { rows })
    }

    /// Delete the persisted row. Returns `None` when vetoed by a
    /// before-delete hook, otherwise the affected count, which without a
    /// lock may legitimately be zero. The record becomes new again; the
    /// in-memory attributes survive.
    pub async fn delete(&mut self, ctx: &RecordContext) -> RecordResult<Option<u64>> {
        if !self.fire_before_delete() {
            return Ok(None);
        }

        let mut condition = self.old_primary_key_map()?;
        let lock = self.schema.optimistic_lock().map(str::to_string);
        if let Some(lock) = &lock {
            let current = self.attributes.get(lock).cloned().unwrap_or(Value::Null);
            condition.insert(lock.clone(), current);
        }

        debug!(table = self.schema.table(), "deleting record");
        let rows = ctx.command().delete(self.schema.table(), &condition).await?;
        if lock.is_some() && rows == 0 {
            warn!(table = self.schema.table(), "optimistic lock conflict");
            return Err(RecordError::stale(self.schema.table()));
        }

        self.old_attributes = None;
        self.fire_after_delete();
        Ok(Some(rows))
    }

    /// Reload the record from storage by its current primary key. Returns
    /// whether the row still exists; on success both snapshots are reset
    /// and the relation cache is cleared.
    pub async fn refresh(&mut self, ctx: &RecordContext) -> RecordResult<bool> {
        let key = self.primary_key_map()?;
        let row = match ctx.query().one(self.schema.table(), &key).await? {
            Some(row) => row,
            None => return Ok(false),
        };
        for name in row.keys() {
            if !self.schema.has_attribute(name) {
                return Err(RecordError::unknown_attribute(self.schema.table(), name));
            }
        }
        self.attributes = row.clone();
        self.old_attributes = Some(row);
        self.related.clear();
        Ok(true)
    }

    /// Set and write the named attributes directly, skipping validation
    /// and lifecycle hooks. A new record is left untouched and reports
    /// zero rows. Changed values are committed on success.
    pub async fn update_attributes(
        &mut self,
        ctx: &RecordContext,
        values: &[(&str, Value)],
    ) -> RecordResult<u64> {
        let mut names = Vec::with_capacity(values.len());
        for (name, value) in values {
            self.set(name, value.clone())?;
            names.push(*name);
        }

        let dirty = self.dirty_attributes(Some(&names));
        if dirty.is_empty() || self.is_new_record() {
            return Ok(0);
        }

        let condition = self.old_primary_key_map()?;
        debug!(table = self.schema.table(), "updating attributes directly");
        let rows = ctx
            .command()
            .update(self.schema.table(), &dirty, &condition)
            .await?;
        self.commit_values(&dirty);
        Ok(rows)
    }
}

fn next_lock_value(current: &Value) -> Value {
    Value::from(current.as_i64().unwrap_or(0) + 1)
}
