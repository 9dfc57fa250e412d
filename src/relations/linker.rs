//! Relation linking - establishing and destroying associations
//!
//! Direct links copy key values onto whichever side holds the foreign key
//! and save that side without validation. Pivot links insert or delete the
//! join row, through the mapped join entity's own insert path when one is
//! declared. Either way the resolved relation cache is kept coherent as a
//! side effect.

use std::collections::HashMap;

use serde_json::Value;
use tracing::debug;

use crate::error::{RecordError, RecordResult};
use crate::executor::{Filter, RecordContext};
use crate::record::{Record, Related};
use crate::relations::{Multiplicity, Relation, Via};

impl Record {
    /// Establish the named association between this record and `target`.
    ///
    /// For a pivot relation both records must already be persisted and
    /// `extra_pivot_values` lands in the join row. For a direct relation
    /// exactly one side must hold the primary key the link map references;
    /// the other side receives the key values and is saved unvalidated.
    pub async fn link(
        &mut self,
        name: &str,
        target: &mut Record,
        extra_pivot_values: &[(&str, Value)],
        ctx: &RecordContext,
    ) -> RecordResult<()> {
        let relation = self
            .schema
            .relation(name)
            .cloned()
            .ok_or_else(|| RecordError::unknown_relation(self.schema.table(), name))?;

        debug!(
            table = self.schema.table(),
            relation = name,
            "linking records"
        );

        match relation.via() {
            Some(via) => {
                if self.is_new_record() || target.is_new_record() {
                    return Err(RecordError::invalid_link(
                        "records linked through a pivot must both be persisted",
                    ));
                }
                let (pivot_table, pivot_link) = self.pivot_side(via)?;
                let mut columns: HashMap<String, Value> = HashMap::new();
                for (pivot_attr, source_attr) in &pivot_link {
                    columns.insert(pivot_attr.clone(), self.attribute_or_null(source_attr));
                }
                for (target_attr, pivot_attr) in relation.link() {
                    columns.insert(pivot_attr.clone(), target.attribute_or_null(target_attr));
                }
                for (column, value) in extra_pivot_values {
                    columns.insert(column.to_string(), value.clone());
                }

                match via {
                    Via::Relation(via_name) => {
                        // cached join entities are stale after the insert
                        self.related.remove(via_name);
                        let join_schema = self
                            .schema
                            .relation(via_name)
                            .map(|r| r.related().clone())
                            .ok_or_else(|| {
                                RecordError::unknown_relation(self.schema.table(), via_name)
                            })?;
                        let mut pivot = Record::new(join_schema);
                        for (column, value) in &columns {
                            pivot.set(column, value.clone())?;
                        }
                        if !pivot.insert(ctx, false, None).await?.is_saved() {
                            return Err(RecordError::invalid_link(
                                "a lifecycle hook rejected the pivot row",
                            ));
                        }
                    }
                    Via::Table { .. } => {
                        ctx.command().insert(&pivot_table, &columns).await?;
                    }
                }
            }
            None => {
                let link = relation.link();
                let target_side: Vec<&str> = link.keys().map(String::as_str).collect();
                let source_side: Vec<&str> = link.values().map(String::as_str).collect();
                let target_holds_key = target.is_primary_key(&target_side);
                let self_holds_key = self.is_primary_key(&source_side);

                let flipped: Vec<(String, String)> = link
                    .iter()
                    .map(|(target_attr, source_attr)| (source_attr.clone(), target_attr.clone()))
                    .collect();
                let straight: Vec<(String, String)> = link
                    .iter()
                    .map(|(target_attr, source_attr)| (target_attr.clone(), source_attr.clone()))
                    .collect();

                if target_holds_key && self_holds_key {
                    // self-referential link: prefer the direction that does
                    // not copy from a record with no identity yet
                    if self.is_new_record() && target.is_new_record() {
                        return Err(RecordError::invalid_link(
                            "at most one of the records being linked can be new",
                        ));
                    } else if self.is_new_record() {
                        bind_records(&flipped, self, target, ctx).await?;
                    } else {
                        bind_records(&straight, target, self, ctx).await?;
                    }
                } else if target_holds_key {
                    bind_records(&flipped, self, target, ctx).await?;
                } else if self_holds_key {
                    bind_records(&straight, target, self, ctx).await?;
                } else {
                    return Err(RecordError::invalid_link(
                        "the link defining the relation does not involve a primary key",
                    ));
                }
            }
        }

        self.apply_link_to_cache(name, &relation, target);
        Ok(())
    }

    /// Destroy the named association between this record and `target`.
    ///
    /// For a pivot relation the matching join row is deleted; a join row
    /// with nulled key columns would be dangling data, so the `delete`
    /// flag does not change the pivot behavior. For a direct relation the
    /// foreign-key side has its key attributes nulled and is then deleted
    /// or saved unvalidated per the flag.
    pub async fn unlink(
        &mut self,
        name: &str,
        target: &mut Record,
        delete: bool,
        ctx: &RecordContext,
    ) -> RecordResult<()> {
        let relation = self
            .schema
            .relation(name)
            .cloned()
            .ok_or_else(|| RecordError::unknown_relation(self.schema.table(), name))?;

        debug!(
            table = self.schema.table(),
            relation = name,
            "unlinking records"
        );

        match relation.via() {
            Some(via) => {
                if let Via::Relation(via_name) = via {
                    self.related.remove(via_name);
                }
                let (pivot_table, pivot_link) = self.pivot_side(via)?;
                let mut columns = Filter::new();
                for (pivot_attr, source_attr) in &pivot_link {
                    columns.insert(pivot_attr.clone(), self.attribute_or_null(source_attr));
                }
                for (target_attr, pivot_attr) in relation.link() {
                    columns.insert(pivot_attr.clone(), target.attribute_or_null(target_attr));
                }
                ctx.command().delete(&pivot_table, &columns).await?;
            }
            None => {
                let link = relation.link();
                let target_side: Vec<&str> = link.keys().map(String::as_str).collect();
                let source_side: Vec<&str> = link.values().map(String::as_str).collect();

                // the key-holder branch comes first, so "both sides
                // qualify" and "only the foreign-key side qualifies" are
                // the same branch
                if self.is_primary_key(&source_side) {
                    for target_attr in link.keys() {
                        target.set(target_attr, Value::Null)?;
                    }
                    if delete {
                        target.delete(ctx).await?;
                    } else {
                        let _ = target.save(ctx, false, None).await?;
                    }
                } else if target.is_primary_key(&target_side) {
                    for source_attr in link.values() {
                        self.set(source_attr, Value::Null)?;
                    }
                    if delete {
                        self.delete(ctx).await?;
                    } else {
                        let _ = self.save(ctx, false, None).await?;
                    }
                } else {
                    return Err(RecordError::invalid_link(
                        "the link defining the relation does not involve a primary key",
                    ));
                }
            }
        }

        self.remove_link_from_cache(name, &relation, target);
        Ok(())
    }

    fn attribute_or_null(&self, name: &str) -> Value {
        self.attributes.get(name).cloned().unwrap_or(Value::Null)
    }

    /// Incremental cache maintenance after a successful link. An
    /// unresolved to-many cache stays untouched; it will be correct on the
    /// next resolve.
    fn apply_link_to_cache(&mut self, name: &str, relation: &Relation, target: &Record) {
        match relation.multiplicity() {
            Multiplicity::One => {
                self.related
                    .insert(name.to_string(), Related::One(Some(target.clone())));
            }
            Multiplicity::Many => {
                if let Some(Related::Many(records)) = self.related.get_mut(name) {
                    if let Some(index_attr) = relation.index_by() {
                        let key = target.attributes.get(index_attr).cloned();
                        match records
                            .iter()
                            .position(|r| r.attributes.get(index_attr).cloned() == key)
                        {
                            Some(position) => records[position] = target.clone(),
                            None => records.push(target.clone()),
                        }
                    } else {
                        records.push(target.clone());
                    }
                }
            }
        }
    }

    /// Cache maintenance after unlink: drop the to-one entry, or for a
    /// resolved to-many drop the elements whose primary key equals the
    /// target's. Comparison is by key value, not object identity.
    fn remove_link_from_cache(&mut self, name: &str, relation: &Relation, target: &Record) {
        match relation.multiplicity() {
            Multiplicity::One => {
                self.related.remove(name);
            }
            Multiplicity::Many => {
                if let Some(target_key) = target.primary_key_values() {
                    if let Some(Related::Many(records)) = self.related.get_mut(name) {
                        records.retain(|record| {
                            record
                                .primary_key_values()
                                .map_or(true, |key| key != target_key)
                        });
                    }
                }
            }
        }
    }
}

async fn bind_records(
    pairs: &[(String, String)],
    foreign: &mut Record,
    owner: &Record,
    ctx: &RecordContext,
) -> RecordResult<()> {
    for (foreign_attr, owner_attr) in pairs {
        let value = owner
            .attributes
            .get(owner_attr)
            .cloned()
            .unwrap_or(Value::Null);
        if value.is_null() {
            return Err(RecordError::invalid_link(&format!(
                "the primary key of '{}' is null",
                owner.table()
            )));
        }
        foreign.set(foreign_attr, value)?;
    }
    let _ = foreign.save(ctx, false, None).await?;
    Ok(())
}
