//! Lazy relation resolution and the per-record cache
//!
//! First access builds a filter from the link map bound to the record's
//! current attribute values and queries through the [`QueryExecutor`];
//! the result is cached, including empty results, until invalidated. Via
//! relations resolve in two steps: pivot rows first, then the targets by
//! set membership.

use crate::error::{RecordError, RecordResult};
use crate::executor::{Filter, RecordContext};
use crate::record::{Record, Related};
use crate::relations::{Multiplicity, Relation, Via};
use serde_json::Value;
use std::collections::HashMap;

impl Record {
    /// Resolve a declared relation, querying storage on first access and
    /// answering from the cache afterwards
    pub async fn relation(&mut self, name: &str, ctx: &RecordContext) -> RecordResult<&Related> {
        if !self.related.contains_key(name) {
            let resolved = self.resolve_relation(name, ctx).await?;
            self.related.insert(name.to_string(), resolved);
        }
        self.related
            .get(name)
            .ok_or_else(|| RecordError::unknown_relation(self.schema.table(), name))
    }

    /// Force-set the cache without querying, e.g. after eager loading
    pub fn populate_relation(&mut self, name: &str, related: Related) -> RecordResult<()> {
        if self.schema.relation(name).is_none() {
            return Err(RecordError::unknown_relation(self.schema.table(), name));
        }
        self.related.insert(name.to_string(), related);
        Ok(())
    }

    /// Drop a cached entry so the next access re-queries
    pub fn invalidate_relation(&mut self, name: &str) {
        self.related.remove(name);
    }

    pub fn invalidate_all_relations(&mut self) {
        self.related.clear();
    }

    /// Whether the relation has been resolved (or populated), even to an
    /// empty result
    pub fn is_relation_populated(&self, name: &str) -> bool {
        self.related.contains_key(name)
    }

    async fn resolve_relation(&self, name: &str, ctx: &RecordContext) -> RecordResult<Related> {
        let relation = self
            .schema
            .relation(name)
            .ok_or_else(|| RecordError::unknown_relation(self.schema.table(), name))?
            .clone();

        let filter = match relation.via() {
            None => self.link_filter(relation.link()),
            Some(via) => {
                let (pivot_table, pivot_link) = self.pivot_side(via)?;
                let pivot_rows = ctx
                    .query()
                    .all(&pivot_table, &self.link_filter(&pivot_link))
                    .await?;
                if pivot_rows.is_empty() {
                    return Ok(empty_result(&relation));
                }
                let mut filter = Filter::new();
                for (target_attr, pivot_attr) in relation.link() {
                    let values: Vec<Value> = pivot_rows
                        .iter()
                        .map(|row| row.get(pivot_attr).cloned().unwrap_or(Value::Null))
                        .collect();
                    filter.insert(target_attr.clone(), Value::Array(values));
                }
                filter
            }
        };

        let related_schema = relation.related().clone();
        match relation.multiplicity() {
            Multiplicity::One => {
                let row = ctx.query().one(related_schema.table(), &filter).await?;
                let record = match row {
                    Some(row) => Some(Record::from_row(related_schema, row)?),
                    None => None,
                };
                Ok(Related::One(record))
            }
            Multiplicity::Many => {
                let rows = ctx.query().all(related_schema.table(), &filter).await?;
                let mut records = Vec::with_capacity(rows.len());
                for row in rows {
                    records.push(Record::from_row(related_schema.clone(), row)?);
                }
                Ok(Related::Many(records))
            }
        }
    }

    /// Bind a link map's value side to this record's current attributes
    pub(crate) fn link_filter(&self, link: &HashMap<String, String>) -> Filter {
        link.iter()
            .map(|(key_attr, value_attr)| {
                (
                    key_attr.clone(),
                    self.attributes
                        .get(value_attr)
                        .cloned()
                        .unwrap_or(Value::Null),
                )
            })
            .collect()
    }

    /// The pivot table and its source-side link map for a via descriptor
    pub(crate) fn pivot_side(&self, via: &Via) -> RecordResult<(String, HashMap<String, String>)> {
        match via {
            Via::Relation(via_name) => {
                let via_relation = self
                    .schema
                    .relation(via_name)
                    .ok_or_else(|| RecordError::unknown_relation(self.schema.table(), via_name))?;
                Ok((
                    via_relation.related().table().to_string(),
                    via_relation.link().clone(),
                ))
            }
            Via::Table { table, link } => Ok((table.clone(), link.clone())),
        }
    }
}

fn empty_result(relation: &Relation) -> Related {
    match relation.multiplicity() {
        Multiplicity::One => Related::One(None),
        Multiplicity::Many => Related::Many(Vec::new()),
    }
}
