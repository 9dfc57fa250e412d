//! Relation descriptors - declared association metadata
//!
//! A [`Relation`] defines a has-one or has-many association between two
//! entity types through a link map of foreign/primary key correspondences,
//! optionally mediated by a join table or a mapped join entity.

use std::collections::HashMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::schema::Schema;

/// Whether a relation resolves to a single record or a sequence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Multiplicity {
    One,
    Many,
}

/// How a pivot-mediated relation reaches its join rows
#[derive(Debug, Clone)]
pub enum Via {
    /// Through another declared relation whose target is the mapped join
    /// entity; that relation's link map keys the pivot to this side.
    Relation(String),
    /// Through an unmapped join table, with an explicit pivot-to-source
    /// link map.
    Table {
        table: String,
        link: HashMap<String, String>,
    },
}

/// Declared association between two entity types.
///
/// The link map is keyed by target attribute and valued by source
/// attribute. For via relations the "target attribute" side keys the
/// related entity and the value side names the pivot column carrying it.
#[derive(Debug, Clone)]
pub struct Relation {
    related: Arc<Schema>,
    link: HashMap<String, String>,
    multiplicity: Multiplicity,
    via: Option<Via>,
    index_by: Option<String>,
}

impl Relation {
    /// Declare a to-one association. `link` pairs are
    /// `(target_attribute, source_attribute)`.
    pub fn has_one(related: Arc<Schema>, link: &[(&str, &str)]) -> Self {
        Self::new(related, link, Multiplicity::One)
    }

    /// Declare a to-many association. `link` pairs are
    /// `(target_attribute, source_attribute)`.
    pub fn has_many(related: Arc<Schema>, link: &[(&str, &str)]) -> Self {
        Self::new(related, link, Multiplicity::Many)
    }

    fn new(related: Arc<Schema>, link: &[(&str, &str)], multiplicity: Multiplicity) -> Self {
        Self {
            related,
            link: link
                .iter()
                .map(|(target, source)| (target.to_string(), source.to_string()))
                .collect(),
            multiplicity,
            via: None,
            index_by: None,
        }
    }

    /// Route the association through another declared relation (a mapped
    /// join entity). The link map of this relation then names pivot
    /// columns on its value side.
    pub fn via_relation(mut self, name: &str) -> Self {
        self.via = Some(Via::Relation(name.to_string()));
        self
    }

    /// Route the association through an unmapped join table. `link` pairs
    /// are `(pivot_column, source_attribute)`.
    pub fn via_table(mut self, table: &str, link: &[(&str, &str)]) -> Self {
        self.via = Some(Via::Table {
            table: table.to_string(),
            link: link
                .iter()
                .map(|(pivot, source)| (pivot.to_string(), source.to_string()))
                .collect(),
        });
        self
    }

    /// Key a resolved to-many cache by this target attribute; link() then
    /// upserts instead of appending.
    pub fn with_index_by(mut self, attribute: &str) -> Self {
        self.index_by = Some(attribute.to_string());
        self
    }

    pub fn related(&self) -> &Arc<Schema> {
        &self.related
    }

    pub fn link(&self) -> &HashMap<String, String> {
        &self.link
    }

    pub fn multiplicity(&self) -> Multiplicity {
        self.multiplicity
    }

    pub fn is_multiple(&self) -> bool {
        self.multiplicity == Multiplicity::Many
    }

    pub fn via(&self) -> Option<&Via> {
        self.via.as_ref()
    }

    pub fn index_by(&self) -> Option<&str> {
        self.index_by.as_deref()
    }
}
