//! Schema - declared per-entity-type metadata
//!
//! A [`Schema`] carries everything the engine is allowed to know statically
//! about one entity type: the storage table, the declared attribute names,
//! the primary key, an optional optimistic-lock attribute, relation
//! descriptors, and lifecycle observers. Schemas validate at build time and
//! are immutable afterwards, shared behind an `Arc`.

use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Arc;

use crate::error::{RecordError, RecordResult};
use crate::events::RecordObserver;
use crate::relations::Relation;

/// Declared metadata for one entity type
pub struct Schema {
    table: String,
    attributes: Vec<String>,
    primary_key: Vec<String>,
    optimistic_lock: Option<String>,
    relations: HashMap<String, Relation>,
    observers: Vec<Arc<dyn RecordObserver>>,
}

impl Schema {
    /// Start declaring a schema for the given storage table
    pub fn builder(table: &str) -> SchemaBuilder {
        SchemaBuilder {
            table: table.to_string(),
            attributes: Vec::new(),
            primary_key: Vec::new(),
            optimistic_lock: None,
            relations: Vec::new(),
            observers: Vec::new(),
        }
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Declared attribute names, in declaration order
    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.iter().any(|a| a == name)
    }

    /// Declared primary-key attribute names, in declaration order
    pub fn primary_key(&self) -> &[String] {
        &self.primary_key
    }

    /// The nominated version-token attribute, if optimistic locking is on
    pub fn optimistic_lock(&self) -> Option<&str> {
        self.optimistic_lock.as_deref()
    }

    pub fn relation(&self, name: &str) -> Option<&Relation> {
        self.relations.get(name)
    }

    pub fn relation_names(&self) -> Vec<&str> {
        self.relations.keys().map(String::as_str).collect()
    }

    pub(crate) fn observers(&self) -> Vec<Arc<dyn RecordObserver>> {
        self.observers.clone()
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema")
            .field("table", &self.table)
            .field("attributes", &self.attributes)
            .field("primary_key", &self.primary_key)
            .field("optimistic_lock", &self.optimistic_lock)
            .field("relations", &self.relations.keys().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}

/// Builder for [`Schema`], validated by [`SchemaBuilder::build`]
pub struct SchemaBuilder {
    table: String,
    attributes: Vec<String>,
    primary_key: Vec<String>,
    optimistic_lock: Option<String>,
    relations: Vec<(String, Relation)>,
    observers: Vec<Arc<dyn RecordObserver>>,
}

impl SchemaBuilder {
    /// Declare the attribute names mapped to storage columns
    pub fn with_attributes(mut self, names: &[&str]) -> Self {
        self.attributes = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Declare the primary-key attribute names, in order
    pub fn with_primary_key(mut self, names: &[&str]) -> Self {
        self.primary_key = names.iter().map(|n| n.to_string()).collect();
        self
    }

    /// Nominate an attribute as the optimistic-lock version token
    pub fn with_optimistic_lock(mut self, name: &str) -> Self {
        self.optimistic_lock = Some(name.to_string());
        self
    }

    /// Declare a named relation. Name and descriptor are registered
    /// together; there is no runtime name recovery.
    pub fn declare_relation(mut self, name: &str, relation: Relation) -> Self {
        self.relations.push((name.to_string(), relation));
        self
    }

    /// Register a lifecycle observer; observers fire in registration order
    pub fn observe(mut self, observer: Arc<dyn RecordObserver>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Validate the declaration and produce an immutable schema
    pub fn build(self) -> RecordResult<Arc<Schema>> {
        if self.table.is_empty() {
            return Err(RecordError::schema("table name cannot be empty"));
        }
        if self.attributes.is_empty() {
            return Err(RecordError::schema(&format!(
                "table '{}' declares no attributes",
                self.table
            )));
        }

        let mut seen = HashSet::new();
        for name in &self.attributes {
            if !seen.insert(name.as_str()) {
                return Err(RecordError::schema(&format!(
                    "duplicate attribute '{}' on table '{}'",
                    name, self.table
                )));
            }
        }

        for name in &self.primary_key {
            if !self.attributes.contains(name) {
                return Err(RecordError::schema(&format!(
                    "primary key attribute '{}' is not declared on table '{}'",
                    name, self.table
                )));
            }
        }

        if let Some(lock) = &self.optimistic_lock {
            if !self.attributes.contains(lock) {
                return Err(RecordError::schema(&format!(
                    "optimistic lock attribute '{}' is not declared on table '{}'",
                    lock, self.table
                )));
            }
        }

        let mut relations = HashMap::new();
        for (name, relation) in self.relations {
            if self.attributes.contains(&name) {
                return Err(RecordError::schema(&format!(
                    "relation '{}' collides with a declared attribute on table '{}'",
                    name, self.table
                )));
            }
            if relations.insert(name.clone(), relation).is_some() {
                return Err(RecordError::schema(&format!(
                    "relation '{}' is declared twice on table '{}'",
                    name, self.table
                )));
            }
        }

        // A via reference must point at a declared, via-free relation.
        for (name, relation) in &relations {
            if let Some(crate::relations::Via::Relation(via_name)) = relation.via() {
                match relations.get(via_name) {
                    None => {
                        return Err(RecordError::schema(&format!(
                            "relation '{}' on table '{}' goes via undeclared relation '{}'",
                            name, self.table, via_name
                        )));
                    }
                    Some(via_relation) if via_relation.via().is_some() => {
                        return Err(RecordError::schema(&format!(
                            "relation '{}' on table '{}' goes via '{}', which is itself a via relation",
                            name, self.table, via_name
                        )));
                    }
                    Some(_) => {}
                }
            }
        }

        Ok(Arc::new(Schema {
            table: self.table,
            attributes: self.attributes,
            primary_key: self.primary_key,
            optimistic_lock: self.optimistic_lock,
            relations,
            observers: self.observers,
        }))
    }
}
