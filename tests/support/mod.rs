//! Test support: an in-memory table store implementing the executor
//! collaborators, plus canned validators and a recording observer.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;

use rowlink::{
    CommandExecutor, Filter, LifecycleGate, QueryExecutor, Record, RecordContext, RecordObserver,
    RecordResult, Row, Validator,
};

/// Shorthand for building a row literal
pub fn row(pairs: &[(&str, Value)]) -> Row {
    pairs
        .iter()
        .map(|(name, value)| (name.to_string(), value.clone()))
        .collect()
}

#[derive(Default)]
struct DbState {
    tables: HashMap<String, Vec<Row>>,
    auto_keys: HashMap<String, (String, i64)>,
    ops: Vec<String>,
}

/// In-memory tables with equality/IN filtering and optional
/// auto-incrementing key columns. Every storage call is logged so tests
/// can assert which operations ran.
#[derive(Default)]
pub struct MemoryDb {
    state: Mutex<DbState>,
}

impl MemoryDb {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Generate sequential integer values for `column` on insert into
    /// `table` whenever the inserted values omit it or carry null
    pub fn auto_key(&self, table: &str, column: &str) {
        self.state
            .lock()
            .unwrap()
            .auto_keys
            .insert(table.to_string(), (column.to_string(), 1));
    }

    pub fn seed(&self, table: &str, rows: Vec<Row>) {
        self.state
            .lock()
            .unwrap()
            .tables
            .entry(table.to_string())
            .or_default()
            .extend(rows);
    }

    pub fn rows(&self, table: &str) -> Vec<Row> {
        self.state
            .lock()
            .unwrap()
            .tables
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn ops(&self) -> Vec<String> {
        self.state.lock().unwrap().ops.clone()
    }

    pub fn context(self: &Arc<Self>) -> RecordContext {
        RecordContext::new(self.clone(), self.clone())
    }
}

fn matches(row: &Row, filter: &Filter) -> bool {
    filter.iter().all(|(name, expected)| {
        let actual = row.get(name).unwrap_or(&Value::Null);
        match expected {
            Value::Array(candidates) => candidates.contains(actual),
            other => actual == other,
        }
    })
}

#[async_trait]
impl QueryExecutor for MemoryDb {
    async fn one(&self, table: &str, filter: &Filter) -> RecordResult<Option<Row>> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("one {}", table));
        Ok(state
            .tables
            .get(table)
            .and_then(|rows| rows.iter().find(|row| matches(row, filter)).cloned()))
    }

    async fn all(&self, table: &str, filter: &Filter) -> RecordResult<Vec<Row>> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("all {}", table));
        Ok(state
            .tables
            .get(table)
            .map(|rows| {
                rows.iter()
                    .filter(|row| matches(row, filter))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }
}

#[async_trait]
impl CommandExecutor for MemoryDb {
    async fn insert(&self, table: &str, values: &Row) -> RecordResult<Row> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("insert {}", table));

        let mut row = values.clone();
        let mut generated = Row::new();
        if let Some((column, next)) = state.auto_keys.get_mut(table) {
            let missing = matches!(row.get(column.as_str()), None | Some(Value::Null));
            if missing {
                let value = Value::from(*next);
                *next += 1;
                row.insert(column.clone(), value.clone());
                generated.insert(column.clone(), value);
            }
        }
        state
            .tables
            .entry(table.to_string())
            .or_default()
            .push(row);
        Ok(generated)
    }

    async fn update(&self, table: &str, values: &Row, condition: &Filter) -> RecordResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("update {}", table));

        let mut affected = 0;
        if let Some(rows) = state.tables.get_mut(table) {
            for row in rows.iter_mut() {
                if matches(row, condition) {
                    for (name, value) in values {
                        row.insert(name.clone(), value.clone());
                    }
                    affected += 1;
                }
            }
        }
        Ok(affected)
    }

    async fn delete(&self, table: &str, condition: &Filter) -> RecordResult<u64> {
        let mut state = self.state.lock().unwrap();
        state.ops.push(format!("delete {}", table));

        let mut removed = 0;
        if let Some(rows) = state.tables.get_mut(table) {
            let before = rows.len();
            rows.retain(|row| !matches(row, condition));
            removed = (before - rows.len()) as u64;
        }
        Ok(removed)
    }
}

/// Validator that always rejects, with the failure list callers can query
#[derive(Default)]
pub struct RejectingValidator {
    pub failures: Mutex<Vec<String>>,
}

#[async_trait]
impl Validator for RejectingValidator {
    async fn validate(&self, record: &mut Record, _scope: Option<&[&str]>) -> RecordResult<bool> {
        self.failures
            .lock()
            .unwrap()
            .push(format!("rejected save into '{}'", record.table()));
        Ok(false)
    }
}

/// Observer that records every lifecycle point it sees and optionally
/// vetoes one of the guarded phases
#[derive(Default)]
pub struct RecordingObserver {
    pub events: Mutex<Vec<String>>,
    pub veto_insert: bool,
    pub veto_update: bool,
    pub veto_delete: bool,
}

impl RecordingObserver {
    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    fn log(&self, event: &str) {
        self.events.lock().unwrap().push(event.to_string());
    }
}

impl RecordObserver for RecordingObserver {
    fn init(&self, _record: &mut Record) {
        self.log("init");
    }

    fn after_find(&self, _record: &mut Record) {
        self.log("after_find");
    }

    fn before_insert(&self, _record: &mut Record, gate: &mut LifecycleGate) {
        self.log("before_insert");
        if self.veto_insert {
            gate.veto();
        }
    }

    fn after_insert(&self, _record: &mut Record) {
        self.log("after_insert");
    }

    fn before_update(&self, _record: &mut Record, gate: &mut LifecycleGate) {
        self.log("before_update");
        if self.veto_update {
            gate.veto();
        }
    }

    fn after_update(&self, _record: &mut Record) {
        self.log("after_update");
    }

    fn before_delete(&self, _record: &mut Record, gate: &mut LifecycleGate) {
        self.log("before_delete");
        if self.veto_delete {
            gate.veto();
        }
    }

    fn after_delete(&self, _record: &mut Record) {
        self.log("after_delete");
    }
}
