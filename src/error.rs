//! Error types for the record lifecycle engine
//!
//! Every failure surfaced by the engine is a `RecordError`. Storage failures
//! reported by the executor collaborators travel through unmodified as
//! `Database`; the engine adds no retry layer on top of them.

use std::fmt;

/// Result type alias for record operations
pub type RecordResult<T> = Result<T, RecordError>;

/// Error types for record lifecycle and relation operations
#[derive(Debug, Clone, PartialEq)]
pub enum RecordError {
    /// Attribute get/set on a name the schema does not declare
    UnknownAttribute { table: String, name: String },
    /// Relation resolve/link/unlink on a name the schema does not declare
    UnknownRelation { table: String, name: String },
    /// Optimistic-lock compare-and-swap matched zero rows on update/delete
    StaleRecord { table: String },
    /// Link/unlink precondition violated
    InvalidLink(String),
    /// Declaration-time schema misconfiguration
    Schema(String),
    /// Storage-call failure reported by an executor collaborator
    Database(String),
}

impl RecordError {
    pub fn unknown_attribute(table: &str, name: &str) -> Self {
        Self::UnknownAttribute {
            table: table.to_string(),
            name: name.to_string(),
        }
    }

    pub fn unknown_relation(table: &str, name: &str) -> Self {
        Self::UnknownRelation {
            table: table.to_string(),
            name: name.to_string(),
        }
    }

    pub fn stale(table: &str) -> Self {
        Self::StaleRecord {
            table: table.to_string(),
        }
    }

    pub fn invalid_link(message: &str) -> Self {
        Self::InvalidLink(message.to_string())
    }

    pub fn schema(message: &str) -> Self {
        Self::Schema(message.to_string())
    }

    pub fn database(message: &str) -> Self {
        Self::Database(message.to_string())
    }
}

impl fmt::Display for RecordError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordError::UnknownAttribute { table, name } => {
                write!(f, "Unknown attribute '{}' on table '{}'", name, table)
            }
            RecordError::UnknownRelation { table, name } => {
                write!(f, "Unknown relation '{}' on table '{}'", name, table)
            }
            RecordError::StaleRecord { table } => {
                write!(f, "Stale record in table '{}': the row was changed by another writer", table)
            }
            RecordError::InvalidLink(msg) => write!(f, "Invalid link: {}", msg),
            RecordError::Schema(msg) => write!(f, "Schema error: {}", msg),
            RecordError::Database(msg) => write!(f, "Database error: {}", msg),
        }
    }
}

impl std::error::Error for RecordError {}
