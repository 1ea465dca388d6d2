//! Core types for TinySql.
//!
//! This crate provides the foundations shared by the query model and the
//! facade:
//!
//! - `Value`, `SqlType` and `ColumnType` for literals and declarations
//! - the read-only metadata catalog (`MetadataDatabase`)
//! - `Row`/`ResultSet` as returned by an executor, and the assembled
//!   `RowData`/`ResultTable` tree
//! - `Executor`, the boundary to whatever runs the compiled SQL
//! - `Outcome` and `Cx` re-exported from asupersync

// Re-export asupersync primitives for structured concurrency
pub use asupersync::{Cx, Outcome};

pub mod config;
pub mod error;
pub mod executor;
pub mod metadata;
pub mod record;
pub mod row;
pub mod types;
pub mod value;

pub use config::{Culture, DEFAULT_SCHEMA, DateHandling, SelectListDedup, SqlConfig};
pub use error::{
    ConfigError, Error, ExecutionError, LookupScope, RelationshipError, RelationshipErrorKind,
    Result, StatementKindError, TypeError, UnacceptedChangesError, UnknownColumnError,
    UnknownTableError,
};
pub use executor::Executor;
pub use metadata::{
    ColumnReference, MetadataColumn, MetadataDatabase, MetadataForeignKey, MetadataTable,
};
pub use record::{ResultTable, RowData, column_key};
pub use row::{ColumnInfo, ResultSet, Row};
pub use types::{ColumnType, SqlType};
pub use value::{FromValue, Value};
