//! TinySql Rust - metadata-driven T-SQL statements with hierarchical results.
//!
//! TinySql builds SQL Server statements from a query model instead of string
//! concatenation, and folds the flat result sets of a batch back into a tree
//! of rows:
//!
//! - A statement model with tables, fields, condition groups and joins
//! - A deterministic T-SQL compiler
//! - Joins derived from foreign keys in a metadata catalog
//! - Correlated sub-selects assembled into nested row tables
//! - Change-tracked rows that generate their own UPDATE statements
//!
//! # Quick Start
//!
//! ```ignore
//! use tinysql::prelude::*;
//!
//! async fn accounts(cx: &Cx, executor: &impl Executor, catalog: Arc<MetadataDatabase>) {
//!     let mut b = Builder::select().with_metadata(catalog);
//!     let account = b.add_table("Account", None, None);
//!     b.add_columns(account, &["AccountID", "Name"]);
//!     b.auto_join(account, "OwningUserID").unwrap();
//!     b.sub_select_related(account, "Contact").unwrap();
//!
//!     let tree = match fetch(cx, executor, &b).await {
//!         Outcome::Ok(tree) => tree,
//!         other => panic!("fetch failed: {other:?}"),
//!     };
//!     for row in &tree {
//!         let contacts = row.child("ContactList");
//!     }
//! }
//! ```
//!
//! # Features
//!
//! - **Deterministic output**: the same model always compiles to the same text
//! - **Structured concurrency**: execution runs on asupersync under a `Cx`
//! - **No I/O in the core**: drivers plug in through the `Executor` trait

// Re-export all public types from sub-crates
pub use tinysql_core::{
    // asupersync re-exports
    Cx,
    Outcome,
    // Core types
    ColumnReference,
    ColumnType,
    Culture,
    DEFAULT_SCHEMA,
    DateHandling,
    Error,
    Executor,
    LookupScope,
    MetadataColumn,
    MetadataDatabase,
    MetadataForeignKey,
    MetadataTable,
    RelationshipErrorKind,
    Result,
    ResultSet,
    ResultTable,
    Row,
    RowData,
    SelectListDedup,
    SqlConfig,
    SqlType,
    Value,
    column_key,
};

pub use tinysql_query::{
    Builder, JoinId, JoinType, Link, Operator, OrderDirection, Query, QueryCache, StatementKind,
    SubSelect, TableId, UpdateOptions,
};

pub mod fetch;
pub use fetch::{execute, fetch, fetch_ordered, fetch_query};

// Session management
pub mod session;
pub use session::{Session, SessionBuilder};

/// Prelude module for convenient imports.
///
/// ```ignore
/// use tinysql::prelude::*;
/// ```
pub mod prelude {
    pub use crate::{
        // Statement building
        Builder,
        // Catalog
        ColumnType,
        // asupersync
        Cx,
        DateHandling,
        Error,
        Executor,
        JoinType,
        Link,
        MetadataColumn,
        MetadataDatabase,
        MetadataForeignKey,
        MetadataTable,
        Operator,
        OrderDirection,
        Outcome,
        Query,
        QueryCache,
        Result,
        ResultSet,
        ResultTable,
        RowData,
        // Sessions
        Session,
        SqlConfig,
        SqlType,
        SubSelect,
        UpdateOptions,
        Value,
        execute,
        fetch,
        fetch_query,
    };
    pub use std::sync::Arc;
}
