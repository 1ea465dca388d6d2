//! Query model and T-SQL compiler for TinySql Rust.
//!
//! `tinysql-query` is the **query construction layer**. A [`Builder`] owns an
//! arena of tables, fields, condition groups and joins for one statement (plus
//! its nested sub-queries) and compiles it into T-SQL text that is identical
//! for identical models.
//!
//! # Role In The Architecture
//!
//! - **Query model**: SELECT, INSERT, UPDATE, DELETE, stored procedure calls
//!   and IF/ELSE IF/ELSE blocks, with ids into the builder's arenas.
//! - **Compiler**: [`Builder::compile`] renders the model, hoisting parameter
//!   declarations to the top of the batch.
//! - **Join resolver**: [`Builder::join_column`], [`Builder::join_table`] and
//!   [`Builder::auto_join`] derive joins from catalog foreign keys.
//! - **Result assembler**: [`Builder::assemble`] folds the flat result sets of
//!   a batch back into a tree of [`ResultTable`](tinysql_core::ResultTable)s.
//! - **Frozen queries**: [`Query`] and [`QueryCache`] share compiled text.
//!
//! Execution lives behind the `Executor` trait from `tinysql-core`; most users
//! reach these types through the `tinysql` facade crate.
//!
//! # Example
//!
//! ```
//! use tinysql_query::{Builder, Operator};
//!
//! let mut b = Builder::select();
//! let account = b.add_table("Account", None, None);
//! b.add_columns(account, &["AccountID", "Name"]);
//! b.where_("Account", "AccountID", Operator::Equal, 526).unwrap();
//!
//! let sql = b.compile().unwrap();
//! assert!(sql.contains("WHERE (t0.[AccountID] = 526)"));
//! ```

pub mod assemble;
pub mod builder;
pub mod cache;
pub mod clause;
pub mod compile;
pub mod condition;
pub mod field;
pub mod join;
pub mod literal;
pub mod query;
pub mod resolve;
pub mod row_query;
pub mod statement;
pub mod subquery;
pub mod table;

pub use builder::{Builder, StatementKind, SubQueryLink};
pub use cache::{CachedQuery, QueryCache};
pub use clause::{OrderBy, OrderDirection};
pub use condition::{ConditionGroup, FieldCondition, GroupId, GroupKind, Link, Operand, Operator};
pub use field::{Field, FieldId, FieldKind};
pub use join::{Join, JoinId, JoinType};
pub use literal::{SORTABLE_DATE, literal, render_value};
pub use query::Query;
pub use row_query::UpdateOptions;
pub use statement::{Branch, Conditional, OutputClause, ProcedureCall};
pub use subquery::SubSelect;
pub use table::{Table, TableId, TableKind};
