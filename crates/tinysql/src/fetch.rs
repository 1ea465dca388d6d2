//! Compile, execute and assemble in one call.
//!
//! These are the only async entry points. They hand the compiled batch to an
//! [`Executor`] under the caller's `Cx` and fold the returned result sets into
//! a [`ResultTable`]. Cancellation is whatever the executor reports.

use tinysql_core::{Cx, Error, Executor, Outcome, ResultTable};
use tinysql_query::{Builder, Query};

/// Run the batch text `sql` compiled from `builder` and assemble its results.
async fn run<E: Executor>(
    cx: &Cx,
    executor: &E,
    sql: &str,
    builder: &Builder,
    hierarchy_field: Option<&str>,
) -> Outcome<ResultTable, Error> {
    tracing::trace!(sql = %sql, "executing batch");
    let sets = match executor.query_sets(cx, sql).await {
        Outcome::Ok(sets) => sets,
        Outcome::Err(e) => {
            tracing::debug!(error = %e, "batch failed");
            return Outcome::Err(e);
        }
        Outcome::Cancelled(r) => return Outcome::Cancelled(r),
        Outcome::Panicked(p) => return Outcome::Panicked(p),
    };
    tracing::debug!(sets = sets.len(), "batch returned");

    match builder.assemble_with(sets, hierarchy_field) {
        Ok(table) => Outcome::Ok(table),
        Err(e) => Outcome::Err(e),
    }
}

/// Compile `builder`, execute it and assemble the row tree.
#[tracing::instrument(level = "debug", skip(cx, executor, builder), fields(kind = builder.kind().as_str()))]
pub async fn fetch<E: Executor>(cx: &Cx, executor: &E, builder: &Builder) -> Outcome<ResultTable, Error> {
    fetch_ordered(cx, executor, builder, None).await
}

/// Like [`fetch`], ordering child rows by `hierarchy_field` instead of their
/// primary key.
pub async fn fetch_ordered<E: Executor>(
    cx: &Cx,
    executor: &E,
    builder: &Builder,
    hierarchy_field: Option<&str>,
) -> Outcome<ResultTable, Error> {
    let sql = match builder.compile() {
        Ok(sql) => sql,
        Err(e) => return Outcome::Err(e),
    };
    run(cx, executor, &sql, builder, hierarchy_field).await
}

/// Execute a frozen query and assemble the row tree.
#[tracing::instrument(level = "debug", skip(cx, executor, query))]
pub async fn fetch_query<E: Executor>(cx: &Cx, executor: &E, query: &Query) -> Outcome<ResultTable, Error> {
    run(cx, executor, query.sql(), query.builder(), None).await
}

/// Compile `builder` and execute it for its row count.
#[tracing::instrument(level = "debug", skip(cx, executor, builder), fields(kind = builder.kind().as_str()))]
pub async fn execute<E: Executor>(cx: &Cx, executor: &E, builder: &Builder) -> Outcome<u64, Error> {
    let sql = match builder.compile() {
        Ok(sql) => sql,
        Err(e) => return Outcome::Err(e),
    };
    tracing::trace!(sql = %sql, "executing batch");
    executor.execute(cx, &sql).await
}
