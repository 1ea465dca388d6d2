//! The execution boundary.
//!
//! TinySql never talks to a server itself. A driver implements [`Executor`]
//! and runs the compiled batch text; all operations integrate with
//! asupersync's structured concurrency via the `Cx` context.

use crate::row::ResultSet;
use asupersync::{Cx, Outcome};

/// Runs compiled SQL batches.
///
/// # Example
///
/// ```rust,ignore
/// let sets = executor.query_sets(&cx, &query.sql()).await?;
/// let tree = query.builder().assemble(sets)?;
/// ```
pub trait Executor: Send + Sync {
    /// Execute a batch and return one result set per `SELECT` it produces,
    /// in the order the server returns them.
    fn query_sets(
        &self,
        cx: &Cx,
        sql: &str,
    ) -> impl Future<Output = Outcome<Vec<ResultSet>, crate::Error>> + Send;

    /// Execute a batch that returns no rows and report rows affected.
    fn execute(&self, cx: &Cx, sql: &str) -> impl Future<Output = Outcome<u64, crate::Error>> + Send;

    /// Execute a batch and return only its first result set.
    fn query_first(
        &self,
        cx: &Cx,
        sql: &str,
    ) -> impl Future<Output = Outcome<Option<ResultSet>, crate::Error>> + Send {
        async move {
            match self.query_sets(cx, sql).await {
                Outcome::Ok(sets) => Outcome::Ok(sets.into_iter().next()),
                Outcome::Err(e) => Outcome::Err(e),
                Outcome::Cancelled(r) => Outcome::Cancelled(r),
                Outcome::Panicked(p) => Outcome::Panicked(p),
            }
        }
    }
}
