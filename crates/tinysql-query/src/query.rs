//! Frozen, compiled statements.

use std::fmt;
use std::sync::Arc;

use crate::builder::Builder;
use tinysql_core::Result;

#[derive(Debug)]
struct QueryInner {
    builder: Builder,
    sql: String,
}

/// A compiled statement together with the model it was compiled from.
///
/// Cloning is cheap; clones share the same text and model. The model is kept
/// so the result assembler can walk the sub-query tree after execution.
#[derive(Debug, Clone)]
pub struct Query {
    inner: Arc<QueryInner>,
}

impl Query {
    pub fn builder(&self) -> &Builder {
        &self.inner.builder
    }

    pub fn sql(&self) -> &str {
        &self.inner.sql
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.inner.sql)
    }
}

impl Builder {
    /// Compile once and freeze the builder.
    pub fn freeze(self) -> Result<Query> {
        let sql = self.compile()?;
        Ok(Query {
            inner: Arc::new(QueryInner { builder: self, sql }),
        })
    }
}
