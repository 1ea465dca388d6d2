//! Sessions over an executor.
//!
//! A Session bundles an [`Executor`] with the catalog and configuration new
//! builders should carry, plus a [`QueryCache`] of frozen statements.
//!
//! # Example
//!
//! ```rust,ignore
//! use tinysql::prelude::*;
//!
//! let mut session = Session::builder()
//!     .with_metadata(catalog)
//!     .cache_size(64)
//!     .build_with(executor);
//!
//! let mut b = session.select();
//! let account = b.add_table("Account", None, None);
//! b.all_columns(account, false)?;
//! let accounts = session.fetch(&cx, &b).await;
//! ```

use std::sync::Arc;

use tinysql_core::{Cx, Error, Executor, MetadataDatabase, Outcome, Result, ResultTable, SqlConfig};
use tinysql_query::{Builder, Query, QueryCache};

use crate::fetch;

/// An executor together with the catalog, configuration and query cache
/// shared by the statements run through it.
#[derive(Debug)]
pub struct Session<E: Executor> {
    /// The underlying executor
    executor: E,
    metadata: Option<Arc<MetadataDatabase>>,
    config: SqlConfig,
    cache: QueryCache,
}

impl<E: Executor> Session<E> {
    /// Create a session with default configuration and no catalog.
    pub fn new(executor: E) -> Self {
        Self {
            executor,
            metadata: None,
            config: SqlConfig::default(),
            cache: QueryCache::default(),
        }
    }

    /// Create a session builder.
    #[must_use]
    pub fn builder() -> SessionBuilder {
        SessionBuilder::new()
    }

    pub fn executor(&self) -> &E {
        &self.executor
    }

    /// Consume the session and return the underlying executor.
    pub fn into_executor(self) -> E {
        self.executor
    }

    pub fn metadata(&self) -> Option<&Arc<MetadataDatabase>> {
        self.metadata.as_ref()
    }

    pub fn config(&self) -> &SqlConfig {
        &self.config
    }

    pub fn cache(&self) -> &QueryCache {
        &self.cache
    }

    pub fn cache_mut(&mut self) -> &mut QueryCache {
        &mut self.cache
    }

    /// Attach the session's catalog and configuration to a builder.
    pub fn prepare(&self, builder: Builder) -> Builder {
        let builder = builder.with_config(self.config.clone());
        match &self.metadata {
            Some(metadata) => builder.with_metadata(Arc::clone(metadata)),
            None => builder,
        }
    }

    pub fn select(&self) -> Builder {
        self.prepare(Builder::select())
    }

    pub fn insert(&self) -> Builder {
        self.prepare(Builder::insert())
    }

    pub fn update(&self) -> Builder {
        self.prepare(Builder::update())
    }

    pub fn delete(&self) -> Builder {
        self.prepare(Builder::delete())
    }

    /// Compile, execute and assemble `builder`.
    pub async fn fetch(&self, cx: &Cx, builder: &Builder) -> Outcome<ResultTable, Error> {
        fetch::fetch(cx, &self.executor, builder).await
    }

    /// Execute a frozen query.
    pub async fn fetch_query(&self, cx: &Cx, query: &Query) -> Outcome<ResultTable, Error> {
        fetch::fetch_query(cx, &self.executor, query).await
    }

    /// Execute the query cached under `name`, building and freezing it with
    /// `build` on first use.
    ///
    /// `build` receives this session so it can start from a prepared builder.
    pub async fn fetch_cached(
        &mut self,
        cx: &Cx,
        name: &str,
        build: impl FnOnce(&Self) -> Result<Builder>,
    ) -> Outcome<ResultTable, Error> {
        let query = match self.cache.get(name) {
            Some(query) => query,
            None => {
                let query = match build(self).and_then(Builder::freeze) {
                    Ok(query) => query,
                    Err(e) => return Outcome::Err(e),
                };
                tracing::debug!(name, "caching query");
                self.cache.add(name, query)
            }
        };
        self.fetch_query(cx, &query).await
    }

    /// Compile and execute `builder` for its row count.
    pub async fn execute(&self, cx: &Cx, builder: &Builder) -> Outcome<u64, Error> {
        fetch::execute(cx, &self.executor, builder).await
    }
}

/// Builder for creating Session instances with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// let session = Session::builder()
///     .with_config(SqlConfig::new().date_handling(DateHandling::ToString))
///     .build_with(executor);
/// ```
#[derive(Debug, Default)]
pub struct SessionBuilder {
    metadata: Option<Arc<MetadataDatabase>>,
    config: SqlConfig,
    cache_size: Option<usize>,
}

impl SessionBuilder {
    /// Create a new session builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Catalog attached to every builder the session prepares.
    #[must_use]
    pub fn with_metadata(mut self, metadata: Arc<MetadataDatabase>) -> Self {
        self.metadata = Some(metadata);
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: SqlConfig) -> Self {
        self.config = config;
        self
    }

    /// Maximum number of cached queries.
    #[must_use]
    pub fn cache_size(mut self, size: usize) -> Self {
        self.cache_size = Some(size);
        self
    }

    /// Build the session with the provided executor.
    pub fn build_with<E: Executor>(self, executor: E) -> Session<E> {
        Session {
            executor,
            metadata: self.metadata,
            config: self.config,
            cache: self.cache_size.map_or_else(QueryCache::default, QueryCache::new),
        }
    }
}

#[cfg(test)]
#[allow(clippy::manual_async_fn)] // Mock trait impls must match trait signatures
mod tests {
    use super::*;
    use tinysql_core::{DateHandling, ResultSet};

    #[derive(Debug)]
    struct NoopExecutor;

    impl Executor for NoopExecutor {
        fn query_sets(
            &self,
            _cx: &Cx,
            _sql: &str,
        ) -> impl std::future::Future<Output = Outcome<Vec<ResultSet>, Error>> + Send {
            async { Outcome::Ok(vec![]) }
        }

        fn execute(&self, _cx: &Cx, _sql: &str) -> impl std::future::Future<Output = Outcome<u64, Error>> + Send {
            async { Outcome::Ok(0) }
        }
    }

    #[test]
    fn test_session_builder_defaults() {
        let session = Session::<NoopExecutor>::builder().build_with(NoopExecutor);
        assert!(session.metadata().is_none());
        assert!(session.cache().is_empty());
        assert_eq!(session.config().default_schema, "dbo");
    }

    #[test]
    fn test_prepared_builders_carry_configuration() {
        let catalog = Arc::new(MetadataDatabase::new("crm"));
        let session = Session::<NoopExecutor>::builder()
            .with_metadata(Arc::clone(&catalog))
            .with_config(SqlConfig::new().date_handling(DateHandling::ToString))
            .build_with(NoopExecutor);

        let b = session.select();
        assert!(b.metadata().is_some());
        assert_eq!(b.config().date_handling, DateHandling::ToString);
        assert_eq!(session.update().kind(), tinysql_query::StatementKind::Update);
    }

    #[test]
    fn test_into_executor() {
        let session = Session::new(NoopExecutor);
        let _executor: NoopExecutor = session.into_executor();
    }
}
