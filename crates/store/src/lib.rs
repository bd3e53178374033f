//! Read-only database access for integrity checks over an indexer snapshot.

mod diesel_queries;
pub mod models;
mod query;
mod table;

use diesel_async::pooled_connection::deadpool::{Object, Pool};
use diesel_async::pooled_connection::AsyncDieselConnectionManager;
use diesel_async::scoped_futures::ScopedFutureExt;
use diesel_async::AsyncPgConnection;
pub use query::{SqlParam, SqlQuery};
pub use table::QueryTable;
use tracing::{debug, info};

/// Default upper bound on pooled connections.
pub const DEFAULT_POOL_SIZE: usize = 8;

/// An abstraction over all database operations. It uses [`Arc`] internally, so
/// it's cheaply cloneable.
///
/// [`Arc`]: std::sync::Arc
#[derive(Clone)]
pub struct Store {
    pool: Pool<AsyncPgConnection>,
}

impl Store {
    /// Connects to the database and makes sure it's reachable.
    pub async fn new(db_url: &str) -> anyhow::Result<Self> {
        Self::with_pool_size(db_url, DEFAULT_POOL_SIZE).await
    }

    pub async fn with_pool_size(db_url: &str, pool_size: usize) -> anyhow::Result<Self> {
        info!(pool_size, "Initializing database connection pool");
        let manager = AsyncDieselConnectionManager::<AsyncPgConnection>::new(db_url);
        let pool = Pool::builder(manager).max_size(pool_size).build()?;
        let store = Self { pool };

        let version = diesel_queries::server_version(&mut *store.conn().await?).await?;
        info!(server_version = %version, "Connected to the database");
        Ok(store)
    }

    async fn conn(&self) -> anyhow::Result<Object<AsyncPgConnection>> {
        Ok(self.pool.get().await?)
    }

    /// Runs the given query inside a read-only transaction and returns its
    /// result set.
    pub async fn query_table(&self, query: &SqlQuery) -> anyhow::Result<QueryTable> {
        debug!(sql = %query, "Running query");

        let query = query.clone();
        self.conn()
            .await?
            .build_transaction()
            .read_only()
            .run(|conn| {
                async move { diesel_queries::query_table(conn, &query).await }.scope_boxed()
            })
            .await
    }

    /// Whether a table with the given name exists in the current schema.
    pub async fn table_exists(&self, name: &str) -> anyhow::Result<bool> {
        diesel_queries::table_exists(&mut *self.conn().await?, name).await
    }

    /// Runs a raw statement outside of a read-only transaction. Only meant for
    /// setting up fixtures in tests.
    #[cfg(feature = "tests")]
    pub async fn execute_unchecked(&self, sql: &str) -> anyhow::Result<()> {
        use diesel_async::SimpleAsyncConnection;

        self.conn().await?.batch_execute(sql).await?;
        Ok(())
    }
}
