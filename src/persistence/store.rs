//! Page store: runs catalog statements on the shared connection pool.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use sqlx::any::AnyRow;
use sqlx::{Any, AnyPool, Row};

use super::models::{Page, RawPageId};
use super::queries::{QueryCatalog, QueryName};
use crate::error::QueryError;

/// Executes externalized page statements against an [`AnyPool`].
///
/// Every statement acquires its own pooled connection, which is released
/// when the statement method returns, whatever the outcome. Statements are
/// bounded by the query timeout; connection acquisition is bounded by the
/// pool's acquire timeout.
#[derive(Debug, Clone)]
pub struct PageStore {
    pool: AnyPool,
    catalog: Arc<QueryCatalog>,
    query_timeout: Duration,
}

impl PageStore {
    /// Creates a store over the given pool and catalog.
    #[must_use]
    pub fn new(pool: AnyPool, catalog: Arc<QueryCatalog>, query_timeout: Duration) -> Self {
        Self {
            pool,
            catalog,
            query_timeout,
        }
    }

    /// Returns the underlying connection pool.
    #[must_use]
    pub const fn pool(&self) -> &AnyPool {
        &self.pool
    }

    /// Returns the query catalog.
    #[must_use]
    pub fn catalog(&self) -> &QueryCatalog {
        &self.catalog
    }

    /// Runs the idempotent create-table statement.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] on database failure or timeout.
    pub async fn ensure_table(&self) -> Result<(), QueryError> {
        self.execute(QueryName::CreateTable, &[]).await?;
        Ok(())
    }

    /// Returns the title of every stored page, in storage order.
    ///
    /// Rows with a NULL title are skipped.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] on database failure or timeout.
    pub async fn all_titles(&self) -> Result<Vec<String>, QueryError> {
        let rows = self.fetch_all(QueryName::ListPages, &[]).await?;
        let mut titles = Vec::with_capacity(rows.len());
        for row in &rows {
            if let Some(title) = row.try_get::<Option<String>, _>(0)? {
                titles.push(title);
            }
        }
        Ok(titles)
    }

    /// Looks up a page by title. Only the first matching row is used.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] on database failure or timeout.
    pub async fn find_by_title(&self, title: &str) -> Result<Option<Page>, QueryError> {
        let rows = self.fetch_all(QueryName::GetPage, &[title]).await?;
        let Some(row) = rows.first() else {
            return Ok(None);
        };
        Ok(Some(Page {
            id: row.try_get::<i64, _>(0)?,
            content: row.try_get::<Option<String>, _>(1)?,
        }))
    }

    /// Inserts a new page.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] on database failure (for example a
    /// duplicate title) or timeout.
    pub async fn create(&self, title: &str, markdown: &str) -> Result<(), QueryError> {
        self.execute(QueryName::CreatePage, &[title, markdown])
            .await?;
        Ok(())
    }

    /// Replaces the content of the page with the given id.
    ///
    /// Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] on database failure or timeout.
    pub async fn save(&self, id: &RawPageId, markdown: &str) -> Result<u64, QueryError> {
        self.execute(QueryName::SavePage, &[markdown, id.as_str()])
            .await
    }

    /// Deletes the page with the given id.
    ///
    /// Returns the number of rows affected.
    ///
    /// # Errors
    ///
    /// Returns a [`QueryError`] on database failure or timeout.
    pub async fn delete(&self, id: &RawPageId) -> Result<u64, QueryError> {
        self.execute(QueryName::DeletePage, &[id.as_str()]).await
    }

    /// Closes the pool, waiting for checked-out connections to return.
    pub async fn close(&self) {
        self.pool.close().await;
    }

    async fn fetch_all(&self, name: QueryName, params: &[&str]) -> Result<Vec<AnyRow>, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let mut query = sqlx::query::<Any>(self.catalog.lookup(name));
        for param in params {
            query = query.bind((*param).to_owned());
        }
        self.bounded(query.fetch_all(&mut *conn)).await
    }

    async fn execute(&self, name: QueryName, params: &[&str]) -> Result<u64, QueryError> {
        let mut conn = self.pool.acquire().await?;
        let mut query = sqlx::query::<Any>(self.catalog.lookup(name));
        for param in params {
            query = query.bind((*param).to_owned());
        }
        let result = self.bounded(query.execute(&mut *conn)).await?;
        Ok(result.rows_affected())
    }

    /// Applies the query timeout to a statement future.
    async fn bounded<T, F>(&self, statement: F) -> Result<T, QueryError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, statement).await {
            Ok(result) => result.map_err(QueryError::from),
            Err(_) => Err(QueryError::Timeout(self.query_timeout.as_millis())),
        }
    }
}
