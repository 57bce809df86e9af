//! Database transactions.
//!
//! A [`Transaction`] holds a dedicated connection until it is committed or
//! rolled back. Dropping it without either rolls back (driver behavior).

use crate::db::executor::{QueryExecutor, rows_to_json};
use crate::db::params::{bind_mysql, bind_postgres, bind_sqlite};
use crate::db::pool::DbPool;
use crate::error::{DbError, DbResult};
use crate::models::{DatabaseType, ExecuteResult, QueryParam, QueryResult, Statement};
use futures_util::{StreamExt, TryStreamExt};
use sqlx::{MySql, Postgres, Sqlite};
use std::time::Instant;
use tracing::debug;

/// Database-specific transaction wrapper.
pub enum DbTransaction {
    MySql(sqlx::Transaction<'static, MySql>),
    Postgres(sqlx::Transaction<'static, Postgres>),
    SQLite(sqlx::Transaction<'static, Sqlite>),
}

impl DbTransaction {
    /// Begin a transaction on a pool.
    pub async fn begin(pool: &DbPool) -> Result<Self, sqlx::Error> {
        Ok(match pool {
            DbPool::MySql(p) => DbTransaction::MySql(p.begin().await?),
            DbPool::Postgres(p) => DbTransaction::Postgres(p.begin().await?),
            DbPool::SQLite(p) => DbTransaction::SQLite(p.begin().await?),
        })
    }

    pub fn db_type(&self) -> DatabaseType {
        match self {
            DbTransaction::MySql(_) => DatabaseType::MySQL,
            DbTransaction::Postgres(_) => DatabaseType::PostgreSQL,
            DbTransaction::SQLite(_) => DatabaseType::SQLite,
        }
    }

    pub async fn commit(self) -> Result<(), sqlx::Error> {
        match self {
            DbTransaction::MySql(tx) => tx.commit().await,
            DbTransaction::Postgres(tx) => tx.commit().await,
            DbTransaction::SQLite(tx) => tx.commit().await,
        }
    }

    pub async fn rollback(self) -> Result<(), sqlx::Error> {
        match self {
            DbTransaction::MySql(tx) => tx.rollback().await,
            DbTransaction::Postgres(tx) => tx.rollback().await,
            DbTransaction::SQLite(tx) => tx.rollback().await,
        }
    }
}

impl std::fmt::Debug for DbTransaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DbTransaction").field(&self.db_type()).finish()
    }
}

/// An open transaction returned by [`DatabaseManager::begin`](crate::DatabaseManager::begin).
#[derive(Debug)]
pub struct Transaction {
    inner: DbTransaction,
    executor: QueryExecutor,
    started_at: Instant,
}

impl Transaction {
    pub(crate) async fn begin(pool: &DbPool, executor: QueryExecutor) -> DbResult<Self> {
        let inner = match executor.bounded(DbTransaction::begin(pool)).await {
            Ok(inner) => inner,
            Err(e) => {
                executor.events().error(&e);
                return Err(e);
            }
        };
        debug!(db_type = %inner.db_type(), "Transaction started");

        Ok(Self {
            inner,
            executor,
            started_at: Instant::now(),
        })
    }

    pub fn db_type(&self) -> DatabaseType {
        self.inner.db_type()
    }

    /// Execute a write statement inside the transaction.
    pub async fn execute(&mut self, sql: &str, params: &[QueryParam]) -> DbResult<ExecuteResult> {
        let start = Instant::now();
        let executor = &self.executor;

        let outcome = match &mut self.inner {
            DbTransaction::MySql(tx) => executor
                .bounded(bind_mysql(sql, params).execute(&mut **tx))
                .await
                .map(|r| r.rows_affected()),
            DbTransaction::Postgres(tx) => executor
                .bounded(bind_postgres(sql, params).execute(&mut **tx))
                .await
                .map(|r| r.rows_affected()),
            DbTransaction::SQLite(tx) => executor
                .bounded(bind_sqlite(sql, params).execute(&mut **tx))
                .await
                .map(|r| r.rows_affected()),
        };

        executor.events().query(sql, params.len(), start.elapsed());
        match outcome {
            Ok(rows_affected) => Ok(ExecuteResult {
                rows_affected,
                execution_time_ms: start.elapsed().as_millis() as u64,
            }),
            Err(e) => {
                executor.events().error(&e);
                Err(e)
            }
        }
    }

    /// Run a [`Statement`] inside the transaction.
    pub async fn execute_statement(&mut self, statement: &Statement) -> DbResult<ExecuteResult> {
        self.execute(&statement.sql, &statement.params).await
    }

    /// Execute a row-returning statement inside the transaction.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[QueryParam],
        limit: Option<u32>,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let executor = &self.executor;
        let row_limit = executor.effective_limit(limit);
        let fetch_limit = row_limit as usize + 1;

        let fetched = match &mut self.inner {
            DbTransaction::MySql(tx) => executor
                .bounded(
                    bind_mysql(sql, params)
                        .fetch(&mut **tx)
                        .take(fetch_limit)
                        .try_collect::<Vec<_>>(),
                )
                .await
                .map(|rows| rows_to_json(&rows, row_limit)),
            DbTransaction::Postgres(tx) => executor
                .bounded(
                    bind_postgres(sql, params)
                        .fetch(&mut **tx)
                        .take(fetch_limit)
                        .try_collect::<Vec<_>>(),
                )
                .await
                .map(|rows| rows_to_json(&rows, row_limit)),
            DbTransaction::SQLite(tx) => executor
                .bounded(
                    bind_sqlite(sql, params)
                        .fetch(&mut **tx)
                        .take(fetch_limit)
                        .try_collect::<Vec<_>>(),
                )
                .await
                .map(|rows| rows_to_json(&rows, row_limit)),
        };

        executor.events().query(sql, params.len(), start.elapsed());
        let result = fetched.map(|(columns, rows, truncated)| QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
            truncated,
        });
        executor.report(result, row_limit)
    }

    pub async fn commit(self) -> DbResult<()> {
        let elapsed = self.started_at.elapsed();
        let events = self.executor.events().clone();
        self.inner.commit().await.map_err(|e| {
            let err = DbError::transaction(format!("Commit failed: {}", e));
            events.error(&err);
            err
        })?;
        events.info(&format!(
            "Transaction committed after {}ms",
            elapsed.as_millis()
        ));
        Ok(())
    }

    pub async fn rollback(self) -> DbResult<()> {
        let events = self.executor.events().clone();
        self.inner.rollback().await.map_err(|e| {
            let err = DbError::transaction(format!("Rollback failed: {}", e));
            events.error(&err);
            err
        })?;
        events.info("Transaction rolled back");
        Ok(())
    }
}
