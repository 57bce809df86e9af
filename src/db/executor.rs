//! Statement execution.
//!
//! Runs queries and writes against a [`DbPool`] with:
//! - Parameterized statements
//! - Row limits (enforced via streaming - only fetches needed rows)
//! - Per-statement timeouts
//! - Query / warn / error events according to the client log settings

use crate::db::events::EventLogger;
use crate::db::params::{bind_mysql, bind_postgres, bind_sqlite};
use crate::db::pool::DbPool;
use crate::db::types::RowToJson;
use crate::error::{DbError, DbResult};
use crate::models::{DEFAULT_ROW_LIMIT, ExecuteResult, MAX_ROW_LIMIT, QueryParam, QueryResult};
use futures_util::{Stream, StreamExt};
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::debug;

/// Executes statements and reports them through the client's event logger.
#[derive(Debug, Clone)]
pub struct QueryExecutor {
    default_timeout: Duration,
    default_limit: u32,
    events: EventLogger,
}

impl QueryExecutor {
    pub fn new(default_timeout: Duration, events: EventLogger) -> Self {
        Self {
            default_timeout,
            default_limit: DEFAULT_ROW_LIMIT,
            events,
        }
    }

    pub fn events(&self) -> &EventLogger {
        &self.events
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }

    /// Clamp a requested limit to [1, MAX_ROW_LIMIT]; `limit=0` would mark
    /// every non-empty result as truncated.
    pub fn effective_limit(&self, limit: Option<u32>) -> u32 {
        limit
            .map(|l| l.clamp(1, MAX_ROW_LIMIT))
            .unwrap_or(self.default_limit)
    }

    /// Execute a row-returning statement.
    pub async fn query(
        &self,
        pool: &DbPool,
        sql: &str,
        params: &[QueryParam],
        limit: Option<u32>,
    ) -> DbResult<QueryResult> {
        let start = Instant::now();
        let row_limit = self.effective_limit(limit);

        debug!(sql = %sql, params = params.len(), limit = row_limit, "Executing query");

        let fetched = match pool {
            DbPool::MySql(p) => {
                let stream = if params.is_empty() {
                    use sqlx::Executor;
                    p.fetch(sql)
                } else {
                    bind_mysql(sql, params).fetch(p)
                };
                self.collect(stream, row_limit).await
            }
            DbPool::Postgres(p) => {
                let stream = if params.is_empty() {
                    use sqlx::Executor;
                    p.fetch(sql)
                } else {
                    bind_postgres(sql, params).fetch(p)
                };
                self.collect(stream, row_limit).await
            }
            DbPool::SQLite(p) => {
                let stream = if params.is_empty() {
                    use sqlx::Executor;
                    p.fetch(sql)
                } else {
                    bind_sqlite(sql, params).fetch(p)
                };
                self.collect(stream, row_limit).await
            }
        };

        self.events.query(sql, params.len(), start.elapsed());
        let result = fetched.map(|(columns, rows, truncated)| QueryResult {
            columns,
            rows,
            execution_time_ms: start.elapsed().as_millis() as u64,
            truncated,
        });
        self.report(result, row_limit)
    }

    /// Execute a write statement (INSERT, UPDATE, DELETE, DDL).
    pub async fn execute(
        &self,
        pool: &DbPool,
        sql: &str,
        params: &[QueryParam],
    ) -> DbResult<ExecuteResult> {
        let start = Instant::now();

        debug!(sql = %sql, params = params.len(), "Executing write");

        // Without params, run the raw SQL: some statements reject prepared mode
        let outcome = match pool {
            DbPool::MySql(p) => {
                if params.is_empty() {
                    use sqlx::Executor;
                    self.bounded(p.execute(sql)).await.map(|r| r.rows_affected())
                } else {
                    self.bounded(bind_mysql(sql, params).execute(p))
                        .await
                        .map(|r| r.rows_affected())
                }
            }
            DbPool::Postgres(p) => {
                if params.is_empty() {
                    use sqlx::Executor;
                    self.bounded(p.execute(sql)).await.map(|r| r.rows_affected())
                } else {
                    self.bounded(bind_postgres(sql, params).execute(p))
                        .await
                        .map(|r| r.rows_affected())
                }
            }
            DbPool::SQLite(p) => {
                if params.is_empty() {
                    use sqlx::Executor;
                    self.bounded(p.execute(sql)).await.map(|r| r.rows_affected())
                } else {
                    self.bounded(bind_sqlite(sql, params).execute(p))
                        .await
                        .map(|r| r.rows_affected())
                }
            }
        };

        self.events.query(sql, params.len(), start.elapsed());
        match outcome {
            Ok(rows_affected) => Ok(ExecuteResult {
                rows_affected,
                execution_time_ms: start.elapsed().as_millis() as u64,
            }),
            Err(e) => {
                self.events.error(&e);
                Err(e)
            }
        }
    }

    /// Log the outcome of a query: truncation as warn, failure as error.
    pub(crate) fn report(&self, result: DbResult<QueryResult>, row_limit: u32) -> DbResult<QueryResult> {
        match &result {
            Ok(r) if r.truncated => {
                self.events
                    .warn(&format!("Query result truncated to {} rows", row_limit));
            }
            Ok(_) => {}
            Err(e) => {
                self.events.error(e);
            }
        }
        result
    }

    /// Await a driver future under the default statement timeout.
    pub(crate) async fn bounded<T, F>(&self, fut: F) -> DbResult<T>
    where
        F: std::future::Future<Output = Result<T, sqlx::Error>>,
    {
        match timeout(self.default_timeout, fut).await {
            Ok(result) => result.map_err(DbError::from),
            Err(_) => Err(DbError::timeout(
                "statement execution",
                self.default_timeout.as_secs() as u32,
            )),
        }
    }

    /// Take up to `row_limit + 1` rows so truncation can be detected.
    async fn collect<R, S>(
        &self,
        stream: S,
        row_limit: u32,
    ) -> DbResult<(Vec<String>, Vec<serde_json::Map<String, serde_json::Value>>, bool)>
    where
        R: RowToJson,
        S: Stream<Item = Result<R, sqlx::Error>>,
    {
        let fetch_limit = row_limit as usize + 1;
        let results = match timeout(
            self.default_timeout,
            stream.take(fetch_limit).collect::<Vec<_>>(),
        )
        .await
        {
            Ok(results) => results,
            Err(_) => {
                return Err(DbError::timeout(
                    "query execution",
                    self.default_timeout.as_secs() as u32,
                ));
            }
        };

        let rows = results
            .into_iter()
            .collect::<Result<Vec<R>, sqlx::Error>>()?;
        Ok(rows_to_json(&rows, row_limit))
    }
}

/// Convert fetched rows, dropping the sentinel row used for truncation.
pub(crate) fn rows_to_json<R: RowToJson>(
    rows: &[R],
    row_limit: u32,
) -> (Vec<String>, Vec<serde_json::Map<String, serde_json::Value>>, bool) {
    let Some(first) = rows.first() else {
        return (Vec::new(), Vec::new(), false);
    };
    let truncated = rows.len() > row_limit as usize;
    let json_rows = rows
        .iter()
        .take(row_limit as usize)
        .map(RowToJson::to_json_map)
        .collect();
    (first.column_names(), json_rows, truncated)
}
