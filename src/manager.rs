//! The bot's database manager.
//!
//! [`DatabaseManager`] owns the connection pool built from a [`ClientOptions`]
//! record and exposes the small statement surface the bot uses. Building one
//! reports readiness through the host's [`HostLogger`].

use crate::config::{ClientOptions, Datasource};
use crate::db::events::EventLogger;
use crate::db::executor::QueryExecutor;
use crate::db::pool::DbPool;
use crate::db::transaction::Transaction;
use crate::error::{DbError, DbResult};
use crate::logger::HostLogger;
use crate::models::{
    ConnectionInfo, DatabaseType, ExecuteResult, QueryParam, QueryResult, Statement,
};
use tokio::sync::RwLock;
use tracing::debug;

/// Message passed to the host logger once the client has been built.
pub const LOADED_MESSAGE: &str = "Database client has been loaded";

/// Database client wrapper for the bot.
#[derive(Debug)]
pub struct DatabaseManager {
    pool: DbPool,
    executor: QueryExecutor,
    database: Option<String>,
    server_version: RwLock<Option<String>>,
}

impl DatabaseManager {
    /// Build the client from `options` and log [`LOADED_MESSAGE`] through `host`.
    ///
    /// The datasource URL is read here, once. No connection is opened yet;
    /// the pool connects on first use or on [`connect`](Self::connect). Must
    /// be called inside a Tokio runtime.
    ///
    /// Fails without logging when the URL is missing, has an unsupported
    /// scheme or carries invalid pool options, and when the query timeout
    /// is zero.
    pub fn new(host: &dyn HostLogger, options: ClientOptions) -> DbResult<Self> {
        let url = options
            .datasource_url
            .as_deref()
            .ok_or(DbError::MissingDatasource)?;
        let datasource = Datasource::parse(url)?;

        let db_type = DatabaseType::from_connection_string(&datasource.connection_string)
            .ok_or_else(|| {
                let scheme = datasource
                    .connection_string
                    .split(':')
                    .next()
                    .unwrap_or_default();
                DbError::configuration(format!("Unsupported datasource scheme '{}'", scheme))
            })?;

        if options.query_timeout().is_zero() {
            return Err(DbError::configuration(
                "query timeout must be greater than 0",
            ));
        }

        let pool = DbPool::connect_lazy(db_type, &datasource)?;
        let executor = QueryExecutor::new(
            options.query_timeout(),
            EventLogger::new(options.log, options.error_format),
        );

        debug!(
            db_type = %db_type,
            database = ?datasource.database,
            error_format = %executor.events().error_format(),
            "Database client configured"
        );
        host.log(LOADED_MESSAGE);

        Ok(Self {
            pool,
            executor,
            database: datasource.database,
            server_version: RwLock::new(None),
        })
    }

    /// Open a connection now and cache the server version.
    pub async fn connect(&self) -> DbResult<ConnectionInfo> {
        let events = self.executor.events();
        let version = match self.pool.server_version().await {
            Ok(version) => version,
            Err(e) => {
                events.warn(&format!("Could not read {} server version", self.db_type()));
                events.error(&e);
                return Err(e);
            }
        };

        *self.server_version.write().await = Some(version.clone());
        events.info(&format!("Connected to {} {}", self.db_type(), version));
        Ok(self.info().await)
    }

    /// Close the pool. Calling it again is a no-op.
    pub async fn disconnect(&self) {
        if self.pool.is_closed() {
            return;
        }
        self.pool.close().await;
        self.executor
            .events()
            .info(&format!("Disconnected from {}", self.db_type()));
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    pub fn db_type(&self) -> DatabaseType {
        self.pool.db_type()
    }

    /// Server version cached by the last successful [`connect`](Self::connect).
    pub async fn server_version(&self) -> Option<String> {
        self.server_version.read().await.clone()
    }

    pub async fn info(&self) -> ConnectionInfo {
        ConnectionInfo {
            database_type: self.db_type(),
            database: self.database.clone(),
            server_version: self.server_version().await,
            closed: self.is_closed(),
        }
    }

    /// Underlying pool, for callers that need the driver directly.
    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run a row-returning statement with the default row limit.
    pub async fn query(&self, sql: &str, params: &[QueryParam]) -> DbResult<QueryResult> {
        self.executor.query(&self.pool, sql, params, None).await
    }

    pub async fn query_with_limit(
        &self,
        sql: &str,
        params: &[QueryParam],
        limit: u32,
    ) -> DbResult<QueryResult> {
        self.executor
            .query(&self.pool, sql, params, Some(limit))
            .await
    }

    /// Run a write statement (INSERT, UPDATE, DELETE, DDL).
    pub async fn execute(&self, sql: &str, params: &[QueryParam]) -> DbResult<ExecuteResult> {
        self.executor.execute(&self.pool, sql, params).await
    }

    /// Start a transaction on a dedicated connection.
    pub async fn begin(&self) -> DbResult<Transaction> {
        Transaction::begin(&self.pool, self.executor.clone()).await
    }

    /// Run `statements` in one transaction.
    ///
    /// Commits when every statement succeeds. Otherwise the transaction is
    /// rolled back and the first error is returned.
    pub async fn execute_batch(&self, statements: &[Statement]) -> DbResult<Vec<ExecuteResult>> {
        if statements.is_empty() {
            return Ok(Vec::new());
        }

        let mut tx = self.begin().await?;
        let mut results = Vec::with_capacity(statements.len());

        for (index, statement) in statements.iter().enumerate() {
            match tx.execute_statement(statement).await {
                Ok(result) => results.push(result),
                Err(e) => {
                    debug!(index, "Batch statement failed, rolling back");
                    // The statement error is what the caller needs
                    let _ = tx.rollback().await;
                    return Err(e);
                }
            }
        }

        tx.commit().await?;
        Ok(results)
    }

    /// Format an error with the configured error format.
    pub fn render_error(&self, err: &DbError) -> String {
        err.render(self.executor.events().error_format())
    }
}
