//! Integration tests for the database manager against a file-backed SQLite database.

use bot_dbms::config::{ClientOptions, ErrorFormat, LogLevel};
use bot_dbms::models::{DatabaseType, QueryParam, Statement};
use bot_dbms::{DatabaseManager, DbError, HostLogger, LOADED_MESSAGE};
use serde_json::json;
use std::sync::Mutex;
use tempfile::NamedTempFile;

#[derive(Default)]
struct StubLogger {
    messages: Mutex<Vec<String>>,
}

impl StubLogger {
    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl HostLogger for StubLogger {
    fn log(&self, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

fn sqlite_options(temp_file: &NamedTempFile) -> ClientOptions {
    let db_path = temp_file.path().to_str().unwrap();
    ClientOptions::new(format!("sqlite:{}?mode=rwc", db_path))
}

async fn manager_with_users(temp_file: &NamedTempFile) -> DatabaseManager {
    let manager = DatabaseManager::new(&StubLogger::default(), sqlite_options(temp_file)).unwrap();
    manager
        .execute(
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL)",
            &[],
        )
        .await
        .unwrap();
    manager
}

#[tokio::test]
async fn test_construction_logs_once() {
    let temp_file = NamedTempFile::new().unwrap();
    let logger = StubLogger::default();

    let manager = DatabaseManager::new(&logger, sqlite_options(&temp_file)).unwrap();

    assert_eq!(logger.messages(), vec![LOADED_MESSAGE.to_string()]);
    assert_eq!(manager.db_type(), DatabaseType::SQLite);
    manager.disconnect().await;
}

#[tokio::test]
async fn test_two_managers_log_independently() {
    let temp_file = NamedTempFile::new().unwrap();
    let first_logger = StubLogger::default();
    let second_logger = StubLogger::default();

    let first = DatabaseManager::new(&first_logger, sqlite_options(&temp_file)).unwrap();
    let second = DatabaseManager::new(&second_logger, sqlite_options(&temp_file)).unwrap();

    assert_eq!(first_logger.messages().len(), 1);
    assert_eq!(second_logger.messages().len(), 1);

    first.disconnect().await;
    assert!(first.is_closed());
    assert!(!second.is_closed());
    second.disconnect().await;
}

#[test]
fn test_missing_datasource_fails_without_logging() {
    let logger = StubLogger::default();
    let options = ClientOptions::default().with_log([LogLevel::Error]);

    let result = DatabaseManager::new(&logger, options);

    assert!(matches!(result, Err(DbError::MissingDatasource)));
    assert!(logger.messages().is_empty());
}

#[tokio::test]
async fn test_connect_caches_server_version() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = DatabaseManager::new(&StubLogger::default(), sqlite_options(&temp_file)).unwrap();

    assert!(manager.server_version().await.is_none());
    let info = manager.connect().await.unwrap();

    assert_eq!(info.database_type, DatabaseType::SQLite);
    assert!(info.server_version.as_deref().unwrap().starts_with('3'));
    assert_eq!(manager.server_version().await, info.server_version);

    manager.disconnect().await;
    assert!(manager.info().await.closed);
}

#[tokio::test]
async fn test_query_and_execute() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = manager_with_users(&temp_file).await;

    let inserted = manager
        .execute(
            "INSERT INTO users (id, name) VALUES (?, ?), (?, ?)",
            &[1.into(), "alice".into(), 2.into(), "bob".into()],
        )
        .await
        .unwrap();
    assert_eq!(inserted.rows_affected, 2);

    let result = manager
        .query(
            "SELECT id, name FROM users WHERE id = ?",
            &[QueryParam::Int(2)],
        )
        .await
        .unwrap();

    assert_eq!(result.columns, vec!["id", "name"]);
    assert_eq!(result.row_count(), 1);
    assert_eq!(result.rows[0].get("name"), Some(&json!("bob")));
    assert_eq!(result.rows[0].get("id"), Some(&json!(2)));
    assert!(!result.truncated);

    manager.disconnect().await;
}

#[tokio::test]
async fn test_query_with_limit_truncates() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = manager_with_users(&temp_file).await;

    for id in 1..=5 {
        manager
            .execute(
                "INSERT INTO users (id, name) VALUES (?, ?)",
                &[QueryParam::Int(id), format!("user{}", id).into()],
            )
            .await
            .unwrap();
    }

    let result = manager
        .query_with_limit("SELECT id FROM users ORDER BY id", &[], 3)
        .await
        .unwrap();
    assert_eq!(result.row_count(), 3);
    assert!(result.truncated);

    let exact = manager
        .query_with_limit("SELECT id FROM users ORDER BY id", &[], 5)
        .await
        .unwrap();
    assert_eq!(exact.row_count(), 5);
    assert!(!exact.truncated);

    manager.disconnect().await;
}

#[tokio::test]
async fn test_failed_statement_returns_database_error() {
    let temp_file = NamedTempFile::new().unwrap();
    let options = sqlite_options(&temp_file).with_error_format(ErrorFormat::Colorless);
    let manager = DatabaseManager::new(&StubLogger::default(), options).unwrap();

    let err = manager
        .query("SELECT * FROM missing_table", &[])
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::Database { .. }));

    let rendered = manager.render_error(&err);
    assert!(rendered.starts_with("error: Database error:"));
    assert!(rendered.contains("missing_table"));
    assert!(!rendered.contains('\x1b'));

    manager.disconnect().await;
}

#[tokio::test]
async fn test_transaction_commit() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = manager_with_users(&temp_file).await;

    let mut tx = manager.begin().await.unwrap();
    tx.execute("INSERT INTO users (id, name) VALUES (?, ?)", &[1.into(), "alice".into()])
        .await
        .unwrap();
    let inside = tx.query("SELECT name FROM users", &[], None).await.unwrap();
    assert_eq!(inside.row_count(), 1);
    tx.commit().await.unwrap();

    let result = manager.query("SELECT name FROM users", &[]).await.unwrap();
    assert_eq!(result.scalar(), Some(&json!("alice")));

    manager.disconnect().await;
}

#[tokio::test]
async fn test_transaction_rollback() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = manager_with_users(&temp_file).await;

    let mut tx = manager.begin().await.unwrap();
    tx.execute("INSERT INTO users (id, name) VALUES (1, 'alice')", &[])
        .await
        .unwrap();
    tx.rollback().await.unwrap();

    let result = manager.query("SELECT id FROM users", &[]).await.unwrap();
    assert!(result.is_empty());

    manager.disconnect().await;
}

#[tokio::test]
async fn test_execute_batch_commits_all() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = manager_with_users(&temp_file).await;

    let statements = vec![
        Statement::new("INSERT INTO users (id, name) VALUES (?, ?)")
            .bind(1)
            .bind("alice"),
        Statement::new("INSERT INTO users (id, name) VALUES (?, ?)")
            .bind(2)
            .bind("bob"),
        Statement::new("UPDATE users SET name = ? WHERE id = ?")
            .bind("robert")
            .bind(2),
    ];

    let results = manager.execute_batch(&statements).await.unwrap();
    assert_eq!(results.len(), 3);
    assert!(results.iter().all(|r| r.rows_affected == 1));

    let names = manager
        .query("SELECT name FROM users ORDER BY id", &[])
        .await
        .unwrap();
    assert_eq!(names.rows[1].get("name"), Some(&json!("robert")));

    manager.disconnect().await;
}

#[tokio::test]
async fn test_execute_batch_rolls_back_on_failure() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = manager_with_users(&temp_file).await;

    let statements = vec![
        Statement::new("INSERT INTO users (id, name) VALUES (1, 'alice')"),
        // Duplicate primary key
        Statement::new("INSERT INTO users (id, name) VALUES (1, 'again')"),
    ];

    let err = manager.execute_batch(&statements).await.unwrap_err();
    assert!(matches!(err, DbError::Database { .. }));

    let result = manager.query("SELECT id FROM users", &[]).await.unwrap();
    assert!(result.is_empty());

    manager.disconnect().await;
}

#[tokio::test]
async fn test_empty_batch_is_noop() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = manager_with_users(&temp_file).await;

    let results = manager.execute_batch(&[]).await.unwrap();
    assert!(results.is_empty());

    manager.disconnect().await;
}

#[tokio::test]
async fn test_queries_fail_after_disconnect() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = manager_with_users(&temp_file).await;

    manager.disconnect().await;

    let err = manager.query("SELECT 1", &[]).await.unwrap_err();
    assert!(matches!(err, DbError::Connection { .. }));
}

#[tokio::test]
async fn test_values_outside_declared_column_type_are_kept() {
    let temp_file = NamedTempFile::new().unwrap();
    let manager = DatabaseManager::new(&StubLogger::default(), sqlite_options(&temp_file)).unwrap();

    manager
        .execute("CREATE TABLE settings (a INTEGER, b BOOLEAN)", &[])
        .await
        .unwrap();
    manager
        .execute(
            "INSERT INTO settings (rowid, a, b) VALUES (1, 'abc', 'yes'), (2, 7, 1), (3, NULL, NULL)",
            &[],
        )
        .await
        .unwrap();

    let result = manager
        .query("SELECT a, b FROM settings ORDER BY rowid", &[])
        .await
        .unwrap();

    assert_eq!(result.rows[0].get("a"), Some(&json!("abc")));
    assert_eq!(result.rows[0].get("b"), Some(&json!("yes")));
    assert_eq!(result.rows[1].get("a"), Some(&json!(7)));
    assert_eq!(result.rows[1].get("b"), Some(&json!(true)));
    assert_eq!(result.rows[2].get("a"), Some(&json!(null)));
    assert_eq!(result.rows[2].get("b"), Some(&json!(null)));

    manager.disconnect().await;
}

#[test]
fn test_zero_query_timeout_is_rejected() {
    let temp_file = NamedTempFile::new().unwrap();
    let logger = StubLogger::default();

    let result = DatabaseManager::new(&logger, sqlite_options(&temp_file).with_query_timeout(0));

    assert!(matches!(result, Err(DbError::Configuration { .. })));
    assert!(logger.messages().is_empty());
}
