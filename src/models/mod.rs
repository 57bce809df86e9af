//! Data models for the bot database client.
//!
//! This module re-exports all model types used throughout the crate.

pub mod connection;
pub mod query;

// Re-export commonly used types
pub use connection::{ConnectionInfo, DatabaseType, mask_connection_string};
pub use query::{
    DEFAULT_ROW_LIMIT, ExecuteResult, MAX_ROW_LIMIT, QueryParam, QueryResult, Statement,
};
