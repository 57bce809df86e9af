//! Database abstraction layer.
//!
//! This module provides database access functionality:
//! - Connection pool construction
//! - Statement execution and transactions
//! - Type mappings
//! - Client log events

pub mod events;
pub mod executor;
pub mod params;
pub mod pool;
pub mod transaction;
pub mod types;

pub use events::EventLogger;
pub use executor::QueryExecutor;
pub use pool::DbPool;
pub use transaction::{DbTransaction, Transaction};
