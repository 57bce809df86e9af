//! Host logging collaborator.
//!
//! The bot owns its log facility; the database client only needs to push
//! plain messages into it.

use tracing::info;

/// Message sink supplied by the owning application.
pub trait HostLogger {
    fn log(&self, message: &str);
}

impl<T: HostLogger + ?Sized> HostLogger for &T {
    fn log(&self, message: &str) {
        (**self).log(message)
    }
}

/// `HostLogger` that forwards messages to `tracing` at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogger;

impl HostLogger for TracingLogger {
    fn log(&self, message: &str) {
        info!(target: "bot", "{}", message);
    }
}
