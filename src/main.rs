//! bot-dbms - Main entry point.
//!
//! Loads the bot's env file, builds the database client and checks that the
//! configured database answers.

use bot_dbms::config::Config;
use bot_dbms::models::mask_connection_string;
use bot_dbms::{DatabaseManager, TracingLogger};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Initialize the tracing subscriber for logging.
fn init_tracing(config: &Config) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if config.json_logs {
        subscriber.with(fmt::layer().json()).init();
    } else {
        subscriber
            .with(fmt::layer().with_target(true).with_thread_ids(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse once to find the env file, then again so its variables apply
    let bootstrap = Config::parse();
    let (config, env_file) = bootstrap.reload_with_env_file(std::env::args_os())?;
    init_tracing(&config);

    match env_file {
        Some(path) => info!(path = %path.display(), "Loaded env file"),
        None => warn!(path = %config.env_file.display(), "Env file not found"),
    }

    let options = config.client_options();
    if let Some(url) = options.datasource_url.as_deref() {
        info!(url = %mask_connection_string(url), "Using datasource");
    }

    let manager = match DatabaseManager::new(&TracingLogger, options) {
        Ok(manager) => manager,
        Err(e) => {
            error!(error = %e, "Failed to build database client");
            return Err(e.into());
        }
    };

    let result = manager.connect().await;
    manager.disconnect().await;

    let info = result?;
    info!(
        db_type = %info.database_type,
        database = ?info.database,
        server_version = ?info.server_version,
        "Database check complete"
    );
    Ok(())
}
