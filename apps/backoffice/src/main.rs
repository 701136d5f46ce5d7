//! # Officine Sweep
//!
//! Entry point of the maintenance sweep. Meant to run from cron or a
//! systemd timer.
//!
//! ```bash
//! OFFICINE_DB_PATH=./officine_dev.db RUST_LOG=info officine-sweep
//! ```

use std::process::ExitCode;

use tracing::{error, info};

use officine_backoffice::config::AppConfig;
use officine_backoffice::{init_tracing, open_database, sweep};

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    info!("Starting Officine sweep");

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Invalid configuration");
            return ExitCode::FAILURE;
        }
    };

    let db = match open_database(&config).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "Could not open database");
            return ExitCode::FAILURE;
        }
    };

    let outcome = sweep::run(&db, &config).await;
    db.close().await;

    match outcome {
        Ok(results) => {
            info!(pharmacies = results.len(), "Sweep complete");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Sweep failed");
            ExitCode::FAILURE
        }
    }
}
