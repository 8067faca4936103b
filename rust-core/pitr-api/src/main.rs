// SPDX-License-Identifier: PMPL-1.0-or-later
//! PITR archive service binary
//!
//! Reads `PITR_*` configuration from the environment and starts the service.

use pitr_api::ServiceConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = ServiceConfig::from_env()?;

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    if config.log_json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }

    pitr_api::install_crypto_provider();

    tracing::info!(
        archive_root = %config.archive_root.display(),
        wal_spool = %config.wal_spool.display(),
        "Starting PITR archive service on {}",
        config.listen_addr
    );

    pitr_api::serve(config).await?;

    Ok(())
}
