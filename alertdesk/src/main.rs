//! Alert Desk Main Entry Point
//!
//! Wires the configured stores into the alert desk core and serves its HTTP routes.

use alertdesk::server::{create_app, run_server};
use alertdesk::{Dependencies, ServiceError};
use dotenv::dotenv;
use std::env;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Initialize tracing/logging.
fn init_tracing() -> Result<(), ServiceError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("alertdesk=info,alertdesk_repository=info"));

    let json_logs = env::var("LOG_FORMAT")
        .map(|v| v.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    if json_logs {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_target(true)
                    .with_thread_ids(true),
            )
            .try_init()
            .map_err(|e| ServiceError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "alertdesk",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with JSON format"
        );
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_target(true).pretty())
            .try_init()
            .map_err(|e| ServiceError::config(format!("Failed to initialize tracing: {}", e)))?;

        info!(
            service_name = "alertdesk",
            service_version = env!("CARGO_PKG_VERSION"),
            "Tracing initialized with console output"
        );
    }

    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), ServiceError> {
    // Load environment variables from .env file
    dotenv().ok();

    init_tracing()?;

    info!("Starting Alert Desk");

    let deps = match Dependencies::new().await {
        Ok(deps) => {
            info!("Dependencies initialized successfully");
            deps
        }
        Err(e) => {
            error!(error = %e, "Failed to initialize dependencies");
            return Err(e);
        }
    };

    let app = create_app(deps.desk, &deps.cors_origins);
    match run_server(app, deps.server_addr).await {
        Ok(()) => {
            info!("Alert desk stopped");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "Alert desk server failed");
            Err(e)
        }
    }
}
