//! Debug publisher for cloud IoT brokers.
//!
//! Checks the local TLS credentials, connects over MQTT with bounded
//! retries, publishes a fixed number of synthetic telemetry messages and
//! disconnects.

pub mod config;
pub mod connection;
pub mod credentials;
pub mod errors;
pub mod publisher;
pub mod session;
pub mod telemetry;

#[cfg(test)]
mod mock;

use crate::config::Config;
use crate::errors::Result;
use crate::publisher::PublishReport;
use crate::session::Session;
use tracing::info;

/// Runs the whole check: configuration, credentials, connect, publish.
///
/// `open_session` is only called once the endpoint is configured and all
/// three credential files exist. Errors returned here are fatal; a publish
/// failure after connecting is reported inside the `PublishReport`.
pub async fn run<S, F>(config: &Config, open_session: F) -> Result<PublishReport>
where
    S: Session,
    F: FnOnce(&Config) -> Result<S>,
{
    print_banner(config);

    config.ensure_endpoint()?;
    credentials::validate_all(config)?;

    info!("🏗️ Configuring MQTT client...");
    let mut session = open_session(config)?;

    info!("🔌 Connecting to {}:{}...", config.endpoint, config.port);
    connection::connect_with_retry(&mut session, config.max_attempts).await?;

    Ok(publisher::run_session(&mut session, &config.publish).await)
}

/// Process exit status for the outcome of [`run`].
///
/// Only fatal errors exit non-zero; a publish failure after connecting is
/// reported but still exits 0.
pub fn exit_status(result: &Result<PublishReport>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(_) => 1,
    }
}

fn print_banner(config: &Config) {
    info!("🔍 === IoT Debug Publisher ===");
    info!("📁 Base directory: {}", config.base_dir.display());
    info!("📋 Client ID: {}", config.client_id);
    info!("🌐 Endpoint: {}", config.endpoint);
    info!("🚪 Port: {}", config.port);
    info!("📝 Topic: {}", config.publish.topic);
}
