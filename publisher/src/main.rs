use clap::Parser;
use debug_publisher::config::{Cli, Config};
use debug_publisher::errors::Error;
use debug_publisher::session::MqttSession;
use std::process::ExitCode;
use tracing::{debug, error, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    // .env goes first so it can also set RUST_LOG
    let dotenv = dotenvy::dotenv().ok();
    let config = Config::from(Cli::parse());

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    if let Some(path) = dotenv {
        debug!("Loaded environment from {}", path.display());
    }

    let result = debug_publisher::run(&config, MqttSession::new).await;
    match &result {
        Ok(report) => {
            if let Some(e) = &report.failure {
                warn!(
                    "Stopped after {}/{} messages: {}",
                    report.sent, report.requested, e
                );
            }
        }
        Err(e) => explain_failure(&config, e),
    }

    ExitCode::from(debug_publisher::exit_status(&result))
}

fn explain_failure(config: &Config, err: &Error) {
    match err {
        Error::MissingConfiguration(_) => {
            error!("❌ ERROR: {}", err);
            error!("   It should look like: xxxxxx-ats.iot.us-east-1.amazonaws.com");
        }
        Error::MissingCredentialFile { .. } => {
            error!("❌ ERROR: {}", err);
            error!("💡 Check that the credential files are in:");
            error!("   {}", config.certs_dir().display());
        }
        Error::ConnectionFailure(_) => {
            error!("🆘 Could not connect to {}.", config.endpoint);
            error!("📝 Review the setup in the IoT console:");
            error!("   1. Security > Certificates: is it Active?");
            error!("   2. Policies: is a policy attached?");
            error!("   3. Things: is it attached to the certificate?");
        }
        _ => error!("❌ {}: {}", err.kind(), err),
    }
}
