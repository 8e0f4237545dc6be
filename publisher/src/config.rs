use crate::connection::DEFAULT_MAX_ATTEMPTS;
use crate::errors::{Error, Result};
use clap::Parser;
use rumqttc::QoS;
use std::path::PathBuf;
use std::time::Duration;

/// Endpoint value shipped in templates; treated as "not configured".
pub const UNCONFIGURED_ENDPOINT: &str = "YOUR_IOT_ENDPOINT";

pub const DEFAULT_PORT: u16 = 8883;
pub const CERTS_DIR: &str = "certs";

const KEEP_ALIVE_SECS: u64 = 30;

/// Publishes synthetic telemetry to a cloud IoT broker over mutual TLS,
/// narrating each step for debugging.
#[derive(Debug, Parser)]
#[command(name = "debug-publisher")]
#[command(version)]
pub struct Cli {
    /// Broker hostname, e.g. xxxxxx-ats.iot.us-east-1.amazonaws.com
    #[arg(long, env = "AWS_IOT_ENDPOINT", default_value = UNCONFIGURED_ENDPOINT)]
    pub endpoint: String,

    /// Broker TLS port
    #[arg(long, env = "AWS_IOT_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// MQTT client identifier
    #[arg(long, env = "AWS_CLIENT_ID", default_value = "debug-publisher")]
    pub client_id: String,

    /// Directory holding the `certs/` folder
    #[arg(long, env = "AWS_BASE_DIR", default_value = ".")]
    pub base_dir: PathBuf,

    /// Root CA certificate (PEM)
    #[arg(long, env = "AWS_IOT_ROOT_CA")]
    pub root_ca: Option<PathBuf>,

    /// Device private key (PEM)
    #[arg(long, env = "AWS_IOT_PRIVATE_KEY")]
    pub private_key: Option<PathBuf>,

    /// Device certificate (PEM)
    #[arg(long, env = "AWS_IOT_CERT")]
    pub cert: Option<PathBuf>,

    /// MQTT topic
    #[arg(long, env = "AWS_IOT_TOPIC", default_value = "devices/telemetry")]
    pub topic: String,

    /// Device identifier placed in every payload
    #[arg(long, env = "DEVICE_ID", default_value = "test-device")]
    pub device: String,

    /// Messages to send
    #[arg(long, default_value_t = 5)]
    pub count: u32,

    /// QoS 0/1
    #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u8).range(0..=1))]
    pub qos: u8,

    /// Seconds between messages
    #[arg(long, default_value = "2.0", value_parser = parse_seconds)]
    pub interval: Duration,

    /// Connection attempts before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub attempts: u32,

    /// Seconds to wait for the broker to acknowledge a connect or disconnect
    #[arg(long, default_value_t = 30, value_parser = clap::value_parser!(u64).range(1..))]
    pub connect_timeout: u64,

    /// Seconds to wait for a single publish to complete
    #[arg(long, default_value_t = 15, value_parser = clap::value_parser!(u64).range(1..))]
    pub operation_timeout: u64,
}

fn parse_seconds(s: &str) -> std::result::Result<Duration, String> {
    let value: f64 = s.parse().map_err(|e| format!("{}", e))?;
    Duration::try_from_secs_f64(value)
        .map_err(|_| format!("{} is not a representable non-negative number of seconds", s))
}

/// Immutable run configuration, built once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    pub endpoint: String,
    pub port: u16,
    pub client_id: String,
    pub base_dir: PathBuf,
    pub root_ca: PathBuf,
    pub private_key: PathBuf,
    pub certificate: PathBuf,
    pub connect_timeout: Duration,
    pub operation_timeout: Duration,
    pub keep_alive: Duration,
    pub max_attempts: u32,
    pub publish: PublishPlan,
}

/// Parameters of the publish loop.
#[derive(Debug, Clone)]
pub struct PublishPlan {
    pub topic: String,
    pub device: String,
    pub count: u32,
    pub qos: QoS,
    pub interval: Duration,
}

impl From<Cli> for Config {
    fn from(cli: Cli) -> Self {
        let certs = cli.base_dir.join(CERTS_DIR);
        let root_ca = cli.root_ca.unwrap_or_else(|| certs.join("root-CA.crt"));
        let private_key = cli
            .private_key
            .unwrap_or_else(|| certs.join("private.pem.key"));
        let certificate = cli
            .cert
            .unwrap_or_else(|| certs.join("certificate.pem.crt"));

        Config {
            endpoint: cli.endpoint,
            port: cli.port,
            client_id: cli.client_id,
            base_dir: cli.base_dir,
            root_ca,
            private_key,
            certificate,
            connect_timeout: Duration::from_secs(cli.connect_timeout),
            operation_timeout: Duration::from_secs(cli.operation_timeout),
            keep_alive: Duration::from_secs(KEEP_ALIVE_SECS),
            max_attempts: cli.attempts,
            publish: PublishPlan {
                topic: cli.topic,
                device: cli.device,
                count: cli.count,
                qos: qos_from_level(cli.qos),
                interval: cli.interval,
            },
        }
    }
}

impl Config {
    pub fn ensure_endpoint(&self) -> Result<()> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() || endpoint == UNCONFIGURED_ENDPOINT {
            return Err(Error::MissingConfiguration(
                "set AWS_IOT_ENDPOINT (or --endpoint) to the broker hostname".to_string(),
            ));
        }
        Ok(())
    }

    pub fn certs_dir(&self) -> PathBuf {
        self.base_dir.join(CERTS_DIR)
    }
}

fn qos_from_level(level: u8) -> QoS {
    match level {
        0 => QoS::AtMostOnce,
        _ => QoS::AtLeastOnce,
    }
}
