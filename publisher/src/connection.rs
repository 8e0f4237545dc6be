use crate::errors::Result;
use crate::session::Session;
use std::time::Duration;
use tracing::{error, info, warn};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const INITIAL_BACKOFF_SECS: f64 = 2.0;
const BACKOFF_FACTOR: f64 = 1.5;

/// Delay schedule between connection attempts: 2.0s, 3.0s, 4.5s, ...
#[derive(Debug, Clone)]
pub struct Backoff {
    delay_secs: f64,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            delay_secs: INITIAL_BACKOFF_SECS,
        }
    }
}

impl Backoff {
    /// Returns the current delay and grows the next one.
    pub fn next_delay(&mut self) -> Duration {
        let current = self.delay_secs;
        self.delay_secs *= BACKOFF_FACTOR;
        Duration::from_secs_f64(current)
    }
}

/// Connects `session`, retrying with exponential backoff.
///
/// The last attempt's error is returned after printing a troubleshooting
/// checklist.
pub async fn connect_with_retry<S>(session: &mut S, max_attempts: u32) -> Result<()>
where
    S: Session + ?Sized,
{
    let max_attempts = max_attempts.max(1);
    let mut backoff = Backoff::default();
    let mut attempt = 0;

    loop {
        attempt += 1;
        info!("📡 Connection attempt {}/{}...", attempt, max_attempts);

        match session.connect().await {
            Ok(()) => {
                info!("✅ Connected");
                return Ok(());
            }
            Err(e) => {
                if attempt >= max_attempts {
                    error!("❌ Final connection error: {}: {}", e.kind(), e);
                    print_connection_checklist();
                    return Err(e);
                }

                let delay = backoff.next_delay();
                warn!(
                    "❌ Connection failed (attempt {}/{}): {}: {}",
                    attempt,
                    max_attempts,
                    e.kind(),
                    e
                );
                info!("⏳ Retrying in {:.1}s...", delay.as_secs_f64());

                tokio::time::sleep(delay).await;
            }
        }
    }
}

fn print_connection_checklist() {
    error!("🔍 Possible causes:");
    error!("  1. Certificate not registered with the IoT service");
    error!("  2. IoT policy missing or too restrictive");
    error!("  3. Thing not attached to the certificate");
    error!("  4. Certificate inactive");
    error!("  5. Firewall blocking port 8883");
}
