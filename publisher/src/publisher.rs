use crate::config::PublishPlan;
use crate::errors::Error;
use crate::session::Session;
use crate::telemetry::Telemetry;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{error, info, warn};

/// Result of the publish loop.
#[derive(Debug)]
pub struct PublishReport {
    pub requested: u32,
    pub sent: u32,
    /// Error that stopped the loop early, if any.
    pub failure: Option<Error>,
}

impl PublishReport {
    pub fn is_complete(&self) -> bool {
        self.failure.is_none() && self.sent == self.requested
    }
}

/// Publishes `plan.count` telemetry messages, idling the session for
/// `plan.interval` between them. The first publish error, or a connection
/// lost while idling, stops the loop; nothing is retried.
pub async fn publish_all<S>(session: &mut S, plan: &PublishPlan, rng: &mut impl Rng) -> PublishReport
where
    S: Session + ?Sized,
{
    let mut report = PublishReport {
        requested: plan.count,
        sent: 0,
        failure: None,
    };

    for message_id in 1..=plan.count {
        let telemetry = Telemetry::generate(rng, &plan.device, message_id);
        let payload = match telemetry.to_payload() {
            Ok(p) => p,
            Err(e) => {
                error!("Failed to serialize telemetry: {}", e);
                report.failure = Some(e);
                break;
            }
        };

        info!("📨 [{}/{}] {}", message_id, plan.count, payload);

        if let Err(e) = session.publish(&plan.topic, plan.qos, payload).await {
            error!("❌ Error while sending: {}: {}", e.kind(), e);
            report.failure = Some(e);
            break;
        }
        report.sent += 1;

        if message_id < plan.count {
            if let Err(e) = session.idle(plan.interval).await {
                error!("❌ Connection lost between messages: {}: {}", e.kind(), e);
                report.failure = Some(e);
                break;
            }
        }
    }

    if report.is_complete() {
        info!("✅ All {} messages sent", report.sent);
    }

    report
}

/// Runs the publish loop on a connected session, then disconnects.
///
/// Disconnect is attempted on every path out of the loop. A failed
/// disconnect is only logged.
pub async fn run_session<S>(session: &mut S, plan: &PublishPlan) -> PublishReport
where
    S: Session + ?Sized,
{
    info!("📤 Publishing {} messages to '{}'...", plan.count, plan.topic);

    let mut rng = StdRng::from_entropy();
    let report = publish_all(session, plan, &mut rng).await;

    info!("🔌 Disconnecting...");
    match session.disconnect().await {
        Ok(()) => info!("✅ Disconnected"),
        Err(e) => warn!("⚠️ Error while disconnecting: {}", e),
    }

    report
}
