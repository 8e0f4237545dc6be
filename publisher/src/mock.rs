use crate::errors::{Error, Result};
use crate::session::Session;
use async_trait::async_trait;
use rumqttc::QoS;
use std::time::Duration;
use tokio::time::Instant;

/// Scripted session that records every call with the (virtual) time it was made.
#[derive(Debug, Default)]
pub(crate) struct MockSession {
    connect_failures_left: u32,
    fail_publish_at: Option<usize>,
    fail_idle_at: Option<usize>,
    fail_disconnect: bool,
    pub connects: Vec<Instant>,
    pub publishes: Vec<RecordedPublish>,
    /// Start instant and length of every idle call.
    pub idles: Vec<(Instant, Duration)>,
    pub disconnects: u32,
}

#[derive(Debug, Clone)]
pub(crate) struct RecordedPublish {
    pub topic: String,
    pub qos: QoS,
    pub payload: String,
    pub at: Instant,
}

impl MockSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// The first `n` connect calls fail.
    pub fn failing_connects(mut self, n: u32) -> Self {
        self.connect_failures_left = n;
        self
    }

    /// The `n`-th publish call (1-based) fails.
    pub fn failing_publish_at(mut self, n: usize) -> Self {
        self.fail_publish_at = Some(n);
        self
    }

    /// The `n`-th idle call (1-based) reports a lost connection.
    pub fn failing_idle_at(mut self, n: usize) -> Self {
        self.fail_idle_at = Some(n);
        self
    }

    pub fn failing_disconnect(mut self) -> Self {
        self.fail_disconnect = true;
        self
    }
}

#[async_trait]
impl Session for MockSession {
    async fn connect(&mut self) -> Result<()> {
        self.connects.push(Instant::now());
        if self.connect_failures_left > 0 {
            self.connect_failures_left -= 1;
            return Err(Error::ConnectionFailure("Io: connection refused".to_string()));
        }
        Ok(())
    }

    async fn publish(&mut self, topic: &str, qos: QoS, payload: String) -> Result<()> {
        self.publishes.push(RecordedPublish {
            topic: topic.to_string(),
            qos,
            payload,
            at: Instant::now(),
        });
        if self.fail_publish_at == Some(self.publishes.len()) {
            return Err(Error::PublishFailure("Timeout: no PubAck".to_string()));
        }
        Ok(())
    }

    async fn idle(&mut self, duration: Duration) -> Result<()> {
        self.idles.push((Instant::now(), duration));
        if self.fail_idle_at == Some(self.idles.len()) {
            return Err(Error::ConnectionFailure("Io: connection reset".to_string()));
        }
        tokio::time::sleep(duration).await;
        Ok(())
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.disconnects += 1;
        if self.fail_disconnect {
            return Err(Error::DisconnectFailure("broker went away".to_string()));
        }
        Ok(())
    }
}

pub(crate) fn assert_duration_near(actual: Duration, expected: Duration) {
    let tolerance = Duration::from_millis(5);
    let diff = if actual > expected {
        actual - expected
    } else {
        expected - actual
    };
    assert!(
        diff <= tolerance,
        "expected {:?} (±{:?}), got {:?}",
        expected,
        tolerance,
        actual
    );
}
