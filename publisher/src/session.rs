use crate::config::Config;
use crate::credentials::CredentialKind;
use crate::errors::{Error, Result};
use async_trait::async_trait;
use rumqttc::{
    AsyncClient, ConnectionError, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS,
    TlsConfiguration, Transport,
};
use std::path::Path;
use std::time::Duration;
use tracing::debug;

const REQUEST_CHANNEL_CAPACITY: usize = 10;

/// Broker session used by the connect and publish steps.
///
/// Every call reports failure through the returned `Result`; callers decide
/// whether to retry.
#[async_trait]
pub trait Session: Send {
    async fn connect(&mut self) -> Result<()>;

    async fn publish(&mut self, topic: &str, qos: QoS, payload: String) -> Result<()>;

    /// Waits `duration` while keeping the connection alive.
    async fn idle(&mut self, duration: Duration) -> Result<()>;

    async fn disconnect(&mut self) -> Result<()>;
}

/// rumqttc-backed session over mutual TLS.
///
/// The event loop is polled inline while an operation is in flight or the
/// session idles between messages, so no background task is spawned.
pub struct MqttSession {
    client: AsyncClient,
    eventloop: EventLoop,
    connect_timeout: Duration,
    operation_timeout: Duration,
}

impl MqttSession {
    /// Builds a not-yet-connected session from the credential files.
    pub fn new(config: &Config) -> Result<Self> {
        let ca = read_pem(CredentialKind::RootCa, &config.root_ca)?;
        let key = read_pem(CredentialKind::PrivateKey, &config.private_key)?;
        let cert = read_pem(CredentialKind::Certificate, &config.certificate)?;

        let mut mqtt_options = MqttOptions::new(&config.client_id, &config.endpoint, config.port);
        mqtt_options.set_keep_alive(config.keep_alive);
        mqtt_options.set_clean_session(true);
        mqtt_options.set_transport(Transport::Tls(TlsConfiguration::Simple {
            ca,
            alpn: None,
            client_auth: Some((cert, key)),
        }));

        let (client, eventloop) = AsyncClient::new(mqtt_options, REQUEST_CHANNEL_CAPACITY);

        Ok(Self {
            client,
            eventloop,
            connect_timeout: config.connect_timeout,
            operation_timeout: config.operation_timeout,
        })
    }

    /// Polls the event loop until `done` accepts an event, the loop errors,
    /// or `limit` elapses.
    async fn drive_until<F>(&mut self, limit: Duration, mut done: F) -> std::result::Result<(), String>
    where
        F: FnMut(&Event) -> bool,
    {
        let eventloop = &mut self.eventloop;
        let polled = tokio::time::timeout(limit, async {
            loop {
                let event = eventloop.poll().await?;
                debug!("MQTT event: {:?}", event);
                if done(&event) {
                    return Ok::<(), ConnectionError>(());
                }
            }
        })
        .await;

        match polled {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(describe_connection_error(&e)),
            Err(_) => Err(format!("Timeout: no response within {:?}", limit)),
        }
    }
}

#[async_trait]
impl Session for MqttSession {
    async fn connect(&mut self) -> Result<()> {
        let limit = self.connect_timeout;
        self.drive_until(limit, |event| {
            matches!(event, Event::Incoming(Packet::ConnAck(_)))
        })
        .await
        .map_err(Error::ConnectionFailure)
    }

    async fn publish(&mut self, topic: &str, qos: QoS, payload: String) -> Result<()> {
        self.client
            .publish(topic, qos, false, payload)
            .await
            .map_err(|e| Error::PublishFailure(e.to_string()))?;

        let limit = self.operation_timeout;
        self.drive_until(limit, |event| match qos {
            QoS::AtMostOnce => matches!(event, Event::Outgoing(Outgoing::Publish(_))),
            _ => matches!(event, Event::Incoming(Packet::PubAck(_))),
        })
        .await
        .map_err(Error::PublishFailure)
    }

    async fn idle(&mut self, duration: Duration) -> Result<()> {
        let eventloop = &mut self.eventloop;
        // Keep-alive pings go out from inside poll().
        let polled = tokio::time::timeout(duration, async {
            loop {
                match eventloop.poll().await {
                    Ok(event) => debug!("MQTT event: {:?}", event),
                    Err(e) => return e,
                }
            }
        })
        .await;

        match polled {
            Err(_elapsed) => Ok(()),
            Ok(e) => Err(Error::ConnectionFailure(describe_connection_error(&e))),
        }
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.client
            .disconnect()
            .await
            .map_err(|e| Error::DisconnectFailure(e.to_string()))?;

        let limit = self.connect_timeout;
        self.drive_until(limit, |event| {
            matches!(event, Event::Outgoing(Outgoing::Disconnect))
        })
        .await
        .map_err(Error::DisconnectFailure)
    }
}

fn read_pem(kind: CredentialKind, path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .map_err(|e| Error::Tls(format!("cannot read {} {}: {}", kind.label(), path.display(), e)))
}

/// Error kind and message, the way operators see it in the retry log.
fn describe_connection_error(error: &ConnectionError) -> String {
    let kind = match error {
        ConnectionError::NetworkTimeout => "Timeout",
        ConnectionError::Io(_) => "Io",
        ConnectionError::ConnectionRefused(_) => "ConnectionRefused",
        ConnectionError::MqttState(_) => "MqttState",
        _ => "Transport",
    };
    format!("{}: {}", kind, error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Cli;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn test_new_reports_unreadable_credentials() {
        let dir = tempdir().unwrap();
        let root_ca = dir.path().join("root-CA.crt");
        let private_key = dir.path().join("private.pem.key");
        let cert = dir.path().join("certificate.pem.crt");
        let cli = Cli::try_parse_from([
            "debug-publisher",
            "--endpoint",
            "broker.example.com",
            "--root-ca",
            root_ca.to_str().unwrap(),
            "--private-key",
            private_key.to_str().unwrap(),
            "--cert",
            cert.to_str().unwrap(),
        ])
        .unwrap();
        let config = Config::from(cli);

        match MqttSession::new(&config) {
            Err(Error::Tls(msg)) => assert!(msg.contains("ROOT_CA"), "{}", msg),
            Err(e) => panic!("unexpected error: {}", e),
            Ok(_) => panic!("session built without credentials"),
        }
    }

    #[test]
    fn test_describe_connection_error_names_kind() {
        let msg = describe_connection_error(&ConnectionError::NetworkTimeout);
        assert!(msg.starts_with("Timeout: "), "{}", msg);

        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let msg = describe_connection_error(&ConnectionError::Io(io));
        assert!(msg.starts_with("Io: "), "{}", msg);
    }
}
