// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! MQTT publisher: the one-way seam between the drivers and the broker.
//!
//! Drivers talk to a `dyn Publisher`; the concrete [`MqttPublisher`] wraps a
//! rumqttc client whose event loop runs as a background task until shutdown.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use rumqttc::{AsyncClient, ConnectReturnCode, Event, MqttOptions, Packet, QoS};
use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::config::Config;
use crate::error::LightsError;

/// Timeout for the initial broker handshake.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for a single publish.
const PUBLISH_TIMEOUT: Duration = Duration::from_secs(2);

/// Delay before the event loop retries after a connection error.
const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Capacity of the rumqttc request channel between client and event loop.
const MQTT_QUEUE_CAPACITY: usize = 16;

/// One-way message send to the broker. Fire-and-forget from the caller's
/// perspective; QoS is handled below this interface.
pub trait Publisher: Send + Sync {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), LightsError>>;
}

pub type SharedPublisher = Arc<dyn Publisher>;

/// MQTT-backed [`Publisher`].
pub struct MqttPublisher {
    client: AsyncClient,
}

impl MqttPublisher {
    /// Connect to the broker and spawn the event-loop task.
    ///
    /// Waits for the first ConnAck so a misconfigured broker fails at
    /// bootstrap instead of on the first mutation.
    pub async fn connect(config: &Config, shutdown: CancellationToken) -> anyhow::Result<Self> {
        let (host, port) = parse_broker_url(&config.mqtt_url)?;
        let mut opts = MqttOptions::new(&config.mqtt_client_id, host, port);
        opts.set_keep_alive(Duration::from_secs(30));
        if let Some(ref user) = config.mqtt_username {
            opts.set_credentials(user, config.mqtt_password.as_deref().unwrap_or(""));
        }

        let (client, mut eventloop) = AsyncClient::new(opts, MQTT_QUEUE_CAPACITY);

        tokio::time::timeout(CONNECT_TIMEOUT, async {
            loop {
                match eventloop.poll().await {
                    Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                        if ack.code == ConnectReturnCode::Success {
                            return Ok(());
                        }
                        anyhow::bail!("broker refused connection: {:?}", ack.code);
                    }
                    Ok(_) => continue,
                    Err(e) => anyhow::bail!("broker connection failed: {e}"),
                }
            }
        })
        .await
        .map_err(|_| anyhow::anyhow!("timed out connecting to {}", config.mqtt_url))??;

        tracing::info!(url = %config.mqtt_url, client_id = %config.mqtt_client_id, "MQTT connected");

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    event = eventloop.poll() => match event {
                        Ok(event) => trace!(?event, "mqtt event"),
                        Err(e) => {
                            warn!(err = %e, "mqtt connection error, retrying");
                            tokio::time::sleep(RECONNECT_DELAY).await;
                        }
                    },
                }
            }
        });

        Ok(Self { client })
    }

    /// Disconnect from the broker; in-flight publishes error out.
    pub async fn disconnect(&self) {
        if let Err(e) = self.client.disconnect().await {
            warn!(err = %e, "mqtt disconnect failed");
        }
    }
}

impl Publisher for MqttPublisher {
    fn publish<'a>(
        &'a self,
        topic: &'a str,
        payload: Vec<u8>,
    ) -> BoxFuture<'a, Result<(), LightsError>> {
        Box::pin(async move {
            match tokio::time::timeout(
                PUBLISH_TIMEOUT,
                self.client.publish(topic, QoS::AtMostOnce, false, payload),
            )
            .await
            {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(LightsError::Transport(e.to_string())),
                Err(_) => Err(LightsError::Transport(format!("publish to {topic} timed out"))),
            }
        })
    }
}

/// Split a broker URL of the form `tcp://host:port` (scheme and port
/// optional) into host and port.
pub(crate) fn parse_broker_url(url: &str) -> anyhow::Result<(String, u16)> {
    let rest = url
        .strip_prefix("tcp://")
        .or_else(|| url.strip_prefix("mqtt://"))
        .unwrap_or(url);
    anyhow::ensure!(!rest.is_empty(), "empty broker URL");

    match rest.rsplit_once(':') {
        Some((host, port)) => {
            anyhow::ensure!(!host.is_empty(), "broker URL {url:?} has no host");
            let port = port.parse::<u16>().map_err(|_| {
                anyhow::anyhow!("broker URL {url:?} has an invalid port: {port:?}")
            })?;
            Ok((host.to_owned(), port))
        }
        None => Ok((rest.to_owned(), 1883)),
    }
}

#[cfg(test)]
#[path = "mqtt_tests.rs"]
mod tests;
