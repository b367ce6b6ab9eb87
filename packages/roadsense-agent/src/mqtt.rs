// MQTT transport backed by rumqttc
//
// A single AsyncClient is shared by all publishes. Its event loop runs on a
// background task until `disconnect` is called.

use crate::error::{AgentError, AgentResult};
use crate::publisher::Transport;
use async_trait::async_trait;
use rumqttc::{AsyncClient, Event, EventLoop, MqttOptions, Outgoing, Packet, QoS};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

const KEEP_ALIVE: Duration = Duration::from_secs(30);
const REQUEST_CAPACITY: usize = 64;
const RETRY_DELAY: Duration = Duration::from_secs(1);
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(2);

pub struct MqttTransport {
    client: AsyncClient,
    stop: CancellationToken,
    event_loop: Mutex<Option<JoinHandle<()>>>,
}

impl MqttTransport {
    /// Create the client and start polling its event loop.
    ///
    /// The broker connection is established lazily by the event loop.
    pub fn connect(client_id: &str, host: &str, port: u16) -> Self {
        let mut options = MqttOptions::new(client_id, host, port);
        options.set_keep_alive(KEEP_ALIVE);

        let (client, event_loop) = AsyncClient::new(options, REQUEST_CAPACITY);
        let stop = CancellationToken::new();
        let event_loop = tokio::spawn(drive_event_loop(event_loop, stop.clone()));

        tracing::info!("MQTT client '{}' connecting to {}:{}", client_id, host, port);

        Self {
            client,
            stop,
            event_loop: Mutex::new(Some(event_loop)),
        }
    }

    /// Disconnect from the broker and stop the event loop
    pub async fn disconnect(&self) {
        let Some(mut handle) = self.event_loop.lock().await.take() else {
            return;
        };

        if let Err(e) = self.client.disconnect().await {
            tracing::warn!("MQTT disconnect failed: {}", e);
        }
        if tokio::time::timeout(DISCONNECT_TIMEOUT, &mut handle)
            .await
            .is_err()
        {
            self.stop.cancel();
            if let Err(e) = handle.await {
                tracing::warn!("MQTT event loop task failed: {}", e);
            }
        }
        tracing::info!("MQTT client disconnected");
    }
}

#[async_trait]
impl Transport for MqttTransport {
    async fn publish(&self, topic: &str, payload: String) -> AgentResult<()> {
        self.client
            .publish(topic, QoS::AtLeastOnce, false, payload)
            .await
            .map_err(|e| AgentError::Transport(e.to_string()))
    }
}

async fn drive_event_loop(mut event_loop: EventLoop, stop: CancellationToken) {
    loop {
        tokio::select! {
            _ = stop.cancelled() => break,
            event = event_loop.poll() => match event {
                Ok(Event::Incoming(Packet::ConnAck(ack))) => {
                    tracing::info!("Connected to MQTT broker ({:?})", ack.code);
                }
                Ok(Event::Incoming(Packet::Disconnect)) => {
                    tracing::warn!("MQTT broker closed the connection");
                }
                Ok(Event::Outgoing(Outgoing::Disconnect)) => break,
                Ok(_) => {}
                Err(e) => {
                    tracing::error!("MQTT connection error: {}", e);
                    tokio::select! {
                        _ = stop.cancelled() => break,
                        _ = tokio::time::sleep(RETRY_DELAY) => {}
                    }
                }
            }
        }
    }
    tracing::debug!("MQTT event loop stopped");
}
