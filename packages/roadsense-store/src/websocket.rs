use crate::state::StoreState;
use crate::types::SubscriberState;
use axum::{
    extract::{
        ws::{Message, WebSocket},
        State, WebSocketUpgrade,
    },
    response::Response,
};
use futures_util::{SinkExt, StreamExt};
use axum::body::Bytes;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

/// Interval between server pings; pongs count as subscriber activity
pub const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Handle WebSocket upgrade
pub async fn handle_websocket(
    ws: WebSocketUpgrade,
    State(state): State<Arc<StoreState>>,
) -> Response {
    info!("Subscriber handshake started ({:?})", SubscriberState::Connecting);
    ws.on_upgrade(|socket| handle_socket(socket, state))
}

/// Handle individual WebSocket connection
///
/// Outbound batches flow from the registry queue through a dedicated writer
/// task; the read side only serves as a liveness signal.
async fn handle_socket(socket: WebSocket, state: Arc<StoreState>) {
    let (mut sender, mut receiver) = socket.split();
    let registry = state.service.registry().clone();
    let (subscriber_id, mut queue) = registry.subscribe();

    let mut writer = {
        let registry = registry.clone();
        tokio::spawn(async move {
            let mut ping = tokio::time::interval(PING_INTERVAL);
            ping.tick().await;
            loop {
                let message = tokio::select! {
                    payload = queue.recv() => match payload {
                        Some(payload) => Message::Text(payload.to_string().into()),
                        None => break,
                    },
                    _ = ping.tick() => Message::Ping(Bytes::new()),
                };
                if let Err(e) = sender.send(message).await {
                    error!("Failed to push to subscriber {}: {}", subscriber_id, e);
                    break;
                }
            }
            registry.unsubscribe(&subscriber_id);
        })
    };

    loop {
        tokio::select! {
            msg = receiver.next() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        info!("WebSocket connection closed by subscriber {}", subscriber_id);
                        break;
                    }
                    Some(Ok(_)) => {
                        registry.touch(&subscriber_id);
                    }
                    Some(Err(e)) => {
                        error!("WebSocket error: {}", e);
                        break;
                    }
                }
            }
            _ = &mut writer => {
                // Writer gave up (send failure or removal from the registry)
                break;
            }
        }
    }

    writer.abort();
    registry.unsubscribe(&subscriber_id);
    info!("WebSocket connection terminated");
}
