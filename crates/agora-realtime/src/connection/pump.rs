//! Socket I/O routines — one inbound/outbound pump pair per connection.
//!
//! The outbound pump drains the bounded queue and owns the socket writer;
//! the inbound pump owns the reader. Teardown always flows the same way:
//! the hub drops the connection handle, the queue closes, the writer sends
//! Close and exits, and the reader observes the closed socket.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use agora_core::config::RealtimeConfig;
use agora_core::types::UserId;

use crate::hub::HubHandle;
use crate::protocol::{ClientFrame, Inbound};

use super::authenticator::AuthenticatedSocket;
use super::handle::{ConnectionHandle, ConnectionId};

/// Drive a freshly upgraded socket for an authenticated user until it
/// reaches its terminal state.
pub async fn serve_socket(
    socket: WebSocket,
    identity: AuthenticatedSocket,
    hub: HubHandle,
    config: RealtimeConfig,
) {
    let (ws_tx, ws_rx) = socket.split();

    let (handle, outbound_rx) =
        ConnectionHandle::channel(identity.user_id, config.outbound_buffer_size);
    let conn_id = handle.id;
    let user_id = handle.user_id;

    if hub.register(Arc::new(handle)).await.is_err() {
        warn!(user_id = %user_id, "Hub unavailable, refusing connection");
        return;
    }

    info!(
        conn_id = %conn_id,
        user_id = %user_id,
        "WebSocket connection established"
    );

    let ping_interval = Duration::from_secs(config.ping_interval_seconds);
    let outbound = tokio::spawn(outbound_pump(ws_tx, outbound_rx, ping_interval));

    let read_timeout = Duration::from_secs(config.read_timeout_seconds);
    inbound_pump(ws_rx, conn_id, user_id, &hub, read_timeout).await;

    // Graceful and error paths converge here; unregister is idempotent, so
    // a hub-initiated teardown that already removed us is a no-op.
    hub.unregister(conn_id).await;
    let _ = outbound.await;

    info!(
        conn_id = %conn_id,
        user_id = %user_id,
        "WebSocket connection closed"
    );
}

/// Drain the outbound queue into the socket, pinging on an idle interval.
///
/// Exits when the queue closes (hub-initiated teardown) or a write fails.
async fn outbound_pump(
    mut ws_tx: SplitSink<WebSocket, Message>,
    mut rx: mpsc::Receiver<String>,
    ping_interval: Duration,
) {
    let start = tokio::time::Instant::now() + ping_interval;
    let mut ping = tokio::time::interval_at(start, ping_interval);
    ping.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            maybe = rx.recv() => match maybe {
                Some(payload) => {
                    if ws_tx.send(Message::Text(payload.into())).await.is_err() {
                        break;
                    }
                }
                None => {
                    // Queue closed by the hub; say goodbye and stop writing.
                    let _ = ws_tx.send(Message::Close(None)).await;
                    break;
                }
            },
            _ = ping.tick() => {
                if ws_tx.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Read frames under a deadline, decode, stamp, and forward to the hub.
///
/// Pongs and wire-level heartbeats both count as liveness reports. A frame
/// that fails to decode is discarded; the connection stays open.
async fn inbound_pump(
    mut ws_rx: SplitStream<WebSocket>,
    conn_id: ConnectionId,
    user_id: UserId,
    hub: &HubHandle,
    read_timeout: Duration,
) {
    loop {
        let frame = match tokio::time::timeout(read_timeout, ws_rx.next()).await {
            Err(_) => {
                warn!(conn_id = %conn_id, "Read deadline expired, closing connection");
                break;
            }
            Ok(None) => break,
            Ok(Some(Err(e))) => {
                warn!(conn_id = %conn_id, error = %e, "WebSocket read error");
                break;
            }
            Ok(Some(Ok(frame))) => frame,
        };

        match frame {
            Message::Text(text) => {
                let decoded: ClientFrame = match serde_json::from_str(&text) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!(
                            conn_id = %conn_id,
                            error = %e,
                            "Discarding malformed frame"
                        );
                        continue;
                    }
                };

                let stamped = Inbound {
                    connection_id: conn_id,
                    sender_id: user_id,
                    received_at: Utc::now(),
                    frame: decoded,
                };
                if hub.submit(stamped).await.is_err() {
                    break;
                }
            }
            Message::Pong(_) => {
                debug!(conn_id = %conn_id, "Pong received");
                if hub.submit(Inbound::heartbeat(conn_id, user_id)).await.is_err() {
                    break;
                }
            }
            Message::Close(_) => break,
            // Pings are answered by the socket layer; binary frames are not
            // part of the protocol.
            Message::Ping(_) | Message::Binary(_) => {}
        }
    }
}
