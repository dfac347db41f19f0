//! The hub — single coordinator owning the connection registry.
//!
//! One event loop selects over the register, unregister, and inbound
//! queues plus the sweep timer, processing exactly one event per
//! iteration. Registry mutation happens nowhere else, which is what makes
//! the registry lock-free.

pub mod registry;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use agora_core::config::RealtimeConfig;
use agora_core::error::AppError;
use agora_core::result::AppResult;
use agora_core::types::UserId;

use crate::connection::handle::{ConnectionHandle, ConnectionId, PushError};
use crate::presence::PresenceTracker;
use crate::protocol::{ClientFrame, Inbound, ServerFrame};
use crate::store::ChatStore;

use self::registry::Registry;

/// Cloneable front door to the hub event loop.
///
/// Gateways and pumps interact with the hub only through these bounded
/// senders; the loop ends once every clone has been dropped.
#[derive(Debug, Clone)]
pub struct HubHandle {
    register_tx: mpsc::Sender<Arc<ConnectionHandle>>,
    unregister_tx: mpsc::Sender<ConnectionId>,
    inbound_tx: mpsc::Sender<Inbound>,
}

impl HubHandle {
    /// Hand a freshly built connection to the hub.
    pub async fn register(&self, handle: Arc<ConnectionHandle>) -> AppResult<()> {
        self.register_tx
            .send(handle)
            .await
            .map_err(|_| AppError::service_unavailable("Hub is not running"))
    }

    /// Request teardown of a connection. Idempotent; unknown IDs are
    /// ignored by the loop.
    pub async fn unregister(&self, conn_id: ConnectionId) {
        let _ = self.unregister_tx.send(conn_id).await;
    }

    /// Forward a stamped inbound frame for routing.
    pub async fn submit(&self, inbound: Inbound) -> AppResult<()> {
        self.inbound_tx
            .send(inbound)
            .await
            .map_err(|_| AppError::service_unavailable("Hub is not running"))
    }
}

/// The broker state machine. Owns the registry; runs as a single task.
#[derive(Debug)]
pub struct Hub {
    registry: Registry,
    register_rx: mpsc::Receiver<Arc<ConnectionHandle>>,
    unregister_rx: mpsc::Receiver<ConnectionId>,
    inbound_rx: mpsc::Receiver<Inbound>,
    store: Arc<dyn ChatStore>,
    presence: PresenceTracker,
    config: RealtimeConfig,
}

impl Hub {
    /// Build a hub and its handle.
    pub fn new(store: Arc<dyn ChatStore>, config: RealtimeConfig) -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::channel(config.hub_queue_depth);
        let (unregister_tx, unregister_rx) = mpsc::channel(config.hub_queue_depth);
        let (inbound_tx, inbound_rx) = mpsc::channel(config.hub_queue_depth);

        let hub = Self {
            registry: Registry::new(),
            register_rx,
            unregister_rx,
            inbound_rx,
            store: store.clone(),
            presence: PresenceTracker::new(store),
            config,
        };
        let handle = HubHandle {
            register_tx,
            unregister_tx,
            inbound_tx,
        };
        (hub, handle)
    }

    /// Run the event loop until every [`HubHandle`] clone has been dropped.
    pub async fn run(mut self) {
        info!("Hub event loop started");

        let period = Duration::from_secs(self.config.sweep_interval_seconds);
        let mut sweep = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        sweep.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                maybe = self.register_rx.recv() => match maybe {
                    Some(handle) => self.handle_register(handle).await,
                    None => break,
                },
                maybe = self.unregister_rx.recv() => match maybe {
                    Some(conn_id) => self.unregister_chain(vec![conn_id]).await,
                    None => break,
                },
                maybe = self.inbound_rx.recv() => match maybe {
                    Some(inbound) => self.route(inbound).await,
                    None => break,
                },
                _ = sweep.tick() => self.sweep().await,
            }
        }

        info!("Hub event loop stopped");
    }

    /// Add a connection to the registry; first connection for a user flips
    /// their presence online.
    async fn handle_register(&mut self, handle: Arc<ConnectionHandle>) {
        let user_id = handle.user_id;
        let conn_id = handle.id;
        let live = self.registry.insert(handle);

        info!(
            conn_id = %conn_id,
            user_id = %user_id,
            live = live,
            "Connection registered"
        );

        if live == 1 {
            match self.presence.went_online(user_id).await {
                Ok(frame) => {
                    let rejected = self.broadcast_status(user_id, &frame).await;
                    self.unregister_chain(rejected).await;
                }
                Err(e) => error!(
                    user_id = %user_id,
                    error = %e,
                    "Failed to persist online transition"
                ),
            }
        }
    }

    /// Persist-then-deliver for chat messages; store writes for read
    /// receipts; liveness refresh for heartbeats.
    ///
    /// Store calls are awaited inline, so a pathologically slow store
    /// delays the whole loop. Deliveries never block: a full queue costs
    /// that connection its registration instead.
    async fn route(&mut self, inbound: Inbound) {
        // Any inbound traffic proves the connection is alive.
        if let Some(conn) = self.registry.get(&inbound.connection_id) {
            conn.touch();
        }

        match inbound.frame {
            ClientFrame::Message {
                content,
                receiver_id,
                temp_id,
            } => {
                let stored = match self
                    .store
                    .insert_message(inbound.sender_id, receiver_id, &content, inbound.received_at)
                    .await
                {
                    Ok(stored) => stored,
                    Err(e) => {
                        error!(
                            sender_id = %inbound.sender_id,
                            receiver_id = %receiver_id,
                            error = %e,
                            "Failed to persist message, dropping"
                        );
                        return;
                    }
                };

                let frame = ServerFrame::Message {
                    id: stored.id,
                    content: stored.content,
                    sender_id: stored.sender_id,
                    receiver_id: stored.receiver_id,
                    timestamp: stored.created_at,
                    temp_id,
                };
                let payload = frame.to_json();

                let mut rejected = Vec::new();
                for conn in self.registry.user_connections(receiver_id) {
                    match conn.push(payload.clone()) {
                        Ok(()) => {}
                        Err(PushError::Full) => {
                            warn!(
                                conn_id = %conn.id,
                                user_id = %receiver_id,
                                "Outbound queue full, closing slow connection"
                            );
                            rejected.push(conn.id);
                        }
                        Err(PushError::Closed) => rejected.push(conn.id),
                    }
                }
                self.unregister_chain(rejected).await;
            }
            ClientFrame::Read { sender_id } => {
                match self
                    .store
                    .mark_conversation_read(inbound.sender_id, sender_id)
                    .await
                {
                    Ok(rows) => debug!(
                        receiver_id = %inbound.sender_id,
                        sender_id = %sender_id,
                        rows = rows,
                        "Read receipt applied"
                    ),
                    Err(e) => error!(
                        receiver_id = %inbound.sender_id,
                        sender_id = %sender_id,
                        error = %e,
                        "Failed to apply read receipt"
                    ),
                }
            }
            // Liveness already refreshed above; heartbeats carry nothing else.
            ClientFrame::Heartbeat => {}
        }
    }

    /// Tear down connections until no teardown produces further casualties.
    ///
    /// A teardown can flip a user offline, whose status broadcast can in
    /// turn reveal more saturated queues; those are processed iteratively
    /// here rather than recursively.
    async fn unregister_chain(&mut self, seed: Vec<ConnectionId>) {
        let mut pending = seed;
        while let Some(conn_id) = pending.pop() {
            if let Some((user_id, frame)) = self.remove_connection(conn_id).await {
                let rejected = self.broadcast_status(user_id, &frame).await;
                pending.extend(rejected);
            }
        }
    }

    /// Remove one connection. If it was the user's last, persist the
    /// offline transition and return the frame to broadcast.
    async fn remove_connection(
        &mut self,
        conn_id: ConnectionId,
    ) -> Option<(UserId, ServerFrame)> {
        let handle = self.registry.remove(&conn_id)?;
        let user_id = handle.user_id;

        info!(
            conn_id = %conn_id,
            user_id = %user_id,
            "Connection unregistered"
        );

        // Dropping the handle closes the outbound queue, which tells the
        // writer to exit and shut the socket down.
        drop(handle);

        if self.registry.user_live_count(user_id) > 0 {
            return None;
        }

        match self.presence.went_offline(user_id).await {
            Ok(frame) => Some((user_id, frame)),
            Err(e) => {
                error!(
                    user_id = %user_id,
                    error = %e,
                    "Failed to persist offline transition"
                );
                None
            }
        }
    }

    /// Push a status frame to everyone who shares a conversation with the
    /// subject, plus the subject's own surviving connections. Returns the
    /// connections whose queues refused the frame.
    async fn broadcast_status(
        &self,
        subject: UserId,
        frame: &ServerFrame,
    ) -> Vec<ConnectionId> {
        let mut audience: HashSet<UserId> =
            match self.store.conversation_partner_ids(subject).await {
                Ok(partners) => partners.into_iter().collect(),
                Err(e) => {
                    error!(
                        user_id = %subject,
                        error = %e,
                        "Failed to resolve broadcast audience"
                    );
                    HashSet::new()
                }
            };
        audience.insert(subject);

        let payload = frame.to_json();
        let mut rejected = Vec::new();
        for user_id in audience {
            for conn in self.registry.user_connections(user_id) {
                match conn.push(payload.clone()) {
                    Ok(()) => {}
                    Err(PushError::Full) => {
                        warn!(
                            conn_id = %conn.id,
                            user_id = %user_id,
                            "Outbound queue full during status broadcast"
                        );
                        rejected.push(conn.id);
                    }
                    Err(PushError::Closed) => rejected.push(conn.id),
                }
            }
        }
        rejected
    }

    /// Evict connections whose last liveness report is older than the
    /// configured threshold. Catches half-open sockets that never surface
    /// a read or write error.
    async fn sweep(&mut self) {
        let cutoff = chrono::Utc::now()
            - chrono::Duration::seconds(self.config.liveness_timeout_seconds as i64);

        let stale: Vec<ConnectionId> = self
            .registry
            .iter()
            .filter(|conn| conn.last_seen() < cutoff)
            .map(|conn| conn.id)
            .collect();

        if stale.is_empty() {
            return;
        }

        warn!(count = stale.len(), "Sweeping inactive connections");
        self.unregister_chain(stale).await;
    }
}
