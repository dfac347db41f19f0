//! Hub behavior tests against an in-memory store.
//!
//! Exercises the broker's observable contract: persist-then-deliver
//! routing, offline persistence, read receipts, presence transitions,
//! backpressure teardown, and the inactivity sweep.
//!
//! The hub has no cross-queue ordering guarantee, so tests synchronize on
//! observable effects (a connection's own `status_update`, or a sentinel
//! registration) before exercising the next queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::mpsc;

use agora_core::config::RealtimeConfig;
use agora_core::error::AppError;
use agora_core::result::AppResult;
use agora_core::types::{MessageId, UserId};
use agora_entity::message::ChatMessage;
use agora_realtime::connection::handle::{ConnectionHandle, ConnectionId};
use agora_realtime::hub::{Hub, HubHandle};
use agora_realtime::protocol::{ClientFrame, Inbound};
use agora_realtime::store::ChatStore;

#[derive(Debug, Default)]
struct MockStore {
    messages: Mutex<Vec<ChatMessage>>,
    presence: Mutex<Vec<(UserId, bool)>>,
    reads: Mutex<Vec<(UserId, UserId)>>,
    partners: Mutex<HashMap<UserId, Vec<UserId>>>,
    fail_inserts: AtomicBool,
    next_id: AtomicI64,
}

impl MockStore {
    fn with_partners(pairs: &[(i64, i64)]) -> Arc<Self> {
        let store = Self::default();
        {
            let mut partners = store.partners.lock().unwrap();
            for &(a, b) in pairs {
                partners
                    .entry(UserId::new(a))
                    .or_default()
                    .push(UserId::new(b));
                partners
                    .entry(UserId::new(b))
                    .or_default()
                    .push(UserId::new(a));
            }
        }
        Arc::new(store)
    }

    fn message_count(&self) -> usize {
        self.messages.lock().unwrap().len()
    }

    fn presence_calls(&self, user: i64) -> Vec<bool> {
        self.presence
            .lock()
            .unwrap()
            .iter()
            .filter(|(id, _)| *id == UserId::new(user))
            .map(|(_, online)| *online)
            .collect()
    }
}

#[async_trait]
impl ChatStore for MockStore {
    async fn insert_message(
        &self,
        sender_id: UserId,
        receiver_id: UserId,
        content: &str,
        created_at: DateTime<Utc>,
    ) -> AppResult<ChatMessage> {
        if self.fail_inserts.load(Ordering::SeqCst) {
            return Err(AppError::database("insert failed"));
        }
        let id = self.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let message = ChatMessage {
            id: MessageId::new(id),
            sender_id,
            receiver_id,
            content: content.to_string(),
            created_at,
            read_at: None,
        };
        self.messages.lock().unwrap().push(message.clone());
        Ok(message)
    }

    async fn mark_conversation_read(
        &self,
        receiver_id: UserId,
        sender_id: UserId,
    ) -> AppResult<u64> {
        self.reads.lock().unwrap().push((receiver_id, sender_id));
        let mut rows = 0;
        for message in self.messages.lock().unwrap().iter_mut() {
            if message.receiver_id == receiver_id
                && message.sender_id == sender_id
                && message.read_at.is_none()
            {
                message.read_at = Some(Utc::now());
                rows += 1;
            }
        }
        Ok(rows)
    }

    async fn set_presence(
        &self,
        user_id: UserId,
        is_online: bool,
        _last_seen: DateTime<Utc>,
    ) -> AppResult<()> {
        self.presence.lock().unwrap().push((user_id, is_online));
        Ok(())
    }

    async fn conversation_partner_ids(&self, user_id: UserId) -> AppResult<Vec<UserId>> {
        Ok(self
            .partners
            .lock()
            .unwrap()
            .get(&user_id)
            .cloned()
            .unwrap_or_default())
    }
}

fn test_config() -> RealtimeConfig {
    RealtimeConfig {
        // Sweep far in the future unless a test opts in.
        sweep_interval_seconds: 3600,
        ..RealtimeConfig::default()
    }
}

fn start_hub(store: Arc<MockStore>, config: RealtimeConfig) -> HubHandle {
    let (hub, handle) = Hub::new(store, config);
    tokio::spawn(hub.run());
    handle
}

/// Register a connection for `user` with the given outbound queue depth.
async fn connect(
    hub: &HubHandle,
    user: i64,
    buffer: usize,
) -> (ConnectionId, mpsc::Receiver<String>) {
    let (handle, rx) = ConnectionHandle::channel(UserId::new(user), buffer);
    let conn_id = handle.id;
    hub.register(Arc::new(handle)).await.expect("hub running");
    (conn_id, rx)
}

/// Register a connection and wait for its own `status_update`, proving the
/// hub has drained every registration submitted before this one.
async fn connect_synced(
    hub: &HubHandle,
    user: i64,
    buffer: usize,
) -> (ConnectionId, mpsc::Receiver<String>) {
    let (conn_id, mut rx) = connect(hub, user, buffer).await;
    recv_status_for(&mut rx, user).await;
    (conn_id, rx)
}

/// Receive frames until one of the given type arrives.
async fn recv_frame(rx: &mut mpsc::Receiver<String>, frame_type: &str) -> serde_json::Value {
    loop {
        let payload = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for frame")
            .expect("outbound queue closed");
        let value: serde_json::Value = serde_json::from_str(&payload).expect("frame is JSON");
        if value["type"] == frame_type {
            return value;
        }
    }
}

/// Receive status frames until one about `user` arrives.
async fn recv_status_for(rx: &mut mpsc::Receiver<String>, user: i64) -> serde_json::Value {
    loop {
        let frame = recv_frame(rx, "status_update").await;
        if frame["user_id"] == user {
            return frame;
        }
    }
}

/// Poll until the condition holds; paused test time makes this cheap.
async fn wait_until(mut condition: impl FnMut() -> bool) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("condition never reached");
}

fn chat(conn: ConnectionId, from: i64, to: i64, content: &str) -> Inbound {
    Inbound::new(
        conn,
        UserId::new(from),
        ClientFrame::Message {
            content: content.to_string(),
            receiver_id: UserId::new(to),
            temp_id: None,
        },
    )
}

#[tokio::test(start_paused = true)]
async fn test_message_delivered_to_connected_receiver() {
    let store = MockStore::with_partners(&[]);
    let hub = start_hub(store.clone(), test_config());

    let (conn_a, _rx_a) = connect_synced(&hub, 1, 16).await;
    let (_conn_b, mut rx_b) = connect_synced(&hub, 2, 16).await;

    hub.submit(Inbound::new(
        conn_a,
        UserId::new(1),
        ClientFrame::Message {
            content: "hi".into(),
            receiver_id: UserId::new(2),
            temp_id: Some("t-7".into()),
        },
    ))
    .await
    .expect("hub running");

    let frame = recv_frame(&mut rx_b, "message").await;
    assert_eq!(frame["content"], "hi");
    assert_eq!(frame["sender_id"], 1);
    assert_eq!(frame["receiver_id"], 2);
    assert_eq!(frame["temp_id"], "t-7");

    let messages = store.messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert_eq!(messages[0].sender_id, UserId::new(1));
    assert_eq!(messages[0].receiver_id, UserId::new(2));
    assert_eq!(messages[0].content, "hi");
    assert!(messages[0].read_at.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_multi_tab_receiver_gets_every_frame() {
    let store = MockStore::with_partners(&[]);
    let hub = start_hub(store.clone(), test_config());

    let (conn_a, _rx_a) = connect_synced(&hub, 1, 16).await;
    let (_b1, mut rx_b1) = connect_synced(&hub, 2, 16).await;
    let (_b2, mut rx_b2) = connect(&hub, 2, 16).await;
    // Second tab emits no status frame; a sentinel registration behind it
    // proves it was processed.
    let _sentinel = connect_synced(&hub, 99, 16).await;

    hub.submit(chat(conn_a, 1, 2, "both tabs")).await.expect("hub running");

    assert_eq!(recv_frame(&mut rx_b1, "message").await["content"], "both tabs");
    assert_eq!(recv_frame(&mut rx_b2, "message").await["content"], "both tabs");
    assert_eq!(store.message_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_message_to_offline_receiver_persists_without_delivery() {
    let store = MockStore::with_partners(&[]);
    let hub = start_hub(store.clone(), test_config());

    let (conn_a, mut rx_a) = connect_synced(&hub, 1, 16).await;

    hub.submit(chat(conn_a, 1, 9, "into the void"))
        .await
        .expect("hub running");

    wait_until(|| store.message_count() == 1).await;

    // The sender never sees a delivery frame.
    let mut seen_delivery = false;
    while let Ok(payload) = rx_a.try_recv() {
        let value: serde_json::Value = serde_json::from_str(&payload).expect("frame is JSON");
        if value["type"] == "message" {
            seen_delivery = true;
        }
    }
    assert!(!seen_delivery);
}

#[tokio::test(start_paused = true)]
async fn test_heartbeat_never_persisted() {
    let store = MockStore::with_partners(&[]);
    let hub = start_hub(store.clone(), test_config());

    let (conn_a, _rx_a) = connect_synced(&hub, 1, 16).await;

    hub.submit(Inbound::heartbeat(conn_a, UserId::new(1)))
        .await
        .expect("hub running");
    // A chat message behind the heartbeat acts as an ordering barrier on
    // the inbound queue.
    hub.submit(chat(conn_a, 1, 2, "barrier")).await.expect("hub running");

    wait_until(|| store.message_count() == 1).await;
    assert_eq!(store.messages.lock().unwrap()[0].content, "barrier");
}

#[tokio::test(start_paused = true)]
async fn test_read_receipt_targets_own_inbox_and_repeats_safely() {
    let store = MockStore::with_partners(&[]);
    let hub = start_hub(store.clone(), test_config());

    let (conn_a, _rx_a) = connect_synced(&hub, 1, 16).await;
    let (conn_b, mut rx_b) = connect_synced(&hub, 2, 16).await;

    hub.submit(chat(conn_a, 1, 2, "unread")).await.expect("hub running");
    recv_frame(&mut rx_b, "message").await;

    for _ in 0..2 {
        hub.submit(Inbound::new(
            conn_b,
            UserId::new(2),
            ClientFrame::Read {
                sender_id: UserId::new(1),
            },
        ))
        .await
        .expect("hub running");
    }

    wait_until(|| store.reads.lock().unwrap().len() == 2).await;

    // Both receipts scope to (receiver = B, sender = A); only the first
    // transitions the row.
    let reads = store.reads.lock().unwrap();
    assert!(reads
        .iter()
        .all(|&(receiver, sender)| receiver == UserId::new(2) && sender == UserId::new(1)));
    let messages = store.messages.lock().unwrap();
    assert!(messages[0].read_at.is_some());
}

#[tokio::test(start_paused = true)]
async fn test_persist_failure_drops_without_delivery() {
    let store = MockStore::with_partners(&[]);
    let hub = start_hub(store.clone(), test_config());

    let (conn_a, _rx_a) = connect_synced(&hub, 1, 16).await;
    let (_conn_b, mut rx_b) = connect_synced(&hub, 2, 16).await;

    store.fail_inserts.store(true, Ordering::SeqCst);
    hub.submit(chat(conn_a, 1, 2, "lost")).await.expect("hub running");

    // Recovery: the next message goes through untouched.
    store.fail_inserts.store(false, Ordering::SeqCst);
    hub.submit(chat(conn_a, 1, 2, "after recovery"))
        .await
        .expect("hub running");

    let frame = recv_frame(&mut rx_b, "message").await;
    assert_eq!(frame["content"], "after recovery");
    assert_eq!(store.message_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_slow_consumer_torn_down_without_hub_impact() {
    let store = MockStore::with_partners(&[]);
    let hub = start_hub(store.clone(), test_config());

    let (conn_a, _rx_a) = connect_synced(&hub, 1, 16).await;
    // Depth-1 queue: the registration status_update saturates it.
    let (_conn_b, mut rx_b) = connect(&hub, 2, 1).await;
    let (_conn_c, mut rx_c) = connect_synced(&hub, 3, 16).await;

    hub.submit(chat(conn_a, 1, 2, "overflow")).await.expect("hub running");

    // B is evicted: message persisted, offline transition recorded, queue
    // closed behind the frames already buffered.
    wait_until(|| store.presence_calls(2) == vec![true, false]).await;
    assert_eq!(store.message_count(), 1);
    recv_status_for(&mut rx_b, 2).await;
    assert!(rx_b.recv().await.is_none());

    // The hub and other connections are unaffected.
    hub.submit(chat(conn_a, 1, 3, "still routing"))
        .await
        .expect("hub running");
    assert_eq!(
        recv_frame(&mut rx_c, "message").await["content"],
        "still routing"
    );
}

#[tokio::test(start_paused = true)]
async fn test_presence_transitions_fire_once_across_tabs() {
    let store = MockStore::with_partners(&[(1, 2)]);
    let hub = start_hub(store.clone(), test_config());

    let (_conn_b, mut rx_b) = connect_synced(&hub, 2, 16).await;
    let (conn_a1, _rx_a1) = connect_synced(&hub, 1, 16).await;
    let (conn_a2, _rx_a2) = connect(&hub, 1, 16).await;
    let _sentinel = connect_synced(&hub, 99, 16).await;

    // Exactly one online broadcast for A, heard by partner B; the store
    // write is visible no later than the frame.
    let online = recv_status_for(&mut rx_b, 1).await;
    assert_eq!(online["is_online"], true);
    assert_eq!(store.presence_calls(1), vec![true]);

    hub.unregister(conn_a1).await;
    hub.unregister(conn_a2).await;

    let offline = recv_status_for(&mut rx_b, 1).await;
    assert_eq!(offline["is_online"], false);
    assert!(offline["last_seen"].is_string());
    assert_eq!(store.presence_calls(1), vec![true, false]);
}

#[tokio::test(start_paused = true)]
async fn test_unregister_is_idempotent() {
    let store = MockStore::with_partners(&[]);
    let hub = start_hub(store.clone(), test_config());

    let (conn_a, mut rx_a) = connect_synced(&hub, 1, 16).await;
    hub.unregister(conn_a).await;
    hub.unregister(conn_a).await;

    wait_until(|| store.presence_calls(1) == vec![true, false]).await;
    // Extra unregisters never produce extra transitions.
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(store.presence_calls(1), vec![true, false]);

    // Queue closed exactly once.
    assert!(rx_a.recv().await.is_none());
}

#[tokio::test(start_paused = true)]
async fn test_sweep_evicts_half_open_connections() {
    let store = MockStore::with_partners(&[]);
    let config = RealtimeConfig {
        sweep_interval_seconds: 5,
        liveness_timeout_seconds: 0,
        ..RealtimeConfig::default()
    };
    let hub = start_hub(store.clone(), config);

    let (_conn_a, mut rx_a) = connect_synced(&hub, 1, 16).await;

    // Let the wall clock move past the connection's liveness stamp; no
    // liveness reports arrive in the meantime.
    std::thread::sleep(Duration::from_millis(5));

    wait_until(|| store.presence_calls(1) == vec![true, false]).await;
    assert!(rx_a.recv().await.is_none());
}
