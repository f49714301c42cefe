//! UseCase のテスト用ヘルパー

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::mpsc;

use farmhub_shared::time::{Clock, FixedClock};

use crate::{
    domain::{ConnectionId, MessagePusher, Namespace, PresenceRepository, Timestamp},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryPresenceRepository,
    },
};

pub const NOW: i64 = 1_700_000_000_000;

pub struct Harness {
    pub repository: Arc<dyn PresenceRepository>,
    pub pusher: Arc<dyn MessagePusher>,
    pub clock: Arc<dyn Clock>,
}

impl Harness {
    pub fn new() -> Self {
        Self {
            repository: Arc::new(InMemoryPresenceRepository::default()),
            pusher: Arc::new(WebSocketMessagePusher::default()),
            clock: Arc::new(FixedClock::new(NOW)),
        }
    }

    /// 接続を登録し、その接続宛てのメッセージを受け取る receiver を返す
    pub async fn connect(
        &self,
        id: &str,
        namespace: Namespace,
    ) -> (ConnectionId, mpsc::UnboundedReceiver<String>) {
        let connection_id = ConnectionId::new(id.to_string()).unwrap();
        let (tx, rx) = mpsc::unbounded_channel();
        self.repository
            .register_connection(connection_id.clone(), namespace, Timestamp::new(NOW))
            .await
            .unwrap();
        self.pusher.register_client(connection_id.clone(), tx).await;
        (connection_id, rx)
    }
}

/// 受信済みのメッセージを全て取り出す
pub fn drain(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<Value> {
    let mut events = Vec::new();
    while let Ok(text) = rx.try_recv() {
        events.push(serde_json::from_str(&text).unwrap());
    }
    events
}

/// 受信済みのイベント名
pub fn event_names(rx: &mut mpsc::UnboundedReceiver<String>) -> Vec<String> {
    drain(rx)
        .into_iter()
        .map(|value| value["event"].as_str().unwrap_or_default().to_string())
        .collect()
}
