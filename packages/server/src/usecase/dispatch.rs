//! サーバーイベントの配信
//!
//! `ServerEvent` を 1 回だけシリアライズし、MessagePusher 経由で宛先へ送ります。

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, MessagePushError, MessagePusher},
    infrastructure::dto::websocket::ServerEvent,
};

#[derive(Clone)]
pub struct EventDispatcher {
    message_pusher: Arc<dyn MessagePusher>,
}

impl EventDispatcher {
    pub fn new(message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self { message_pusher }
    }

    pub fn pusher(&self) -> &Arc<dyn MessagePusher> {
        &self.message_pusher
    }

    /// 1 つの接続へ送信
    pub async fn send_to(
        &self,
        target: &ConnectionId,
        event: &ServerEvent,
    ) -> Result<(), MessagePushError> {
        let json = encode(event)?;
        self.message_pusher.push_to(target, &json).await
    }

    /// 複数の接続へ送信（宛先が空なら何もしない）
    pub async fn send_to_many(
        &self,
        targets: Vec<ConnectionId>,
        event: &ServerEvent,
    ) -> Result<(), MessagePushError> {
        if targets.is_empty() {
            return Ok(());
        }
        let json = encode(event)?;
        tracing::debug!(event = event.name(), targets = targets.len(), "broadcasting");
        self.message_pusher.broadcast(targets, &json).await
    }
}

fn encode(event: &ServerEvent) -> Result<String, MessagePushError> {
    event
        .to_json()
        .map_err(|e| MessagePushError::PushFailed(format!("failed to encode {}: {e}", event.name())))
}

/// `exclude` を除いた宛先
pub fn except(targets: Vec<ConnectionId>, exclude: &ConnectionId) -> Vec<ConnectionId> {
    targets.into_iter().filter(|id| id != exclude).collect()
}
