//! InMemory Presence Repository 実装
//!
//! ドメイン層が定義する PresenceRepository trait の具体的な実装。
//! `PresenceRegistry` を Mutex で保護し、単一の書き込み者として扱います。
//! 各メソッドはロックを 1 回だけ取得するため、1 イベント分の状態変更が途中で観測されることはありません。

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    ChatMessage, ConnectionId, Departure, JoinOutcome, Namespace, PresenceRegistry,
    PresenceRepository, RepositoryError, RoomId, RoomKey, RoomOccupancy, SwitchOutcome,
    Timestamp, TypingChange, UserProfile, UserStatus,
};

/// インメモリ Presence Repository 実装
pub struct InMemoryPresenceRepository {
    registry: Arc<Mutex<PresenceRegistry>>,
}

impl InMemoryPresenceRepository {
    pub fn new(registry: Arc<Mutex<PresenceRegistry>>) -> Self {
        Self { registry }
    }
}

impl Default for InMemoryPresenceRepository {
    fn default() -> Self {
        Self::new(Arc::new(Mutex::new(PresenceRegistry::new())))
    }
}

#[async_trait]
impl PresenceRepository for InMemoryPresenceRepository {
    async fn register_connection(
        &self,
        connection_id: ConnectionId,
        namespace: Namespace,
        connected_at: Timestamp,
    ) -> Result<(), RepositoryError> {
        let mut registry = self.registry.lock().await;
        registry.register(connection_id, namespace, connected_at)
    }

    async fn join(
        &self,
        connection_id: &ConnectionId,
        profile: UserProfile,
        room: RoomId,
    ) -> Result<JoinOutcome, RepositoryError> {
        let mut registry = self.registry.lock().await;
        registry.join(connection_id, profile, room)
    }

    async fn switch_room(
        &self,
        connection_id: &ConnectionId,
        room: RoomId,
    ) -> Result<SwitchOutcome, RepositoryError> {
        let mut registry = self.registry.lock().await;
        registry.switch_room(connection_id, room)
    }

    async fn join_query(
        &self,
        connection_id: &ConnectionId,
        key: RoomKey,
    ) -> Result<(), RepositoryError> {
        let mut registry = self.registry.lock().await;
        registry.join_query(connection_id, key)
    }

    async fn leave_query(
        &self,
        connection_id: &ConnectionId,
        key: &RoomKey,
    ) -> Result<bool, RepositoryError> {
        let mut registry = self.registry.lock().await;
        registry.leave_query(connection_id, key)
    }

    async fn chat_context(&self, connection_id: &ConnectionId) -> Option<(UserProfile, RoomId)> {
        let registry = self.registry.lock().await;
        registry.chat_context(connection_id)
    }

    async fn profile(&self, connection_id: &ConnectionId) -> Option<UserProfile> {
        let registry = self.registry.lock().await;
        registry.profile(connection_id).cloned()
    }

    async fn find_by_user_id(&self, user_id: &str) -> Option<UserProfile> {
        let registry = self.registry.lock().await;
        registry.find_by_user_id(user_id).cloned()
    }

    async fn members(&self, key: &RoomKey) -> Vec<ConnectionId> {
        let registry = self.registry.lock().await;
        registry.members(key)
    }

    async fn room_profiles(&self, room: &RoomId) -> Vec<UserProfile> {
        let registry = self.registry.lock().await;
        registry.room_profiles(room)
    }

    async fn start_typing(&self, connection_id: &ConnectionId) -> Option<TypingChange> {
        let mut registry = self.registry.lock().await;
        registry.start_typing(connection_id)
    }

    async fn stop_typing(&self, connection_id: &ConnectionId) -> Option<TypingChange> {
        let mut registry = self.registry.lock().await;
        registry.stop_typing(connection_id)
    }

    async fn typing_users(&self, room: &RoomId) -> Vec<String> {
        let registry = self.registry.lock().await;
        registry.typing_users(room)
    }

    async fn set_status(
        &self,
        connection_id: &ConnectionId,
        status: UserStatus,
    ) -> Option<UserProfile> {
        let mut registry = self.registry.lock().await;
        registry.set_status(connection_id, status)
    }

    async fn record_message(&self, message: ChatMessage) {
        let mut registry = self.registry.lock().await;
        registry.record_message(message);
    }

    async fn recent_messages(&self, room: &RoomId) -> Vec<ChatMessage> {
        let registry = self.registry.lock().await;
        registry.recent_messages(room)
    }

    async fn disconnect(
        &self,
        connection_id: &ConnectionId,
        disconnected_at: Timestamp,
    ) -> Option<Departure> {
        let mut registry = self.registry.lock().await;
        registry.disconnect(connection_id, disconnected_at)
    }

    async fn connections(&self, namespace: Namespace) -> Vec<ConnectionId> {
        let registry = self.registry.lock().await;
        registry.connections(namespace)
    }

    async fn connection_count(&self) -> usize {
        let registry = self.registry.lock().await;
        registry.connection_count()
    }

    async fn online_users(&self) -> Vec<UserProfile> {
        let registry = self.registry.lock().await;
        registry.online_users()
    }

    async fn occupancy(&self) -> Vec<RoomOccupancy> {
        let registry = self.registry.lock().await;
        registry.occupancy()
    }
}
