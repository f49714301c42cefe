//! UseCase: プレゼンス情報の参照（HTTP API 用）

use std::sync::Arc;

use crate::{
    domain::{
        Namespace, PresenceRepository, RoomId, catalog::find_chat_room, default_chat_rooms,
    },
    infrastructure::dto::{
        conversion::users_to_dto,
        http::{RoomDetailDto, RoomSummaryDto, SocketHealthDto, SocketStatusDto},
        websocket::{ChatMessageDto, UserDto},
    },
};

pub struct PresenceQueryUseCase {
    repository: Arc<dyn PresenceRepository>,
}

impl PresenceQueryUseCase {
    pub fn new(repository: Arc<dyn PresenceRepository>) -> Self {
        Self { repository }
    }

    /// 固定のルームカタログ
    pub fn rooms(&self) -> Vec<RoomSummaryDto> {
        default_chat_rooms().iter().map(RoomSummaryDto::from).collect()
    }

    /// ルームの詳細（現在のメンバーと最近のメッセージ）
    ///
    /// カタログに無く、誰もいないルームは `None`。
    pub async fn room_detail(&self, room_id: &str) -> Option<RoomDetailDto> {
        let room = RoomId::new(room_id.to_string()).ok()?;
        let members = self.repository.room_profiles(&room).await;
        let catalogued = find_chat_room(room.as_str());
        if catalogued.is_none() && members.is_empty() {
            return None;
        }

        let (name, description) = catalogued
            .map(|info| (info.name.to_string(), info.description.to_string()))
            .unwrap_or_else(|| (room.as_str().to_string(), String::new()));
        let messages = self
            .repository
            .recent_messages(&room)
            .await
            .into_iter()
            .map(ChatMessageDto::from)
            .collect();

        Some(RoomDetailDto {
            id: room.as_str().to_string(),
            name,
            description,
            members: users_to_dto(members),
            messages,
        })
    }

    pub async fn online_users(&self) -> Vec<UserDto> {
        users_to_dto(self.repository.online_users().await)
    }

    pub async fn socket_health(&self) -> SocketHealthDto {
        SocketHealthDto {
            ok: true,
            engine_clients: self.repository.connection_count().await,
            namespaces: Namespace::ALL.iter().map(Namespace::path).collect(),
            rooms: self.room_names().await,
        }
    }

    pub async fn socket_status(&self) -> SocketStatusDto {
        let rooms = self.room_names().await;
        SocketStatusDto {
            ok: true,
            connected_users: self.online_users().await,
            room_count: rooms.len(),
            rooms,
        }
    }

    async fn room_names(&self) -> Vec<String> {
        self.repository
            .occupancy()
            .await
            .into_iter()
            .filter(|entry| entry.key.namespace() == Namespace::Default)
            .map(|entry| entry.key.name().to_string())
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChatMessage, ConnectionId, Timestamp};
    use crate::usecase::test_support::{Harness, NOW};

    async fn seeded() -> (Harness, PresenceQueryUseCase) {
        let harness = Harness::new();
        let (alice, _rx) = harness.connect("alice", Namespace::Default).await;
        let profile = crate::domain::UserProfile::new(
            "u-1".to_string(),
            "Alice".to_string(),
            None,
            alice.clone(),
            Timestamp::new(NOW),
        );
        harness
            .repository
            .join(&alice, profile.clone(), RoomId::new("barn".to_string()).unwrap())
            .await
            .unwrap();
        harness
            .repository
            .record_message(ChatMessage::sent_by(
                &profile,
                RoomId::new("barn".to_string()).unwrap(),
                "Hay delivered".to_string(),
                Timestamp::new(NOW),
            ))
            .await;
        let usecase = PresenceQueryUseCase::new(harness.repository.clone());
        (harness, usecase)
    }

    #[tokio::test]
    async fn test_room_catalogue_lists_six_rooms() {
        // テスト項目: カタログは 6 つの固定ルームを返す
        let usecase = PresenceQueryUseCase::new(Harness::new().repository);

        let rooms = usecase.rooms();

        assert_eq!(rooms.len(), 6);
        assert_eq!(rooms[0].id, "general");
        assert_eq!(rooms[4].name, "Expert Q&A");
    }

    #[tokio::test]
    async fn test_room_detail_for_occupied_room() {
        // テスト項目: カタログ外でも誰かがいるルームは詳細を返す
        // given (前提条件):
        let (_harness, usecase) = seeded().await;

        // when (操作):
        let detail = usecase.room_detail("barn").await.unwrap();

        // then (期待する結果):
        assert_eq!(detail.name, "barn");
        assert_eq!(detail.members.len(), 1);
        assert_eq!(detail.messages[0].content, "Hay delivered");
    }

    #[tokio::test]
    async fn test_room_detail_catalogued_and_unknown() {
        // テスト項目: 空のカタログルームは詳細を返し、カタログ外の空ルームは None
        let (_harness, usecase) = seeded().await;

        let market = usecase.room_detail("market").await.unwrap();
        let unknown = usecase.room_detail("nowhere").await;

        assert_eq!(market.name, "Market Prices");
        assert!(market.members.is_empty());
        assert!(unknown.is_none());
    }

    #[tokio::test]
    async fn test_socket_status_counts_users_and_rooms() {
        // テスト項目: ソケット状態に接続中のユーザーと使用中のルームが含まれる
        // given (前提条件):
        let (harness, usecase) = seeded().await;
        let bob = ConnectionId::new("bob".to_string()).unwrap();
        harness
            .repository
            .register_connection(bob, Namespace::Queries, Timestamp::new(NOW))
            .await
            .unwrap();

        // when (操作):
        let status = usecase.socket_status().await;
        let health = usecase.socket_health().await;

        // then (期待する結果):
        assert_eq!(status.connected_users.len(), 1);
        assert_eq!(status.rooms, vec!["barn".to_string()]);
        assert_eq!(status.room_count, 1);
        assert_eq!(health.engine_clients, 2);
        assert_eq!(health.namespaces, vec!["/", "/queries"]);
    }
}
