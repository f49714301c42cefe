//! エンティティ

use serde::Serialize;

use super::value_object::{ConnectionId, RoomId, Timestamp, UserStatus};

/// ユーザープロフィール
///
/// `user_join` イベントで生成され、接続の切断とともに破棄されます（永続化しない）。
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// クライアントが名乗るユーザー ID（認証サービス側の ID）
    pub id: String,
    /// 表示名（重複を許容する）
    pub name: String,
    pub avatar: Option<String>,
    /// このプロフィールを所有する接続
    pub connection_id: ConnectionId,
    pub status: UserStatus,
    pub joined_at: Timestamp,
    pub last_seen: Option<Timestamp>,
}

impl UserProfile {
    pub fn new(
        id: String,
        name: String,
        avatar: Option<String>,
        connection_id: ConnectionId,
        joined_at: Timestamp,
    ) -> Self {
        Self {
            id,
            name,
            avatar,
            connection_id,
            status: UserStatus::Online,
            joined_at,
            last_seen: None,
        }
    }
}

/// 配信状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sending,
    Sent,
}

/// ルームに送信されたチャットメッセージ
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub room: RoomId,
    pub content: String,
    pub created_at: Timestamp,
    pub status: DeliveryStatus,
}

impl ChatMessage {
    /// サーバー側で ID を採番して送信済みメッセージを作成
    pub fn sent_by(author: &UserProfile, room: RoomId, content: String, created_at: Timestamp) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            user_id: author.id.clone(),
            user_name: author.name.clone(),
            user_avatar: author.avatar.clone(),
            room,
            content,
            created_at,
            status: DeliveryStatus::Sent,
        }
    }
}
