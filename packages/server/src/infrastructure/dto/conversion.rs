//! Conversion logic between domain entities and DTOs.

use serde_json::{Map, Value};

use farmhub_shared::time::timestamp_to_rfc3339;

use crate::domain::{ChatMessage, UserProfile, catalog::ChatRoomInfo};
use crate::infrastructure::dto::{http, websocket as dto};

/// メッセージ本体のフィールドと衝突する追加フィールドは落とす
const RESERVED_MESSAGE_KEYS: [&str; 10] = [
    "content",
    "id",
    "userId",
    "userName",
    "userAvatar",
    "room",
    "timestamp",
    "reactions",
    "status",
    "type",
];

const RESERVED_PRIVATE_KEYS: [&str; 10] = [
    "recipientId",
    "content",
    "id",
    "senderId",
    "senderName",
    "senderAvatar",
    "timestamp",
    "type",
    "status",
    "userId",
];

fn without_reserved(mut extra: Map<String, Value>, reserved: &[&str]) -> Map<String, Value> {
    extra.retain(|key, _| !reserved.contains(&key.as_str()));
    extra
}

// ========================================
// Domain Entity → DTO
// ========================================

impl From<UserProfile> for dto::UserDto {
    fn from(model: UserProfile) -> Self {
        Self {
            id: model.id,
            name: model.name,
            avatar: model.avatar,
            socket_id: model.connection_id.into_string(),
            joined_at: timestamp_to_rfc3339(model.joined_at.value()),
            status: model.status,
            last_seen: model.last_seen.map(|t| timestamp_to_rfc3339(t.value())),
        }
    }
}

/// プロフィール一覧をワイヤー表現に変換
pub fn users_to_dto(profiles: Vec<UserProfile>) -> Vec<dto::UserDto> {
    profiles.into_iter().map(dto::UserDto::from).collect()
}

impl dto::ChatMessageDto {
    /// 記録済みのメッセージとクライアントの追加フィールドから配信用の表現を組み立てる
    pub fn from_message(model: ChatMessage, extra: Map<String, Value>) -> Self {
        Self {
            extra: without_reserved(extra, &RESERVED_MESSAGE_KEYS),
            content: model.content,
            id: model.id,
            user_id: model.user_id,
            user_name: model.user_name,
            user_avatar: model.user_avatar,
            room: model.room.as_str().to_string(),
            timestamp: timestamp_to_rfc3339(model.created_at.value()),
            reactions: Vec::new(),
            status: model.status,
        }
    }
}

impl From<ChatMessage> for dto::ChatMessageDto {
    fn from(model: ChatMessage) -> Self {
        Self::from_message(model, Map::new())
    }
}

impl dto::PrivateMessageDto {
    pub fn strip_reserved(extra: Map<String, Value>) -> Map<String, Value> {
        without_reserved(extra, &RESERVED_PRIVATE_KEYS)
    }
}

impl From<&ChatRoomInfo> for http::RoomSummaryDto {
    fn from(info: &ChatRoomInfo) -> Self {
        Self {
            id: info.id.to_string(),
            name: info.name.to_string(),
            description: info.description.to_string(),
        }
    }
}
