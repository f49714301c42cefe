//! WebSocket のワイヤーフォーマット
//!
//! 送受信ともに `{"event": "<name>", "data": <json>}` のエンベロープを使います。
//! 受信したフレームは境界で `ClientEvent` にデコードし、不正なフレームは
//! `EventRejection` として送信者に返します。

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::domain::{
    DeliveryStatus, HistoryEntry, NetworkMetrics, QueryId, RoomId, SensorNetworkStatus,
    SensorSnapshot, UserStatus,
};

use super::http::NetworkStatusDto;

// ========================================
// Client → Server
// ========================================

/// 受信フレームのエンベロープ
#[derive(Debug, Deserialize)]
pub struct Envelope {
    pub event: String,
    #[serde(default)]
    pub data: Value,
}

/// 受信フレームを拒否した理由
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("rejected event {event:?}: {reason}")]
pub struct EventRejection {
    /// 判別できた場合のイベント名
    pub event: Option<String>,
    pub reason: String,
}

impl EventRejection {
    fn new(event: Option<&str>, reason: impl Into<String>) -> Self {
        Self {
            event: event.map(str::to_string),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserJoinPayload {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub room: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SendMessagePayload {
    pub content: String,
    /// クライアントが付けた追加フィールド（そのまま中継する）
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessagePayload {
    pub recipient_id: String,
    pub content: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionPayload {
    pub message_id: String,
    pub emoji: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SensorAction {
    Toggle,
    Calibrate,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SensorControlPayload {
    pub action: SensorAction,
    pub sensor_id: String,
}

/// 質問スレッド系イベントの共通ペイロード
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPayload {
    pub query_id: QueryId,
    /// `queryId` を含む受信データ全体
    pub body: Map<String, Value>,
}

impl QueryPayload {
    pub fn user(&self) -> Option<Value> {
        self.body.get("user").cloned()
    }

    pub fn id(&self) -> Option<Value> {
        self.body.get("id").cloned()
    }
}

/// 質問スレッドのイベント（両方の名前空間で受け付ける）
#[derive(Debug, Clone, PartialEq)]
pub enum QueryEvent {
    Join(QueryPayload),
    Leave(QueryPayload),
    Post(QueryPayload),
    Comment(QueryPayload),
    Typing { payload: QueryPayload, typing: bool },
}

/// クライアントから受信したイベント
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    UserJoin(UserJoinPayload),
    JoinRoom(RoomId),
    SendMessage(SendMessagePayload),
    SendPrivateMessage(PrivateMessagePayload),
    TypingStart,
    TypingStop,
    AddReaction(ReactionPayload),
    ShareFile(Value),
    SendVoiceMessage(Value),
    MarkMessageRead(String),
    UpdateStatus(UserStatus),
    NetworkPing(Map<String, Value>),
    RequestNetworkStatus,
    RequestSensorsData,
    SensorControl(SensorControlPayload),
    Query(QueryEvent),
}

impl ClientEvent {
    /// テキストフレームをデコード
    pub fn parse(text: &str) -> Result<Self, EventRejection> {
        let envelope: Envelope = serde_json::from_str(text)
            .map_err(|e| EventRejection::new(None, format!("malformed envelope: {e}")))?;
        Self::from_envelope(envelope)
    }

    pub fn from_envelope(envelope: Envelope) -> Result<Self, EventRejection> {
        let Envelope { event, data } = envelope;
        let name = event.as_str();

        match name {
            "user_join" => {
                let mut payload: UserJoinPayload = decode(name, data)?;
                // 空のルームは既定ルーム扱い、それ以外は join_room と同じ検証を通す
                if let Some(room) = payload.room.take().filter(|r| !r.trim().is_empty()) {
                    let room = RoomId::new(room)
                        .map_err(|e| EventRejection::new(Some(name), e.to_string()))?;
                    payload.room = Some(room.as_str().to_string());
                }
                Ok(ClientEvent::UserJoin(payload))
            }
            "join_room" => {
                let room: String = decode(name, data)?;
                RoomId::new(room)
                    .map(ClientEvent::JoinRoom)
                    .map_err(|e| EventRejection::new(Some(name), e.to_string()))
            }
            "send_message" => decode(name, data).map(ClientEvent::SendMessage),
            "send_private_message" => decode(name, data).map(ClientEvent::SendPrivateMessage),
            "typing_start" => Ok(ClientEvent::TypingStart),
            "typing_stop" => Ok(ClientEvent::TypingStop),
            "add_reaction" => decode(name, data).map(ClientEvent::AddReaction),
            "share_file" => Ok(ClientEvent::ShareFile(data)),
            "send_voice_message" => Ok(ClientEvent::SendVoiceMessage(data)),
            "mark_message_read" => identifier(&data)
                .map(ClientEvent::MarkMessageRead)
                .ok_or_else(|| EventRejection::new(Some(name), "message id is required")),
            "update_status" => {
                let status: String = decode(name, data)?;
                UserStatus::try_from(status)
                    .map(ClientEvent::UpdateStatus)
                    .map_err(|e| EventRejection::new(Some(name), e.to_string()))
            }
            "network:ping" => match data {
                Value::Object(map) => Ok(ClientEvent::NetworkPing(map)),
                Value::Null => Ok(ClientEvent::NetworkPing(Map::new())),
                _ => Err(EventRejection::new(Some(name), "data must be an object")),
            },
            "request:network:status" => Ok(ClientEvent::RequestNetworkStatus),
            "request:sensors:data" => Ok(ClientEvent::RequestSensorsData),
            "sensor:control" => decode(name, data).map(ClientEvent::SensorControl),
            "join_query" => query_payload(name, data).map(|p| ClientEvent::Query(QueryEvent::Join(p))),
            "leave_query" => query_payload(name, data).map(|p| ClientEvent::Query(QueryEvent::Leave(p))),
            "query:post" => query_payload(name, data).map(|p| ClientEvent::Query(QueryEvent::Post(p))),
            "query:comment" => {
                query_payload(name, data).map(|p| ClientEvent::Query(QueryEvent::Comment(p)))
            }
            "query:typing:start" => query_payload(name, data).map(|payload| {
                ClientEvent::Query(QueryEvent::Typing {
                    payload,
                    typing: true,
                })
            }),
            "query:typing:stop" => query_payload(name, data).map(|payload| {
                ClientEvent::Query(QueryEvent::Typing {
                    payload,
                    typing: false,
                })
            }),
            _ => Err(EventRejection::new(Some(name), "unknown event")),
        }
    }

    /// 質問スレッド系のイベントであれば取り出す
    pub fn into_query(self) -> Option<QueryEvent> {
        match self {
            ClientEvent::Query(event) => Some(event),
            _ => None,
        }
    }
}

fn decode<T: DeserializeOwned>(event: &str, data: Value) -> Result<T, EventRejection> {
    serde_json::from_value(data).map_err(|e| EventRejection::new(Some(event), e.to_string()))
}

/// 文字列または数値の ID を文字列として取り出す
fn identifier(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn query_payload(event: &str, data: Value) -> Result<QueryPayload, EventRejection> {
    let Value::Object(body) = data else {
        return Err(EventRejection::new(Some(event), "data must be an object"));
    };
    let query_id = body
        .get("queryId")
        .and_then(identifier)
        .ok_or_else(|| EventRejection::new(Some(event), "queryId is required"))?;
    let query_id =
        QueryId::new(query_id).map_err(|e| EventRejection::new(Some(event), e.to_string()))?;
    Ok(QueryPayload { query_id, body })
}

// ========================================
// Server → Client
// ========================================

/// ワイヤー上のユーザー表現
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    pub socket_id: String,
    pub joined_at: String,
    pub status: UserStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WelcomeDto {
    pub ok: bool,
    pub ts: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDto {
    pub event: Option<String>,
    pub reason: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomChangeDto {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserDto>,
    pub room: String,
}

/// ルームに配信されるチャットメッセージ
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessageDto {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub content: String,
    pub id: String,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub room: String,
    pub timestamp: String,
    pub reactions: Vec<Value>,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivateMessageDto {
    #[serde(flatten)]
    pub extra: Map<String, Value>,
    pub recipient_id: String,
    pub content: String,
    pub id: String,
    pub sender_id: String,
    pub sender_name: String,
    pub sender_avatar: Option<String>,
    pub timestamp: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingDto {
    pub user_name: String,
    pub room: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReactionDto {
    pub message_id: String,
    pub emoji: String,
    pub user_id: String,
    pub user_name: String,
    pub timestamp: String,
}

/// ファイル共有・音声メッセージ
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentMessageDto {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub user_id: String,
    pub user_name: String,
    pub user_avatar: Option<String>,
    pub room: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub voice_data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<Value>,
    pub timestamp: String,
    pub status: DeliveryStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadReceiptDto {
    pub message_id: String,
    pub read_by: String,
    pub read_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChangeDto {
    pub user_id: String,
    pub status: UserStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
}

/// `network:metrics` のペイロード
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetailedMetricsDto {
    #[serde(flatten)]
    pub metrics: NetworkMetrics,
    pub history: Vec<HistoryEntry>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryMemberDto {
    pub query_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryTypingDto {
    pub query_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
    pub typing: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryAckDto {
    pub ok: bool,
    pub query_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
}

/// サーバーから送信するイベント
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerEvent {
    #[serde(rename = "server:welcome")]
    Welcome(WelcomeDto),
    #[serde(rename = "error")]
    Error(ErrorDto),
    #[serde(rename = "user_joined")]
    UserJoined(UserDto),
    #[serde(rename = "online_users")]
    OnlineUsers(Vec<UserDto>),
    #[serde(rename = "user_left_room")]
    UserLeftRoom(RoomChangeDto),
    #[serde(rename = "user_joined_room")]
    UserJoinedRoom(RoomChangeDto),
    #[serde(rename = "room_users")]
    RoomUsers(Vec<UserDto>),
    #[serde(rename = "receive_message")]
    ReceiveMessage(ChatMessageDto),
    #[serde(rename = "receive_private_message")]
    ReceivePrivateMessage(PrivateMessageDto),
    #[serde(rename = "private_message_sent")]
    PrivateMessageSent(PrivateMessageDto),
    #[serde(rename = "user_typing")]
    UserTyping(TypingDto),
    #[serde(rename = "user_stop_typing")]
    UserStopTyping(TypingDto),
    #[serde(rename = "message_reaction")]
    MessageReaction(ReactionDto),
    #[serde(rename = "receive_file")]
    ReceiveFile(AttachmentMessageDto),
    #[serde(rename = "receive_voice_message")]
    ReceiveVoiceMessage(AttachmentMessageDto),
    #[serde(rename = "message_read")]
    MessageRead(ReadReceiptDto),
    #[serde(rename = "user_status_changed")]
    UserStatusChanged(StatusChangeDto),
    #[serde(rename = "user_left")]
    UserLeft(UserDto),
    #[serde(rename = "network:pong")]
    NetworkPong(Map<String, Value>),
    #[serde(rename = "network:status")]
    NetworkStatus(NetworkStatusDto),
    #[serde(rename = "network:realtime")]
    NetworkRealtime(HistoryEntry),
    #[serde(rename = "network:metrics")]
    NetworkMetrics(DetailedMetricsDto),
    #[serde(rename = "sensors:status")]
    SensorsStatus(SensorNetworkStatus),
    #[serde(rename = "sensors:data")]
    SensorsData(BTreeMap<String, SensorSnapshot>),
    #[serde(rename = "query:user_joined")]
    QueryUserJoined(QueryMemberDto),
    #[serde(rename = "query:user_left")]
    QueryUserLeft(QueryMemberDto),
    #[serde(rename = "query:new_post")]
    QueryNewPost(Map<String, Value>),
    #[serde(rename = "query:post:ack")]
    QueryPostAck(QueryAckDto),
    #[serde(rename = "query:new_comment")]
    QueryNewComment(Map<String, Value>),
    #[serde(rename = "query:typing")]
    QueryTyping(QueryTypingDto),
}

impl ServerEvent {
    /// ログ用のイベント名
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::Welcome(_) => "server:welcome",
            ServerEvent::Error(_) => "error",
            ServerEvent::UserJoined(_) => "user_joined",
            ServerEvent::OnlineUsers(_) => "online_users",
            ServerEvent::UserLeftRoom(_) => "user_left_room",
            ServerEvent::UserJoinedRoom(_) => "user_joined_room",
            ServerEvent::RoomUsers(_) => "room_users",
            ServerEvent::ReceiveMessage(_) => "receive_message",
            ServerEvent::ReceivePrivateMessage(_) => "receive_private_message",
            ServerEvent::PrivateMessageSent(_) => "private_message_sent",
            ServerEvent::UserTyping(_) => "user_typing",
            ServerEvent::UserStopTyping(_) => "user_stop_typing",
            ServerEvent::MessageReaction(_) => "message_reaction",
            ServerEvent::ReceiveFile(_) => "receive_file",
            ServerEvent::ReceiveVoiceMessage(_) => "receive_voice_message",
            ServerEvent::MessageRead(_) => "message_read",
            ServerEvent::UserStatusChanged(_) => "user_status_changed",
            ServerEvent::UserLeft(_) => "user_left",
            ServerEvent::NetworkPong(_) => "network:pong",
            ServerEvent::NetworkStatus(_) => "network:status",
            ServerEvent::NetworkRealtime(_) => "network:realtime",
            ServerEvent::NetworkMetrics(_) => "network:metrics",
            ServerEvent::SensorsStatus(_) => "sensors:status",
            ServerEvent::SensorsData(_) => "sensors:data",
            ServerEvent::QueryUserJoined(_) => "query:user_joined",
            ServerEvent::QueryUserLeft(_) => "query:user_left",
            ServerEvent::QueryNewPost(_) => "query:new_post",
            ServerEvent::QueryPostAck(_) => "query:post:ack",
            ServerEvent::QueryNewComment(_) => "query:new_comment",
            ServerEvent::QueryTyping(_) => "query:typing",
        }
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::MAX_ROOM_ID_LENGTH;
    use serde_json::json;

    #[test]
    fn test_parse_user_join() {
        // テスト項目: user_join のエンベロープが型付きイベントにデコードされる
        // given (前提条件):
        let text = r#"{"event":"user_join","data":{"id":"u-1","name":"Alice","room":"crops"}}"#;

        // when (操作):
        let event = ClientEvent::parse(text).unwrap();

        // then (期待する結果):
        assert_eq!(
            event,
            ClientEvent::UserJoin(UserJoinPayload {
                id: "u-1".to_string(),
                name: "Alice".to_string(),
                avatar: None,
                room: Some("crops".to_string()),
            })
        );
    }

    #[test]
    fn test_parse_send_message_keeps_extra_fields() {
        // テスト項目: send_message の追加フィールドは保持される
        let text = r#"{"event":"send_message","data":{"content":"Hello","replyTo":"m-1"}}"#;

        let ClientEvent::SendMessage(payload) = ClientEvent::parse(text).unwrap() else {
            panic!("expected send_message");
        };

        assert_eq!(payload.content, "Hello");
        assert_eq!(payload.extra.get("replyTo"), Some(&json!("m-1")));
    }

    #[test]
    fn test_parse_events_without_data() {
        // テスト項目: data を持たないイベントも受け付ける
        assert_eq!(
            ClientEvent::parse(r#"{"event":"typing_start"}"#).unwrap(),
            ClientEvent::TypingStart
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"network:ping"}"#).unwrap(),
            ClientEvent::NetworkPing(Map::new())
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"request:sensors:data"}"#).unwrap(),
            ClientEvent::RequestSensorsData
        );
    }

    #[test]
    fn test_parse_query_event_accepts_numeric_query_id() {
        // テスト項目: queryId は数値でも受け付け、受信データ全体が保持される
        let text = r#"{"event":"query:post","data":{"queryId":42,"id":"p-1","text":"why?"}}"#;

        let event = ClientEvent::parse(text).unwrap().into_query().unwrap();

        let QueryEvent::Post(payload) = event else {
            panic!("expected query:post");
        };
        assert_eq!(payload.query_id.as_str(), "42");
        assert_eq!(payload.id(), Some(json!("p-1")));
        assert_eq!(payload.body.get("text"), Some(&json!("why?")));
    }

    #[test]
    fn test_reject_malformed_frames() {
        // テスト項目: 不正なフレームは理由付きで拒否される
        // 1. JSON でない
        let rejection = ClientEvent::parse("hello").unwrap_err();
        assert_eq!(rejection.event, None);

        // 2. 未知のイベント
        let rejection = ClientEvent::parse(r#"{"event":"drop_tables","data":{}}"#).unwrap_err();
        assert_eq!(rejection.event.as_deref(), Some("drop_tables"));
        assert_eq!(rejection.reason, "unknown event");

        // 3. 必須フィールドの欠落
        let rejection = ClientEvent::parse(r#"{"event":"send_message","data":{}}"#).unwrap_err();
        assert_eq!(rejection.event.as_deref(), Some("send_message"));

        // 4. queryId の欠落
        let rejection = ClientEvent::parse(r#"{"event":"join_query","data":{"user":"a"}}"#).unwrap_err();
        assert_eq!(rejection.reason, "queryId is required");

        // 5. 未知のステータス
        assert!(ClientEvent::parse(r#"{"event":"update_status","data":"away"}"#).is_err());

        // 6. 空のルーム ID
        assert!(ClientEvent::parse(r#"{"event":"join_room","data":"  "}"#).is_err());

        // 7. user_join の長すぎるルーム ID
        let frame = json!({
            "event": "user_join",
            "data": {"id": "u-1", "name": "Alice", "room": "x".repeat(MAX_ROOM_ID_LENGTH + 1)}
        })
        .to_string();
        let rejection = ClientEvent::parse(&frame).unwrap_err();
        assert_eq!(rejection.event.as_deref(), Some("user_join"));
    }

    #[test]
    fn test_parse_user_join_blank_room_falls_back_to_default() {
        // テスト項目: user_join の空白のみのルームは未指定として扱われ、前後の空白は除去される
        // when (操作):
        let blank = ClientEvent::parse(r#"{"event":"user_join","data":{"id":"u-1","name":"A","room":"  "}}"#);
        let padded = ClientEvent::parse(r#"{"event":"user_join","data":{"id":"u-1","name":"A","room":" crops "}}"#);

        // then (期待する結果):
        let Ok(ClientEvent::UserJoin(blank)) = blank else {
            panic!("expected user_join");
        };
        let Ok(ClientEvent::UserJoin(padded)) = padded else {
            panic!("expected user_join");
        };
        assert_eq!(blank.room, None);
        assert_eq!(padded.room.as_deref(), Some("crops"));
    }

    #[test]
    fn test_server_event_envelope() {
        // テスト項目: サーバーイベントは event / data のエンベロープで出力される
        // given (前提条件):
        let event = ServerEvent::QueryPostAck(QueryAckDto {
            ok: true,
            query_id: "q1".to_string(),
            id: Some(json!("p-1")),
        });

        // when (操作):
        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        // then (期待する結果):
        assert_eq!(
            value,
            json!({"event": "query:post:ack", "data": {"ok": true, "queryId": "q1", "id": "p-1"}})
        );
        assert_eq!(event.name(), "query:post:ack");
    }

    #[test]
    fn test_typing_event_wire_format() {
        // テスト項目: 入力中通知は userName / room を持つ
        let event = ServerEvent::UserStopTyping(TypingDto {
            user_name: "Alice".to_string(),
            room: "general".to_string(),
        });

        let value: Value = serde_json::from_str(&event.to_json().unwrap()).unwrap();

        assert_eq!(
            value,
            json!({"event": "user_stop_typing", "data": {"userName": "Alice", "room": "general"}})
        );
    }
}
