//! 値オブジェクト
//!
//! 生成時にバリデーションを行い、不正な値がドメインに入り込まないようにします。

use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::ValueObjectError;

/// Room ID の最大長
pub const MAX_ROOM_ID_LENGTH: usize = 64;

/// ルーム ID が未指定の場合に参加するルーム
pub const DEFAULT_ROOM: &str = "general";

/// 接続 ID（トランスポート層が接続ごとに払い出す）
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyConnectionId);
        }
        Ok(Self(value))
    }

    /// 新しい接続 ID を UUID v4 で生成
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// チャットルーム ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(ValueObjectError::EmptyRoomId);
        }
        if trimmed.chars().count() > MAX_ROOM_ID_LENGTH {
            return Err(ValueObjectError::RoomIdTooLong(value));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// 既定ルーム（general）
    pub fn default_room() -> Self {
        Self(DEFAULT_ROOM.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for RoomId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 質問スレッド ID
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct QueryId(String);

impl QueryId {
    pub fn new(value: String) -> Result<Self, ValueObjectError> {
        if value.trim().is_empty() {
            return Err(ValueObjectError::EmptyQueryId);
        }
        Ok(Self(value))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for QueryId {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unix タイムスタンプ（ミリ秒, UTC）
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct Timestamp(i64);

impl Timestamp {
    pub fn new(value: i64) -> Self {
        Self(value)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

/// ユーザーのオンライン状態
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserStatus {
    Online,
    Offline,
}

impl TryFrom<String> for UserStatus {
    type Error = ValueObjectError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.as_str() {
            "online" => Ok(Self::Online),
            "offline" => Ok(Self::Offline),
            _ => Err(ValueObjectError::UnknownStatus(value)),
        }
    }
}

/// イベントチャネルの名前空間
///
/// ルームは名前空間ごとに独立しており、同名のルームでも名前空間が異なれば別物として扱います。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Namespace {
    #[serde(rename = "/")]
    Default,
    #[serde(rename = "/queries")]
    Queries,
}

impl Namespace {
    pub const ALL: [Namespace; 2] = [Namespace::Default, Namespace::Queries];

    pub fn path(&self) -> &'static str {
        match self {
            Namespace::Default => "/",
            Namespace::Queries => "/queries",
        }
    }
}

/// ルームの種別
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RoomKind {
    Chat,
    Query,
}

/// ブロードキャスト先のルームを表すキー（名前空間 + 種別 + ルーム名）
///
/// 種別を含めるので、`query:42` という名前のチャットルームと質問スレッド `42` は別のキーになる。
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RoomKey {
    namespace: Namespace,
    kind: RoomKind,
    name: String,
}

impl RoomKey {
    /// チャットルームのキー（チャットルームは既定の名前空間にのみ存在する）
    pub fn chat(room: &RoomId) -> Self {
        Self {
            namespace: Namespace::Default,
            kind: RoomKind::Chat,
            name: room.as_str().to_string(),
        }
    }

    /// 質問スレッドのキー: `query:<queryId>`
    pub fn query(namespace: Namespace, query_id: &QueryId) -> Self {
        Self {
            namespace,
            kind: RoomKind::Query,
            name: format!("query:{}", query_id.as_str()),
        }
    }

    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    pub fn kind(&self) -> RoomKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.namespace {
            Namespace::Default => f.write_str(&self.name),
            Namespace::Queries => write!(f, "{}#{}", self.namespace.path(), self.name),
        }
    }
}
