//! ドメイン層のエラー型

use thiserror::Error;

/// 値オブジェクト生成時のバリデーションエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("connection id must not be empty")]
    EmptyConnectionId,
    #[error("room id must not be empty")]
    EmptyRoomId,
    #[error("room id '{0}' exceeds {max} characters", max = super::value_object::MAX_ROOM_ID_LENGTH)]
    RoomIdTooLong(String),
    #[error("query id must not be empty")]
    EmptyQueryId,
    #[error("unknown user status '{0}'")]
    UnknownStatus(String),
}

/// Repository 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RepositoryError {
    #[error("connection '{0}' is not registered")]
    ConnectionNotFound(String),
    #[error("connection '{0}' is already registered")]
    DuplicateConnection(String),
}

/// MessagePusher 操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MessagePushError {
    #[error("client '{0}' is not connected")]
    ClientNotFound(String),
    #[error("failed to push message: {0}")]
    PushFailed(String),
}

/// センサーネットワーク操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorError {
    #[error("sensor '{0}' not found")]
    NotFound(String),
}
