//! UseCase 層のエラー型

use thiserror::Error;

use crate::domain::{MessagePushError, RepositoryError, SensorError, ValueObjectError, WeatherError};

/// 接続受付のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConnectError {
    #[error("connection '{0}' is already registered")]
    DuplicateConnection(String),
    #[error(transparent)]
    Push(#[from] MessagePushError),
}

/// ルーム参加・移動のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum JoinRoomError {
    #[error("invalid room: {0}")]
    InvalidRoom(#[from] ValueObjectError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Push(#[from] MessagePushError),
}

/// チャットの中継（メッセージ・入力中通知・ステータス・質問スレッド）のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RelayError {
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Push(#[from] MessagePushError),
}

/// センサー操作のエラー
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SensorControlError {
    #[error(transparent)]
    Sensor(#[from] SensorError),
}

/// ファイルアップロードのエラー
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("No file uploaded")]
    MissingFile,
    #[error("Invalid file type")]
    InvalidType,
    #[error("File too large")]
    TooLarge,
    #[error("File upload failed: {0}")]
    Storage(#[from] std::io::Error),
}

/// 天気取得のエラー（デモデータで代替できないもの）
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GetWeatherError {
    #[error(transparent)]
    Weather(#[from] WeatherError),
}
