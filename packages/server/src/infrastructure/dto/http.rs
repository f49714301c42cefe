//! HTTP API response bodies.

use serde::Serialize;

use crate::domain::{ConnectionDetail, NetworkMetrics, metrics::NetworkTopology};
use crate::infrastructure::dto::websocket::{ChatMessageDto, UserDto};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthDto {
    pub ok: bool,
}

/// `GET /` のサービス記述
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescriptorDto {
    pub ok: bool,
    pub service: &'static str,
    pub endpoints: Vec<&'static str>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketHealthDto {
    pub ok: bool,
    pub engine_clients: usize,
    pub namespaces: Vec<&'static str>,
    pub rooms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SocketStatusDto {
    pub ok: bool,
    pub connected_users: Vec<UserDto>,
    pub room_count: usize,
    pub rooms: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomSummaryDto {
    pub id: String,
    pub name: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoomDetailDto {
    pub id: String,
    pub name: String,
    pub description: String,
    pub members: Vec<UserDto>,
    pub messages: Vec<ChatMessageDto>,
}

/// メトリクス本体にトポロジーと接続詳細を並べた応答（HTTP と `network:status` で共通）
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatusDto {
    #[serde(flatten)]
    pub metrics: NetworkMetrics,
    pub topology: NetworkTopology,
    pub connection_details: Vec<ConnectionDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SensorControlDto {
    pub success: bool,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ErrorDto {
    pub error: String,
}

impl ErrorDto {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

/// 未定義のパスに対する応答
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotFoundDto {
    pub ok: bool,
    pub message: &'static str,
    pub path: String,
    #[serde(rename = "try")]
    pub suggestions: Vec<&'static str>,
}
