//! HTTP API endpoint handlers.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::{StatusCode, Uri},
};

use crate::{
    infrastructure::dto::{
        http::{
            ErrorDto, HealthDto, NotFoundDto, RoomDetailDto, RoomSummaryDto, ServiceDescriptorDto,
            SocketHealthDto, SocketStatusDto,
        },
        websocket::UserDto,
    },
    ui::state::AppState,
};

const ENDPOINTS: [&str; 6] = [
    "/",
    "/health",
    "/healthz",
    "/api/health",
    "/api/socket-health",
    "/api/socket-status",
];

/// Service descriptor
pub async fn root() -> Json<ServiceDescriptorDto> {
    Json(ServiceDescriptorDto {
        ok: true,
        service: "socket-server",
        endpoints: ENDPOINTS.to_vec(),
    })
}

/// Health check endpoint (`/health`, `/healthz`, `/api/health`)
pub async fn health_check() -> Json<HealthDto> {
    Json(HealthDto { ok: true })
}

pub async fn socket_health(State(state): State<Arc<AppState>>) -> Json<SocketHealthDto> {
    Json(state.presence_query_usecase.socket_health().await)
}

pub async fn socket_status(State(state): State<Arc<AppState>>) -> Json<SocketStatusDto> {
    Json(state.presence_query_usecase.socket_status().await)
}

/// Get list of rooms
pub async fn get_rooms(State(state): State<Arc<AppState>>) -> Json<Vec<RoomSummaryDto>> {
    Json(state.presence_query_usecase.rooms())
}

/// Get room detail by ID
pub async fn get_room_detail(
    State(state): State<Arc<AppState>>,
    Path(room_id): Path<String>,
) -> Result<Json<RoomDetailDto>, (StatusCode, Json<ErrorDto>)> {
    match state.presence_query_usecase.room_detail(&room_id).await {
        Some(detail) => Ok(Json(detail)),
        None => Err((StatusCode::NOT_FOUND, Json(ErrorDto::new("Room not found")))),
    }
}

pub async fn get_online_users(State(state): State<Arc<AppState>>) -> Json<Vec<UserDto>> {
    Json(state.presence_query_usecase.online_users().await)
}

/// Fallback for unknown paths
pub async fn not_found(uri: Uri) -> (StatusCode, Json<NotFoundDto>) {
    tracing::debug!(path = %uri.path(), "no route");
    (
        StatusCode::NOT_FOUND,
        Json(NotFoundDto {
            ok: false,
            message: "Not found",
            path: uri.path().to_string(),
            suggestions: ENDPOINTS.to_vec(),
        }),
    )
}
