//! Network monitor and sensor network endpoints.

use std::{collections::BTreeMap, sync::Arc};

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{SensorError, SensorNetworkStatus, SensorSnapshot, metrics::NetworkTopology},
    infrastructure::dto::http::{ErrorDto, NetworkStatusDto, SensorControlDto},
    ui::state::AppState,
    usecase::SensorControlError,
};

type SensorControlResponse = Result<Json<SensorControlDto>, (StatusCode, Json<ErrorDto>)>;

/// `GET /api/network/status`
pub async fn network_status(State(state): State<Arc<AppState>>) -> Json<NetworkStatusDto> {
    Json(state.network_monitor_usecase.status().await)
}

/// `GET /api/network/topology`
pub async fn network_topology(State(state): State<Arc<AppState>>) -> Json<NetworkTopology> {
    Json(state.network_monitor_usecase.topology().await)
}

/// `GET /api/sensors/status`
pub async fn sensors_status(State(state): State<Arc<AppState>>) -> Json<SensorNetworkStatus> {
    Json(state.sensor_network_usecase.status().await)
}

/// `GET /api/sensors/data`
pub async fn sensors_data(
    State(state): State<Arc<AppState>>,
) -> Json<BTreeMap<String, SensorSnapshot>> {
    Json(state.sensor_network_usecase.data().await)
}

/// `POST /api/sensors/{sensor_id}/toggle`
pub async fn toggle_sensor(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
) -> SensorControlResponse {
    let status = state
        .sensor_network_usecase
        .toggle(&sensor_id)
        .await
        .map_err(not_found)?;
    tracing::debug!(sensor_id = %sensor_id, ?status, "toggled via HTTP");
    Ok(Json(SensorControlDto {
        success: true,
        message: format!("Sensor {sensor_id} toggled"),
    }))
}

/// `POST /api/sensors/{sensor_id}/calibrate`
pub async fn calibrate_sensor(
    State(state): State<Arc<AppState>>,
    Path(sensor_id): Path<String>,
) -> SensorControlResponse {
    state
        .sensor_network_usecase
        .calibrate(&sensor_id)
        .await
        .map_err(not_found)?;
    Ok(Json(SensorControlDto {
        success: true,
        message: format!("Sensor {sensor_id} calibrated"),
    }))
}

fn not_found(error: SensorControlError) -> (StatusCode, Json<ErrorDto>) {
    match error {
        SensorControlError::Sensor(SensorError::NotFound(_)) => {
            (StatusCode::NOT_FOUND, Json(ErrorDto::new("Sensor not found or sensors disabled")))
        }
    }
}
