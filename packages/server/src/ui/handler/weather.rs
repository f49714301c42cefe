//! Weather endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};

use crate::{
    domain::{CurrentWeather, WeatherError},
    infrastructure::dto::http::ErrorDto,
    ui::state::AppState,
    usecase::GetWeatherError,
};

/// `GET /api/weather/current/{city}`
pub async fn current_weather(
    State(state): State<Arc<AppState>>,
    Path(city): Path<String>,
) -> Result<Json<CurrentWeather>, (StatusCode, Json<ErrorDto>)> {
    match state.get_weather_usecase.current(&city).await {
        Ok(weather) => Ok(Json(weather)),
        Err(GetWeatherError::Weather(e)) => {
            let status = match e {
                WeatherError::Unauthorized => StatusCode::UNAUTHORIZED,
                WeatherError::CityNotFound(_) => StatusCode::NOT_FOUND,
                WeatherError::Upstream(_) => StatusCode::BAD_GATEWAY,
            };
            tracing::info!(city = %city, %status, "weather lookup failed: {}", e);
            Err((status, Json(ErrorDto::new(e.to_string()))))
        }
    }
}
