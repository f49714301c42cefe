//! 天気情報のドメインモデル

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

/// 現在の天気
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentWeather {
    pub city: String,
    pub country: String,
    pub temperature: f64,
    pub feels_like: f64,
    pub humidity: u32,
    pub pressure: u32,
    pub description: String,
    pub icon: String,
    pub wind_speed: f64,
    pub cloudiness: u32,
    pub sunrise: String,
    pub sunset: String,
    pub timestamp: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub demo: bool,
}

impl CurrentWeather {
    /// API キーが無い、または取得に失敗したときに返す固定値
    pub fn demo(city: &str, now: String) -> Self {
        Self {
            city: city.to_string(),
            country: "IN".to_string(),
            temperature: 28.0,
            feels_like: 30.0,
            humidity: 65,
            pressure: 1013,
            description: "partly cloudy".to_string(),
            icon: "02d".to_string(),
            wind_speed: 3.5,
            cloudiness: 40,
            sunrise: now.clone(),
            sunset: now.clone(),
            timestamp: now,
            demo: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WeatherError {
    /// 上流が 401 を返した
    #[error("Invalid API key. Get a free key from https://openweathermap.org/api")]
    Unauthorized,
    /// 上流が 200 / 401 以外を返した
    #[error("City not found")]
    CityNotFound(String),
    /// 通信やデコードの失敗
    #[error("weather upstream error: {0}")]
    Upstream(String),
}

/// 外部の天気 API
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn current(&self, city: &str) -> Result<CurrentWeather, WeatherError>;
}
