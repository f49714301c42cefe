//! UseCase: 現在の天気
//!
//! API キーが無い場合や上流との通信に失敗した場合は、デモデータを返します。

use std::sync::Arc;

use farmhub_shared::time::{Clock, timestamp_to_rfc3339};

use crate::domain::{CurrentWeather, WeatherError, WeatherProvider};

use super::error::GetWeatherError;

/// プレースホルダーのままの API キーを未設定として扱う
pub fn usable_api_key(key: Option<String>) -> Option<String> {
    key.map(|k| k.trim().to_string())
        .filter(|k| !k.is_empty() && k != "demo" && !k.contains("Get your key"))
}

pub struct GetWeatherUseCase {
    provider: Option<Arc<dyn WeatherProvider>>,
    clock: Arc<dyn Clock>,
}

impl GetWeatherUseCase {
    pub fn new(provider: Option<Arc<dyn WeatherProvider>>, clock: Arc<dyn Clock>) -> Self {
        Self { provider, clock }
    }

    pub fn is_demo(&self) -> bool {
        self.provider.is_none()
    }

    pub async fn current(&self, city: &str) -> Result<CurrentWeather, GetWeatherError> {
        let Some(provider) = &self.provider else {
            return Ok(self.demo(city));
        };

        match provider.current(city).await {
            Ok(weather) => Ok(weather),
            Err(WeatherError::Upstream(reason)) => {
                tracing::warn!(city, %reason, "weather upstream unavailable, serving demo data");
                Ok(self.demo(city))
            }
            Err(e) => Err(e.into()),
        }
    }

    fn demo(&self, city: &str) -> CurrentWeather {
        CurrentWeather::demo(city, timestamp_to_rfc3339(self.clock.now_millis()))
    }
}
