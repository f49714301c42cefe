//! OpenWeatherMap の現在の天気 API クライアント

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use farmhub_shared::time::{get_utc_timestamp, timestamp_to_rfc3339};

use crate::domain::{CurrentWeather, WeatherError, WeatherProvider};

pub const DEFAULT_OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org/data/2.5";
const REQUEST_TIMEOUT_SECS: u64 = 10;
const CONNECT_TIMEOUT_SECS: u64 = 5;

pub struct OpenWeatherClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl OpenWeatherClient {
    pub fn new(api_key: String, base_url: Option<&str>) -> Result<Self, WeatherError> {
        let base_url = base_url
            .unwrap_or(DEFAULT_OPENWEATHER_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()
            .map_err(|e| WeatherError::Upstream(e.to_string()))?;
        Ok(Self {
            http,
            api_key,
            base_url,
        })
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn current(&self, city: &str) -> Result<CurrentWeather, WeatherError> {
        let url = format!("{}/weather", self.base_url);
        let response = self
            .http
            .get(url)
            .query(&[("q", city), ("appid", self.api_key.as_str()), ("units", "metric")])
            .send()
            .await
            .map_err(|e| WeatherError::Upstream(e.to_string()))?;

        match response.status().as_u16() {
            200 => {}
            401 => return Err(WeatherError::Unauthorized),
            status => {
                tracing::debug!(city, status, "weather lookup failed");
                return Err(WeatherError::CityNotFound(city.to_string()));
            }
        }

        let body: OwmCurrent = response
            .json()
            .await
            .map_err(|e| WeatherError::Upstream(e.to_string()))?;
        Ok(body.into_current(get_utc_timestamp()))
    }
}

#[derive(Debug, Deserialize)]
struct OwmCurrent {
    name: String,
    sys: OwmSys,
    main: OwmMain,
    weather: Vec<OwmCondition>,
    wind: OwmWind,
    clouds: OwmClouds,
}

#[derive(Debug, Deserialize)]
struct OwmSys {
    #[serde(default)]
    country: String,
    sunrise: i64,
    sunset: i64,
}

#[derive(Debug, Deserialize)]
struct OwmMain {
    temp: f64,
    feels_like: f64,
    humidity: u32,
    pressure: u32,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwmWind {
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct OwmClouds {
    all: u32,
}

impl OwmCurrent {
    fn into_current(self, now_millis: i64) -> CurrentWeather {
        let (description, icon) = self
            .weather
            .into_iter()
            .next()
            .map(|c| (c.description, c.icon))
            .unwrap_or_default();
        CurrentWeather {
            city: self.name,
            country: self.sys.country,
            temperature: self.main.temp.round(),
            feels_like: self.main.feels_like.round(),
            humidity: self.main.humidity,
            pressure: self.main.pressure,
            description,
            icon,
            wind_speed: self.wind.speed,
            cloudiness: self.clouds.all,
            sunrise: timestamp_to_rfc3339(self.sys.sunrise * 1000),
            sunset: timestamp_to_rfc3339(self.sys.sunset * 1000),
            timestamp: timestamp_to_rfc3339(now_millis),
            demo: false,
        }
    }
}
