//! 外部天気 API の実装

pub mod openweather;

pub use openweather::OpenWeatherClient;
