//! Server configuration (CLI flags with environment-variable fallbacks).

use std::path::PathBuf;

use clap::Parser;

use crate::usecase::usable_api_key;

const WEATHER_KEY_ALIAS_ENV: &str = "VITE_OPENWEATHER_API_KEY";

#[derive(Parser, Debug, Clone)]
#[command(name = "farmhub-server")]
#[command(about = "Real-time chat relay, presence and telemetry server for farmhub", long_about = None)]
pub struct ServerConfig {
    /// Host address to bind the server to
    #[arg(short = 'H', long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, env = "PORT", default_value_t = 8081)]
    pub port: u16,

    /// Primary web client origin
    #[arg(long, env = "CLIENT_URL", default_value = "http://localhost:5173")]
    pub client_url: String,

    /// Additional allowed origins (comma separated)
    #[arg(long, env = "CLIENT_URLS", value_delimiter = ',')]
    pub client_urls: Vec<String>,

    /// OpenWeatherMap API key; demo data is served when unset
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub weather_api_key: Option<String>,

    /// Directory where uploaded files are stored
    #[arg(long, env = "UPLOAD_DIR", default_value = "./uploads")]
    pub upload_dir: PathBuf,

    /// Default log level (overridden by RUST_LOG)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl ServerConfig {
    /// Origins accepted by the CORS layer.
    pub fn allowed_origins(&self) -> Vec<String> {
        let mut origins: Vec<String> = if self.client_urls.is_empty() {
            vec![
                self.client_url.clone(),
                "http://localhost:8080".to_string(),
                "http://localhost:8081".to_string(),
            ]
        } else {
            self.client_urls
                .iter()
                .map(|origin| origin.trim().to_string())
                .filter(|origin| !origin.is_empty())
                .collect()
        };
        if !origins.contains(&self.client_url) {
            origins.insert(0, self.client_url.clone());
        }
        origins
    }

    /// The weather key, or `None` when unset or still a placeholder.
    pub fn weather_api_key(&self) -> Option<String> {
        let key = self
            .weather_api_key
            .clone()
            .or_else(|| std::env::var(WEATHER_KEY_ALIAS_ENV).ok());
        usable_api_key(key)
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
