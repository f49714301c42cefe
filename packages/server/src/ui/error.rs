//! Errors raised while starting or running the server.

use thiserror::Error;

use crate::domain::WeatherError;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to build weather client: {0}")]
    Weather(#[from] WeatherError),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}
