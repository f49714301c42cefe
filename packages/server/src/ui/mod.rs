//! UI 層: axum のルーター、ハンドラ、定期実行タスク

pub mod config;
pub mod error;
mod handler;
mod middleware;
mod scheduler;
mod server;
mod signal;
pub mod state;

pub use config::ServerConfig;
pub use error::ServerError;
pub use server::Server;
