//! farmhub relay server.
//!
//! Serves the chat/presence WebSocket namespaces, the telemetry broadcasts and
//! the HTTP API on a single port.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin farmhub-server
//! cargo run --bin farmhub-server -- --host 127.0.0.1 --port 3001
//! PORT=3001 OPENWEATHER_API_KEY=... cargo run --bin farmhub-server
//! ```

use clap::Parser;

use farmhub_server::ui::{Server, ServerConfig};
use farmhub_shared::logger::setup_logger;

#[tokio::main]
async fn main() {
    let config = ServerConfig::parse();

    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), &config.log_level);

    let server = match Server::from_config(&config) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to initialize server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run(&config.bind_addr()).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}
