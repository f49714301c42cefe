//! Server execution logic.

use std::{future::Future, net::SocketAddr, sync::Arc};

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{HeaderValue, Method, header},
    middleware,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

use crate::domain::upload::MAX_UPLOAD_BYTES;

use super::{
    config::ServerConfig,
    error::ServerError,
    handler::{
        calibrate_sensor, current_weather, default_namespace_handler, get_online_users,
        get_room_detail, get_rooms, health_check, network_status, network_topology, not_found,
        queries_namespace_handler, root, sensors_data, sensors_status, socket_health,
        socket_status, toggle_sensor, upload_file,
    },
    middleware::track_request,
    scheduler::Scheduler,
    signal::shutdown_signal,
    state::AppState,
};

/// Headroom for multipart framing on top of the file size limit
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

/// farmhub relay server
///
/// # Example
///
/// ```ignore
/// let config = ServerConfig::parse();
/// let server = Server::from_config(&config)?;
/// server.run(&config.bind_addr()).await?;
/// ```
pub struct Server {
    state: Arc<AppState>,
    allowed_origins: Vec<String>,
}

impl Server {
    pub fn new(state: AppState, allowed_origins: Vec<String>) -> Self {
        Self {
            state: Arc::new(state),
            allowed_origins,
        }
    }

    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        Ok(Self::new(
            AppState::from_config(config)?,
            config.allowed_origins(),
        ))
    }

    /// Build the router with every endpoint and middleware layer.
    pub fn router(&self) -> Router {
        Router::new()
            // WebSocket エンドポイント
            .route("/ws", get(default_namespace_handler))
            .route("/socket", get(default_namespace_handler))
            .route("/queries/ws", get(queries_namespace_handler))
            // HTTP エンドポイント
            .route("/", get(root))
            .route("/health", get(health_check))
            .route("/healthz", get(health_check))
            .route("/api/health", get(health_check))
            .route("/api/socket-health", get(socket_health))
            .route("/api/socket-status", get(socket_status))
            .route("/api/rooms", get(get_rooms))
            .route("/api/rooms/{room_id}", get(get_room_detail))
            .route("/api/users/online", get(get_online_users))
            .route("/api/upload", post(upload_file))
            .route("/api/weather/current/{city}", get(current_weather))
            .route("/api/network/status", get(network_status))
            .route("/api/network/topology", get(network_topology))
            .route("/api/sensors/status", get(sensors_status))
            .route("/api/sensors/data", get(sensors_data))
            .route("/api/sensors/{sensor_id}/toggle", post(toggle_sensor))
            .route("/api/sensors/{sensor_id}/calibrate", post(calibrate_sensor))
            .nest_service("/uploads", ServeDir::new(&self.state.upload_dir))
            .fallback(not_found)
            .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES + MULTIPART_OVERHEAD_BYTES))
            .layer(middleware::from_fn_with_state(
                self.state.clone(),
                track_request,
            ))
            .layer(self.cors_layer())
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    fn cors_layer(&self) -> CorsLayer {
        let origins: Vec<HeaderValue> = self
            .allowed_origins
            .iter()
            .filter_map(|origin| match origin.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!("Ignoring invalid CORS origin '{}'", origin);
                    None
                }
            })
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([Method::GET, Method::POST])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true)
    }

    /// Bind to `bind_addr` and serve until Ctrl+C / SIGTERM.
    pub async fn run(self, bind_addr: &str) -> Result<(), ServerError> {
        let listener = TcpListener::bind(bind_addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: bind_addr.to_string(),
                source,
            })?;

        tracing::info!("farmhub server listening on {}", listener.local_addr()?);
        tracing::info!("Connect to: ws://{}/ws", bind_addr);
        tracing::info!("Press Ctrl+C to shutdown gracefully");

        self.serve(listener, shutdown_signal()).await
    }

    /// Serve on an already bound listener until `shutdown` resolves.
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let app = self.router();
        let scheduler = Scheduler::start(self.state.clone());

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await?;

        drop(scheduler);
        tracing::info!("Server shutdown complete");
        Ok(())
    }
}
