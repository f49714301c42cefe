//! UseCase 層
//!
//! WebSocket / HTTP のハンドラから呼ばれる操作をまとめます。
//! 配信範囲（誰に何を送るか）はこの層で決め、実際の送信は MessagePusher に委ねます。

pub mod connect_client;
pub mod disconnect_client;
pub mod dispatch;
pub mod error;
pub mod get_weather;
pub mod join_room;
pub mod network_monitor;
pub mod presence_query;
pub mod query_thread;
pub mod relay_chat;
pub mod sensor_network;
pub mod typing_indicator;
pub mod update_status;
pub mod upload_file;

#[cfg(test)]
mod test_support;

pub use connect_client::{ClientInfo, ConnectClientUseCase};
pub use disconnect_client::DisconnectClientUseCase;
pub use error::{
    ConnectError, GetWeatherError, JoinRoomError, RelayError, SensorControlError, UploadError,
};
pub use get_weather::{GetWeatherUseCase, usable_api_key};
pub use join_room::{JoinRequest, JoinRoomUseCase};
pub use network_monitor::NetworkMonitorUseCase;
pub use presence_query::PresenceQueryUseCase;
pub use query_thread::QueryThreadUseCase;
pub use relay_chat::{RelayChatUseCase, RelayOutcome};
pub use sensor_network::SensorNetworkUseCase;
pub use typing_indicator::TypingIndicatorUseCase;
pub use update_status::UpdateStatusUseCase;
pub use upload_file::{IncomingFile, UploadFileUseCase};
