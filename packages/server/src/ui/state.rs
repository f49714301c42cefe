//! Shared application state.

use std::{path::PathBuf, sync::Arc};

use farmhub_shared::time::{Clock, SystemClock};

use crate::{
    domain::{MessagePusher, PresenceRepository, UploadStore, WeatherProvider},
    infrastructure::{
        message_pusher::WebSocketMessagePusher, repository::InMemoryPresenceRepository,
        storage::LocalUploadStore, weather::OpenWeatherClient,
    },
    usecase::{
        ConnectClientUseCase, DisconnectClientUseCase, GetWeatherUseCase, JoinRoomUseCase,
        NetworkMonitorUseCase, PresenceQueryUseCase, QueryThreadUseCase, RelayChatUseCase,
        SensorNetworkUseCase, TypingIndicatorUseCase, UpdateStatusUseCase, UploadFileUseCase,
        dispatch::EventDispatcher,
    },
};

use super::{config::ServerConfig, error::ServerError};

/// UseCase の集合。ハンドラはここから UseCase を取り出して呼ぶ
pub struct AppState {
    pub connect_client_usecase: Arc<ConnectClientUseCase>,
    pub disconnect_client_usecase: Arc<DisconnectClientUseCase>,
    pub join_room_usecase: Arc<JoinRoomUseCase>,
    pub relay_chat_usecase: Arc<RelayChatUseCase>,
    pub typing_indicator_usecase: Arc<TypingIndicatorUseCase>,
    pub update_status_usecase: Arc<UpdateStatusUseCase>,
    pub query_thread_usecase: Arc<QueryThreadUseCase>,
    pub network_monitor_usecase: Arc<NetworkMonitorUseCase>,
    pub sensor_network_usecase: Arc<SensorNetworkUseCase>,
    pub presence_query_usecase: Arc<PresenceQueryUseCase>,
    pub upload_file_usecase: Arc<UploadFileUseCase>,
    pub get_weather_usecase: Arc<GetWeatherUseCase>,
    /// 受信フレームを拒否したときの `error` 返信用
    pub event_dispatcher: EventDispatcher,
    /// `/uploads` で配信するディレクトリ
    pub upload_dir: PathBuf,
}

impl AppState {
    /// 設定から依存関係を組み立てる
    ///
    /// 1. Repository / MessagePusher / 外部サービス
    /// 2. UseCase
    pub fn from_config(config: &ServerConfig) -> Result<Self, ServerError> {
        let repository: Arc<dyn PresenceRepository> = Arc::new(InMemoryPresenceRepository::default());
        let message_pusher: Arc<dyn MessagePusher> = Arc::new(WebSocketMessagePusher::default());
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let upload_store: Arc<dyn UploadStore> = Arc::new(LocalUploadStore::new(config.upload_dir.clone()));

        let weather_provider: Option<Arc<dyn WeatherProvider>> = match config.weather_api_key() {
            Some(key) => Some(Arc::new(OpenWeatherClient::new(key, None)?)),
            None => {
                tracing::info!("No weather API key configured, serving demo weather data");
                None
            }
        };

        Ok(Self::assemble(
            repository,
            message_pusher,
            clock,
            upload_store,
            weather_provider,
            config.upload_dir.clone(),
        ))
    }

    pub fn assemble(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
        upload_store: Arc<dyn UploadStore>,
        weather_provider: Option<Arc<dyn WeatherProvider>>,
        upload_dir: PathBuf,
    ) -> Self {
        let network_monitor_usecase = Arc::new(NetworkMonitorUseCase::new(
            repository.clone(),
            message_pusher.clone(),
            clock.clone(),
        ));

        let event_dispatcher = EventDispatcher::new(message_pusher.clone());

        Self {
            connect_client_usecase: Arc::new(ConnectClientUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                network_monitor_usecase.clone(),
                clock.clone(),
            )),
            disconnect_client_usecase: Arc::new(DisconnectClientUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                network_monitor_usecase.clone(),
                clock.clone(),
            )),
            join_room_usecase: Arc::new(JoinRoomUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            relay_chat_usecase: Arc::new(RelayChatUseCase::new(
                repository.clone(),
                message_pusher.clone(),
                clock.clone(),
            )),
            typing_indicator_usecase: Arc::new(TypingIndicatorUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            update_status_usecase: Arc::new(UpdateStatusUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            query_thread_usecase: Arc::new(QueryThreadUseCase::new(
                repository.clone(),
                message_pusher.clone(),
            )),
            sensor_network_usecase: Arc::new(SensorNetworkUseCase::new(
                repository.clone(),
                message_pusher,
                clock.clone(),
            )),
            presence_query_usecase: Arc::new(PresenceQueryUseCase::new(repository)),
            upload_file_usecase: Arc::new(UploadFileUseCase::new(upload_store, clock.clone())),
            get_weather_usecase: Arc::new(GetWeatherUseCase::new(weather_provider, clock)),
            network_monitor_usecase,
            event_dispatcher,
            upload_dir,
        }
    }
}
