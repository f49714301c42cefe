//! UseCase: 接続の受付
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ConnectClientUseCase::execute()
//! - 既定の名前空間では `server:welcome` が送られ、ネットワークモニタに登録されること
//!
//! ### どのような状況を想定しているか
//! - 正常系：既定の名前空間 / queries 名前空間への接続
//! - 異常系：同じ接続 ID の二重登録

use std::sync::Arc;

use farmhub_shared::time::{Clock, timestamp_to_rfc3339};

use crate::{
    domain::{
        ConnectionId, MessagePusher, Namespace, PresenceRepository, PusherChannel,
        RepositoryError, Timestamp,
    },
    infrastructure::dto::websocket::{ServerEvent, WelcomeDto},
};

use super::{dispatch::EventDispatcher, error::ConnectError, network_monitor::NetworkMonitorUseCase};

/// 接続元の情報（ネットワークモニタ用）
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientInfo {
    pub user_agent: Option<String>,
    pub ip: Option<String>,
}

pub struct ConnectClientUseCase {
    repository: Arc<dyn PresenceRepository>,
    dispatcher: EventDispatcher,
    network_monitor: Arc<NetworkMonitorUseCase>,
    clock: Arc<dyn Clock>,
}

impl ConnectClientUseCase {
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        network_monitor: Arc<NetworkMonitorUseCase>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            dispatcher: EventDispatcher::new(message_pusher),
            network_monitor,
            clock,
        }
    }

    /// 接続を登録し、送信チャネルを MessagePusher に渡す
    ///
    /// 既定の名前空間の接続には `server:welcome` を送信し、ネットワークモニタで追跡します。
    pub async fn execute(
        &self,
        connection_id: ConnectionId,
        namespace: Namespace,
        sender: PusherChannel,
        client: ClientInfo,
    ) -> Result<Timestamp, ConnectError> {
        let connected_at = Timestamp::new(self.clock.now_millis());

        self.repository
            .register_connection(connection_id.clone(), namespace, connected_at)
            .await
            .map_err(|e| match e {
                RepositoryError::DuplicateConnection(id) | RepositoryError::ConnectionNotFound(id) => {
                    ConnectError::DuplicateConnection(id)
                }
            })?;
        self.dispatcher
            .pusher()
            .register_client(connection_id.clone(), sender)
            .await;

        if namespace == Namespace::Default {
            self.network_monitor
                .track_connection(connection_id.clone(), client.user_agent, client.ip)
                .await;

            let welcome = ServerEvent::Welcome(WelcomeDto {
                ok: true,
                ts: timestamp_to_rfc3339(connected_at.value()),
            });
            self.dispatcher.send_to(&connection_id, &welcome).await?;
        }

        tracing::info!(
            connection_id = %connection_id,
            namespace = namespace.path(),
            "client connected"
        );
        Ok(connected_at)
    }
}
