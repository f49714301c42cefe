//! UseCase: オンライン状態の変更

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, MessagePusher, Namespace, PresenceRepository, UserStatus},
    infrastructure::dto::websocket::{ServerEvent, StatusChangeDto},
};

use super::{
    dispatch::{EventDispatcher, except},
    error::RelayError,
};

pub struct UpdateStatusUseCase {
    repository: Arc<dyn PresenceRepository>,
    dispatcher: EventDispatcher,
}

impl UpdateStatusUseCase {
    pub fn new(repository: Arc<dyn PresenceRepository>, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            repository,
            dispatcher: EventDispatcher::new(message_pusher),
        }
    }

    /// プロフィールの状態を更新し、既定の名前空間の他の接続全てに `user_status_changed` を送る
    ///
    /// プロフィール未登録の接続からの要求は無視して `false` を返します。
    pub async fn execute(
        &self,
        connection_id: &ConnectionId,
        status: UserStatus,
    ) -> Result<bool, RelayError> {
        let Some(profile) = self.repository.set_status(connection_id, status).await else {
            return Ok(false);
        };

        let event = ServerEvent::UserStatusChanged(StatusChangeDto {
            user_id: profile.id,
            status,
            last_seen: None,
        });
        let targets = except(
            self.repository.connections(Namespace::Default).await,
            connection_id,
        );
        self.dispatcher.send_to_many(targets, &event).await?;
        Ok(true)
    }
}
