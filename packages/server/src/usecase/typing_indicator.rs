//! UseCase: 入力中表示

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, MessagePusher, PresenceRepository, RoomKey, TypingChange},
    infrastructure::dto::websocket::{ServerEvent, TypingDto},
};

use super::{
    dispatch::{EventDispatcher, except},
    error::RelayError,
};

pub struct TypingIndicatorUseCase {
    repository: Arc<dyn PresenceRepository>,
    dispatcher: EventDispatcher,
}

impl TypingIndicatorUseCase {
    pub fn new(repository: Arc<dyn PresenceRepository>, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            repository,
            dispatcher: EventDispatcher::new(message_pusher),
        }
    }

    /// `typing_start`: 入力中セットに追加し、ルームの他のメンバーに `user_typing`
    pub async fn start(&self, connection_id: &ConnectionId) -> Result<Option<TypingChange>, RelayError> {
        let Some(change) = self.repository.start_typing(connection_id).await else {
            return Ok(None);
        };
        let event = ServerEvent::UserTyping(dto(&change));
        self.notify_others(connection_id, &change, &event).await?;
        Ok(Some(change))
    }

    /// `typing_stop`: 入力中セットから取り除き、ルームの他のメンバーに `user_stop_typing`
    pub async fn stop(&self, connection_id: &ConnectionId) -> Result<Option<TypingChange>, RelayError> {
        let Some(change) = self.repository.stop_typing(connection_id).await else {
            return Ok(None);
        };
        let event = ServerEvent::UserStopTyping(dto(&change));
        self.notify_others(connection_id, &change, &event).await?;
        Ok(Some(change))
    }

    async fn notify_others(
        &self,
        connection_id: &ConnectionId,
        change: &TypingChange,
        event: &ServerEvent,
    ) -> Result<(), RelayError> {
        let members = self.repository.members(&RoomKey::chat(&change.room)).await;
        self.dispatcher
            .send_to_many(except(members, connection_id), event)
            .await?;
        Ok(())
    }
}

fn dto(change: &TypingChange) -> TypingDto {
    TypingDto {
        user_name: change.user_name.clone(),
        room: change.room.as_str().to_string(),
    }
}
