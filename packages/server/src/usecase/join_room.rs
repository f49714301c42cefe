//! UseCase: チャットルームへの参加・移動
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - `user_join`: プロフィール作成とルーム参加、参加通知とメンバー一覧
//! - `join_room`: ルーム移動時の退出通知・参加通知・メンバー一覧
//!
//! ### どのような状況を想定しているか
//! - 正常系：初回参加、ルーム移動
//! - エッジケース：プロフィール未登録の接続によるルーム移動、再参加で二重所属しないこと

use std::sync::Arc;

use farmhub_shared::time::Clock;

use crate::{
    domain::{
        ConnectionId, MessagePusher, PresenceRepository, RoomId, RoomKey, Timestamp, UserProfile,
    },
    infrastructure::dto::{
        conversion::users_to_dto,
        websocket::{RoomChangeDto, ServerEvent, TypingDto, UserDto},
    },
};

use super::{
    dispatch::{EventDispatcher, except},
    error::JoinRoomError,
};

/// `user_join` の入力
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRequest {
    pub user_id: String,
    pub name: String,
    pub avatar: Option<String>,
    /// 未指定・空文字なら `general`
    pub room: Option<String>,
}

pub struct JoinRoomUseCase {
    repository: Arc<dyn PresenceRepository>,
    dispatcher: EventDispatcher,
    clock: Arc<dyn Clock>,
}

impl JoinRoomUseCase {
    pub fn new(
        repository: Arc<dyn PresenceRepository>,
        message_pusher: Arc<dyn MessagePusher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repository,
            dispatcher: EventDispatcher::new(message_pusher),
            clock,
        }
    }

    /// `user_join`: プロフィールを作成（または置換）してルームに参加
    ///
    /// 参加先ルームの他のメンバーに `user_joined`、本人に `online_users` を送信します。
    pub async fn join(
        &self,
        connection_id: &ConnectionId,
        request: JoinRequest,
    ) -> Result<UserProfile, JoinRoomError> {
        let room = match request.room.filter(|r| !r.trim().is_empty()) {
            Some(room) => RoomId::new(room)?,
            None => RoomId::default_room(),
        };
        let profile = UserProfile::new(
            request.user_id,
            request.name,
            request.avatar,
            connection_id.clone(),
            Timestamp::new(self.clock.now_millis()),
        );

        let outcome = self
            .repository
            .join(connection_id, profile.clone(), room.clone())
            .await?;

        if let Some(previous) = outcome.previous_room.as_ref().filter(|prev| **prev != room) {
            self.notify_departure(connection_id, previous, outcome.stopped_typing, Some(&profile))
                .await?;
        }

        let members = self.repository.members(&RoomKey::chat(&room)).await;
        self.dispatcher
            .send_to_many(
                except(members, connection_id),
                &ServerEvent::UserJoined(UserDto::from(profile.clone())),
            )
            .await?;
        self.dispatcher
            .send_to(
                connection_id,
                &ServerEvent::OnlineUsers(users_to_dto(outcome.members)),
            )
            .await?;

        tracing::info!(
            connection_id = %connection_id,
            user = %profile.name,
            room = %room,
            "user joined room"
        );
        Ok(profile)
    }

    /// `join_room`: 所属チャットルームを切り替える
    ///
    /// 旧ルームに `user_left_room` を送信し、プロフィールがあれば新ルームに
    /// `user_joined_room`、本人に `room_users` を送信します。
    pub async fn switch(
        &self,
        connection_id: &ConnectionId,
        room: RoomId,
    ) -> Result<(), JoinRoomError> {
        let outcome = self
            .repository
            .switch_room(connection_id, room.clone())
            .await?;

        if let Some(previous) = outcome.previous_room.as_ref() {
            self.notify_departure(
                connection_id,
                previous,
                outcome.stopped_typing,
                outcome.profile.as_ref(),
            )
            .await?;
        }

        let Some(profile) = outcome.profile else {
            tracing::debug!(connection_id = %connection_id, room = %room, "anonymous connection switched room");
            return Ok(());
        };

        let members = self.repository.members(&RoomKey::chat(&room)).await;
        let joined = ServerEvent::UserJoinedRoom(RoomChangeDto {
            user: Some(UserDto::from(profile)),
            room: room.as_str().to_string(),
        });
        self.dispatcher
            .send_to_many(except(members, connection_id), &joined)
            .await?;
        self.dispatcher
            .send_to(
                connection_id,
                &ServerEvent::RoomUsers(users_to_dto(outcome.members)),
            )
            .await?;
        Ok(())
    }

    /// 旧ルームの残りのメンバーへ、入力中の解除と退出を通知
    async fn notify_departure(
        &self,
        connection_id: &ConnectionId,
        previous: &RoomId,
        stopped_typing: Option<String>,
        profile: Option<&UserProfile>,
    ) -> Result<(), JoinRoomError> {
        let remaining = except(
            self.repository.members(&RoomKey::chat(previous)).await,
            connection_id,
        );

        if let Some(user_name) = stopped_typing {
            let stop = ServerEvent::UserStopTyping(TypingDto {
                user_name,
                room: previous.as_str().to_string(),
            });
            self.dispatcher.send_to_many(remaining.clone(), &stop).await?;
        }

        let left = ServerEvent::UserLeftRoom(RoomChangeDto {
            user: profile.cloned().map(UserDto::from),
            room: previous.as_str().to_string(),
        });
        self.dispatcher.send_to_many(remaining, &left).await?;
        Ok(())
    }
}
