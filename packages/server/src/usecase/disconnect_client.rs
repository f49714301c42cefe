//! UseCase: 接続の切断
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - DisconnectClientUseCase::execute()
//! - 切断後にプロフィール・ルーム所属・入力中状態が残らないこと
//! - 残ったメンバーへの `user_stop_typing` / `user_left` / `user_status_changed` の通知
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム参加中の切断、入力中の切断
//! - エッジケース：プロフィール未登録の接続、未登録の接続の二重切断

use std::sync::Arc;

use farmhub_shared::time::{Clock, timestamp_to_rfc3339};

use crate::{
    domain::{
        ConnectionId, Departure, MessagePusher, Namespace, PresenceRepository, RoomKey, Timestamp,
        UserStatus,
    },
    infrastructure::dto::websocket::{ServerEvent, StatusChangeDto, TypingDto, UserDto},
};

use super::{dispatch::EventDispatcher, error::RelayError, network_monitor::NetworkMonitorUseCase};

pub struct DisconnectClientUseCase {
    repository: Arc<dyn PresenceRepository>,
    dispatcher: EventDispatcher,
    network_monitor: Arc<NetworkMonitorUseCase>,
    clock: Arc<dyn Clock>,
}

impl DisconnectClientUseCase {
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

    /// 接続に紐づく状態を全て取り除き、残ったメンバーに通知する
    ///
    /// 未登録の接続に対しては `Ok(None)` を返します。
    pub async fn execute(&self, connection_id: &ConnectionId) -> Result<Option<Departure>, RelayError> {
        let now = Timestamp::new(self.clock.now_millis());

        self.network_monitor.remove_connection(connection_id).await;
        let departure = self.repository.disconnect(connection_id, now).await;
        self.dispatcher.pusher().unregister_client(connection_id).await;

        let Some(departure) = departure else {
            return Ok(None);
        };

        if let (Some(profile), Some(room)) = (&departure.profile, &departure.room) {
            let members = self.repository.members(&RoomKey::chat(room)).await;
            if departure.was_typing {
                let stop = ServerEvent::UserStopTyping(TypingDto {
                    user_name: profile.name.clone(),
                    room: room.as_str().to_string(),
                });
                self.dispatcher.send_to_many(members.clone(), &stop).await?;
            }
            self.dispatcher
                .send_to_many(members, &ServerEvent::UserLeft(UserDto::from(profile.clone())))
                .await?;

            let offline = ServerEvent::UserStatusChanged(StatusChangeDto {
                user_id: profile.id.clone(),
                status: UserStatus::Offline,
                last_seen: Some(timestamp_to_rfc3339(now.value())),
            });
            let everyone = self.repository.connections(Namespace::Default).await;
            self.dispatcher.send_to_many(everyone, &offline).await?;
        }

        tracing::info!(
            connection_id = %connection_id,
            namespace = departure.namespace.path(),
            rooms = departure.left_rooms.len(),
            "client disconnected"
        );
        Ok(Some(departure))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{QueryId, RoomId};
    use crate::usecase::join_room::{JoinRequest, JoinRoomUseCase};
    use crate::usecase::test_support::{Harness, drain};
    use crate::usecase::typing_indicator::TypingIndicatorUseCase;

    struct Fixture {
        harness: Harness,
        join: JoinRoomUseCase,
        typing: TypingIndicatorUseCase,
        usecase: DisconnectClientUseCase,
    }

    impl Fixture {
        fn new() -> Self {
            let harness = Harness::new();
            let monitor = Arc::new(NetworkMonitorUseCase::new(
                harness.repository.clone(),
                harness.pusher.clone(),
                harness.clock.clone(),
            ));
            Self {
                join: JoinRoomUseCase::new(
                    harness.repository.clone(),
                    harness.pusher.clone(),
                    harness.clock.clone(),
                ),
                typing: TypingIndicatorUseCase::new(harness.repository.clone(), harness.pusher.clone()),
                usecase: DisconnectClientUseCase::new(
                    harness.repository.clone(),
                    harness.pusher.clone(),
                    monitor,
                    harness.clock.clone(),
                ),
                harness,
            }
        }

        async fn joined(
            &self,
            id: &str,
            name: &str,
            room: &str,
        ) -> (ConnectionId, tokio::sync::mpsc::UnboundedReceiver<String>) {
            let (connection, mut rx) = self.harness.connect(id, Namespace::Default).await;
            self.join
                .join(
                    &connection,
                    JoinRequest {
                        user_id: format!("u-{id}"),
                        name: name.to_string(),
                        avatar: None,
                        room: Some(room.to_string()),
                    },
                )
                .await
                .unwrap();
            drain(&mut rx);
            (connection, rx)
        }
    }

    #[tokio::test]
    async fn test_disconnect_removes_profile_and_notifies_room() {
        // テスト項目: 切断するとプロフィールが消え、ルームに user_left、全体に offline が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let (alice, _alice_rx) = fixture.joined("alice", "Alice", "general").await;
        let (_bob, mut bob_rx) = fixture.joined("bob", "Bob", "general").await;
        let (_carol, mut carol_rx) = fixture.joined("carol", "Carol", "market").await;
        drain(&mut bob_rx);

        // when (操作):
        let departure = fixture.usecase.execute(&alice).await.unwrap().unwrap();

        // then (期待する結果):
        assert_eq!(departure.room, Some(RoomId::default_room()));
        assert!(fixture.harness.repository.profile(&alice).await.is_none());
        assert!(fixture.harness.repository.find_by_user_id("u-alice").await.is_none());

        let bob_events = drain(&mut bob_rx);
        assert_eq!(bob_events.len(), 2);
        assert_eq!(bob_events[0]["event"], "user_left");
        assert_eq!(bob_events[0]["data"]["name"], "Alice");
        assert_eq!(bob_events[1]["event"], "user_status_changed");
        assert_eq!(bob_events[1]["data"]["status"], "offline");
        assert_eq!(bob_events[1]["data"]["lastSeen"], "2023-11-14T22:13:20.000Z");

        let carol_events = drain(&mut carol_rx);
        assert_eq!(carol_events.len(), 1);
        assert_eq!(carol_events[0]["event"], "user_status_changed");
    }

    #[tokio::test]
    async fn test_disconnect_while_typing_clears_typing_set() {
        // テスト項目: crops で入力中に切断すると入力中セットが空になり、user_stop_typing が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let (alice, _alice_rx) = fixture.joined("alice", "Alice", "crops").await;
        let (_bob, mut bob_rx) = fixture.joined("bob", "Bob", "crops").await;
        fixture.typing.start(&alice).await.unwrap();
        drain(&mut bob_rx);

        // when (操作):
        let departure = fixture.usecase.execute(&alice).await.unwrap().unwrap();

        // then (期待する結果):
        assert!(departure.was_typing);
        let crops = RoomId::new("crops".to_string()).unwrap();
        assert!(fixture.harness.repository.typing_users(&crops).await.is_empty());
        let events = drain(&mut bob_rx);
        assert_eq!(events[0]["event"], "user_stop_typing");
        assert_eq!(events[0]["data"]["userName"], "Alice");
        assert_eq!(events[1]["event"], "user_left");
    }

    #[tokio::test]
    async fn test_disconnect_without_profile_is_silent() {
        // テスト項目: プロフィール未登録の接続の切断は誰にも通知されず、クエリルームからも外れる
        // given (前提条件):
        let fixture = Fixture::new();
        let (_bob, mut bob_rx) = fixture.joined("bob", "Bob", "general").await;
        let (q, _q_rx) = fixture.harness.connect("q-1", Namespace::Queries).await;
        let key = RoomKey::query(Namespace::Queries, &QueryId::new("42".to_string()).unwrap());
        fixture.harness.repository.join_query(&q, key.clone()).await.unwrap();

        // when (操作):
        let departure = fixture.usecase.execute(&q).await.unwrap().unwrap();

        // then (期待する結果):
        assert_eq!(departure.left_rooms, vec![key.clone()]);
        assert!(fixture.harness.repository.members(&key).await.is_empty());
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_unknown_connection_returns_none() {
        // テスト項目: 未登録の接続の切断は None を返す（二重切断でもエラーにならない）
        let fixture = Fixture::new();
        let (alice, _rx) = fixture.joined("alice", "Alice", "general").await;
        fixture.usecase.execute(&alice).await.unwrap();

        let second = fixture.usecase.execute(&alice).await.unwrap();

        assert!(second.is_none());
    }
}
