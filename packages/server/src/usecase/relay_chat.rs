//! UseCase: チャットルーム内のメッセージ中継
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - ルームメッセージ・プライベートメッセージ・リアクション・ファイル共有・音声メッセージ・既読通知
//!
//! ### なぜこのテストが必要か
//! - 配信範囲（送信者を含むルーム全体 / 送信者以外 / 特定の 1 人）がイベントごとに異なる
//! - 他のルームやプロフィール未登録の接続にメッセージが漏れないことを保証する
//!
//! ### どのような状況を想定しているか
//! - 正常系：ルーム内の配信
//! - エッジケース：プロフィール未登録・ルーム未所属の送信者、存在しない宛先

use std::sync::Arc;

use serde_json::{Map, Value};

use farmhub_shared::time::{Clock, timestamp_to_rfc3339};

use crate::{
    domain::{
        ChatMessage, ConnectionId, DeliveryStatus, MessagePushError, MessagePusher,
        PresenceRepository, RoomId, RoomKey, Timestamp, UserProfile,
    },
    infrastructure::dto::websocket::{
        AttachmentMessageDto, ChatMessageDto, PrivateMessageDto, ReactionDto, ReadReceiptDto,
        ServerEvent,
    },
};

use super::{
    dispatch::{EventDispatcher, except},
    error::RelayError,
};

/// 中継の結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayOutcome {
    /// 配信した宛先の数
    Delivered(usize),
    /// 送信者にプロフィールまたは所属ルームが無いため無視した
    Ignored,
}

pub struct RelayChatUseCase {
    repository: Arc<dyn PresenceRepository>,
    dispatcher: EventDispatcher,
    clock: Arc<dyn Clock>,
}

impl RelayChatUseCase {
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

    /// `send_message`: 履歴に記録し、送信者を含むルーム全体に `receive_message` を配信
    pub async fn send_message(
        &self,
        connection_id: &ConnectionId,
        content: String,
        extra: Map<String, Value>,
    ) -> Result<RelayOutcome, RelayError> {
        let Some((author, room)) = self.repository.chat_context(connection_id).await else {
            return Ok(RelayOutcome::Ignored);
        };

        let message = ChatMessage::sent_by(&author, room.clone(), content, self.now());
        self.repository.record_message(message.clone()).await;

        let event = ServerEvent::ReceiveMessage(ChatMessageDto::from_message(message, extra));
        self.to_room(&room, None, &event).await
    }

    /// `send_private_message`: 宛先ユーザーに `receive_private_message`、送信者に `private_message_sent`
    pub async fn send_private_message(
        &self,
        connection_id: &ConnectionId,
        recipient_id: String,
        content: String,
        extra: Map<String, Value>,
    ) -> Result<RelayOutcome, RelayError> {
        let Some(sender) = self.repository.profile(connection_id).await else {
            return Ok(RelayOutcome::Ignored);
        };
        let Some(recipient) = self.repository.find_by_user_id(&recipient_id).await else {
            tracing::debug!(recipient = %recipient_id, "private message recipient is offline");
            return Ok(RelayOutcome::Ignored);
        };

        let message = PrivateMessageDto {
            extra: PrivateMessageDto::strip_reserved(extra),
            recipient_id,
            content,
            id: uuid::Uuid::new_v4().to_string(),
            sender_id: sender.id,
            sender_name: sender.name,
            sender_avatar: sender.avatar,
            timestamp: timestamp_to_rfc3339(self.now().value()),
            kind: "private",
            status: DeliveryStatus::Sent,
        };

        // 宛先が直前に切断していても送信者への確認は返す
        let delivered = match self
            .dispatcher
            .send_to(
                &recipient.connection_id,
                &ServerEvent::ReceivePrivateMessage(message.clone()),
            )
            .await
        {
            Ok(()) => 1,
            Err(MessagePushError::ClientNotFound(_)) => {
                tracing::debug!(recipient = %message.recipient_id, "private message recipient disconnected");
                0
            }
            Err(e) => return Err(e.into()),
        };
        self.dispatcher
            .send_to(connection_id, &ServerEvent::PrivateMessageSent(message))
            .await?;
        Ok(RelayOutcome::Delivered(delivered + 1))
    }

    /// `add_reaction`: 送信者を含むルーム全体に `message_reaction`
    pub async fn add_reaction(
        &self,
        connection_id: &ConnectionId,
        message_id: String,
        emoji: String,
    ) -> Result<RelayOutcome, RelayError> {
        let Some((user, room)) = self.repository.chat_context(connection_id).await else {
            return Ok(RelayOutcome::Ignored);
        };
        let event = ServerEvent::MessageReaction(ReactionDto {
            message_id,
            emoji,
            user_id: user.id,
            user_name: user.name,
            timestamp: timestamp_to_rfc3339(self.now().value()),
        });
        self.to_room(&room, None, &event).await
    }

    /// `share_file`: 送信者を含むルーム全体に `receive_file`
    pub async fn share_file(
        &self,
        connection_id: &ConnectionId,
        file: Value,
    ) -> Result<RelayOutcome, RelayError> {
        let Some((user, room)) = self.repository.chat_context(connection_id).await else {
            return Ok(RelayOutcome::Ignored);
        };
        let mut message = self.attachment("file", &user, &room);
        message.file = Some(file);
        self.to_room(&room, None, &ServerEvent::ReceiveFile(message)).await
    }

    /// `send_voice_message`: 送信者を含むルーム全体に `receive_voice_message`
    pub async fn send_voice_message(
        &self,
        connection_id: &ConnectionId,
        voice_data: Value,
    ) -> Result<RelayOutcome, RelayError> {
        let Some((user, room)) = self.repository.chat_context(connection_id).await else {
            return Ok(RelayOutcome::Ignored);
        };
        let mut message = self.attachment("voice", &user, &room);
        message.duration = voice_data.get("duration").cloned();
        message.voice_data = Some(voice_data);
        self.to_room(&room, None, &ServerEvent::ReceiveVoiceMessage(message))
            .await
    }

    /// `mark_message_read`: 送信者以外のルームメンバーに `message_read`
    pub async fn mark_read(
        &self,
        connection_id: &ConnectionId,
        message_id: String,
    ) -> Result<RelayOutcome, RelayError> {
        let Some((user, room)) = self.repository.chat_context(connection_id).await else {
            return Ok(RelayOutcome::Ignored);
        };
        let event = ServerEvent::MessageRead(ReadReceiptDto {
            message_id,
            read_by: user.name,
            read_at: timestamp_to_rfc3339(self.now().value()),
        });
        self.to_room(&room, Some(connection_id), &event).await
    }

    fn now(&self) -> Timestamp {
        Timestamp::new(self.clock.now_millis())
    }

    fn attachment(&self, kind: &'static str, user: &UserProfile, room: &RoomId) -> AttachmentMessageDto {
        AttachmentMessageDto {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            user_id: user.id.clone(),
            user_name: user.name.clone(),
            user_avatar: user.avatar.clone(),
            room: room.as_str().to_string(),
            file: None,
            voice_data: None,
            duration: None,
            timestamp: timestamp_to_rfc3339(self.now().value()),
            status: DeliveryStatus::Sent,
        }
    }

    async fn to_room(
        &self,
        room: &RoomId,
        exclude: Option<&ConnectionId>,
        event: &ServerEvent,
    ) -> Result<RelayOutcome, RelayError> {
        let mut targets = self.repository.members(&RoomKey::chat(room)).await;
        if let Some(exclude) = exclude {
            targets = except(targets, exclude);
        }
        let delivered = targets.len();
        self.dispatcher.send_to_many(targets, event).await?;
        Ok(RelayOutcome::Delivered(delivered))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Namespace;
    use crate::usecase::join_room::{JoinRequest, JoinRoomUseCase};
    use crate::usecase::test_support::{Harness, drain};
    use serde_json::json;

    struct Fixture {
        harness: Harness,
        relay: RelayChatUseCase,
        join: JoinRoomUseCase,
    }

    impl Fixture {
        fn new() -> Self {
            let harness = Harness::new();
            let relay = RelayChatUseCase::new(
                harness.repository.clone(),
                harness.pusher.clone(),
                harness.clock.clone(),
            );
            let join = JoinRoomUseCase::new(
                harness.repository.clone(),
                harness.pusher.clone(),
                harness.clock.clone(),
            );
            Self { harness, relay, join }
        }

        async fn join(
            &self,
            connection: &str,
            user_id: &str,
            name: &str,
            room: &str,
        ) -> (ConnectionId, tokio::sync::mpsc::UnboundedReceiver<String>) {
            let (id, mut rx) = self.harness.connect(connection, Namespace::Default).await;
            self.join
                .join(
                    &id,
                    JoinRequest {
                        user_id: user_id.to_string(),
                        name: name.to_string(),
                        avatar: None,
                        room: Some(room.to_string()),
                    },
                )
                .await
                .unwrap();
            drain(&mut rx);
            (id, rx)
        }
    }

    #[tokio::test]
    async fn test_send_message_reaches_whole_room_including_sender() {
        // テスト項目: Alice の "Hello" は general の Alice と Bob に届き、crops の Carol には届かない
        // given (前提条件):
        let fixture = Fixture::new();
        let (alice, mut alice_rx) = fixture.join("alice", "u-1", "Alice", "general").await;
        let (_bob, mut bob_rx) = fixture.join("bob", "u-2", "Bob", "general").await;
        let (_carol, mut carol_rx) = fixture.join("carol", "u-3", "Carol", "crops").await;
        drain(&mut alice_rx);

        // when (操作):
        let outcome = fixture
            .relay
            .send_message(&alice, "Hello".to_string(), Map::new())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome, RelayOutcome::Delivered(2));
        for rx in [&mut alice_rx, &mut bob_rx] {
            let events = drain(rx);
            assert_eq!(events.len(), 1);
            assert_eq!(events[0]["event"], "receive_message");
            assert_eq!(events[0]["data"]["content"], "Hello");
            assert_eq!(events[0]["data"]["userName"], "Alice");
            assert_eq!(events[0]["data"]["room"], "general");
            assert_eq!(events[0]["data"]["status"], "sent");
        }
        assert!(drain(&mut carol_rx).is_empty());

        let history = fixture
            .harness
            .repository
            .recent_messages(&RoomId::new("general".to_string()).unwrap())
            .await;
        assert_eq!(history.len(), 1);
    }

    #[tokio::test]
    async fn test_send_message_without_profile_is_ignored() {
        // テスト項目: プロフィール未登録の接続からのメッセージは配信されない
        // given (前提条件):
        let fixture = Fixture::new();
        let (_bob, mut bob_rx) = fixture.join("bob", "u-2", "Bob", "general").await;
        let (ghost, _ghost_rx) = fixture.harness.connect("ghost", Namespace::Default).await;

        // when (操作):
        let outcome = fixture
            .relay
            .send_message(&ghost, "boo".to_string(), Map::new())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome, RelayOutcome::Ignored);
        assert!(drain(&mut bob_rx).is_empty());
    }

    #[tokio::test]
    async fn test_private_message_goes_to_recipient_and_confirms_sender() {
        // テスト項目: プライベートメッセージは宛先と送信者にだけ届く
        // given (前提条件):
        let fixture = Fixture::new();
        let (alice, mut alice_rx) = fixture.join("alice", "u-1", "Alice", "general").await;
        let (_bob, mut bob_rx) = fixture.join("bob", "u-2", "Bob", "crops").await;
        let (_carol, mut carol_rx) = fixture.join("carol", "u-3", "Carol", "general").await;
        drain(&mut alice_rx);
        let mut extra = Map::new();
        extra.insert("attachment".to_string(), json!(null));

        // when (操作):
        fixture
            .relay
            .send_private_message(&alice, "u-2".to_string(), "psst".to_string(), extra)
            .await
            .unwrap();

        // then (期待する結果):
        let bob_events = drain(&mut bob_rx);
        assert_eq!(bob_events[0]["event"], "receive_private_message");
        assert_eq!(bob_events[0]["data"]["senderName"], "Alice");
        assert_eq!(bob_events[0]["data"]["type"], "private");
        assert_eq!(bob_events[0]["data"]["recipientId"], "u-2");
        let alice_events = drain(&mut alice_rx);
        assert_eq!(alice_events[0]["event"], "private_message_sent");
        assert_eq!(alice_events[0]["data"]["id"], bob_events[0]["data"]["id"]);
        assert!(drain(&mut carol_rx).is_empty());
    }

    #[tokio::test]
    async fn test_private_message_to_unknown_user_is_ignored() {
        // テスト項目: 存在しない宛先へのプライベートメッセージは誰にも届かない
        let fixture = Fixture::new();
        let (alice, mut alice_rx) = fixture.join("alice", "u-1", "Alice", "general").await;

        let outcome = fixture
            .relay
            .send_private_message(&alice, "u-404".to_string(), "hi".to_string(), Map::new())
            .await
            .unwrap();

        assert_eq!(outcome, RelayOutcome::Ignored);
        assert!(drain(&mut alice_rx).is_empty());
    }

    #[tokio::test]
    async fn test_private_message_sender_is_confirmed_when_recipient_channel_is_gone() {
        // テスト項目: 宛先の送信チャネルが既に無くても、送信者には private_message_sent が届く
        // given (前提条件):
        let fixture = Fixture::new();
        let (alice, mut alice_rx) = fixture.join("alice", "u-1", "Alice", "general").await;
        let (bob, _bob_rx) = fixture.join("bob", "u-2", "Bob", "general").await;
        fixture.harness.pusher.unregister_client(&bob).await;
        drain(&mut alice_rx);

        // when (操作):
        let outcome = fixture
            .relay
            .send_private_message(&alice, "u-2".to_string(), "psst".to_string(), Map::new())
            .await
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome, RelayOutcome::Delivered(1));
        let events = drain(&mut alice_rx);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0]["event"], "private_message_sent");
        assert_eq!(events[0]["data"]["content"], "psst");
    }

    #[tokio::test]
    async fn test_reaction_file_and_voice_reach_whole_room() {
        // テスト項目: リアクション・ファイル・音声はルーム全体（送信者を含む）に届く
        // given (前提条件):
        let fixture = Fixture::new();
        let (alice, mut alice_rx) = fixture.join("alice", "u-1", "Alice", "general").await;
        let (_bob, mut bob_rx) = fixture.join("bob", "u-2", "Bob", "general").await;
        drain(&mut alice_rx);

        // when (操作):
        fixture
            .relay
            .add_reaction(&alice, "m-1".to_string(), "👍".to_string())
            .await
            .unwrap();
        fixture
            .relay
            .share_file(&alice, json!({"url": "/uploads/a.png"}))
            .await
            .unwrap();
        fixture
            .relay
            .send_voice_message(&alice, json!({"duration": 4, "blob": "..."}))
            .await
            .unwrap();

        // then (期待する結果):
        for rx in [&mut alice_rx, &mut bob_rx] {
            let events = drain(rx);
            assert_eq!(events.len(), 3);
            assert_eq!(events[0]["event"], "message_reaction");
            assert_eq!(events[0]["data"]["emoji"], "👍");
            assert_eq!(events[1]["event"], "receive_file");
            assert_eq!(events[1]["data"]["type"], "file");
            assert_eq!(events[1]["data"]["file"]["url"], "/uploads/a.png");
            assert_eq!(events[2]["event"], "receive_voice_message");
            assert_eq!(events[2]["data"]["duration"], 4);
        }
    }

    #[tokio::test]
    async fn test_mark_read_excludes_reader() {
        // テスト項目: 既読通知は送信者以外のルームメンバーにだけ届く
        let fixture = Fixture::new();
        let (alice, mut alice_rx) = fixture.join("alice", "u-1", "Alice", "general").await;
        let (_bob, mut bob_rx) = fixture.join("bob", "u-2", "Bob", "general").await;
        drain(&mut alice_rx);

        fixture.relay.mark_read(&alice, "m-9".to_string()).await.unwrap();

        assert!(drain(&mut alice_rx).is_empty());
        let events = drain(&mut bob_rx);
        assert_eq!(events[0]["event"], "message_read");
        assert_eq!(events[0]["data"]["readBy"], "Alice");
        assert_eq!(events[0]["data"]["messageId"], "m-9");
    }
}
