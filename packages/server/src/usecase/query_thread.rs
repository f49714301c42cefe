//! UseCase: 質問スレッド（Q&A）のリアルタイム中継
//!
//! 質問スレッドのルームは `query:<queryId>` で、接続した名前空間ごとに独立しています。
//!
//! ## テスト実装の作業記録
//!
//! ### 何をテストしているか
//! - 参加・退出・投稿・コメント・入力中の各イベントの配信範囲
//! - 投稿者への `query:post:ack`
//!
//! ### どのような状況を想定しているか
//! - 正常系：同じ名前空間の同じスレッドに複数の接続
//! - エッジケース：別の名前空間の同じ queryId には届かない、未参加での退出

use std::sync::Arc;

use crate::{
    domain::{ConnectionId, MessagePusher, Namespace, PresenceRepository, RoomKey},
    infrastructure::dto::websocket::{
        QueryAckDto, QueryEvent, QueryMemberDto, QueryPayload, QueryTypingDto, ServerEvent,
    },
};

use super::{
    dispatch::{EventDispatcher, except},
    error::RelayError,
};

pub struct QueryThreadUseCase {
    repository: Arc<dyn PresenceRepository>,
    dispatcher: EventDispatcher,
}

impl QueryThreadUseCase {
    pub fn new(repository: Arc<dyn PresenceRepository>, message_pusher: Arc<dyn MessagePusher>) -> Self {
        Self {
            repository,
            dispatcher: EventDispatcher::new(message_pusher),
        }
    }

    /// 質問スレッド系イベントを処理
    pub async fn handle(
        &self,
        connection_id: &ConnectionId,
        namespace: Namespace,
        event: QueryEvent,
    ) -> Result<(), RelayError> {
        match event {
            QueryEvent::Join(payload) => self.join(connection_id, namespace, payload).await,
            QueryEvent::Leave(payload) => self.leave(connection_id, namespace, payload).await,
            QueryEvent::Post(payload) => self.post(connection_id, namespace, payload).await,
            QueryEvent::Comment(payload) => self.comment(connection_id, namespace, payload).await,
            QueryEvent::Typing { payload, typing } => {
                self.typing(connection_id, namespace, payload, typing).await
            }
        }
    }

    async fn join(
        &self,
        connection_id: &ConnectionId,
        namespace: Namespace,
        payload: QueryPayload,
    ) -> Result<(), RelayError> {
        let key = RoomKey::query(namespace, &payload.query_id);
        self.repository
            .join_query(connection_id, key.clone())
            .await?;
        tracing::debug!(connection_id = %connection_id, room = %key, "joined query thread");

        let event = ServerEvent::QueryUserJoined(QueryMemberDto {
            query_id: payload.query_id.as_str().to_string(),
            user: payload.user(),
        });
        self.to_others(connection_id, &key, &event).await
    }

    async fn leave(
        &self,
        connection_id: &ConnectionId,
        namespace: Namespace,
        payload: QueryPayload,
    ) -> Result<(), RelayError> {
        let key = RoomKey::query(namespace, &payload.query_id);
        self.repository.leave_query(connection_id, &key).await?;

        let event = ServerEvent::QueryUserLeft(QueryMemberDto {
            query_id: payload.query_id.as_str().to_string(),
            user: payload.user(),
        });
        self.to_others(connection_id, &key, &event).await
    }

    async fn post(
        &self,
        connection_id: &ConnectionId,
        namespace: Namespace,
        payload: QueryPayload,
    ) -> Result<(), RelayError> {
        let key = RoomKey::query(namespace, &payload.query_id);
        let ack = ServerEvent::QueryPostAck(QueryAckDto {
            ok: true,
            query_id: payload.query_id.as_str().to_string(),
            id: payload.id(),
        });

        self.to_others(connection_id, &key, &ServerEvent::QueryNewPost(payload.body))
            .await?;
        self.dispatcher.send_to(connection_id, &ack).await?;
        Ok(())
    }

    async fn comment(
        &self,
        connection_id: &ConnectionId,
        namespace: Namespace,
        payload: QueryPayload,
    ) -> Result<(), RelayError> {
        let key = RoomKey::query(namespace, &payload.query_id);
        self.to_others(connection_id, &key, &ServerEvent::QueryNewComment(payload.body))
            .await
    }

    async fn typing(
        &self,
        connection_id: &ConnectionId,
        namespace: Namespace,
        payload: QueryPayload,
        typing: bool,
    ) -> Result<(), RelayError> {
        let key = RoomKey::query(namespace, &payload.query_id);
        let event = ServerEvent::QueryTyping(QueryTypingDto {
            query_id: payload.query_id.as_str().to_string(),
            user: payload.user(),
            typing,
        });
        self.to_others(connection_id, &key, &event).await
    }

    async fn to_others(
        &self,
        connection_id: &ConnectionId,
        key: &RoomKey,
        event: &ServerEvent,
    ) -> Result<(), RelayError> {
        let members = except(self.repository.members(key).await, connection_id);
        self.dispatcher.send_to_many(members, event).await?;
        Ok(())
    }
}
