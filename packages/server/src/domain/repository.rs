//! Repository trait 定義
//!
//! ドメイン層が必要とするプレゼンス状態へのアクセスのインターフェースを定義します。
//! 具体的な実装は Infrastructure 層が提供します（依存性の逆転）。
//!
//! 各メソッドは 1 回の呼び出しで状態変更を完結させます。UseCase 層は複数の呼び出しを
//! 跨いだ一貫性を前提にしてはいけません。

use async_trait::async_trait;

use super::{
    ChatMessage, ConnectionId, Departure, JoinOutcome, Namespace, RepositoryError, RoomId,
    RoomKey, RoomOccupancy, SwitchOutcome, Timestamp, TypingChange, UserProfile, UserStatus,
};

/// Presence Repository trait
#[async_trait]
pub trait PresenceRepository: Send + Sync {
    /// 接続を登録
    async fn register_connection(
        &self,
        connection_id: ConnectionId,
        namespace: Namespace,
        connected_at: Timestamp,
    ) -> Result<(), RepositoryError>;

    /// プロフィールを作成・置換してチャットルームに参加
    async fn join(
        &self,
        connection_id: &ConnectionId,
        profile: UserProfile,
        room: RoomId,
    ) -> Result<JoinOutcome, RepositoryError>;

    /// チャットルームを切り替え
    async fn switch_room(
        &self,
        connection_id: &ConnectionId,
        room: RoomId,
    ) -> Result<SwitchOutcome, RepositoryError>;

    /// 質問スレッドに参加
    async fn join_query(
        &self,
        connection_id: &ConnectionId,
        key: RoomKey,
    ) -> Result<(), RepositoryError>;

    /// 質問スレッドから退出
    async fn leave_query(
        &self,
        connection_id: &ConnectionId,
        key: &RoomKey,
    ) -> Result<bool, RepositoryError>;

    /// 送信者のプロフィールと所属チャットルーム
    async fn chat_context(&self, connection_id: &ConnectionId) -> Option<(UserProfile, RoomId)>;

    async fn profile(&self, connection_id: &ConnectionId) -> Option<UserProfile>;

    async fn find_by_user_id(&self, user_id: &str) -> Option<UserProfile>;

    /// ルームに所属している接続 ID
    async fn members(&self, key: &RoomKey) -> Vec<ConnectionId>;

    async fn room_profiles(&self, room: &RoomId) -> Vec<UserProfile>;

    async fn start_typing(&self, connection_id: &ConnectionId) -> Option<TypingChange>;

    async fn stop_typing(&self, connection_id: &ConnectionId) -> Option<TypingChange>;

    async fn typing_users(&self, room: &RoomId) -> Vec<String>;

    async fn set_status(
        &self,
        connection_id: &ConnectionId,
        status: UserStatus,
    ) -> Option<UserProfile>;

    /// メッセージをルームの履歴に追加
    async fn record_message(&self, message: ChatMessage);

    async fn recent_messages(&self, room: &RoomId) -> Vec<ChatMessage>;

    /// 接続を削除
    async fn disconnect(
        &self,
        connection_id: &ConnectionId,
        disconnected_at: Timestamp,
    ) -> Option<Departure>;

    /// 名前空間に接続中の接続 ID
    async fn connections(&self, namespace: Namespace) -> Vec<ConnectionId>;

    async fn connection_count(&self) -> usize;

    async fn online_users(&self) -> Vec<UserProfile>;

    async fn occupancy(&self) -> Vec<RoomOccupancy>;
}
