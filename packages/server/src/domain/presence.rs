//! プレゼンス・レジストリ
//!
//! 接続 → プロフィール、接続 → 所属ルーム、ルーム → 入力中ユーザー の対応を保持する
//! インメモリの状態ストアです。全ての変更はこの構造体のメソッド 1 回で完結するため、
//! 呼び出し側が排他制御（単一の書き込み者）を保証すれば途中状態が観測されることはありません。
//!
//! ## 不変条件
//!
//! - 1 つの接続が所属するチャットルームは高々 1 つ
//! - ルーム R へのブロードキャスト対象は、現在 R に所属している接続のみ
//! - 切断された接続のプロフィール・所属情報・入力中状態は残らない

use std::collections::{BTreeMap, BTreeSet, HashMap, VecDeque};

use super::{
    entity::{ChatMessage, UserProfile},
    error::RepositoryError,
    value_object::{ConnectionId, Namespace, RoomId, RoomKey, Timestamp, UserStatus},
};

/// ルームごとに保持するメッセージ履歴の既定件数
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// `join` の結果
#[derive(Debug, Clone, PartialEq)]
pub struct JoinOutcome {
    /// 直前に所属していたチャットルーム
    pub previous_room: Option<RoomId>,
    /// 直前のルームで入力中だった場合、その表示名
    pub stopped_typing: Option<String>,
    /// 参加後のルームのメンバー（参加者自身を含む）
    pub members: Vec<UserProfile>,
}

/// `switch_room` の結果
#[derive(Debug, Clone, PartialEq)]
pub struct SwitchOutcome {
    pub previous_room: Option<RoomId>,
    pub stopped_typing: Option<String>,
    /// プロフィール未登録の接続でもルーム移動は記録される
    pub profile: Option<UserProfile>,
    pub members: Vec<UserProfile>,
}

/// 入力中状態の変化
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypingChange {
    pub user_name: String,
    pub room: RoomId,
    /// 入力中セットが実際に変化したか
    pub changed: bool,
}

/// 切断時に取り除かれた情報
#[derive(Debug, Clone, PartialEq)]
pub struct Departure {
    pub namespace: Namespace,
    /// 切断時点のプロフィール（status は offline, last_seen は切断時刻）
    pub profile: Option<UserProfile>,
    pub room: Option<RoomId>,
    pub was_typing: bool,
    /// チャットルーム・質問スレッドを含む、所属していた全てのルーム
    pub left_rooms: Vec<RoomKey>,
}

/// トポロジー表示用のルーム占有状況
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomOccupancy {
    pub key: RoomKey,
    pub connections: Vec<ConnectionId>,
}

#[derive(Debug, Clone)]
struct ConnectionEntry {
    namespace: Namespace,
    connected_at: Timestamp,
    chat_room: Option<RoomId>,
    query_rooms: BTreeSet<RoomKey>,
}

/// プレゼンス・レジストリ本体
#[derive(Debug, Clone)]
pub struct PresenceRegistry {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    profiles: HashMap<ConnectionId, UserProfile>,
    rooms: BTreeMap<RoomKey, BTreeSet<ConnectionId>>,
    typing: HashMap<RoomId, BTreeSet<String>>,
    history: HashMap<RoomId, VecDeque<ChatMessage>>,
    history_capacity: usize,
}

impl Default for PresenceRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(history_capacity: usize) -> Self {
        Self {
            connections: HashMap::new(),
            profiles: HashMap::new(),
            rooms: BTreeMap::new(),
            typing: HashMap::new(),
            history: HashMap::new(),
            history_capacity,
        }
    }

    /// 新しい接続を登録
    pub fn register(
        &mut self,
        connection_id: ConnectionId,
        namespace: Namespace,
        connected_at: Timestamp,
    ) -> Result<(), RepositoryError> {
        if self.connections.contains_key(&connection_id) {
            return Err(RepositoryError::DuplicateConnection(
                connection_id.into_string(),
            ));
        }
        self.connections.insert(
            connection_id,
            ConnectionEntry {
                namespace,
                connected_at,
                chat_room: None,
                query_rooms: BTreeSet::new(),
            },
        );
        Ok(())
    }

    pub fn is_registered(&self, connection_id: &ConnectionId) -> bool {
        self.connections.contains_key(connection_id)
    }

    /// プロフィールを作成（既存なら置き換え）し、指定ルームに参加
    pub fn join(
        &mut self,
        connection_id: &ConnectionId,
        profile: UserProfile,
        room: RoomId,
    ) -> Result<JoinOutcome, RepositoryError> {
        self.ensure_registered(connection_id)?;

        // 旧ルームからの退出を先に行う（二重所属を作らない）
        let (previous_room, stopped_typing) = self.leave_chat_room(connection_id);

        self.profiles.insert(connection_id.clone(), profile);
        self.enter_chat_room(connection_id, &room);

        Ok(JoinOutcome {
            previous_room,
            stopped_typing,
            members: self.room_profiles(&room),
        })
    }

    /// 所属チャットルームを切り替える
    pub fn switch_room(
        &mut self,
        connection_id: &ConnectionId,
        room: RoomId,
    ) -> Result<SwitchOutcome, RepositoryError> {
        self.ensure_registered(connection_id)?;

        let (previous_room, stopped_typing) = self.leave_chat_room(connection_id);
        self.enter_chat_room(connection_id, &room);

        let profile = self.profiles.get(connection_id).cloned();
        let members = if profile.is_some() {
            self.room_profiles(&room)
        } else {
            Vec::new()
        };

        Ok(SwitchOutcome {
            previous_room,
            stopped_typing,
            profile,
            members,
        })
    }

    /// 質問スレッドのルームに参加（複数同時に参加可能）
    pub fn join_query(
        &mut self,
        connection_id: &ConnectionId,
        key: RoomKey,
    ) -> Result<(), RepositoryError> {
        let entry = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        entry.query_rooms.insert(key.clone());
        self.rooms
            .entry(key)
            .or_default()
            .insert(connection_id.clone());
        Ok(())
    }

    /// 質問スレッドのルームから退出。所属していなかった場合は `Ok(false)`
    pub fn leave_query(
        &mut self,
        connection_id: &ConnectionId,
        key: &RoomKey,
    ) -> Result<bool, RepositoryError> {
        let entry = self
            .connections
            .get_mut(connection_id)
            .ok_or_else(|| RepositoryError::ConnectionNotFound(connection_id.to_string()))?;
        let was_member = entry.query_rooms.remove(key);
        self.remove_member(key, connection_id);
        Ok(was_member)
    }

    pub fn profile(&self, connection_id: &ConnectionId) -> Option<&UserProfile> {
        self.profiles.get(connection_id)
    }

    pub fn chat_room(&self, connection_id: &ConnectionId) -> Option<&RoomId> {
        self.connections
            .get(connection_id)
            .and_then(|entry| entry.chat_room.as_ref())
    }

    /// プロフィール登録済みかつルーム所属中の接続について、その組を返す
    pub fn chat_context(&self, connection_id: &ConnectionId) -> Option<(UserProfile, RoomId)> {
        let profile = self.profiles.get(connection_id)?;
        let room = self.chat_room(connection_id)?;
        Some((profile.clone(), room.clone()))
    }

    /// ユーザー ID からプロフィールを検索（同一 ID が複数ある場合は最後に参加したもの）
    pub fn find_by_user_id(&self, user_id: &str) -> Option<&UserProfile> {
        self.profiles
            .values()
            .filter(|profile| profile.id == user_id)
            .max_by_key(|profile| profile.joined_at)
    }

    /// ルームに所属している接続 ID の一覧
    pub fn members(&self, key: &RoomKey) -> Vec<ConnectionId> {
        self.rooms
            .get(key)
            .map(|members| members.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// チャットルームに所属しているプロフィールの一覧（参加順）
    pub fn room_profiles(&self, room: &RoomId) -> Vec<UserProfile> {
        let mut profiles: Vec<UserProfile> = self
            .members(&RoomKey::chat(room))
            .iter()
            .filter_map(|id| self.profiles.get(id).cloned())
            .collect();
        profiles.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.name.cmp(&b.name)));
        profiles
    }

    pub fn start_typing(&mut self, connection_id: &ConnectionId) -> Option<TypingChange> {
        let (profile, room) = self.chat_context(connection_id)?;
        let changed = self
            .typing
            .entry(room.clone())
            .or_default()
            .insert(profile.name.clone());
        Some(TypingChange {
            user_name: profile.name,
            room,
            changed,
        })
    }

    /// 入力中状態を解除。何度呼んでもエラーにならない
    pub fn stop_typing(&mut self, connection_id: &ConnectionId) -> Option<TypingChange> {
        let (profile, room) = self.chat_context(connection_id)?;
        let changed = self.remove_typing(&room, &profile.name);
        Some(TypingChange {
            user_name: profile.name,
            room,
            changed,
        })
    }

    pub fn typing_users(&self, room: &RoomId) -> Vec<String> {
        self.typing
            .get(room)
            .map(|names| names.iter().cloned().collect())
            .unwrap_or_default()
    }

    pub fn set_status(
        &mut self,
        connection_id: &ConnectionId,
        status: UserStatus,
    ) -> Option<UserProfile> {
        let profile = self.profiles.get_mut(connection_id)?;
        profile.status = status;
        Some(profile.clone())
    }

    /// メッセージをルームの履歴に追加。容量を超えた分は古いものから破棄する
    pub fn record_message(&mut self, message: ChatMessage) {
        if self.history_capacity == 0 {
            return;
        }
        let history = self.history.entry(message.room.clone()).or_default();
        while history.len() >= self.history_capacity {
            history.pop_front();
        }
        history.push_back(message);
    }

    pub fn recent_messages(&self, room: &RoomId) -> Vec<ChatMessage> {
        self.history
            .get(room)
            .map(|history| history.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// 接続を削除し、プロフィール・所属ルーム・入力中状態を全て取り除く
    ///
    /// 未登録の接続に対しては `None` を返す。
    pub fn disconnect(
        &mut self,
        connection_id: &ConnectionId,
        disconnected_at: Timestamp,
    ) -> Option<Departure> {
        if !self.connections.contains_key(connection_id) {
            return None;
        }

        let (room, stopped_typing) = self.leave_chat_room(connection_id);
        let entry = self.connections.remove(connection_id)?;

        let mut left_rooms: Vec<RoomKey> = room.iter().map(RoomKey::chat).collect();
        for key in entry.query_rooms {
            self.remove_member(&key, connection_id);
            left_rooms.push(key);
        }

        let profile = self.profiles.remove(connection_id).map(|mut profile| {
            profile.status = UserStatus::Offline;
            profile.last_seen = Some(disconnected_at);
            profile
        });

        Some(Departure {
            namespace: entry.namespace,
            profile,
            room,
            was_typing: stopped_typing.is_some(),
            left_rooms,
        })
    }

    /// 名前空間に接続中の全ての接続 ID（接続順）
    pub fn connections(&self, namespace: Namespace) -> Vec<ConnectionId> {
        let mut entries: Vec<(&ConnectionId, &ConnectionEntry)> = self
            .connections
            .iter()
            .filter(|(_, entry)| entry.namespace == namespace)
            .collect();
        entries.sort_by(|(a_id, a), (b_id, b)| {
            a.connected_at.cmp(&b.connected_at).then_with(|| a_id.cmp(b_id))
        });
        entries.into_iter().map(|(id, _)| id.clone()).collect()
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// 全てのプロフィール（参加順）
    pub fn online_users(&self) -> Vec<UserProfile> {
        let mut profiles: Vec<UserProfile> = self.profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.joined_at.cmp(&b.joined_at).then_with(|| a.name.cmp(&b.name)));
        profiles
    }

    pub fn occupancy(&self) -> Vec<RoomOccupancy> {
        self.rooms
            .iter()
            .map(|(key, members)| RoomOccupancy {
                key: key.clone(),
                connections: members.iter().cloned().collect(),
            })
            .collect()
    }

    fn ensure_registered(&self, connection_id: &ConnectionId) -> Result<(), RepositoryError> {
        if self.connections.contains_key(connection_id) {
            Ok(())
        } else {
            Err(RepositoryError::ConnectionNotFound(connection_id.to_string()))
        }
    }

    fn enter_chat_room(&mut self, connection_id: &ConnectionId, room: &RoomId) {
        if let Some(entry) = self.connections.get_mut(connection_id) {
            entry.chat_room = Some(room.clone());
        }
        self.rooms
            .entry(RoomKey::chat(room))
            .or_default()
            .insert(connection_id.clone());
    }

    /// 現在のチャットルームから退出し、(退出したルーム, 解除された入力中の表示名) を返す
    fn leave_chat_room(&mut self, connection_id: &ConnectionId) -> (Option<RoomId>, Option<String>) {
        let Some(room) = self
            .connections
            .get_mut(connection_id)
            .and_then(|entry| entry.chat_room.take())
        else {
            return (None, None);
        };

        self.remove_member(&RoomKey::chat(&room), connection_id);

        let stopped_typing = self
            .profiles
            .get(connection_id)
            .map(|profile| profile.name.clone())
            .filter(|name| self.typing.get(&room).is_some_and(|set| set.contains(name)));
        if let Some(name) = &stopped_typing {
            self.remove_typing(&room, name);
        }

        (Some(room), stopped_typing)
    }

    fn remove_member(&mut self, key: &RoomKey, connection_id: &ConnectionId) {
        if let Some(members) = self.rooms.get_mut(key) {
            members.remove(connection_id);
            if members.is_empty() {
                self.rooms.remove(key);
            }
        }
    }

    fn remove_typing(&mut self, room: &RoomId, name: &str) -> bool {
        let Some(names) = self.typing.get_mut(room) else {
            return false;
        };
        let removed = names.remove(name);
        if names.is_empty() {
            self.typing.remove(room);
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_object::QueryId;

    // ========================================
    // テスト作業記録
    // ========================================
    // 【何をテストするか】
    // - 参加・ルーム移動・切断によるメンバーシップの変化
    // - 入力中セットの冪等性と切断時のクリーンアップ
    // - 質問スレッドの複数ルーム同時所属
    //
    // 【なぜこのテストが必要か】
    // - ブロードキャスト対象はこのレジストリの所属情報だけで決まる
    // - 切断後にプロフィールや入力中状態が残ると、他の参加者に誤った表示が続く
    // ========================================

    fn conn(id: &str) -> ConnectionId {
        ConnectionId::new(id.to_string()).unwrap()
    }

    fn room(id: &str) -> RoomId {
        RoomId::new(id.to_string()).unwrap()
    }

    fn profile(connection: &str, name: &str, joined_at: i64) -> UserProfile {
        UserProfile::new(
            format!("user-{name}"),
            name.to_string(),
            None,
            conn(connection),
            Timestamp::new(joined_at),
        )
    }

    fn registry_with(connections: &[&str]) -> PresenceRegistry {
        let mut registry = PresenceRegistry::new();
        for (i, id) in connections.iter().enumerate() {
            registry
                .register(conn(id), Namespace::Default, Timestamp::new(i as i64))
                .unwrap();
        }
        registry
    }

    #[test]
    fn test_register_duplicate_connection_is_rejected() {
        // テスト項目: 同じ接続 ID を二重登録するとエラーになる
        // given (前提条件):
        let mut registry = registry_with(&["c1"]);

        // when (操作):
        let result = registry.register(conn("c1"), Namespace::Default, Timestamp::new(5));

        // then (期待する結果):
        assert_eq!(
            result,
            Err(RepositoryError::DuplicateConnection("c1".to_string()))
        );
    }

    #[test]
    fn test_join_unknown_connection_fails() {
        // テスト項目: 未登録の接続からの参加はエラーになる
        // given (前提条件):
        let mut registry = PresenceRegistry::new();

        // when (操作):
        let result = registry.join(&conn("ghost"), profile("ghost", "Ghost", 0), room("general"));

        // then (期待する結果):
        assert!(matches!(result, Err(RepositoryError::ConnectionNotFound(_))));
    }

    #[test]
    fn test_join_returns_room_members() {
        // テスト項目: 参加すると同じルームのメンバー一覧（自分を含む）が返される
        // given (前提条件):
        let mut registry = registry_with(&["c1", "c2", "c3"]);
        registry
            .join(&conn("c1"), profile("c1", "Alice", 1), room("general"))
            .unwrap();
        registry
            .join(&conn("c3"), profile("c3", "Carol", 3), room("crops"))
            .unwrap();

        // when (操作):
        let outcome = registry
            .join(&conn("c2"), profile("c2", "Bob", 2), room("general"))
            .unwrap();

        // then (期待する結果):
        let names: Vec<&str> = outcome.members.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Alice", "Bob"]);
        assert_eq!(outcome.previous_room, None);
    }

    #[test]
    fn test_rejoin_replaces_profile_and_room() {
        // テスト項目: 再度 join すると古いルームから抜け、プロフィールが置き換わる
        // given (前提条件):
        let mut registry = registry_with(&["c1"]);
        registry
            .join(&conn("c1"), profile("c1", "Alice", 1), room("general"))
            .unwrap();

        // when (操作):
        let outcome = registry
            .join(&conn("c1"), profile("c1", "Alicia", 2), room("market"))
            .unwrap();

        // then (期待する結果):
        assert_eq!(outcome.previous_room, Some(room("general")));
        assert!(registry.members(&RoomKey::chat(&room("general"))).is_empty());
        assert_eq!(registry.members(&RoomKey::chat(&room("market"))), vec![conn("c1")]);
        assert_eq!(registry.profile(&conn("c1")).unwrap().name, "Alicia");
    }

    #[test]
    fn test_switch_room_keeps_single_membership() {
        // テスト項目: ルーム移動後、接続はちょうど 1 つのチャットルームにのみ所属する
        // given (前提条件):
        let mut registry = registry_with(&["c1", "c2"]);
        registry
            .join(&conn("c1"), profile("c1", "Alice", 1), room("general"))
            .unwrap();
        registry
            .join(&conn("c2"), profile("c2", "Bob", 2), room("crops"))
            .unwrap();

        // when (操作):
        let outcome = registry.switch_room(&conn("c1"), room("crops")).unwrap();

        // then (期待する結果):
        assert_eq!(outcome.previous_room, Some(room("general")));
        assert_eq!(outcome.members.len(), 2);
        let chat_rooms_of_c1: Vec<_> = registry
            .occupancy()
            .into_iter()
            .filter(|o| o.connections.contains(&conn("c1")))
            .collect();
        assert_eq!(chat_rooms_of_c1.len(), 1);
        assert_eq!(chat_rooms_of_c1[0].key, RoomKey::chat(&room("crops")));
    }

    #[test]
    fn test_switch_room_without_profile_records_membership() {
        // テスト項目: プロフィール未登録でもルーム移動は記録され、メンバー一覧は返されない
        // given (前提条件):
        let mut registry = registry_with(&["c1"]);

        // when (操作):
        let outcome = registry.switch_room(&conn("c1"), room("weather")).unwrap();

        // then (期待する結果):
        assert!(outcome.profile.is_none());
        assert!(outcome.members.is_empty());
        assert_eq!(registry.chat_room(&conn("c1")), Some(&room("weather")));
    }

    #[test]
    fn test_stop_typing_twice_is_idempotent() {
        // テスト項目: typing stop を 2 回続けてもエラーにならず、入力中セットに残らない
        // given (前提条件):
        let mut registry = registry_with(&["c1"]);
        registry
            .join(&conn("c1"), profile("c1", "Alice", 1), room("general"))
            .unwrap();
        registry.start_typing(&conn("c1")).unwrap();

        // when (操作):
        let first = registry.stop_typing(&conn("c1")).unwrap();
        let second = registry.stop_typing(&conn("c1")).unwrap();

        // then (期待する結果):
        assert!(first.changed);
        assert!(!second.changed);
        assert!(registry.typing_users(&room("general")).is_empty());
    }

    #[test]
    fn test_typing_requires_profile_and_room() {
        // テスト項目: プロフィール未登録の接続の入力中イベントは無視される
        // given (前提条件):
        let mut registry = registry_with(&["c1"]);

        // when (操作):
        let result = registry.start_typing(&conn("c1"));

        // then (期待する結果):
        assert!(result.is_none());
    }

    #[test]
    fn test_disconnect_removes_everything() {
        // テスト項目: join → send → disconnect の後、プロフィールも所属も残らない
        // given (前提条件):
        let mut registry = registry_with(&["c1"]);
        let alice = profile("c1", "Alice", 1);
        registry
            .join(&conn("c1"), alice.clone(), room("general"))
            .unwrap();
        registry.record_message(ChatMessage::sent_by(
            &alice,
            room("general"),
            "Hello".to_string(),
            Timestamp::new(2),
        ));
        let query_key = RoomKey::query(Namespace::Default, &QueryId::new("q1".to_string()).unwrap());
        registry.join_query(&conn("c1"), query_key.clone()).unwrap();

        // when (操作):
        let departure = registry.disconnect(&conn("c1"), Timestamp::new(10)).unwrap();

        // then (期待する結果):
        assert!(registry.profile(&conn("c1")).is_none());
        assert!(!registry.is_registered(&conn("c1")));
        assert!(registry.members(&RoomKey::chat(&room("general"))).is_empty());
        assert!(registry.members(&query_key).is_empty());
        assert!(registry.occupancy().is_empty());

        let profile = departure.profile.unwrap();
        assert_eq!(profile.status, UserStatus::Offline);
        assert_eq!(profile.last_seen, Some(Timestamp::new(10)));
        assert_eq!(departure.left_rooms.len(), 2);
    }

    #[test]
    fn test_disconnect_while_typing_clears_typing_set() {
        // テスト項目: 入力中のまま切断すると、そのルームの入力中セットから消える
        // given (前提条件):
        let mut registry = registry_with(&["c1", "c2"]);
        registry
            .join(&conn("c1"), profile("c1", "Alice", 1), room("crops"))
            .unwrap();
        registry
            .join(&conn("c2"), profile("c2", "Bob", 2), room("crops"))
            .unwrap();
        registry.start_typing(&conn("c1")).unwrap();

        // when (操作):
        let departure = registry.disconnect(&conn("c1"), Timestamp::new(10)).unwrap();

        // then (期待する結果):
        assert!(departure.was_typing);
        assert_eq!(departure.room, Some(room("crops")));
        assert!(registry.typing_users(&room("crops")).is_empty());
    }

    #[test]
    fn test_disconnect_unknown_connection_returns_none() {
        // テスト項目: 未登録の接続の切断は何もせず None を返す
        // given (前提条件):
        let mut registry = PresenceRegistry::new();

        // when (操作):
        let result = registry.disconnect(&conn("ghost"), Timestamp::new(0));

        // then (期待する結果):
        assert!(result.is_none());
    }

    #[test]
    fn test_query_rooms_are_independent_of_chat_room() {
        // テスト項目: 質問スレッドには複数同時に所属でき、チャットルームの移動に影響されない
        // given (前提条件):
        let mut registry = registry_with(&["c1"]);
        let q1 = RoomKey::query(Namespace::Default, &QueryId::new("1".to_string()).unwrap());
        let q2 = RoomKey::query(Namespace::Default, &QueryId::new("2".to_string()).unwrap());

        // when (操作):
        registry.join_query(&conn("c1"), q1.clone()).unwrap();
        registry.join_query(&conn("c1"), q2.clone()).unwrap();
        registry.switch_room(&conn("c1"), room("market")).unwrap();
        let left = registry.leave_query(&conn("c1"), &q1).unwrap();
        let left_again = registry.leave_query(&conn("c1"), &q1).unwrap();

        // then (期待する結果):
        assert!(left);
        assert!(!left_again);
        assert!(registry.members(&q1).is_empty());
        assert_eq!(registry.members(&q2), vec![conn("c1")]);
    }

    #[test]
    fn test_leave_query_keeps_chat_room_with_same_name() {
        // テスト項目: 質問スレッドから退出しても、同じ名前のチャットルームの所属は残る
        // given (前提条件):
        let mut registry = registry_with(&["c1"]);
        let chat_room = room("query:42");
        let thread = RoomKey::query(Namespace::Default, &QueryId::new("42".to_string()).unwrap());
        registry.switch_room(&conn("c1"), chat_room.clone()).unwrap();
        registry.join_query(&conn("c1"), thread.clone()).unwrap();

        // when (操作):
        let left = registry.leave_query(&conn("c1"), &thread).unwrap();

        // then (期待する結果):
        assert!(left);
        assert_eq!(registry.chat_room(&conn("c1")), Some(&chat_room));
        assert_eq!(registry.members(&RoomKey::chat(&chat_room)), vec![conn("c1")]);
        assert!(registry.members(&thread).is_empty());
    }

    #[test]
    fn test_history_is_bounded() {
        // テスト項目: メッセージ履歴は容量を超えると古いものから破棄される
        // given (前提条件):
        let mut registry = PresenceRegistry::with_history_capacity(2);
        let alice = profile("c1", "Alice", 1);

        // when (操作):
        for (i, body) in ["one", "two", "three"].iter().enumerate() {
            registry.record_message(ChatMessage::sent_by(
                &alice,
                room("general"),
                body.to_string(),
                Timestamp::new(i as i64),
            ));
        }

        // then (期待する結果):
        let contents: Vec<String> = registry
            .recent_messages(&room("general"))
            .into_iter()
            .map(|m| m.content)
            .collect();
        assert_eq!(contents, vec!["two".to_string(), "three".to_string()]);
    }

    #[test]
    fn test_connections_are_filtered_by_namespace() {
        // テスト項目: 名前空間ごとの接続一覧が接続順で返される
        // given (前提条件):
        let mut registry = PresenceRegistry::new();
        registry
            .register(conn("b"), Namespace::Default, Timestamp::new(2))
            .unwrap();
        registry
            .register(conn("a"), Namespace::Default, Timestamp::new(1))
            .unwrap();
        registry
            .register(conn("q"), Namespace::Queries, Timestamp::new(0))
            .unwrap();

        // when (操作):
        let default_connections = registry.connections(Namespace::Default);

        // then (期待する結果):
        assert_eq!(default_connections, vec![conn("a"), conn("b")]);
        assert_eq!(registry.connections(Namespace::Queries), vec![conn("q")]);
        assert_eq!(registry.connection_count(), 3);
    }
}
