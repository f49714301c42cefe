//! ドメイン層
//!
//! 接続・プレゼンス・ルーム・テレメトリのドメインモデルと、
//! ドメイン層が必要とするインターフェース（Repository, MessagePusher など）を定義します。

pub mod catalog;
pub mod entity;
pub mod error;
pub mod message_pusher;
pub mod metrics;
pub mod presence;
pub mod repository;
pub mod sensor;
pub mod upload;
pub mod value_object;
pub mod weather;

pub use catalog::{ChatRoomInfo, default_chat_rooms};
pub use entity::{ChatMessage, DeliveryStatus, UserProfile};
pub use error::{MessagePushError, RepositoryError, SensorError, ValueObjectError};
pub use message_pusher::{MessagePusher, PusherChannel};
pub use metrics::{ConnectionDetail, HistoryEntry, NetworkMetrics, NetworkMonitor};
pub use presence::{Departure, JoinOutcome, PresenceRegistry, RoomOccupancy, SwitchOutcome, TypingChange};
pub use repository::PresenceRepository;
pub use sensor::{Sensor, SensorNetwork, SensorNetworkStatus, SensorReading, SensorSnapshot, SensorStatus};
pub use upload::{UploadStore, UploadedFile};
pub use value_object::{ConnectionId, Namespace, QueryId, RoomId, RoomKey, RoomKind, Timestamp, UserStatus};
pub use weather::{CurrentWeather, WeatherError, WeatherProvider};
