//! インフラストラクチャ層
//!
//! ドメイン層が定義する trait（PresenceRepository, MessagePusher, WeatherProvider, UploadStore）の
//! 具体的な実装と、ワイヤーフォーマット（DTO）を提供します。

pub mod dto;
pub mod message_pusher;
pub mod repository;
pub mod storage;
pub mod weather;
