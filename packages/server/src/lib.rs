//! farmhub relay server library.
//!
//! Real-time chat rooms, query threads, presence, and simulated network/sensor
//! telemetry over WebSocket, plus the supporting HTTP API.

// layers
pub mod domain;
pub mod infrastructure;
pub mod ui;
pub mod usecase;
