//! Utilities shared by farmhub binaries: logging setup and time handling.

pub mod logger;
pub mod time;
