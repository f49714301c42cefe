//! アップロードファイルの保存先

pub mod local;

pub use local::LocalUploadStore;
