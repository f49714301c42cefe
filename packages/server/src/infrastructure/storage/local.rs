//! ローカルディスクへの保存

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::domain::UploadStore;

/// 指定ディレクトリ直下にファイルを書き込む UploadStore
pub struct LocalUploadStore {
    dir: PathBuf,
}

impl LocalUploadStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

#[async_trait]
impl UploadStore for LocalUploadStore {
    async fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<()> {
        // ディレクトリ区切りを含む名前は受け付けない
        if filename.is_empty() || filename.contains(['/', '\\']) || filename == ".." {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid upload filename '{filename}'"),
            ));
        }
        tokio::fs::create_dir_all(&self.dir).await?;
        tokio::fs::write(self.dir.join(filename), bytes).await?;
        tracing::debug!(filename, size = bytes.len(), "stored upload");
        Ok(())
    }
}
