//! UseCase: ファイルアップロード

use std::sync::Arc;

use farmhub_shared::time::{Clock, timestamp_to_rfc3339};

use crate::domain::{
    UploadStore, UploadedFile,
    upload::{MAX_UPLOAD_BYTES, base_name, is_allowed},
};

use super::error::UploadError;

/// multipart から取り出したファイル
#[derive(Debug, Clone)]
pub struct IncomingFile {
    pub original_name: String,
    pub mimetype: String,
    pub bytes: Vec<u8>,
}

pub struct UploadFileUseCase {
    store: Arc<dyn UploadStore>,
    clock: Arc<dyn Clock>,
}

impl UploadFileUseCase {
    pub fn new(store: Arc<dyn UploadStore>, clock: Arc<dyn Clock>) -> Self {
        Self { store, clock }
    }

    /// サイズと種別を検証し、`<uuid>-<元のファイル名>` で保存する
    pub async fn execute(&self, file: Option<IncomingFile>) -> Result<UploadedFile, UploadError> {
        let file = file.ok_or(UploadError::MissingFile)?;
        if file.bytes.len() > MAX_UPLOAD_BYTES {
            return Err(UploadError::TooLarge);
        }
        let original_name = base_name(&file.original_name).to_string();
        if !is_allowed(&original_name, &file.mimetype) {
            return Err(UploadError::InvalidType);
        }

        let filename = format!("{}-{}", uuid::Uuid::new_v4(), original_name);
        self.store.save(&filename, &file.bytes).await?;

        tracing::info!(filename = %filename, size = file.bytes.len(), "file uploaded");
        Ok(UploadedFile {
            id: uuid::Uuid::new_v4().to_string(),
            url: format!("/uploads/{filename}"),
            filename,
            original_name,
            size: file.bytes.len(),
            mimetype: file.mimetype,
            uploaded_at: timestamp_to_rfc3339(self.clock.now_millis()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::LocalUploadStore;
    use farmhub_shared::time::FixedClock;

    fn usecase(dir: &std::path::Path) -> UploadFileUseCase {
        UploadFileUseCase::new(
            Arc::new(LocalUploadStore::new(dir)),
            Arc::new(FixedClock::new(1_700_000_000_000)),
        )
    }

    fn file(name: &str, mimetype: &str, size: usize) -> IncomingFile {
        IncomingFile {
            original_name: name.to_string(),
            mimetype: mimetype.to_string(),
            bytes: vec![7; size],
        }
    }

    #[tokio::test]
    async fn test_upload_stores_file_with_uuid_prefix() {
        // テスト項目: 許可された画像は uuid 接頭辞付きの名前で保存され、URL が返る
        // given (前提条件):
        let tmp = tempfile::tempdir().unwrap();
        let usecase = usecase(tmp.path());

        // when (操作):
        let uploaded = usecase
            .execute(Some(file("field.png", "image/png", 16)))
            .await
            .unwrap();

        // then (期待する結果):
        assert!(uploaded.filename.ends_with("-field.png"));
        assert_eq!(uploaded.url, format!("/uploads/{}", uploaded.filename));
        assert_eq!(uploaded.original_name, "field.png");
        assert_eq!(uploaded.size, 16);
        assert_eq!(uploaded.uploaded_at, "2023-11-14T22:13:20.000Z");
        let stored = std::fs::read(tmp.path().join(&uploaded.filename)).unwrap();
        assert_eq!(stored.len(), 16);
    }

    #[tokio::test]
    async fn test_upload_keeps_only_base_name_of_client_path() {
        // テスト項目: ディレクトリ付きのファイル名はベース名だけで保存される
        // given (前提条件):
        let tmp = tempfile::tempdir().unwrap();
        let usecase = usecase(tmp.path());

        // when (操作):
        let unix_style = usecase
            .execute(Some(file("photos/leaf.png", "image/png", 8)))
            .await
            .unwrap();
        let windows_style = usecase
            .execute(Some(file("C:\\x\\leaf.png", "image/png", 8)))
            .await
            .unwrap();

        // then (期待する結果):
        for uploaded in [&unix_style, &windows_style] {
            assert_eq!(uploaded.original_name, "leaf.png");
            assert!(uploaded.filename.ends_with("-leaf.png"));
            assert!(tmp.path().join(&uploaded.filename).is_file());
        }
    }

    #[tokio::test]
    async fn test_upload_rejections() {
        // テスト項目: ファイル無し・許可外の種別・上限超過はそれぞれのエラーになる
        let tmp = tempfile::tempdir().unwrap();
        let usecase = usecase(tmp.path());

        let missing = usecase.execute(None).await;
        let invalid = usecase
            .execute(Some(file("setup.exe", "application/octet-stream", 4)))
            .await;
        let too_large = usecase
            .execute(Some(file("huge.mp4", "video/mp4", MAX_UPLOAD_BYTES + 1)))
            .await;

        assert!(matches!(missing, Err(UploadError::MissingFile)));
        assert!(matches!(invalid, Err(UploadError::InvalidType)));
        assert!(matches!(too_large, Err(UploadError::TooLarge)));
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }
}
