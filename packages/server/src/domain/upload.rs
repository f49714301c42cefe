//! アップロードされたファイルのドメインモデル

use async_trait::async_trait;
use serde::Serialize;

/// アップロードの上限サイズ（10 MiB）
pub const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// 拡張子・MIME タイプに含まれていれば許可するトークン
pub const ALLOWED_TYPE_TOKENS: [&str; 11] = [
    "jpeg", "jpg", "png", "gif", "pdf", "doc", "docx", "txt", "mp3", "wav", "mp4",
];

/// 保存済みファイルのメタデータ
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedFile {
    pub id: String,
    pub filename: String,
    pub original_name: String,
    pub size: usize,
    pub mimetype: String,
    pub url: String,
    pub uploaded_at: String,
}

fn matches_token(value: &str) -> bool {
    ALLOWED_TYPE_TOKENS.iter().any(|token| value.contains(token))
}

/// クライアントが送ったファイル名からディレクトリ部分を取り除く（`/` と `\` の両方を区切りとみなす）
pub fn base_name(original_name: &str) -> &str {
    original_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original_name)
}

/// 拡張子と MIME タイプの両方が許可トークンを含むか
pub fn is_allowed(original_name: &str, mimetype: &str) -> bool {
    let extension = match original_name.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => ext.to_ascii_lowercase(),
        _ => return false,
    };
    matches_token(&extension) && matches_token(mimetype)
}

/// ファイルの保存先
#[async_trait]
pub trait UploadStore: Send + Sync {
    /// `filename` でバイト列を保存する
    async fn save(&self, filename: &str, bytes: &[u8]) -> std::io::Result<()>;
}
