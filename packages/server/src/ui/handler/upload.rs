//! File upload endpoint.

use std::sync::Arc;

use axum::{
    Json,
    extract::{Multipart, State},
    http::StatusCode,
};

use crate::{
    domain::UploadedFile,
    infrastructure::dto::http::ErrorDto,
    ui::state::AppState,
    usecase::{IncomingFile, UploadError},
};

const FILE_FIELD: &str = "file";

type UploadResponse = Result<Json<UploadedFile>, (StatusCode, Json<ErrorDto>)>;

/// `POST /api/upload` (multipart field `file`)
pub async fn upload_file(State(state): State<Arc<AppState>>, mut multipart: Multipart) -> UploadResponse {
    let mut incoming = None;

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => return Err(multipart_error(e)),
        };
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let original_name = field.file_name().unwrap_or_default().to_string();
        let mimetype = field
            .content_type()
            .unwrap_or("application/octet-stream")
            .to_string();
        let bytes = field.bytes().await.map_err(multipart_error)?;
        incoming = Some(IncomingFile {
            original_name,
            mimetype,
            bytes: bytes.to_vec(),
        });
        break;
    }

    state
        .upload_file_usecase
        .execute(incoming)
        .await
        .map(Json)
        .map_err(|e| {
            let status = match &e {
                UploadError::MissingFile | UploadError::InvalidType => StatusCode::BAD_REQUEST,
                UploadError::TooLarge => StatusCode::PAYLOAD_TOO_LARGE,
                UploadError::Storage(io) => {
                    tracing::error!("Failed to store upload: {}", io);
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            };
            let message = match &e {
                UploadError::Storage(_) => "File upload failed".to_string(),
                other => other.to_string(),
            };
            (status, Json(ErrorDto::new(message)))
        })
}

fn multipart_error(e: axum::extract::multipart::MultipartError) -> (StatusCode, Json<ErrorDto>) {
    let status = e.status();
    tracing::warn!(%status, "Rejected multipart body: {}", e.body_text());
    let message = if status == StatusCode::PAYLOAD_TOO_LARGE {
        UploadError::TooLarge.to_string()
    } else {
        e.body_text()
    };
    (status, Json(ErrorDto::new(message)))
}
