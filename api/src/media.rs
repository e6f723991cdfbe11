use axum::{
    Json,
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
};
use serde::{Deserialize, Serialize};

use crate::{App, error::AppError, identity::AuthUser};

#[derive(Deserialize)]
pub struct UploadQueries {
    filename: String,
}

#[derive(Serialize)]
pub struct MediaUpload {
    pub url: String,
}

/// Stores an uploaded blob under a generated timestamped name and returns
/// the public URL. The original filename only contributes its extension.
#[axum::debug_handler]
pub async fn upload_media(
    State(ctx): State<App>,
    AuthUser(_): AuthUser,
    q: Query<UploadQueries>,
    body: Bytes,
) -> Result<Json<MediaUpload>, AppError> {
    if body.is_empty() {
        return Err(("Empty upload", StatusCode::BAD_REQUEST))?;
    }

    let extension = q
        .filename
        .rsplit_once('.')
        .map(|(_, ext)| ext)
        .filter(|ext| !ext.is_empty() && ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .unwrap_or("bin")
        .to_lowercase();

    let name = format!(
        "{}-{}.{extension}",
        chrono::Utc::now().format("%Y%m%d%H%M%S"),
        uuid::Uuid::new_v4()
    );

    tokio::fs::create_dir_all(&ctx.config.media_dir)
        .await
        .map_err(|e| AppError::Unhandled(format!("couldn't create the media directory: {e}")))?;

    tokio::fs::write(ctx.config.media_dir.join(&name), &body)
        .await
        .map_err(|e| AppError::Unhandled(format!("couldn't store the upload: {e}")))?;

    Ok(Json(MediaUpload {
        url: format!("/media/{name}"),
    }))
}
