use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use camino::Utf8Path as Path;
use eyre::{eyre, Context};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use folio_core::mime_type::{extension_for, guess_mime_type_path, media_type_of};

use crate::{
    app_state::SharedState,
    http_error::{ApiResult, HttpError},
};

const FILE_FIELD: &str = "file";

pub fn router(max_upload_size: usize) -> Router<SharedState> {
    Router::new()
        .route("/", post(upload_file))
        .layer(DefaultBodyLimit::max(max_upload_size))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub url: String,
}

/// Stored file name: random, with an extension only for known image and video types.
/// The client's file name never decides how the file is served back.
fn stored_name(mime: &str) -> String {
    let id = uuid::Uuid::new_v4();
    match extension_for(mime) {
        Some(ext) => format!("{}.{}", id, ext),
        None => id.to_string(),
    }
}

#[tracing::instrument(skip_all)]
pub async fn upload_file(
    State(app_state): State<SharedState>,
    mut multipart: Multipart,
) -> ApiResult<Json<UploadResponse>> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            debug!(name = ?field.name(), "skipping multipart field");
            continue;
        }
        let original_name = field.file_name().map(str::to_owned);
        let mime = match field.content_type() {
            Some(mime) if mime != "application/octet-stream" => mime.to_owned(),
            _ => original_name
                .as_deref()
                .and_then(|name| guess_mime_type_path(Path::new(name)))
                .map(|mime| mime.into_owned())
                .unwrap_or_default(),
        };
        if media_type_of(&mime).is_none() {
            return Err(HttpError::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                eyre!("only images and videos can be uploaded, got '{}'", mime),
            ));
        }
        let bytes = field.bytes().await?;
        let name = stored_name(&mime);
        let path = app_state.uploads_dir.join(&name);
        tokio::fs::write(&path, &bytes)
            .await
            .wrap_err(format!("error writing upload to {}", path))?;
        info!(%name, size = bytes.len(), %mime, "stored upload");
        return Ok(Json(UploadResponse {
            url: format!("{}/uploads/{}", app_state.public_url, name),
        }));
    }
    Err(HttpError::new(
        StatusCode::BAD_REQUEST,
        eyre!("multipart field '{}' is missing", FILE_FIELD),
    ))
}
