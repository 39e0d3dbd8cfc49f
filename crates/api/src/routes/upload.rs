//! Image upload passthrough route handler.

use axum::{
    Json,
    extract::{Multipart, State},
};
use serde_json::json;
use tracing::instrument;

use crate::error::{AppError, Result};
use crate::state::AppState;

/// Forward a multipart `image` field to the media host and return the
/// hosted URL as `{"imageUrl": "..."}`.
#[instrument(skip(state, multipart))]
pub async fn upload_image(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>> {
    let Some(media) = state.media() else {
        return Err(AppError::Internal("media host not configured".to_string()));
    };

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("image") {
            continue;
        }

        let file_name = field
            .file_name()
            .unwrap_or("upload")
            .to_owned();
        let content_type = field.content_type().map(ToOwned::to_owned);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(e.to_string()))?;

        let url = media.upload(file_name, content_type, bytes.to_vec()).await?;
        return Ok(Json(json!({ "imageUrl": url })));
    }

    Err(AppError::BadRequest("image field is required".to_string()))
}
