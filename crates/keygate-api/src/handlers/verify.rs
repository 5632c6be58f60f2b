//! Photo verification handler
//!
//! Author: hephaex@gmail.com

use crate::audit::{audit_log, AuditEvent};
use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Multipart, State},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

/// Verification upload response
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    #[schema(example = "File saved successfully")]
    pub message: String,
}

/// Multipart form accepted by the verification endpoint
#[derive(ToSchema)]
pub struct PhotoUpload {
    /// Photo file
    #[schema(value_type = String, format = Binary)]
    pub file: Vec<u8>,
}

/// Upload a verification photo
///
/// Stores the first file part and publishes its compressed path for the
/// face-verification consumer.
#[utoipa::path(
    post,
    path = "/users/verify",
    tag = "users",
    request_body(content = PhotoUpload, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File saved", body = MessageResponse),
        (status = 400, description = "Missing or invalid file", body = crate::error::ApiError),
        (status = 401, description = "Missing, expired or invalid token", body = crate::error::ApiError),
        (status = 500, description = "Storage or publish failure", body = crate::error::ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn verify_photo_handler(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    mut multipart: Multipart,
) -> Result<Json<MessageResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        let Some(file_name) = field.file_name().map(str::to_string) else {
            continue;
        };

        let content = field
            .bytes()
            .await
            .map_err(|e| AppError::BadRequest(format!("Failed to read upload: {e}")))?;

        let path = state
            .photos
            .submit(&user.name, &file_name, &content)
            .await?;

        audit_log(&AuditEvent::PhotoSubmitted {
            name: user.name,
            file_name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or(file_name),
            size_bytes: content.len(),
        });

        return Ok(Json(MessageResponse {
            message: "File saved successfully".to_string(),
        }));
    }

    Err(AppError::BadRequest("No file part in request".to_string()))
}
