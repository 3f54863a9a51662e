//! Public key directory endpoints.
//!
//! POST /api/chat/keys/upload/       Body: { "username": "...", "public_key_b64": "..." }
//! GET  /api/chat/keys/{username}/
//!
//! Entries are stored exactly as uploaded; the server never parses keys.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::state::{RelayState, MAX_USERNAME_LEN};

/// Upload request body. Fields are optional so that a missing field is a
/// 400 with a `detail` message rather than an extractor rejection.
#[derive(Debug, Deserialize)]
pub struct UploadKeyRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub public_key_b64: Option<String>,
}

fn detail(status: StatusCode, message: &str) -> axum::response::Response {
    (status, Json(json!({ "detail": message }))).into_response()
}

/// Publish or overwrite a key.
pub async fn upload_key(
    State(state): State<RelayState>,
    Json(request): Json<UploadKeyRequest>,
) -> impl IntoResponse {
    let (username, public_key_b64) = match (request.username, request.public_key_b64) {
        (Some(username), Some(key)) if !username.is_empty() && !key.is_empty() => (username, key),
        _ => {
            return detail(
                StatusCode::BAD_REQUEST,
                "username and public_key_b64 required",
            )
        }
    };
    if username.chars().count() > MAX_USERNAME_LEN {
        return detail(StatusCode::BAD_REQUEST, "username too long");
    }

    Json(state.publish_key(&username, &public_key_b64)).into_response()
}

/// Fetch the current key for `username`.
pub async fn get_key(
    State(state): State<RelayState>,
    Path(username): Path<String>,
) -> impl IntoResponse {
    match state.get_key(&username) {
        Some(record) => Json(record).into_response(),
        None => detail(StatusCode::NOT_FOUND, "Not found."),
    }
}
