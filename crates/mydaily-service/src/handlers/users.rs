//! User and push registration handlers.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use mydaily_core::{avatar_for, User, UserId};

use crate::error::ApiError;
use crate::state::AppState;

/// Public view of a user. The push token itself is never returned.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    /// User id.
    pub id: String,
    /// Sort and avatar ordinal.
    pub display_order: u32,
    /// Avatar emoji.
    pub avatar: String,
    /// Whether a device is registered for pushes.
    pub has_push_token: bool,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.to_string(),
            display_order: user.display_order,
            avatar: avatar_for(user.display_order).to_string(),
            has_push_token: user.push_token().is_some(),
        }
    }
}

/// Push token registration request.
#[derive(Debug, Deserialize)]
pub struct PushTokenRequest {
    /// New registration token; `null` or blank clears it.
    pub token: Option<String>,
}

/// List users in display order.
pub async fn list_users(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<UserResponse>>, ApiError> {
    let users = state.store.list_users().await?;
    Ok(Json(users.iter().map(UserResponse::from).collect()))
}

/// Replace a user's push token.
pub async fn set_push_token(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
    Json(request): Json<PushTokenRequest>,
) -> Result<Json<UserResponse>, ApiError> {
    let user_id: UserId = user_id.parse()?;
    let token = request
        .token
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty());
    let registered = token.is_some();

    state.store.set_push_token(&user_id, token).await?;

    tracing::info!(user_id = %user_id, registered, "Push token updated");

    let user = state
        .store
        .get_user(&user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("user not found: {user_id}")))?;
    Ok(Json(UserResponse::from(&user)))
}
