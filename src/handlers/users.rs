use axum::extract::{Path, State};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    error::Result,
    models::user::UserView,
    outcome::Outcome,
    state::AppState,
    validation::{
        auth::{validated, BanUserInput, CreateUserInput},
        json::ValidJson,
    },
};

/// The response payload for a created user.
#[derive(Serialize)]
pub struct CreatedUser {
    pub id: Uuid,
}

/// Creates a user from the admin panel.
#[axum::debug_handler]
pub async fn create_user(
    State(state): State<AppState>,
    ValidJson(payload): ValidJson<CreateUserInput>,
) -> Result<Outcome<CreatedUser>> {
    let input = validated(payload)?;
    Ok(state
        .admin
        .create_user(&input.login, &input.email, &input.password, input.role)
        .await
        .map(|id| CreatedUser { id }))
}

/// Lists banned users.
pub async fn list_banned(State(state): State<AppState>) -> Outcome<Vec<UserView>> {
    state.admin.list_banned().await
}

/// Bans a user.
pub async fn ban_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    ValidJson(payload): ValidJson<BanUserInput>,
) -> Result<Outcome> {
    let input = validated(payload)?;
    Ok(state.admin.ban_user(user_id, &input.reason).await)
}

/// Lifts a user's ban.
pub async fn unban_user(State(state): State<AppState>, Path(user_id): Path<Uuid>) -> Outcome {
    state.admin.unban_user(user_id).await
}
