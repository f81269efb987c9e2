use crate::AppState;
use crate::dbs::DbError;
use crate::error::{ArenaError, ArenaResult};
use crate::handlers::CurrentUser;
use axum::{Json, extract::State};
use shared::models::{AuthUser, Profile, UpdateProfileRequest};

async fn existing_profile(state: &AppState, user: &AuthUser) -> ArenaResult<Profile> {
    state
        .accounts
        .ensure_profile(user)
        .await?
        .ok_or_else(|| DbError::NotFound(format!("Profile {}", user.id)).into())
}

pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ArenaResult<Json<Profile>> {
    Ok(Json(existing_profile(&state, &user).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(mut payload): Json<UpdateProfileRequest>,
) -> ArenaResult<Json<Profile>> {
    if let Some(username) = payload.username.as_mut() {
        *username = username.trim().to_string();
        if username.is_empty() {
            return Err(ArenaError::validation("Username cannot be empty"));
        }
    }
    existing_profile(&state, &user).await?;

    let profile = state.accounts.update_profile(user.id, payload).await?;
    tracing::debug!("Updated profile {}", profile.id);
    Ok(Json(profile))
}
