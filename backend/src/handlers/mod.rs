pub mod auth;
pub mod battles;
pub mod characters;
pub mod profile;

pub use auth::*;
pub use battles::*;
pub use characters::*;
pub use profile::*;

use crate::AppState;
use crate::auth::AuthError;
use crate::error::ArenaError;
use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use shared::models::AuthUser;

/// Raw access token from `Authorization: Bearer ...`.
pub struct BearerToken(pub String);

impl<S: Send + Sync> FromRequestParts<S> for BearerToken {
    type Rejection = ArenaError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .map(|token| BearerToken(token.to_string()))
            .ok_or(ArenaError::Auth(AuthError::Unauthenticated))
    }
}

/// The signed-in user behind the request's bearer token.
pub struct CurrentUser(pub AuthUser);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ArenaError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let BearerToken(token) = BearerToken::from_request_parts(parts, state).await?;
        let user = state.accounts.authenticate(&token).await?;
        Ok(CurrentUser(user))
    }
}
