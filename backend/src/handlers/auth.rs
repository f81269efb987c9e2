use crate::AppState;
use crate::error::{ArenaError, ArenaResult};
use crate::handlers::BearerToken;
use axum::{Json, extract::State};
use shared::models::{ResendConfirmationRequest, SignInRequest, SignUpRequest, SignedIn};

fn require(value: &str, field: &str) -> ArenaResult<()> {
    if value.trim().is_empty() {
        return Err(ArenaError::validation(format!("{field} is required")));
    }
    Ok(())
}

pub async fn sign_up(
    State(state): State<AppState>,
    Json(payload): Json<SignUpRequest>,
) -> ArenaResult<Json<SignedIn>> {
    require(&payload.email, "Email")?;
    require(&payload.password, "Password")?;
    require(&payload.username, "Username")?;

    let signed_in = state
        .accounts
        .sign_up(payload.email.trim(), &payload.password, payload.username.trim())
        .await?;
    tracing::info!("User {} signed up", signed_in.user.id);
    Ok(Json(signed_in))
}

pub async fn sign_in(
    State(state): State<AppState>,
    Json(payload): Json<SignInRequest>,
) -> ArenaResult<Json<SignedIn>> {
    require(&payload.email, "Email")?;
    require(&payload.password, "Password")?;

    let signed_in = state
        .accounts
        .sign_in(payload.email.trim(), &payload.password)
        .await?;
    Ok(Json(signed_in))
}

pub async fn sign_out(
    State(state): State<AppState>,
    BearerToken(token): BearerToken,
) -> ArenaResult<Json<()>> {
    state.accounts.sign_out(&token).await?;
    Ok(Json(()))
}

pub async fn resend_confirmation(
    State(state): State<AppState>,
    Json(payload): Json<ResendConfirmationRequest>,
) -> ArenaResult<Json<()>> {
    require(&payload.email, "Email")?;
    state
        .accounts
        .resend_confirmation(payload.email.trim())
        .await?;
    Ok(Json(()))
}
