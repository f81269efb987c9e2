use crate::auth::AuthError;
use crate::dbs::DbError;
use crate::llm::LlmError;
use crate::tts::SynthesisError;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

pub type ArenaResult<T> = Result<T, ArenaError>;

#[derive(Error, Debug)]
pub enum ArenaError {
    #[error("Validation error: {0}")]
    Validation(String),
    #[error("Persistence error: {0}")]
    Persistence(#[from] DbError),
    #[error("Generation error: {0}")]
    Generation(#[from] LlmError),
    #[error("Synthesis error: {0}")]
    Synthesis(#[from] SynthesisError),
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),
}

impl ArenaError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ArenaError::Validation(_) => (StatusCode::BAD_REQUEST, "validation"),
            ArenaError::Persistence(DbError::NotFound(_)) => (StatusCode::NOT_FOUND, "not_found"),
            ArenaError::Persistence(DbError::Conflict(_)) => (StatusCode::CONFLICT, "conflict"),
            ArenaError::Persistence(_) => (StatusCode::INTERNAL_SERVER_ERROR, "persistence"),
            ArenaError::Generation(_) => (StatusCode::BAD_GATEWAY, "generation"),
            ArenaError::Synthesis(SynthesisError::AlreadyPlaying) => {
                (StatusCode::CONFLICT, "already_playing")
            }
            ArenaError::Synthesis(SynthesisError::MissingCredentials) => {
                (StatusCode::SERVICE_UNAVAILABLE, "synthesis")
            }
            ArenaError::Synthesis(_) => (StatusCode::BAD_GATEWAY, "synthesis"),
            ArenaError::Auth(AuthError::EmailNotConfirmed) => {
                (StatusCode::FORBIDDEN, "email_not_confirmed")
            }
            ArenaError::Auth(AuthError::Transport(_)) => (StatusCode::BAD_GATEWAY, "auth"),
            ArenaError::Auth(_) => (StatusCode::UNAUTHORIZED, "auth"),
        }
    }
}

impl IntoResponse for ArenaError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            tracing::error!("{}", self);
        } else {
            tracing::debug!("{}", self);
        }
        (status, Json(json!({ "error": code, "message": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unconfirmed_email_is_distinct_from_bad_credentials() {
        let unconfirmed = ArenaError::from(AuthError::EmailNotConfirmed).status_and_code();
        let invalid =
            ArenaError::from(AuthError::InvalidCredentials("nope".into())).status_and_code();
        assert_eq!(unconfirmed, (StatusCode::FORBIDDEN, "email_not_confirmed"));
        assert_eq!(invalid, (StatusCode::UNAUTHORIZED, "auth"));
    }

    #[test]
    fn missing_rows_are_not_found() {
        let (status, _) =
            ArenaError::from(DbError::NotFound("Battle".into())).status_and_code();
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
