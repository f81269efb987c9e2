use crate::config::AuthConfig;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde_json::{Value, json};
use shared::models::{AuthSession, AuthUser};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Email not confirmed")]
    EmailNotConfirmed,
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),
    #[error("Not signed in")]
    Unauthenticated,
    #[error("Auth provider error ({status}): {message}")]
    Provider { status: u16, message: String },
    #[error("Auth request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

/// Sign-up leaves the user without a session until the email is confirmed,
/// unless the provider auto-confirms.
#[derive(Clone, Debug)]
pub struct SignUpOutcome {
    pub user: AuthUser,
    pub session: Option<AuthSession>,
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<SignUpOutcome, AuthError>;
    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
    async fn resend_confirmation(&self, email: &str) -> Result<(), AuthError>;
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;
}

/// Supabase auth (GoTrue) over its REST API.
pub struct GoTrueAuth {
    client: Client,
    config: AuthConfig,
}

impl GoTrueAuth {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.config.url.trim_end_matches('/'), path)
    }

    fn request(&self, builder: RequestBuilder) -> RequestBuilder {
        builder.header("apikey", &self.config.anon_key)
    }

    async fn checked(response: Response) -> Result<Response, AuthError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(classify_failure(status.as_u16(), &body))
    }
}

/// Maps a GoTrue error body onto [`AuthError`]. Older servers only put the
/// reason in the message text, newer ones add an `error_code`.
pub fn classify_failure(status: u16, body: &str) -> AuthError {
    let parsed: Value = serde_json::from_str(body).unwrap_or(Value::Null);
    let code = parsed
        .get("error_code")
        .or_else(|| parsed.get("code"))
        .and_then(Value::as_str)
        .unwrap_or_default();
    let message = ["msg", "message", "error_description", "error"]
        .iter()
        .find_map(|key| parsed.get(*key).and_then(Value::as_str))
        .unwrap_or(body)
        .to_string();

    if code == "email_not_confirmed"
        || message.contains("Email not confirmed")
        || message.contains("email_not_confirmed")
    {
        return AuthError::EmailNotConfirmed;
    }
    match status {
        400 | 422 if code == "invalid_credentials" || message.contains("Invalid login") => {
            AuthError::InvalidCredentials(message)
        }
        401 | 403 => AuthError::Unauthenticated,
        _ => AuthError::Provider { status, message },
    }
}

#[async_trait]
impl AuthProvider for GoTrueAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let response = self
            .request(self.client.post(self.endpoint("token?grant_type=password")))
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let response = self
            .request(self.client.post(self.endpoint("signup")))
            .json(&json!({
                "email": email,
                "password": password,
                "data": { "username": username }
            }))
            .send()
            .await?;
        let body: Value = Self::checked(response).await?.json().await?;

        // Auto-confirmed projects answer with a session, the rest with the bare user
        let malformed = |e: serde_json::Error| AuthError::Provider {
            status: 200,
            message: format!("Unexpected sign-up response: {e}"),
        };
        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body).map_err(malformed)?;
            Ok(SignUpOutcome {
                user: session.user.clone(),
                session: Some(session),
            })
        } else {
            let user: AuthUser = serde_json::from_value(body).map_err(malformed)?;
            Ok(SignUpOutcome {
                user,
                session: None,
            })
        }
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .request(self.client.post(self.endpoint("logout")))
            .bearer_auth(access_token)
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn resend_confirmation(&self, email: &str) -> Result<(), AuthError> {
        let response = self
            .request(self.client.post(self.endpoint("resend")))
            .json(&json!({ "type": "signup", "email": email }))
            .send()
            .await?;
        Self::checked(response).await?;
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .request(self.client.get(self.endpoint("user")))
            .bearer_auth(access_token)
            .send()
            .await?;
        Ok(Self::checked(response).await?.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const USER_ID: &str = "0b8e6a52-2f4c-4f0e-9a57-1b1f4c0d9e21";

    fn auth(server: &MockServer) -> GoTrueAuth {
        GoTrueAuth::new(AuthConfig {
            url: server.uri(),
            anon_key: "anon".into(),
        })
    }

    fn user_json(confirmed: bool) -> Value {
        json!({
            "id": USER_ID,
            "email": "mc@example.com",
            "email_confirmed_at": if confirmed { json!("2024-05-01T12:00:00Z") } else { Value::Null },
            "user_metadata": { "username": "mc" }
        })
    }

    #[test]
    fn email_not_confirmed_is_recognised_in_both_shapes() {
        let legacy = r#"{"error":"invalid_grant","error_description":"Email not confirmed"}"#;
        let current = r#"{"code":400,"error_code":"email_not_confirmed","msg":"Email not confirmed"}"#;
        assert!(matches!(
            classify_failure(400, legacy),
            AuthError::EmailNotConfirmed
        ));
        assert!(matches!(
            classify_failure(400, current),
            AuthError::EmailNotConfirmed
        ));
    }

    #[test]
    fn bad_password_is_invalid_credentials() {
        let body = r#"{"error_code":"invalid_credentials","msg":"Invalid login credentials"}"#;
        match classify_failure(400, body) {
            AuthError::InvalidCredentials(message) => {
                assert_eq!(message, "Invalid login credentials")
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn sign_in_returns_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .and(query_param("grant_type", "password"))
            .and(header("apikey", "anon"))
            .and(body_partial_json(json!({ "email": "mc@example.com" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "jwt",
                "refresh_token": "refresh",
                "user": user_json(true)
            })))
            .mount(&server)
            .await;

        let session = auth(&server)
            .sign_in("mc@example.com", "hunter2")
            .await
            .unwrap();
        assert_eq!(session.access_token, "jwt");
        assert!(session.user.is_confirmed());
    }

    #[tokio::test]
    async fn sign_in_surfaces_unconfirmed_email() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/token"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "code": 400,
                "error_code": "email_not_confirmed",
                "msg": "Email not confirmed"
            })))
            .mount(&server)
            .await;

        let result = auth(&server).sign_in("mc@example.com", "hunter2").await;
        assert!(matches!(result, Err(AuthError::EmailNotConfirmed)));
    }

    #[tokio::test]
    async fn sign_up_without_confirmation_has_no_session() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/signup"))
            .and(body_partial_json(json!({ "data": { "username": "mc" } })))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(false)))
            .mount(&server)
            .await;

        let outcome = auth(&server)
            .sign_up("mc@example.com", "hunter2", "mc")
            .await
            .unwrap();
        assert!(outcome.session.is_none());
        assert!(!outcome.user.is_confirmed());
    }

    #[tokio::test]
    async fn resend_asks_for_signup_confirmation() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/auth/v1/resend"))
            .and(body_partial_json(json!({ "type": "signup", "email": "mc@example.com" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        auth(&server)
            .resend_confirmation("mc@example.com")
            .await
            .unwrap();
    }
}
