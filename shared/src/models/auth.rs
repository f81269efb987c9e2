use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Profile;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub email_confirmed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub user_metadata: serde_json::Value,
}

impl AuthUser {
    pub fn is_confirmed(&self) -> bool {
        self.email_confirmed_at.is_some()
    }

    /// Username chosen at sign-up, else the local part of the email.
    pub fn preferred_username(&self) -> String {
        if let Some(name) = self.user_metadata.get("username").and_then(|v| v.as_str())
            && !name.is_empty()
        {
            return name.to_string();
        }
        self.email
            .as_deref()
            .and_then(|email| email.split('@').next())
            .filter(|local| !local.is_empty())
            .unwrap_or("User")
            .to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub user: AuthUser,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignInRequest {
    pub email: String,
    pub password: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub username: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ResendConfirmationRequest {
    pub email: String,
}

/// Result of a sign-in or sign-up. The session is absent when the email still
/// needs confirming, and so is the profile.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SignedIn {
    pub user: AuthUser,
    #[serde(default)]
    pub session: Option<AuthSession>,
    #[serde(default)]
    pub profile: Option<Profile>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn user(email: Option<&str>, metadata: serde_json::Value) -> AuthUser {
        AuthUser {
            id: Uuid::new_v4(),
            email: email.map(String::from),
            email_confirmed_at: None,
            user_metadata: metadata,
        }
    }

    #[test]
    fn username_prefers_metadata_then_email() {
        assert_eq!(
            user(Some("a@b.c"), json!({"username": "lyricist"})).preferred_username(),
            "lyricist"
        );
        assert_eq!(
            user(Some("flow@b.c"), json!({})).preferred_username(),
            "flow"
        );
        assert_eq!(user(None, serde_json::Value::Null).preferred_username(), "User");
    }
}
