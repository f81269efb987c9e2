use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub username: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    pub wins: i32,
    pub losses: i32,
    pub total_battles: i32,
    pub created_at: DateTime<Utc>,
}

impl Profile {
    pub fn new(id: Uuid, username: impl Into<String>) -> Self {
        Self {
            id,
            username: username.into(),
            avatar_url: None,
            wins: 0,
            losses: 0,
            total_battles: 0,
            created_at: Utc::now(),
        }
    }
}

/// Explicit profile edits. Counters are only touched by battle completion.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct UpdateProfileRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}
