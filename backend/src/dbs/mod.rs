use async_trait::async_trait;
use shared::models::{Battle, Character, Profile, UpdateProfileRequest, Verse};
use thiserror::Error;
use uuid::Uuid;

pub mod local;
pub mod postgres;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Entity not found: {0}")]
    NotFound(String),
    #[error("Conflict: {0}")]
    Conflict(String),
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Counter changes applied to a profile when a battle completes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ProfileTally {
    pub wins: i32,
    pub losses: i32,
    pub battles: i32,
}

#[async_trait]
pub trait Database: Send + Sync {
    async fn get_profile(&self, user_id: Uuid) -> DbResult<Profile>;
    async fn create_profile(&self, profile: Profile) -> DbResult<()>;
    async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileRequest,
    ) -> DbResult<Profile>;
    /// Missing profiles are skipped, not created.
    async fn add_to_profile(&self, user_id: Uuid, tally: ProfileTally) -> DbResult<()>;

    /// Default characters plus those owned by `owner`, newest first.
    async fn get_characters(&self, owner: Option<Uuid>) -> DbResult<Vec<Character>>;
    async fn get_character(&self, character_id: Uuid) -> DbResult<Character>;
    async fn create_character(&self, character: Character) -> DbResult<()>;

    async fn create_battle(&self, battle: Battle) -> DbResult<()>;
    async fn get_battle(&self, battle_id: Uuid) -> DbResult<Battle>;
    /// Battles where the user is either participant, newest first.
    async fn get_battles_for_user(&self, user_id: Uuid, limit: usize) -> DbResult<Vec<Battle>>;
    /// Replaces the verse list of a battle that is not yet completed.
    async fn update_verses(&self, battle_id: Uuid, verses: &[Verse]) -> DbResult<()>;
    async fn complete_battle(
        &self,
        battle_id: Uuid,
        winner_id: Uuid,
        winner_character_id: Uuid,
        verses: &[Verse],
    ) -> DbResult<()>;
}
