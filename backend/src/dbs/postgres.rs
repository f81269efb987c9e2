use crate::dbs::{Database, DbError, DbResult, ProfileTally};
use async_trait::async_trait;
use serde_json::Value;
use shared::models::{
    Battle, BattleStatus, Character, Profile, UpdateProfileRequest, Verse, parse_stored_text,
};
use sqlx::{Pool, Postgres, Row, postgres::PgPoolOptions, postgres::PgRow};
use uuid::Uuid;

const CHARACTER_COLUMNS: &str = "id, user_id, name, description, style, personality, signature, voice_settings, avatar_url, is_default, created_at";
const BATTLE_COLUMNS: &str = "id, user1_id, user2_id, character1_id, character2_id, topic, verses, winner_id, winner_character_id, status, created_at";
const PROFILE_COLUMNS: &str = "id, username, avatar_url, wins, losses, total_battles, created_at";

#[derive(Clone)]
pub struct PostgresDatabase {
    pool: Pool<Postgres>,
}

impl PostgresDatabase {
    pub async fn new(database_url: &str) -> DbResult<Self> {
        let pool = PgPoolOptions::new().connect(database_url).await?;

        let db = Self { pool };
        db.init().await?;
        Ok(db)
    }

    async fn init(&self) -> DbResult<()> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS profiles (
                id UUID PRIMARY KEY,
                username TEXT NOT NULL,
                avatar_url TEXT,
                wins INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                total_battles INTEGER NOT NULL DEFAULT 0,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await?;

        // style and voice_settings stay TEXT; rows are normalized on read
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS characters (
                id UUID PRIMARY KEY,
                user_id UUID,
                name TEXT NOT NULL,
                description TEXT NOT NULL,
                style TEXT NOT NULL,
                personality TEXT NOT NULL,
                signature JSONB NOT NULL DEFAULT '[]',
                voice_settings TEXT NOT NULL DEFAULT '{}',
                avatar_url TEXT,
                is_default BOOLEAN NOT NULL DEFAULT FALSE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS battles (
                id UUID PRIMARY KEY,
                user1_id UUID NOT NULL,
                user2_id UUID NOT NULL,
                character1_id UUID NOT NULL REFERENCES characters(id),
                character2_id UUID NOT NULL REFERENCES characters(id),
                topic TEXT NOT NULL,
                verses JSONB NOT NULL DEFAULT '[]',
                winner_id UUID,
                winner_character_id UUID,
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL DEFAULT now()
            )",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn battle_status(&self, battle_id: Uuid) -> DbResult<BattleStatus> {
        let row = sqlx::query("SELECT status FROM battles WHERE id = $1")
            .bind(battle_id)
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => parse_status(row.try_get("status")?),
            None => Err(DbError::NotFound(format!("Battle {} not found", battle_id))),
        }
    }

    /// Turns a zero-row update on a battle into the right error.
    async fn explain_missed_update(&self, battle_id: Uuid) -> DbError {
        match self.battle_status(battle_id).await {
            Ok(BattleStatus::Completed) => {
                DbError::Conflict(format!("Battle {} is already completed", battle_id))
            }
            Ok(status) => DbError::Internal(format!(
                "Battle {} not updated in status {}",
                battle_id, status
            )),
            Err(e) => e,
        }
    }
}

fn parse_status(text: String) -> DbResult<BattleStatus> {
    text.parse().map_err(DbError::Internal)
}

fn profile_from_row(row: &PgRow) -> DbResult<Profile> {
    Ok(Profile {
        id: row.try_get("id")?,
        username: row.try_get("username")?,
        avatar_url: row.try_get("avatar_url")?,
        wins: row.try_get("wins")?,
        losses: row.try_get("losses")?,
        total_battles: row.try_get("total_battles")?,
        created_at: row.try_get("created_at")?,
    })
}

fn character_from_row(row: &PgRow) -> DbResult<Character> {
    let style: String = row.try_get("style")?;
    let voice_settings: String = row.try_get("voice_settings")?;
    let signature: Value = row.try_get("signature")?;

    Ok(Character {
        id: row.try_get("id")?,
        user_id: row.try_get("user_id")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        style: parse_stored_text(&style)?,
        personality: row.try_get("personality")?,
        signature: serde_json::from_value(signature)?,
        voice_settings: parse_stored_text(&voice_settings)?,
        avatar_url: row.try_get("avatar_url")?,
        is_default: row.try_get("is_default")?,
        created_at: row.try_get("created_at")?,
    })
}

fn battle_from_row(row: &PgRow) -> DbResult<Battle> {
    let verses: Value = row.try_get("verses")?;

    Ok(Battle {
        id: row.try_get("id")?,
        user1_id: row.try_get("user1_id")?,
        user2_id: row.try_get("user2_id")?,
        character1_id: row.try_get("character1_id")?,
        character2_id: row.try_get("character2_id")?,
        topic: row.try_get("topic")?,
        verses: serde_json::from_value(verses)?,
        winner_id: row.try_get("winner_id")?,
        winner_character_id: row.try_get("winner_character_id")?,
        status: parse_status(row.try_get("status")?)?,
        created_at: row.try_get("created_at")?,
    })
}

#[async_trait]
impl Database for PostgresDatabase {
    async fn get_profile(&self, user_id: Uuid) -> DbResult<Profile> {
        let row = sqlx::query(&format!(
            "SELECT {PROFILE_COLUMNS} FROM profiles WHERE id = $1"
        ))
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => profile_from_row(&row),
            None => Err(DbError::NotFound(format!("Profile {} not found", user_id))),
        }
    }

    async fn create_profile(&self, profile: Profile) -> DbResult<()> {
        let result = sqlx::query(
            "INSERT INTO profiles (id, username, avatar_url, wins, losses, total_battles, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7) ON CONFLICT (id) DO NOTHING",
        )
        .bind(profile.id)
        .bind(profile.username)
        .bind(profile.avatar_url)
        .bind(profile.wins)
        .bind(profile.losses)
        .bind(profile.total_battles)
        .bind(profile.created_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::Conflict(format!(
                "Profile {} already exists",
                profile.id
            )));
        }
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileRequest,
    ) -> DbResult<Profile> {
        let row = sqlx::query(&format!(
            "UPDATE profiles SET username = COALESCE($2, username), avatar_url = COALESCE($3, avatar_url) WHERE id = $1 RETURNING {PROFILE_COLUMNS}"
        ))
        .bind(user_id)
        .bind(update.username)
        .bind(update.avatar_url)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => profile_from_row(&row),
            None => Err(DbError::NotFound(format!("Profile {} not found", user_id))),
        }
    }

    async fn add_to_profile(&self, user_id: Uuid, tally: ProfileTally) -> DbResult<()> {
        sqlx::query(
            "UPDATE profiles SET wins = wins + $2, losses = losses + $3, total_battles = total_battles + $4 WHERE id = $1",
        )
        .bind(user_id)
        .bind(tally.wins)
        .bind(tally.losses)
        .bind(tally.battles)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_characters(&self, owner: Option<Uuid>) -> DbResult<Vec<Character>> {
        let rows = sqlx::query(&format!(
            "SELECT {CHARACTER_COLUMNS} FROM characters WHERE is_default OR ($1::uuid IS NOT NULL AND user_id = $1) ORDER BY created_at DESC"
        ))
        .bind(owner)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(character_from_row).collect()
    }

    async fn get_character(&self, character_id: Uuid) -> DbResult<Character> {
        let row = sqlx::query(&format!(
            "SELECT {CHARACTER_COLUMNS} FROM characters WHERE id = $1"
        ))
        .bind(character_id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => character_from_row(&row),
            None => Err(DbError::NotFound(format!(
                "Character {} not found",
                character_id
            ))),
        }
    }

    async fn create_character(&self, character: Character) -> DbResult<()> {
        let style = serde_json::to_string(&character.style)?;
        let voice_settings = serde_json::to_string(&character.voice_settings)?;
        let signature = serde_json::to_value(&character.signature)?;

        sqlx::query(
            "INSERT INTO characters (id, user_id, name, description, style, personality, signature, voice_settings, avatar_url, is_default, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(character.id)
        .bind(character.user_id)
        .bind(character.name)
        .bind(character.description)
        .bind(style)
        .bind(character.personality)
        .bind(signature)
        .bind(voice_settings)
        .bind(character.avatar_url)
        .bind(character.is_default)
        .bind(character.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn create_battle(&self, battle: Battle) -> DbResult<()> {
        let verses = serde_json::to_value(&battle.verses)?;

        sqlx::query(
            "INSERT INTO battles (id, user1_id, user2_id, character1_id, character2_id, topic, verses, winner_id, winner_character_id, status, created_at) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(battle.id)
        .bind(battle.user1_id)
        .bind(battle.user2_id)
        .bind(battle.character1_id)
        .bind(battle.character2_id)
        .bind(battle.topic)
        .bind(verses)
        .bind(battle.winner_id)
        .bind(battle.winner_character_id)
        .bind(battle.status.as_str())
        .bind(battle.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_battle(&self, battle_id: Uuid) -> DbResult<Battle> {
        let row = sqlx::query(&format!("SELECT {BATTLE_COLUMNS} FROM battles WHERE id = $1"))
            .bind(battle_id)
            .fetch_optional(&self.pool)
            .await?;

        match row {
            Some(row) => battle_from_row(&row),
            None => Err(DbError::NotFound(format!("Battle {} not found", battle_id))),
        }
    }

    async fn get_battles_for_user(&self, user_id: Uuid, limit: usize) -> DbResult<Vec<Battle>> {
        let rows = sqlx::query(&format!(
            "SELECT {BATTLE_COLUMNS} FROM battles WHERE user1_id = $1 OR user2_id = $1 ORDER BY created_at DESC LIMIT $2"
        ))
        .bind(user_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(battle_from_row).collect()
    }

    async fn update_verses(&self, battle_id: Uuid, verses: &[Verse]) -> DbResult<()> {
        let verses = serde_json::to_value(verses)?;
        let result = sqlx::query(
            "UPDATE battles SET verses = $2 WHERE id = $1 AND status <> 'completed'",
        )
        .bind(battle_id)
        .bind(verses)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.explain_missed_update(battle_id).await);
        }
        Ok(())
    }

    async fn complete_battle(
        &self,
        battle_id: Uuid,
        winner_id: Uuid,
        winner_character_id: Uuid,
        verses: &[Verse],
    ) -> DbResult<()> {
        let verses = serde_json::to_value(verses)?;
        let result = sqlx::query(
            "UPDATE battles SET status = 'completed', winner_id = $2, winner_character_id = $3, verses = $4 WHERE id = $1 AND status <> 'completed'",
        )
        .bind(battle_id)
        .bind(winner_id)
        .bind(winner_character_id)
        .bind(verses)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.explain_missed_update(battle_id).await);
        }
        Ok(())
    }
}
