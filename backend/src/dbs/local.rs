use crate::dbs::{Database, DbError, DbResult, ProfileTally};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use shared::models::*;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Serialize, Deserialize, Default, Clone)]
struct LocalData {
    #[serde(default)]
    profiles: Vec<Profile>,
    #[serde(default)]
    characters: Vec<Character>,
    #[serde(default)]
    battles: Vec<Battle>,
}

/// Single JSON document store. With no path it never touches disk.
pub struct LocalDatabase {
    path: Option<PathBuf>,
    data: RwLock<LocalData>,
}

impl LocalDatabase {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: RwLock::new(LocalData::default()),
        }
    }

    pub async fn open(path: impl AsRef<Path>) -> DbResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match tokio::fs::read_to_string(&path).await {
            Ok(content) => serde_json::from_str(&content)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => LocalData::default(),
            Err(e) => return Err(e.into()),
        };
        tracing::info!("Opened local database at {}", path.display());
        Ok(Self {
            path: Some(path),
            data: RwLock::new(data),
        })
    }

    async fn save(&self, data: &LocalData) -> DbResult<()> {
        if let Some(path) = &self.path {
            let content = serde_json::to_string_pretty(data)?;
            tokio::fs::write(path, content).await?;
        }
        Ok(())
    }

    /// Applies `change` to a copy of the data. The copy replaces the live data
    /// only once it has been written, so a failed save changes nothing.
    async fn commit<T: Send>(
        &self,
        change: impl FnOnce(&mut LocalData) -> DbResult<T> + Send,
    ) -> DbResult<T> {
        let mut db = self.data.write().await;
        let mut next = db.clone();
        let result = change(&mut next)?;
        self.save(&next).await?;
        *db = next;
        Ok(result)
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> chrono::DateTime<chrono::Utc>) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

fn writable_battle(db: &mut LocalData, battle_id: Uuid) -> DbResult<&mut Battle> {
    let battle = db
        .battles
        .iter_mut()
        .find(|b| b.id == battle_id)
        .ok_or_else(|| DbError::NotFound(format!("Battle {} not found", battle_id)))?;
    if !battle.status.can_become(BattleStatus::Completed) {
        return Err(DbError::Conflict(format!(
            "Battle {} is already completed",
            battle_id
        )));
    }
    Ok(battle)
}

#[async_trait]
impl Database for LocalDatabase {
    async fn get_profile(&self, user_id: Uuid) -> DbResult<Profile> {
        let db = self.data.read().await;
        db.profiles
            .iter()
            .find(|p| p.id == user_id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("Profile {} not found", user_id)))
    }

    async fn create_profile(&self, profile: Profile) -> DbResult<()> {
        self.commit(|db| {
            if db.profiles.iter().any(|p| p.id == profile.id) {
                return Err(DbError::Conflict(format!(
                    "Profile {} already exists",
                    profile.id
                )));
            }
            db.profiles.push(profile);
            Ok(())
        })
        .await
    }

    async fn update_profile(
        &self,
        user_id: Uuid,
        update: UpdateProfileRequest,
    ) -> DbResult<Profile> {
        self.commit(|db| {
            let profile = db
                .profiles
                .iter_mut()
                .find(|p| p.id == user_id)
                .ok_or_else(|| DbError::NotFound(format!("Profile {} not found", user_id)))?;
            if let Some(username) = update.username {
                profile.username = username;
            }
            if let Some(avatar_url) = update.avatar_url {
                profile.avatar_url = Some(avatar_url);
            }
            Ok(profile.clone())
        })
        .await
    }

    async fn add_to_profile(&self, user_id: Uuid, tally: ProfileTally) -> DbResult<()> {
        if !self.data.read().await.profiles.iter().any(|p| p.id == user_id) {
            return Ok(());
        }
        self.commit(|db| {
            if let Some(profile) = db.profiles.iter_mut().find(|p| p.id == user_id) {
                profile.wins += tally.wins;
                profile.losses += tally.losses;
                profile.total_battles += tally.battles;
            }
            Ok(())
        })
        .await
    }

    async fn get_characters(&self, owner: Option<Uuid>) -> DbResult<Vec<Character>> {
        let db = self.data.read().await;
        let mut characters: Vec<Character> = db
            .characters
            .iter()
            .filter(|c| c.is_default || (owner.is_some() && c.user_id == owner))
            .cloned()
            .collect();
        newest_first(&mut characters, |c| c.created_at);
        Ok(characters)
    }

    async fn get_character(&self, character_id: Uuid) -> DbResult<Character> {
        let db = self.data.read().await;
        db.characters
            .iter()
            .find(|c| c.id == character_id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("Character {} not found", character_id)))
    }

    async fn create_character(&self, character: Character) -> DbResult<()> {
        self.commit(|db| {
            db.characters.push(character);
            Ok(())
        })
        .await
    }

    async fn create_battle(&self, battle: Battle) -> DbResult<()> {
        self.commit(|db| {
            db.battles.push(battle);
            Ok(())
        })
        .await
    }

    async fn get_battle(&self, battle_id: Uuid) -> DbResult<Battle> {
        let db = self.data.read().await;
        db.battles
            .iter()
            .find(|b| b.id == battle_id)
            .cloned()
            .ok_or_else(|| DbError::NotFound(format!("Battle {} not found", battle_id)))
    }

    async fn get_battles_for_user(&self, user_id: Uuid, limit: usize) -> DbResult<Vec<Battle>> {
        let db = self.data.read().await;
        let mut battles: Vec<Battle> = db
            .battles
            .iter()
            .filter(|b| b.has_participant(user_id))
            .cloned()
            .collect();
        newest_first(&mut battles, |b| b.created_at);
        battles.truncate(limit);
        Ok(battles)
    }

    async fn update_verses(&self, battle_id: Uuid, verses: &[Verse]) -> DbResult<()> {
        self.commit(|db| {
            let battle = writable_battle(db, battle_id)?;
            battle.verses = verses.to_vec();
            Ok(())
        })
        .await
    }

    async fn complete_battle(
        &self,
        battle_id: Uuid,
        winner_id: Uuid,
        winner_character_id: Uuid,
        verses: &[Verse],
    ) -> DbResult<()> {
        self.commit(|db| {
            let battle = writable_battle(db, battle_id)?;
            battle.status = BattleStatus::Completed;
            battle.winner_id = Some(winner_id);
            battle.winner_character_id = Some(winner_character_id);
            battle.verses = verses.to_vec();
            Ok(())
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn character(owner: Option<Uuid>, is_default: bool, age_minutes: i64) -> Character {
        Character {
            id: Uuid::new_v4(),
            user_id: owner,
            name: "Test".into(),
            description: String::new(),
            style: RapStyle {
                tempo: Tempo::Medium,
                complexity: Complexity::Moderate,
                attitude: Attitude::Technical,
                rhyme_scheme: RhymeScheme::Abab,
            },
            personality: String::new(),
            signature: Vec::new(),
            voice_settings: VoiceConfig::default(),
            avatar_url: None,
            is_default,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    fn battle(user1: Uuid, user2: Uuid, age_minutes: i64) -> Battle {
        Battle {
            id: Uuid::new_v4(),
            user1_id: user1,
            user2_id: user2,
            character1_id: Uuid::new_v4(),
            character2_id: Uuid::new_v4(),
            topic: "Freestyle".into(),
            verses: Vec::new(),
            winner_id: None,
            winner_character_id: None,
            status: BattleStatus::Active,
            created_at: Utc::now() - Duration::minutes(age_minutes),
        }
    }

    #[tokio::test]
    async fn characters_are_defaults_plus_owned_newest_first() {
        let db = LocalDatabase::in_memory();
        let me = Uuid::new_v4();
        let old_default = character(None, true, 30);
        let mine = character(Some(me), false, 10);
        let theirs = character(Some(Uuid::new_v4()), false, 5);
        for c in [old_default.clone(), mine.clone(), theirs] {
            db.create_character(c).await.unwrap();
        }

        let visible = db.get_characters(Some(me)).await.unwrap();
        let ids: Vec<Uuid> = visible.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![mine.id, old_default.id]);

        let anonymous = db.get_characters(None).await.unwrap();
        assert_eq!(anonymous.len(), 1);
    }

    #[tokio::test]
    async fn history_matches_either_participant_and_limits() {
        let db = LocalDatabase::in_memory();
        let me = Uuid::new_v4();
        let other = Uuid::new_v4();
        for age in 0..12 {
            let b = if age % 2 == 0 {
                battle(me, other, age)
            } else {
                battle(other, me, age)
            };
            db.create_battle(b).await.unwrap();
        }
        db.create_battle(battle(other, other, 100)).await.unwrap();

        let history = db.get_battles_for_user(me, 10).await.unwrap();
        assert_eq!(history.len(), 10);
        assert!(history.windows(2).all(|w| w[0].created_at >= w[1].created_at));
        assert!(history.iter().all(|b| b.has_participant(me)));
    }

    #[tokio::test]
    async fn completed_battles_reject_further_writes() {
        let db = LocalDatabase::in_memory();
        let b = battle(Uuid::new_v4(), Uuid::new_v4(), 0);
        db.create_battle(b.clone()).await.unwrap();
        db.complete_battle(b.id, b.user1_id, b.character1_id, &[])
            .await
            .unwrap();

        let stored = db.get_battle(b.id).await.unwrap();
        assert_eq!(stored.status, BattleStatus::Completed);
        assert!(matches!(
            db.update_verses(b.id, &[]).await,
            Err(DbError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("arena.json");
        let profile = Profile::new(Uuid::new_v4(), "rhymer");
        {
            let db = LocalDatabase::open(&path).await.unwrap();
            db.create_profile(profile.clone()).await.unwrap();
            db.add_to_profile(
                profile.id,
                ProfileTally {
                    wins: 1,
                    losses: 0,
                    battles: 1,
                },
            )
            .await
            .unwrap();
        }

        let reopened = LocalDatabase::open(&path).await.unwrap();
        let stored = reopened.get_profile(profile.id).await.unwrap();
        assert_eq!(stored.wins, 1);
        assert_eq!(stored.total_battles, 1);
    }

    #[tokio::test]
    async fn failed_write_leaves_data_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let sub = dir.path().join("sub");
        tokio::fs::create_dir(&sub).await.unwrap();
        let db = LocalDatabase::open(sub.join("arena.json")).await.unwrap();
        let b = battle(Uuid::new_v4(), Uuid::new_v4(), 0);
        db.create_battle(b.clone()).await.unwrap();

        tokio::fs::remove_dir_all(&sub).await.unwrap();
        let verse = Verse {
            character_id: b.character1_id,
            verse: "1. lost in transit".into(),
            score: 6,
            audio_url: None,
        };
        assert!(matches!(
            db.update_verses(b.id, &[verse.clone()]).await,
            Err(DbError::Io(_))
        ));
        assert!(
            db.complete_battle(b.id, b.user1_id, b.character1_id, &[])
                .await
                .is_err()
        );
        let stored = db.get_battle(b.id).await.unwrap();
        assert!(stored.verses.is_empty());
        assert_eq!(stored.status, BattleStatus::Active);

        tokio::fs::create_dir(&sub).await.unwrap();
        db.complete_battle(b.id, b.user1_id, b.character1_id, &[verse])
            .await
            .unwrap();
        let stored = db.get_battle(b.id).await.unwrap();
        assert_eq!(stored.status, BattleStatus::Completed);
        assert_eq!(stored.verses.len(), 1);
    }
}
