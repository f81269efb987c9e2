#![allow(dead_code)]

use async_trait::async_trait;
use backend::auth::{AuthError, AuthProvider, SignUpOutcome};
use backend::battle::ArenaServices;
use backend::dbs::local::LocalDatabase;
use backend::dbs::{Database, DbError, DbResult, ProfileTally};
use backend::llm::{LlmError, VerseGenerator, VersePrompt, VerseScorer};
use backend::tts::{SynthesisError, VerseSynthesizer};
use chrono::Utc;
use serde_json::json;
use shared::models::*;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

/// What the generator was asked for, captured per call.
#[derive(Clone, Debug)]
pub struct SeenPrompt {
    pub name: String,
    pub topic: String,
    pub opponent: Option<String>,
    pub previous_verse: Option<String>,
    pub battle_context: Option<String>,
}

#[derive(Default)]
pub struct FakeGenerator {
    pub prompts: Mutex<Vec<SeenPrompt>>,
    pub fail: AtomicBool,
}

impl FakeGenerator {
    pub fn fail_next(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn seen(&self) -> Vec<SeenPrompt> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl VerseGenerator for FakeGenerator {
    async fn generate_verse(&self, prompt: &VersePrompt<'_>) -> Result<String, LlmError> {
        if self.fail.swap(false, Ordering::SeqCst) {
            return Err(LlmError::EmptyCompletion);
        }
        let mut prompts = self.prompts.lock().unwrap();
        prompts.push(SeenPrompt {
            name: prompt.name.to_string(),
            topic: prompt.topic.to_string(),
            opponent: prompt.opponent.map(str::to_string),
            previous_verse: prompt.previous_verse.map(str::to_string),
            battle_context: prompt.battle_context.clone(),
        });
        Ok(format!("{} verse #{}", prompt.name, prompts.len()))
    }
}

/// Answers with queued replies, then "7". `None` in the queue is a failed call.
#[derive(Default)]
pub struct FakeScorer {
    pub replies: Mutex<VecDeque<Option<String>>>,
}

impl FakeScorer {
    pub fn queue(&self, reply: Option<&str>) {
        self.replies
            .lock()
            .unwrap()
            .push_back(reply.map(str::to_string));
    }
}

#[async_trait]
impl VerseScorer for FakeScorer {
    async fn rate_verse(&self, _verse: &str, criteria: &[&str]) -> Result<String, LlmError> {
        assert_eq!(criteria.len(), 4);
        match self.replies.lock().unwrap().pop_front() {
            Some(Some(reply)) => Ok(reply),
            Some(None) => Err(LlmError::EmptyCompletion),
            None => Ok("7".into()),
        }
    }
}

pub struct FakeSynthesizer;

#[async_trait]
impl VerseSynthesizer for FakeSynthesizer {
    async fn synthesize(&self, text: &str, voice: &VoiceConfig) -> Result<Vec<u8>, SynthesisError> {
        Ok(format!("{}:{}", voice.voice_id, text).into_bytes())
    }
}

/// In-memory store whose battle writes can be made to fail. `fail_completion`
/// fails only the closing write.
pub struct FlakyDatabase {
    pub inner: LocalDatabase,
    pub fail_writes: AtomicBool,
    pub fail_completion: AtomicBool,
}

impl FlakyDatabase {
    pub fn new() -> Self {
        Self {
            inner: LocalDatabase::in_memory(),
            fail_writes: AtomicBool::new(false),
            fail_completion: AtomicBool::new(false),
        }
    }

    fn check(&self) -> DbResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(DbError::Internal("store offline".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl Database for FlakyDatabase {
    async fn get_profile(&self, user_id: Uuid) -> DbResult<Profile> {
        self.inner.get_profile(user_id).await
    }
    async fn create_profile(&self, profile: Profile) -> DbResult<()> {
        self.inner.create_profile(profile).await
    }
    async fn update_profile(&self, user_id: Uuid, update: UpdateProfileRequest) -> DbResult<Profile> {
        self.inner.update_profile(user_id, update).await
    }
    async fn add_to_profile(&self, user_id: Uuid, tally: ProfileTally) -> DbResult<()> {
        self.inner.add_to_profile(user_id, tally).await
    }
    async fn get_characters(&self, owner: Option<Uuid>) -> DbResult<Vec<Character>> {
        self.inner.get_characters(owner).await
    }
    async fn get_character(&self, character_id: Uuid) -> DbResult<Character> {
        self.inner.get_character(character_id).await
    }
    async fn create_character(&self, character: Character) -> DbResult<()> {
        self.inner.create_character(character).await
    }
    async fn create_battle(&self, battle: Battle) -> DbResult<()> {
        self.check()?;
        self.inner.create_battle(battle).await
    }
    async fn get_battle(&self, battle_id: Uuid) -> DbResult<Battle> {
        self.inner.get_battle(battle_id).await
    }
    async fn get_battles_for_user(&self, user_id: Uuid, limit: usize) -> DbResult<Vec<Battle>> {
        self.inner.get_battles_for_user(user_id, limit).await
    }
    async fn update_verses(&self, battle_id: Uuid, verses: &[Verse]) -> DbResult<()> {
        self.check()?;
        self.inner.update_verses(battle_id, verses).await
    }
    async fn complete_battle(
        &self,
        battle_id: Uuid,
        winner_id: Uuid,
        winner_character_id: Uuid,
        verses: &[Verse],
    ) -> DbResult<()> {
        self.check()?;
        if self.fail_completion.load(Ordering::SeqCst) {
            return Err(DbError::Internal("store offline".into()));
        }
        self.inner
            .complete_battle(battle_id, winner_id, winner_character_id, verses)
            .await
    }
}

/// Accepts `<name>@example.com` with password "secret"; the access token is
/// the user's id. Addresses starting with "pending" are unconfirmed.
#[derive(Default)]
pub struct FakeAuth {
    users: Mutex<HashMap<String, AuthUser>>,
}

impl FakeAuth {
    pub fn add_user(&self, email: &str) -> AuthUser {
        let user = AuthUser {
            id: Uuid::new_v4(),
            email: Some(email.to_string()),
            email_confirmed_at: (!email.starts_with("pending")).then(Utc::now),
            user_metadata: json!({}),
        };
        self.users
            .lock()
            .unwrap()
            .insert(email.to_string(), user.clone());
        user
    }

    fn by_token(&self, token: &str) -> Option<AuthUser> {
        self.users
            .lock()
            .unwrap()
            .values()
            .find(|u| u.id.to_string() == token)
            .cloned()
    }
}

#[async_trait]
impl AuthProvider for FakeAuth {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let user = self.users.lock().unwrap().get(email).cloned();
        match user {
            Some(user) if password == "secret" => {
                if !user.is_confirmed() {
                    return Err(AuthError::EmailNotConfirmed);
                }
                Ok(AuthSession {
                    access_token: user.id.to_string(),
                    refresh_token: None,
                    user,
                })
            }
            _ => Err(AuthError::InvalidCredentials(
                "Invalid login credentials".into(),
            )),
        }
    }

    async fn sign_up(
        &self,
        email: &str,
        _password: &str,
        username: &str,
    ) -> Result<SignUpOutcome, AuthError> {
        let mut user = self.add_user(email);
        user.user_metadata = json!({ "username": username });
        self.users
            .lock()
            .unwrap()
            .insert(email.to_string(), user.clone());
        Ok(SignUpOutcome {
            session: user.is_confirmed().then(|| AuthSession {
                access_token: user.id.to_string(),
                refresh_token: None,
                user: user.clone(),
            }),
            user,
        })
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), AuthError> {
        Ok(())
    }

    async fn resend_confirmation(&self, _email: &str) -> Result<(), AuthError> {
        Ok(())
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        self.by_token(access_token)
            .ok_or(AuthError::Unauthenticated)
    }
}

pub fn character(name: &str, owner: Option<Uuid>) -> Character {
    Character {
        id: Uuid::new_v4(),
        user_id: owner,
        name: name.to_string(),
        description: format!("{name} from the test suite"),
        style: RapStyle {
            tempo: Tempo::Medium,
            complexity: Complexity::Moderate,
            attitude: Attitude::Technical,
            rhyme_scheme: RhymeScheme::Abab,
        },
        personality: "relentless".into(),
        signature: vec!["check it".into()],
        voice_settings: VoiceConfig {
            voice_id: format!("voice-{name}"),
            settings: VoiceSettings::default(),
        },
        avatar_url: None,
        is_default: owner.is_none(),
        created_at: Utc::now(),
    }
}

/// Services built from fakes, with handles kept for steering them.
pub struct Harness {
    pub db: Arc<FlakyDatabase>,
    pub generator: Arc<FakeGenerator>,
    pub scorer: Arc<FakeScorer>,
    pub services: ArenaServices,
}

impl Harness {
    pub fn new(rounds_per_side: usize) -> Self {
        let db = Arc::new(FlakyDatabase::new());
        let generator = Arc::new(FakeGenerator::default());
        let scorer = Arc::new(FakeScorer::default());
        let services = ArenaServices {
            db: db.clone(),
            generator: generator.clone(),
            scorer: scorer.clone(),
            rules: BattleRules { rounds_per_side },
        };
        Self {
            db,
            generator,
            scorer,
            services,
        }
    }

    pub async fn add_character(&self, name: &str, owner: Option<Uuid>) -> Character {
        let character = character(name, owner);
        self.db.create_character(character.clone()).await.unwrap();
        character
    }
}
