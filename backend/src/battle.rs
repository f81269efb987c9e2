//! Battle lifecycle: create, alternate verses, score, pick a winner, close.
//!
//! An orchestrator drives one battle at a time and is either idle or holding an
//! active battle. Whose turn it is comes from the verse count alone: an odd
//! number of existing verses means the next one is a reply.

use crate::dbs::{Database, DbError, ProfileTally};
use crate::error::{ArenaError, ArenaResult};
use crate::llm::{DEFAULT_SCORE, SCORING_RUBRIC, VerseGenerator, VersePrompt, VerseScorer, parse_score};
use chrono::Utc;
use shared::models::{Battle, BattleOutcome, BattleRules, BattleStatus, Character, Verse};
use std::sync::Arc;
use uuid::Uuid;

/// Collaborators shared by every orchestrator.
#[derive(Clone)]
pub struct ArenaServices {
    pub db: Arc<dyn Database>,
    pub generator: Arc<dyn VerseGenerator>,
    pub scorer: Arc<dyn VerseScorer>,
    pub rules: BattleRules,
}

struct ActiveBattle {
    battle: Battle,
    character1: Character,
    character2: Character,
}

impl ActiveBattle {
    fn character(&self, character_id: Uuid) -> Option<&Character> {
        if self.character1.id == character_id {
            Some(&self.character1)
        } else if self.character2.id == character_id {
            Some(&self.character2)
        } else {
            None
        }
    }
}

enum Phase {
    Idle,
    Active(Box<ActiveBattle>),
}

pub struct BattleOrchestrator {
    services: ArenaServices,
    phase: Phase,
}

/// Mean score of one character's verses; a character with none scores 0.
pub fn average_score(verses: &[Verse], character_id: Uuid) -> f64 {
    let scores: Vec<f64> = verses
        .iter()
        .filter(|v| v.character_id == character_id)
        .map(|v| v.score as f64)
        .collect();
    if scores.is_empty() {
        return 0.0;
    }
    scores.iter().sum::<f64>() / scores.len() as f64
}

/// Strictly higher mean wins; on a tie the first participant takes it.
pub fn decide_outcome(battle: &Battle, verses: &[Verse]) -> BattleOutcome {
    let character1_average = average_score(verses, battle.character1_id);
    let character2_average = average_score(verses, battle.character2_id);
    let (winner_id, winner_character_id) = if character2_average > character1_average {
        (battle.user2_id, battle.character2_id)
    } else {
        (battle.user1_id, battle.character1_id)
    };
    BattleOutcome {
        battle_id: battle.id,
        winner_id,
        winner_character_id,
        character1_average,
        character2_average,
    }
}

/// Profile counter changes for a finished battle, keyed by user. The
/// challenger (`user1`) wins or loses with their character; a distinct
/// opponent user gets the opposite result.
pub fn profile_tallies(battle: &Battle, outcome: &BattleOutcome) -> Vec<(Uuid, ProfileTally)> {
    let challenger_won = outcome.winner_character_id == battle.character1_id;
    let result = |won: bool| ProfileTally {
        wins: i32::from(won),
        losses: i32::from(!won),
        battles: 1,
    };
    let mut tallies = vec![(battle.user1_id, result(challenger_won))];
    if battle.user2_id != battle.user1_id {
        tallies.push((battle.user2_id, result(!challenger_won)));
    }
    tallies
}

impl BattleOrchestrator {
    pub fn new(services: ArenaServices) -> Self {
        Self {
            services,
            phase: Phase::Idle,
        }
    }

    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active(_))
    }

    pub fn current_battle(&self) -> Option<&Battle> {
        match &self.phase {
            Phase::Active(active) => Some(&active.battle),
            Phase::Idle => None,
        }
    }

    pub fn verses(&self) -> &[Verse] {
        self.current_battle()
            .map(|b| b.verses.as_slice())
            .unwrap_or_default()
    }

    /// Whether the next verse answers the previous one.
    pub fn is_reply_turn(&self) -> bool {
        self.verses().len() % 2 == 1
    }

    pub fn budget_reached(&self) -> bool {
        self.verses().len() >= self.services.rules.verse_budget()
    }

    fn active(&self) -> ArenaResult<&ActiveBattle> {
        match &self.phase {
            Phase::Active(active) => Ok(active),
            Phase::Idle => Err(ArenaError::validation("No battle in progress")),
        }
    }

    /// Starts a battle between the challenger's `character` and `opponent`.
    pub async fn create_battle(
        &mut self,
        challenger_id: Uuid,
        character: Character,
        opponent: Character,
        topic: &str,
    ) -> ArenaResult<&Battle> {
        if self.is_active() {
            return Err(ArenaError::validation("A battle is already in progress"));
        }
        let topic = topic.trim();
        if topic.is_empty() {
            return Err(ArenaError::validation("Battle topic is required"));
        }
        if character.id == opponent.id {
            return Err(ArenaError::validation(
                "A battle needs two different characters",
            ));
        }

        let battle = Battle {
            id: Uuid::now_v7(),
            user1_id: challenger_id,
            user2_id: opponent.user_id.unwrap_or(challenger_id),
            character1_id: character.id,
            character2_id: opponent.id,
            topic: topic.to_string(),
            verses: Vec::new(),
            winner_id: None,
            winner_character_id: None,
            status: BattleStatus::Active,
            created_at: Utc::now(),
        };
        self.services.db.create_battle(battle.clone()).await?;
        tracing::info!(
            "Battle {} started: {} vs {} on {:?}",
            battle.id,
            character.name,
            opponent.name,
            battle.topic
        );

        self.phase = Phase::Active(Box::new(ActiveBattle {
            battle,
            character1: character,
            character2: opponent,
        }));
        self.current_battle()
            .ok_or_else(|| ArenaError::validation("No battle in progress"))
    }

    /// Picks up an active battle from the store, e.g. after a restart.
    pub async fn resume(&mut self, battle_id: Uuid) -> ArenaResult<&Battle> {
        if self.is_active() {
            return Err(ArenaError::validation("A battle is already in progress"));
        }
        let battle = self.services.db.get_battle(battle_id).await?;
        if battle.status == BattleStatus::Completed {
            return Err(DbError::Conflict(format!("Battle {} is already completed", battle_id)).into());
        }
        let character1 = self.services.db.get_character(battle.character1_id).await?;
        let character2 = self.services.db.get_character(battle.character2_id).await?;
        tracing::debug!("Resumed battle {} at verse {}", battle.id, battle.verses.len());

        self.phase = Phase::Active(Box::new(ActiveBattle {
            battle,
            character1,
            character2,
        }));
        self.current_battle()
            .ok_or_else(|| ArenaError::validation("No battle in progress"))
    }

    /// Generates, scores and records the next verse for `character_id`.
    /// On any failure the verse list is left exactly as it was.
    pub async fn generate_verse(&mut self, character_id: Uuid) -> ArenaResult<Verse> {
        let budget = self.services.rules.verse_budget();
        let active = self.active()?;
        let character = active.character(character_id).ok_or_else(|| {
            ArenaError::validation(format!(
                "Character {} is not part of this battle",
                character_id
            ))
        })?;
        let verses = &active.battle.verses;
        if verses.len() >= budget {
            return Err(ArenaError::validation("This battle has no verses left"));
        }

        let is_reply = verses.len() % 2 == 1;
        let opponent_name = active
            .battle
            .opponent_of(character_id)
            .and_then(|id| active.character(id))
            .map(|c| c.name.as_str());

        let mut prompt = VersePrompt::for_character(character, &active.battle.topic);
        if is_reply {
            prompt.opponent = opponent_name;
            prompt.previous_verse = verses.last().map(|v| v.verse.as_str());
        }
        prompt.battle_context = Some(format!(
            "Verse {} of {} in the rap battle",
            verses.len() + 1,
            budget
        ));

        let text = self.services.generator.generate_verse(&prompt).await?;
        let score = match self.services.scorer.rate_verse(&text, &SCORING_RUBRIC).await {
            Ok(reply) => parse_score(&reply),
            Err(e) => {
                tracing::warn!("Scoring failed, using default score: {}", e);
                DEFAULT_SCORE
            }
        };

        let verse = Verse {
            character_id,
            verse: text,
            score,
            audio_url: None,
        };
        let mut updated = verses.clone();
        updated.push(verse.clone());
        let battle_id = active.battle.id;
        self.services.db.update_verses(battle_id, &updated).await?;

        if let Phase::Active(active) = &mut self.phase {
            active.battle.verses = updated;
        }
        tracing::info!(
            "Battle {}: verse {} by {} scored {}",
            battle_id,
            self.verses().len(),
            character_id,
            score
        );
        Ok(verse)
    }

    /// Closes the battle, records the winner and returns to idle.
    pub async fn end_battle(&mut self) -> ArenaResult<BattleOutcome> {
        let active = self.active()?;
        let battle = &active.battle;
        let outcome = decide_outcome(battle, &battle.verses);

        self.services
            .db
            .complete_battle(
                battle.id,
                outcome.winner_id,
                outcome.winner_character_id,
                &battle.verses,
            )
            .await?;

        for (user_id, tally) in profile_tallies(battle, &outcome) {
            if let Err(e) = self.services.db.add_to_profile(user_id, tally).await {
                tracing::error!("Failed to update profile {} after battle: {}", user_id, e);
            }
        }
        tracing::info!(
            "Battle {} completed, winner character {} ({:.1} vs {:.1})",
            battle.id,
            outcome.winner_character_id,
            outcome.character1_average,
            outcome.character2_average
        );

        self.phase = Phase::Idle;
        Ok(outcome)
    }
}
