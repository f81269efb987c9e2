use crate::AppState;
use crate::battle::BattleOrchestrator;
use crate::dbs::DbError;
use crate::error::{ArenaError, ArenaResult};
use crate::handlers::CurrentUser;
use crate::playback::ClipSink;
use crate::state::Arena;
use crate::tts::SynthesisError;
use axum::{
    Json,
    extract::{Path, State},
    http::header::CONTENT_TYPE,
    response::IntoResponse,
};
use shared::models::{
    Battle, BattleOutcome, Character, CreateBattleRequest, GenerateVerseRequest, VerseTurn,
};
use tokio::sync::MutexGuard;
use uuid::Uuid;

const RECENT_BATTLES: usize = 10;

fn not_found(battle_id: Uuid) -> ArenaError {
    DbError::NotFound(format!("Battle {}", battle_id)).into()
}

/// Loads a battle the caller takes part in. Other users' battles look missing.
async fn participant_battle(state: &AppState, battle_id: Uuid, user_id: Uuid) -> ArenaResult<Battle> {
    let battle = state.services.db.get_battle(battle_id).await?;
    if !battle.has_participant(user_id) {
        return Err(not_found(battle_id));
    }
    Ok(battle)
}

/// Looks up a character named in a battle request. An unknown id is a bad
/// request, not a missing resource.
async fn battle_character(
    state: &AppState,
    character_id: Uuid,
    user_id: Uuid,
) -> ArenaResult<Character> {
    let character = match state.services.db.get_character(character_id).await {
        Ok(character) => character,
        Err(DbError::NotFound(_)) => {
            return Err(ArenaError::validation(format!(
                "Character {} does not exist",
                character_id
            )));
        }
        Err(e) => return Err(e.into()),
    };
    if !character.is_visible_to(user_id) {
        return Err(ArenaError::validation(format!(
            "Character {} is not available",
            character_id
        )));
    }
    Ok(character)
}

pub async fn create_battle(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateBattleRequest>,
) -> ArenaResult<Json<Battle>> {
    let character = battle_character(&state, payload.character_id, user.id).await?;
    let opponent = battle_character(&state, payload.opponent_id, user.id).await?;

    // The store holds the battle from here; the next request resumes it
    let mut orchestrator = BattleOrchestrator::new(state.services.clone());
    let battle = orchestrator
        .create_battle(user.id, character, opponent, &payload.topic)
        .await?
        .clone();
    Ok(Json(battle))
}

pub async fn list_battles(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ArenaResult<Json<Vec<Battle>>> {
    let battles = state
        .services
        .db
        .get_battles_for_user(user.id, RECENT_BATTLES)
        .await?;
    Ok(Json(battles))
}

pub async fn get_battle(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(battle_id): Path<Uuid>,
) -> ArenaResult<Json<Battle>> {
    Ok(Json(participant_battle(&state, battle_id, user.id).await?))
}

async fn lock_active(
    arena: &Arena,
    battle_id: Uuid,
) -> ArenaResult<MutexGuard<'_, BattleOrchestrator>> {
    let mut orchestrator = arena.lock().await;
    if !orchestrator.is_active() {
        orchestrator.resume(battle_id).await?;
    }
    Ok(orchestrator)
}

async fn take_turn(arena: &Arena, battle_id: Uuid, character_id: Uuid) -> ArenaResult<VerseTurn> {
    let mut orchestrator = lock_active(arena, battle_id).await?;
    let verse = orchestrator.generate_verse(character_id).await?;
    let index = orchestrator.verses().len() - 1;

    // The verse is already stored; a failed close leaves the battle for /end
    let outcome = if orchestrator.budget_reached() {
        match orchestrator.end_battle().await {
            Ok(outcome) => Some(outcome),
            Err(e) => {
                tracing::error!("Battle {} is out of verses but did not close: {}", battle_id, e);
                None
            }
        }
    } else {
        None
    };
    Ok(VerseTurn {
        index,
        verse,
        outcome,
    })
}

/// Generates the next verse. The verse that uses up the budget also closes
/// the battle and carries the outcome.
pub async fn generate_verse(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(battle_id): Path<Uuid>,
    Json(payload): Json<GenerateVerseRequest>,
) -> ArenaResult<Json<VerseTurn>> {
    participant_battle(&state, battle_id, user.id).await?;
    let arena = state.arena(battle_id).await;
    let turn = take_turn(&arena, battle_id, payload.character_id).await;
    state.release_arena(battle_id, arena).await;
    Ok(Json(turn?))
}

pub async fn end_battle(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(battle_id): Path<Uuid>,
) -> ArenaResult<Json<BattleOutcome>> {
    participant_battle(&state, battle_id, user.id).await?;
    let arena = state.arena(battle_id).await;
    let outcome = match lock_active(&arena, battle_id).await {
        Ok(mut orchestrator) => orchestrator.end_battle().await,
        Err(e) => Err(e),
    };
    state.release_arena(battle_id, arena).await;
    Ok(Json(outcome?))
}

pub async fn verse_audio(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path((battle_id, index)): Path<(Uuid, usize)>,
) -> ArenaResult<impl IntoResponse> {
    let battle = participant_battle(&state, battle_id, user.id).await?;
    let verse = battle
        .verses
        .get(index)
        .ok_or_else(|| DbError::NotFound(format!("Verse {} of battle {}", index, battle_id)))?;
    let character = state.services.db.get_character(verse.character_id).await?;

    let sink = ClipSink::default();
    let voicebox = state.voicebox(user.id).await;
    let played = voicebox.play_verse(verse, &character, &sink).await;
    state.release_voicebox(user.id, voicebox).await;
    played?;
    let audio = sink
        .take()
        .ok_or_else(|| SynthesisError::Playback("No audio was produced".into()))?;
    Ok(([(CONTENT_TYPE, "audio/mpeg")], audio))
}
