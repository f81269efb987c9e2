use crate::AppState;
use crate::error::{ArenaError, ArenaResult};
use crate::handlers::CurrentUser;
use axum::{Json, extract::State};
use chrono::Utc;
use shared::models::{Character, CharacterRoster, CreateCharacterRequest};
use uuid::Uuid;

pub async fn list_characters(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ArenaResult<Json<CharacterRoster>> {
    let characters = state.services.db.get_characters(Some(user.id)).await?;
    let (defaults, owned): (Vec<_>, Vec<_>) =
        characters.into_iter().partition(|c| c.is_default);
    Ok(Json(CharacterRoster { defaults, owned }))
}

pub async fn create_character(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(payload): Json<CreateCharacterRequest>,
) -> ArenaResult<Json<Character>> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(ArenaError::validation("Character name is required"));
    }

    let character = Character {
        id: Uuid::new_v4(),
        user_id: Some(user.id),
        name: name.to_string(),
        description: payload.description,
        style: payload.style,
        personality: payload.personality,
        signature: payload
            .signature
            .into_iter()
            .map(|phrase| phrase.trim().to_string())
            .filter(|phrase| !phrase.is_empty())
            .collect(),
        voice_settings: payload.voice_settings,
        avatar_url: payload.avatar_url,
        is_default: false,
        created_at: Utc::now(),
    };

    state
        .services
        .db
        .create_character(character.clone())
        .await?;
    tracing::info!("User {} created character {}", user.id, character.name);
    Ok(Json(character))
}
