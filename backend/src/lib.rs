pub mod accounts;
pub mod auth;
pub mod battle;
pub mod config;
pub mod dbs;
pub mod defaults;
pub mod error;
mod handlers;
pub mod llm;
pub mod playback;
pub mod state;
pub mod tts;

use crate::auth::GoTrueAuth;
use crate::battle::ArenaServices;
use crate::config::{ArenaConfig, DatabaseConfig};
use crate::dbs::Database;
use crate::dbs::local::LocalDatabase;
use crate::dbs::postgres::PostgresDatabase;
use crate::error::ArenaResult;
use crate::handlers::*;
use crate::llm::ChatCompletionsClient;
use crate::tts::ElevenLabsSynthesizer;
use axum::{
    Json, Router,
    extract::State,
    routing::{get, post},
};
use shared::models::BattleRules;
use std::sync::Arc;
use tower_http::cors::CorsLayer;

pub use crate::state::AppState;

async fn open_database(config: &DatabaseConfig) -> ArenaResult<Arc<dyn Database>> {
    let db: Arc<dyn Database> = match config {
        DatabaseConfig::Local { path: Some(path) } => {
            tracing::info!("Using local database at {}", path.display());
            Arc::new(LocalDatabase::open(path).await?)
        }
        DatabaseConfig::Local { path: None } => {
            tracing::warn!("No database configured, battles are kept in memory only");
            Arc::new(LocalDatabase::in_memory())
        }
        DatabaseConfig::Postgres { url } => {
            tracing::info!("Connecting to Postgres");
            Arc::new(PostgresDatabase::new(url).await?)
        }
    };
    Ok(db)
}

/// Wires the real collaborators from configuration.
pub async fn build_state(config: ArenaConfig) -> ArenaResult<AppState> {
    let db = open_database(&config.database).await?;
    defaults::seed_default_characters(db.as_ref()).await?;

    if config.tts.api_key.is_none() {
        tracing::warn!("No ElevenLabs API key configured, verse audio is disabled");
    }
    let llm = Arc::new(ChatCompletionsClient::new(config.llm));
    let services = ArenaServices {
        db,
        generator: llm.clone(),
        scorer: llm,
        rules: config.rules,
    };
    Ok(AppState::new(
        services,
        Arc::new(GoTrueAuth::new(config.auth)),
        Arc::new(ElevenLabsSynthesizer::new(config.tts)),
    ))
}

async fn battle_rules(State(state): State<AppState>) -> Json<BattleRules> {
    Json(state.services.rules)
}

pub fn routes(router: Router<AppState>, state: AppState) -> Router<()> {
    router
        .route("/api/health", get(|| async { "OK" }))
        .route("/api/rules", get(battle_rules))
        .route("/api/auth/sign-up", post(sign_up))
        .route("/api/auth/sign-in", post(sign_in))
        .route("/api/auth/sign-out", post(sign_out))
        .route("/api/auth/resend-confirmation", post(resend_confirmation))
        .route("/api/profile", get(get_profile).patch(update_profile))
        .route(
            "/api/characters",
            get(list_characters).post(create_character),
        )
        .route("/api/battles", get(list_battles).post(create_battle))
        .route("/api/battles/{battle_id}", get(get_battle))
        .route("/api/battles/{battle_id}/verses", post(generate_verse))
        .route("/api/battles/{battle_id}/end", post(end_battle))
        .route(
            "/api/battles/{battle_id}/verses/{index}/audio",
            post(verse_audio),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

pub async fn init(router: Router<AppState>, config: ArenaConfig) -> ArenaResult<Router<()>> {
    let state = build_state(config).await?;
    Ok(routes(router, state))
}
