use backend::config::{
    ArenaConfig, AuthConfig, DEFAULT_LLM_API_BASE, DEFAULT_LLM_MODEL, DatabaseConfig, LlmConfig,
    TtsConfig,
};
use clap::Parser;
use shared::models::BattleRules;
use std::path::PathBuf;

#[derive(Parser)]
#[command(about = "Serve the verse arena API")]
pub struct Cli {
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,
    #[arg(long, env = "DIST_DIR", default_value = "dist")]
    pub dist_dir: PathBuf,
    /// JSON file store, used when no Postgres URL is given
    #[arg(long, env = "LOCAL_DB_PATH")]
    pub local_db_path: Option<PathBuf>,
    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    #[arg(long, env = "GROQ_API_KEY", default_value = "", hide_env_values = true)]
    pub llm_api_key: String,
    #[arg(long, env = "LLM_API_BASE", default_value = DEFAULT_LLM_API_BASE)]
    pub llm_api_base: String,
    #[arg(long, env = "LLM_MODEL", default_value = DEFAULT_LLM_MODEL)]
    pub llm_model: String,

    #[arg(long, env = "ELEVENLABS_API_KEY", hide_env_values = true)]
    pub elevenlabs_api_key: Option<String>,

    #[arg(long, env = "SUPABASE_URL")]
    pub supabase_url: String,
    #[arg(long, env = "SUPABASE_ANON_KEY", hide_env_values = true)]
    pub supabase_anon_key: String,

    #[arg(long, env = "ROUNDS_PER_SIDE", default_value_t = 3)]
    pub rounds_per_side: usize,
}

impl Cli {
    pub fn arena_config(&self) -> ArenaConfig {
        let database = match &self.database_url {
            Some(url) => DatabaseConfig::Postgres { url: url.clone() },
            None => DatabaseConfig::Local {
                path: self.local_db_path.clone(),
            },
        };
        ArenaConfig {
            database,
            llm: LlmConfig {
                api_key: self.llm_api_key.clone(),
                api_base: self.llm_api_base.clone(),
                model: self.llm_model.clone(),
                ..LlmConfig::default()
            },
            tts: TtsConfig {
                api_key: self.elevenlabs_api_key.clone(),
                ..TtsConfig::default()
            },
            auth: AuthConfig {
                url: self.supabase_url.clone(),
                anon_key: self.supabase_anon_key.clone(),
            },
            rules: BattleRules {
                rounds_per_side: self.rounds_per_side.max(1),
            },
        }
    }
}
