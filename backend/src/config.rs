use shared::models::BattleRules;
use std::path::PathBuf;

pub const DEFAULT_LLM_API_BASE: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_LLM_MODEL: &str = "llama3-70b-8192";
pub const DEFAULT_TTS_API_BASE: &str = "https://api.elevenlabs.io";
pub const DEFAULT_TTS_MODEL: &str = "eleven_monolingual_v1";

#[derive(Clone, Debug)]
pub enum DatabaseConfig {
    /// JSON file store; `None` keeps everything in memory
    Local { path: Option<PathBuf> },
    Postgres { url: String },
}

/// Chat-completion settings. Sampling parameters are fixed per call kind.
#[derive(Clone, Debug)]
pub struct LlmConfig {
    pub api_key: String,
    pub api_base: String,
    pub model: String,
    pub verse_temperature: f32,
    pub verse_max_tokens: u32,
    pub score_temperature: f32,
    pub score_max_tokens: u32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_base: DEFAULT_LLM_API_BASE.to_string(),
            model: DEFAULT_LLM_MODEL.to_string(),
            verse_temperature: 0.8,
            verse_max_tokens: 1000,
            score_temperature: 0.3,
            score_max_tokens: 10,
        }
    }
}

#[derive(Clone, Debug)]
pub struct TtsConfig {
    pub api_key: Option<String>,
    pub api_base: String,
    pub model_id: String,
}

impl Default for TtsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_base: DEFAULT_TTS_API_BASE.to_string(),
            model_id: DEFAULT_TTS_MODEL.to_string(),
        }
    }
}

/// GoTrue endpoint, i.e. `https://<project>.supabase.co`
#[derive(Clone, Debug)]
pub struct AuthConfig {
    pub url: String,
    pub anon_key: String,
}

#[derive(Clone, Debug)]
pub struct ArenaConfig {
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub tts: TtsConfig,
    pub auth: AuthConfig,
    pub rules: BattleRules,
}
