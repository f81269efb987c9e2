use super::stored::json_or_string;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tempo {
    Slow,
    Medium,
    Fast,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Complexity {
    Simple,
    Moderate,
    Complex,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Attitude {
    Aggressive,
    Conscious,
    Humorous,
    Technical,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RhymeScheme {
    #[serde(rename = "ABAB")]
    Abab,
    #[serde(rename = "AABB")]
    Aabb,
    #[serde(rename = "ABCB")]
    Abcb,
    #[serde(rename = "complex")]
    Complex,
}

impl Tempo {
    pub fn as_str(&self) -> &'static str {
        match self {
            Tempo::Slow => "slow",
            Tempo::Medium => "medium",
            Tempo::Fast => "fast",
        }
    }
}

impl Complexity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Complexity::Simple => "simple",
            Complexity::Moderate => "moderate",
            Complexity::Complex => "complex",
        }
    }
}

impl Attitude {
    pub fn as_str(&self) -> &'static str {
        match self {
            Attitude::Aggressive => "aggressive",
            Attitude::Conscious => "conscious",
            Attitude::Humorous => "humorous",
            Attitude::Technical => "technical",
        }
    }
}

impl RhymeScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            RhymeScheme::Abab => "ABAB",
            RhymeScheme::Aabb => "AABB",
            RhymeScheme::Abcb => "ABCB",
            RhymeScheme::Complex => "complex",
        }
    }
}

macro_rules! display_as_str {
    ($($ty:ty),*) => {
        $(impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        })*
    };
}

display_as_str!(Tempo, Complexity, Attitude, RhymeScheme);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RapStyle {
    pub tempo: Tempo,
    pub complexity: Complexity,
    pub attitude: Attitude,
    #[serde(rename = "rhymeScheme")]
    pub rhyme_scheme: RhymeScheme,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoiceSettings {
    pub stability: f32,
    pub similarity_boost: f32,
    pub style: f32,
    pub use_speaker_boost: bool,
}

impl Default for VoiceSettings {
    fn default() -> Self {
        Self {
            stability: 0.75,
            similarity_boost: 0.8,
            style: 0.4,
            use_speaker_boost: true,
        }
    }
}

/// Synthesis voice for a character. Rows written without one deserialize to an
/// empty voice id, which the synthesizer refuses.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct VoiceConfig {
    #[serde(default)]
    pub voice_id: String,
    #[serde(default)]
    pub settings: VoiceSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Character {
    pub id: Uuid,
    /// None for shared default characters
    #[serde(default)]
    pub user_id: Option<Uuid>,
    pub name: String,
    pub description: String,
    #[serde(deserialize_with = "json_or_string")]
    pub style: RapStyle,
    pub personality: String,
    #[serde(default)]
    pub signature: Vec<String>,
    #[serde(deserialize_with = "json_or_string")]
    pub voice_settings: VoiceConfig,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    pub created_at: DateTime<Utc>,
}

impl Character {
    /// Default characters are visible to everyone, the rest only to their owner.
    pub fn is_visible_to(&self, user_id: Uuid) -> bool {
        self.is_default || self.user_id == Some(user_id)
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateCharacterRequest {
    pub name: String,
    pub description: String,
    pub style: RapStyle,
    pub personality: String,
    #[serde(default)]
    pub signature: Vec<String>,
    pub voice_settings: VoiceConfig,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Characters available to a user, newest first.
#[derive(Serialize, Deserialize, Clone, Debug, Default)]
pub struct CharacterRoster {
    pub defaults: Vec<Character>,
    pub owned: Vec<Character>,
}
