use crate::dbs::{Database, DbResult};
use chrono::Utc;
use shared::models::*;
use uuid::Uuid;

struct StockCharacter {
    name: &'static str,
    description: &'static str,
    personality: &'static str,
    style: RapStyle,
    signature: &'static [&'static str],
    voice_id: &'static str,
    settings: VoiceSettings,
}

const STOCK_CHARACTERS: [StockCharacter; 4] = [
    StockCharacter {
        name: "Street Rapper",
        description: "Raw bars straight from the block",
        personality: "Confrontational, proud of where they came from, never backs down",
        style: RapStyle {
            tempo: Tempo::Fast,
            complexity: Complexity::Moderate,
            attitude: Attitude::Aggressive,
            rhyme_scheme: RhymeScheme::Aabb,
        },
        signature: &["straight outta nowhere", "real recognize real"],
        voice_id: "21m00Tcm4TlvDq8ikWAM",
        settings: VoiceSettings {
            stability: 0.75,
            similarity_boost: 0.8,
            style: 0.4,
            use_speaker_boost: true,
        },
    },
    StockCharacter {
        name: "Conscious Rapper",
        description: "Wordsmith with a message",
        personality: "Thoughtful and political, wins with ideas rather than insults",
        style: RapStyle {
            tempo: Tempo::Medium,
            complexity: Complexity::Complex,
            attitude: Attitude::Conscious,
            rhyme_scheme: RhymeScheme::Abab,
        },
        signature: &["wake up", "knowledge is the weapon"],
        voice_id: "AZnzlk1XvdvUeBnXmlld",
        settings: VoiceSettings {
            stability: 0.85,
            similarity_boost: 0.9,
            style: 0.2,
            use_speaker_boost: false,
        },
    },
    StockCharacter {
        name: "Comedy Rapper",
        description: "Punchlines first, questions later",
        personality: "Goofy, self-deprecating, roasts everyone including the crowd",
        style: RapStyle {
            tempo: Tempo::Medium,
            complexity: Complexity::Simple,
            attitude: Attitude::Humorous,
            rhyme_scheme: RhymeScheme::Abcb,
        },
        signature: &["no cap, all jokes", "your mama's favourite MC"],
        voice_id: "ErXwobaYiN019PkySvjV",
        settings: VoiceSettings {
            stability: 0.6,
            similarity_boost: 0.7,
            style: 0.8,
            use_speaker_boost: true,
        },
    },
    StockCharacter {
        name: "Battle Veteran",
        description: "Decades on the circuit, undefeated in the cipher",
        personality: "Calm, surgical, dismantles opponents with multisyllabic schemes",
        style: RapStyle {
            tempo: Tempo::Slow,
            complexity: Complexity::Complex,
            attitude: Attitude::Technical,
            rhyme_scheme: RhymeScheme::Complex,
        },
        signature: &["been here before", "class is in session"],
        voice_id: "VR6AewLTigWG4xSOukaG",
        settings: VoiceSettings {
            stability: 0.9,
            similarity_boost: 0.95,
            style: 0.1,
            use_speaker_boost: false,
        },
    },
];

fn to_character(stock: &StockCharacter) -> Character {
    Character {
        id: Uuid::new_v4(),
        user_id: None,
        name: stock.name.to_string(),
        description: stock.description.to_string(),
        style: stock.style,
        personality: stock.personality.to_string(),
        signature: stock.signature.iter().map(|s| s.to_string()).collect(),
        voice_settings: VoiceConfig {
            voice_id: stock.voice_id.to_string(),
            settings: stock.settings,
        },
        avatar_url: None,
        is_default: true,
        created_at: Utc::now(),
    }
}

/// Inserts the stock default characters unless the store already has defaults.
/// Returns how many were added.
pub async fn seed_default_characters(db: &dyn Database) -> DbResult<usize> {
    let existing = db.get_characters(None).await?;
    if existing.iter().any(|c| c.is_default) {
        return Ok(0);
    }
    for stock in &STOCK_CHARACTERS {
        db.create_character(to_character(stock)).await?;
    }
    tracing::info!("Seeded {} default characters", STOCK_CHARACTERS.len());
    Ok(STOCK_CHARACTERS.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dbs::local::LocalDatabase;

    #[tokio::test]
    async fn seeding_is_idempotent() {
        let db = LocalDatabase::in_memory();
        assert_eq!(seed_default_characters(&db).await.unwrap(), 4);
        assert_eq!(seed_default_characters(&db).await.unwrap(), 0);

        let characters = db.get_characters(None).await.unwrap();
        assert_eq!(characters.len(), 4);
        assert!(characters.iter().all(|c| c.is_default && c.user_id.is_none()));
        assert!(
            characters
                .iter()
                .any(|c| c.voice_settings.voice_id == "VR6AewLTigWG4xSOukaG")
        );
    }
}
