use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleStatus {
    Pending,
    Active,
    Completed,
}

impl BattleStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BattleStatus::Pending => "pending",
            BattleStatus::Active => "active",
            BattleStatus::Completed => "completed",
        }
    }

    /// Status only ever moves forward, and nothing leaves `Completed`.
    pub fn can_become(&self, next: BattleStatus) -> bool {
        match (self, next) {
            (BattleStatus::Completed, _) => false,
            (_, BattleStatus::Pending) => false,
            _ => true,
        }
    }
}

impl fmt::Display for BattleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BattleStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(BattleStatus::Pending),
            "active" => Ok(BattleStatus::Active),
            "completed" => Ok(BattleStatus::Completed),
            other => Err(format!("unknown battle status: {other}")),
        }
    }
}

/// One generated verse. Stored inline in the battle row, in generation order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Verse {
    pub character_id: Uuid,
    pub verse: String,
    /// Always within 1..=10
    pub score: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio_url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Battle {
    pub id: Uuid,
    pub user1_id: Uuid,
    pub user2_id: Uuid,
    pub character1_id: Uuid,
    pub character2_id: Uuid,
    pub topic: String,
    #[serde(default)]
    pub verses: Vec<Verse>,
    #[serde(default)]
    pub winner_id: Option<Uuid>,
    #[serde(default)]
    pub winner_character_id: Option<Uuid>,
    pub status: BattleStatus,
    pub created_at: DateTime<Utc>,
}

impl Battle {
    pub fn has_participant(&self, user_id: Uuid) -> bool {
        self.user1_id == user_id || self.user2_id == user_id
    }

    /// The other character in this battle, if `character_id` is one of the two.
    pub fn opponent_of(&self, character_id: Uuid) -> Option<Uuid> {
        if character_id == self.character1_id {
            Some(self.character2_id)
        } else if character_id == self.character2_id {
            Some(self.character1_id)
        } else {
            None
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateBattleRequest {
    /// The challenger's character
    pub character_id: Uuid,
    pub opponent_id: Uuid,
    pub topic: String,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct GenerateVerseRequest {
    pub character_id: Uuid,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct BattleOutcome {
    pub battle_id: Uuid,
    pub winner_id: Uuid,
    pub winner_character_id: Uuid,
    pub character1_average: f64,
    pub character2_average: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct VerseTurn {
    pub index: usize,
    pub verse: Verse,
    /// Present when this verse used up the battle's verse budget
    #[serde(default)]
    pub outcome: Option<BattleOutcome>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_never_moves_backward() {
        assert!(BattleStatus::Pending.can_become(BattleStatus::Active));
        assert!(BattleStatus::Active.can_become(BattleStatus::Completed));
        assert!(!BattleStatus::Completed.can_become(BattleStatus::Active));
        assert!(!BattleStatus::Active.can_become(BattleStatus::Pending));
        assert!(!BattleStatus::Completed.can_become(BattleStatus::Completed));
    }

    #[test]
    fn status_round_trips_through_text() {
        for status in [
            BattleStatus::Pending,
            BattleStatus::Active,
            BattleStatus::Completed,
        ] {
            assert_eq!(status.as_str().parse::<BattleStatus>(), Ok(status));
        }
        assert!("finished".parse::<BattleStatus>().is_err());
    }
}
