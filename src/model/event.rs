use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::team::PlayerRef;

/// A single timeline entry of a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub id: String,
    pub match_id: String,
    pub minute: u16,
    /// Stoppage-time offset, e.g. `3` for 90+3.
    #[serde(default)]
    pub extra_minute: Option<u16>,
    #[serde(rename = "type")]
    pub event_type: MatchEventType,
    #[serde(default)]
    pub team_id: Option<String>,
    #[serde(default)]
    pub player: Option<PlayerRef>,
    #[serde(default)]
    pub secondary_player: Option<PlayerRef>,
    #[serde(default)]
    pub position_x: Option<f32>,
    #[serde(default)]
    pub position_y: Option<f32>,
    pub created_at: DateTime<Utc>,
}

impl MatchEvent {
    /// Minute label as shown on a timeline, e.g. `45'` or `90+3'`.
    pub fn minute_label(&self) -> String {
        match self.extra_minute {
            Some(extra) if extra > 0 => format!("{}+{}'", self.minute, extra),
            _ => format!("{}'", self.minute),
        }
    }
}

/// The kind of a match event.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum MatchEventType {
    Goal,
    OwnGoal,
    PenaltyGoal,
    PenaltyMissed,
    YellowCard,
    SecondYellow,
    RedCard,
    Substitution,
    VarDecision,
    Injury,
    #[serde(other)]
    Other,
}

impl MatchEventType {
    pub fn is_goal(self) -> bool {
        matches!(
            self,
            MatchEventType::Goal | MatchEventType::OwnGoal | MatchEventType::PenaltyGoal
        )
    }

    /// Events worth interrupting the user with a live banner.
    pub fn is_headline(self) -> bool {
        self.is_goal() || matches!(self, MatchEventType::RedCard | MatchEventType::SecondYellow)
    }
}
