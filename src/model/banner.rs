use serde::{Deserialize, Serialize};

use super::event::MatchEventType;

/// What a live banner shows. Only one is on screen at a time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveBannerData {
    pub match_id: String,
    pub event_type: MatchEventType,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    pub home_team_name: String,
    pub away_team_name: String,
    #[serde(default)]
    pub home_team_logo: Option<String>,
    #[serde(default)]
    pub away_team_logo: Option<String>,
    pub home_score: u32,
    pub away_score: u32,
    #[serde(default)]
    pub minute: Option<u16>,
}
