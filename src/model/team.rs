use serde::{Deserialize, Serialize};

/// A team reference embedded in a match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub short_name: Option<String>,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// The competition (league, cup) a match belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Competition {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub logo_url: Option<String>,
}

/// A player reference as it appears in events and lineups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerRef {
    pub id: String,
    pub name: String,
}

/// Both sides' lineups.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lineups {
    #[serde(default)]
    pub home: Vec<LineupEntry>,
    #[serde(default)]
    pub away: Vec<LineupEntry>,
}

/// One player in a lineup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupEntry {
    pub player: PlayerRef,
    #[serde(default)]
    pub position: Option<String>,
    #[serde(default)]
    pub shirt_number: Option<u8>,
    #[serde(default)]
    pub is_starter: bool,
}
