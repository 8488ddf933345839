use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::event::MatchEvent;
use super::team::{Competition, Lineups, Team};

/// A match as cached client-side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    #[serde(default)]
    pub competition: Option<Competition>,
    pub home_team: Team,
    pub away_team: Team,
    pub start_time: DateTime<Utc>,
    pub status: MatchStatus,
    #[serde(default)]
    pub home_score: u32,
    #[serde(default)]
    pub away_score: u32,
    #[serde(default)]
    pub current_minute: Option<u16>,
    #[serde(default)]
    pub live_started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub events: Option<Vec<MatchEvent>>,
    #[serde(default)]
    pub lineups: Option<Lineups>,
    /// Aggregate stats; the shape is owned by the API.
    #[serde(default)]
    pub stats: Option<serde_json::Value>,
}

impl Match {
    /// Return a copy of this match with every field present in `patch` overwritten.
    pub fn patched(&self, patch: &MatchPatch) -> Match {
        let mut next = self.clone();
        if let Some(home_score) = patch.home_score {
            next.home_score = home_score;
        }
        if let Some(away_score) = patch.away_score {
            next.away_score = away_score;
        }
        if let Some(status) = patch.status {
            next.status = status;
        }
        if let Some(minute) = patch.current_minute {
            next.current_minute = Some(minute);
        }
        if let Some(started) = patch.live_started_at {
            next.live_started_at = Some(started);
        }
        next
    }
}

/// Lifecycle status of a match. The client mirrors whatever the server sends.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Halftime,
    Finished,
}

/// A partial update of a match. Absent fields are left untouched when applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchPatch {
    #[serde(alias = "matchId")]
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub home_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub away_score: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<MatchStatus>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_minute: Option<u16>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub live_started_at: Option<DateTime<Utc>>,
}

impl MatchPatch {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_score(mut self, home: u32, away: u32) -> Self {
        self.home_score = Some(home);
        self.away_score = Some(away);
        self
    }

    pub fn with_status(mut self, status: MatchStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_minute(mut self, minute: u16) -> Self {
        self.current_minute = Some(minute);
        self
    }

    /// True when the patch carries nothing but the id.
    pub fn is_empty(&self) -> bool {
        self.home_score.is_none()
            && self.away_score.is_none()
            && self.status.is_none()
            && self.current_minute.is_none()
            && self.live_started_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_match;

    #[test]
    fn patch_overwrites_only_present_fields() {
        let mut original = sample_match("m1");
        original.status = MatchStatus::Live;
        original.home_score = 1;
        original.current_minute = Some(30);

        let patched = original.patched(&MatchPatch::new("m1").with_score(2, 0));

        assert_eq!(patched.home_score, 2);
        assert_eq!(patched.away_score, 0);
        assert_eq!(patched.status, MatchStatus::Live);
        assert_eq!(patched.current_minute, Some(30));
        assert_eq!(patched.home_team, original.home_team);
    }

    #[test]
    fn patch_accepts_match_id_alias() {
        let patch: MatchPatch =
            serde_json::from_str(r#"{"matchId":"m9","status":"halftime"}"#).unwrap();
        assert_eq!(patch.id, "m9");
        assert_eq!(patch.status, Some(MatchStatus::Halftime));
        assert!(patch.home_score.is_none());
        assert!(!patch.is_empty());
    }

    #[test]
    fn match_decodes_camel_case_payload() {
        let json = r#"{
            "id": "m1",
            "homeTeam": {"id": "t1", "name": "Harbor FC"},
            "awayTeam": {"id": "t2", "name": "Mill Town", "logoUrl": "https://cdn/t2.png"},
            "startTime": "2026-10-19T18:00:00Z",
            "status": "scheduled"
        }"#;
        let decoded: Match = serde_json::from_str(json).unwrap();
        assert_eq!(decoded.home_score, 0);
        assert_eq!(decoded.status, MatchStatus::Scheduled);
        assert!(decoded.events.is_none());
        assert_eq!(decoded.away_team.logo_url.as_deref(), Some("https://cdn/t2.png"));
    }
}
