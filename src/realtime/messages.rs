use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;

use crate::error::{LiveScoreError, Result};
use crate::model::{MatchEvent, MatchPatch, MatchStatus, Team};

/// Names of the events the server pushes to us.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::EnumString, strum_macros::Display)]
pub enum InboundEvent {
    #[strum(serialize = "global:event")]
    GlobalEvent,
    #[strum(serialize = "global:match:started")]
    GlobalMatchStarted,
    #[strum(serialize = "global:match:ended")]
    GlobalMatchEnded,
    #[strum(serialize = "match:event")]
    MatchEvent,
    #[strum(serialize = "match:event:deleted")]
    MatchEventDeleted,
    #[strum(serialize = "match:status")]
    MatchStatus,
    #[strum(serialize = "match:minute")]
    MatchMinute,
}

impl InboundEvent {
    /// Global events are handled for the whole lifetime of a connection;
    /// the others only while a match is joined.
    pub fn is_global(self) -> bool {
        matches!(
            self,
            InboundEvent::GlobalEvent
                | InboundEvent::GlobalMatchStarted
                | InboundEvent::GlobalMatchEnded
        )
    }
}

/// `global:event` payload: a score/clock patch, optionally with the event that caused it.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GlobalEventPayload {
    #[serde(flatten)]
    pub patch: MatchPatch,
    #[serde(default)]
    pub event: Option<MatchEvent>,
    #[serde(default)]
    pub home_team: Option<Team>,
    #[serde(default)]
    pub away_team: Option<Team>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDeleted {
    pub match_id: String,
    pub event_id: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub match_id: String,
    pub status: MatchStatus,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinuteUpdate {
    pub match_id: String,
    pub minute: u16,
}

/// A decoded server push.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    GlobalEvent(Box<GlobalEventPayload>),
    MatchStarted(MatchPatch),
    MatchEnded(MatchPatch),
    EventAdded(Box<MatchEvent>),
    EventDeleted(EventDeleted),
    Status(StatusUpdate),
    Minute(MinuteUpdate),
}

impl ServerMessage {
    /// Decode an event by name. Returns `Ok(None)` for names we do not handle.
    pub fn parse(name: &str, data: Value) -> Result<Option<ServerMessage>> {
        let Ok(kind) = InboundEvent::from_str(name) else {
            return Ok(None);
        };
        let decode_err = |e: serde_json::Error| {
            LiveScoreError::Protocol(format!("malformed '{name}' payload: {e}"))
        };
        let message = match kind {
            InboundEvent::GlobalEvent => {
                ServerMessage::GlobalEvent(Box::new(serde_json::from_value(data).map_err(decode_err)?))
            }
            InboundEvent::GlobalMatchStarted => {
                ServerMessage::MatchStarted(serde_json::from_value(data).map_err(decode_err)?)
            }
            InboundEvent::GlobalMatchEnded => {
                ServerMessage::MatchEnded(serde_json::from_value(data).map_err(decode_err)?)
            }
            InboundEvent::MatchEvent => {
                ServerMessage::EventAdded(Box::new(serde_json::from_value(data).map_err(decode_err)?))
            }
            InboundEvent::MatchEventDeleted => {
                ServerMessage::EventDeleted(serde_json::from_value(data).map_err(decode_err)?)
            }
            InboundEvent::MatchStatus => {
                ServerMessage::Status(serde_json::from_value(data).map_err(decode_err)?)
            }
            InboundEvent::MatchMinute => {
                ServerMessage::Minute(serde_json::from_value(data).map_err(decode_err)?)
            }
        };
        Ok(Some(message))
    }

    pub fn kind(&self) -> InboundEvent {
        match self {
            ServerMessage::GlobalEvent(_) => InboundEvent::GlobalEvent,
            ServerMessage::MatchStarted(_) => InboundEvent::GlobalMatchStarted,
            ServerMessage::MatchEnded(_) => InboundEvent::GlobalMatchEnded,
            ServerMessage::EventAdded(_) => InboundEvent::MatchEvent,
            ServerMessage::EventDeleted(_) => InboundEvent::MatchEventDeleted,
            ServerMessage::Status(_) => InboundEvent::MatchStatus,
            ServerMessage::Minute(_) => InboundEvent::MatchMinute,
        }
    }
}

/// Messages we emit to the server.
#[derive(Debug, Clone, PartialEq, Eq, strum_macros::IntoStaticStr)]
pub enum ClientMessage {
    #[strum(serialize = "match:join")]
    JoinMatch(String),
    #[strum(serialize = "match:leave")]
    LeaveMatch(String),
    #[strum(serialize = "livefeed:join")]
    JoinLiveFeed,
    #[strum(serialize = "livefeed:leave")]
    LeaveLiveFeed,
}

impl ClientMessage {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn payload(&self) -> Value {
        match self {
            ClientMessage::JoinMatch(id) | ClientMessage::LeaveMatch(id) => {
                Value::String(id.clone())
            }
            ClientMessage::JoinLiveFeed | ClientMessage::LeaveLiveFeed => Value::Null,
        }
    }
}
