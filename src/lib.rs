//! Client-side realtime layer for the live-score app: REST fetches, a
//! Socket.IO connection that patches cached matches, and the bridges that
//! fan those updates out to the rest of the app.

pub use api::ApiClient;
pub use bridge::{BannerHost, LiveBannerBridge, MatchUpdateBridge, Subscription};
pub use client::LiveScoreClient;
pub use config::ClientConfig;
pub use error::{LiveScoreError, Result};
pub use model::*;
pub use realtime::ConnectionManager;
pub use storage::{LocalStorage, Preferences, SessionStore};
pub use store::{Cart, FetchOutcome, MatchStore, MatchViews, StoreCatalog};

pub mod api;
pub mod bridge;
mod client;
pub mod config;
pub mod error;
pub mod model;
pub mod realtime;
pub mod storage;
pub mod store;

#[cfg(test)]
mod test_support;
