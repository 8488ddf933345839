use std::sync::Arc;

use itertools::Itertools;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use crate::api::ApiClient;
use crate::bridge::MatchUpdateBridge;
use crate::error::Result;
use crate::model::{Match, MatchEvent, MatchPatch};

/// Everything the UI knows about matches right now.
///
/// The four views are independent copies; each is behind its own `Arc` so a
/// view that an update does not touch keeps its identity.
#[derive(Debug, Clone, Default)]
pub struct MatchViews {
    pub matches: Arc<Vec<Match>>,
    pub live_matches: Arc<Vec<Match>>,
    pub featured_match: Option<Arc<Match>>,
    pub current_match: Option<Arc<Match>>,
    pub loading: bool,
    pub error: Option<String>,
}

/// Observable, in-memory authority for the matches shown by the UI.
///
/// All mutation goes through the store's own methods; readers either take a
/// [`MatchStore::snapshot`] or watch [`MatchStore::subscribe`].
#[derive(Clone)]
pub struct MatchStore {
    api: ApiClient,
    state: Arc<watch::Sender<MatchViews>>,
    updates: MatchUpdateBridge,
}

impl MatchStore {
    pub fn new(api: ApiClient, updates: MatchUpdateBridge) -> Self {
        Self {
            api,
            state: Arc::new(watch::Sender::new(MatchViews::default())),
            updates,
        }
    }

    pub fn snapshot(&self) -> MatchViews {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MatchViews> {
        self.state.subscribe()
    }

    pub fn updates(&self) -> &MatchUpdateBridge {
        &self.updates
    }

    /// Replace the generic list with `GET /matches`.
    #[instrument(skip(self))]
    pub async fn fetch_matches(&self) -> Result<()> {
        self.begin_loading();
        let result = self.api.get_matches().await;
        self.finish(result, |views, matches| views.matches = Arc::new(matches))
    }

    /// Replace the live list with `GET /matches/live`.
    #[instrument(skip(self))]
    pub async fn fetch_live_matches(&self) -> Result<()> {
        self.begin_loading();
        let result = self.api.get_live_matches().await;
        self.finish(result, |views, matches| {
            views.live_matches = Arc::new(matches)
        })
    }

    #[instrument(skip(self))]
    pub async fn fetch_featured_match(&self) -> Result<()> {
        self.begin_loading();
        let result = self.api.get_featured_match().await;
        self.finish(result, |views, featured| {
            views.featured_match = featured.map(Arc::new)
        })
    }

    /// Load the detail-screen match.
    #[instrument(skip(self))]
    pub async fn fetch_match_by_id(&self, id: &str) -> Result<()> {
        self.begin_loading();
        let result = self.api.get_match(id).await;
        self.finish(result, |views, found| {
            views.current_match = Some(Arc::new(found))
        })
    }

    /// Apply a partial update to every view that already holds the match,
    /// then forward it on the update bridge.
    pub fn update_match_from_socket(&self, patch: &MatchPatch) {
        let touched =
            !patch.is_empty() && self.state.send_if_modified(|views| apply_patch(views, patch));
        debug!(match_id = %patch.id, touched, "applied socket patch");
        self.updates.emit(patch);
    }

    /// Prepend `event` to the detail-screen match when it is the same match.
    pub fn add_event_to_match(&self, event: MatchEvent) {
        self.state.send_if_modified(|views| {
            let Some(current) = views.current_match.as_ref() else {
                return false;
            };
            if current.id != event.match_id {
                return false;
            }
            let existing = current.events.as_deref().unwrap_or_default();
            if existing.iter().any(|e| e.id == event.id) {
                debug!(event_id = %event.id, "event already known, ignoring");
                return false;
            }
            let mut next = Match::clone(current);
            let events = std::iter::once(event.clone())
                .chain(existing.iter().cloned())
                .collect_vec();
            next.events = Some(events);
            views.current_match = Some(Arc::new(next));
            true
        });
    }

    /// Drop the event with `event_id` from the detail-screen match.
    pub fn remove_event_from_match(&self, match_id: &str, event_id: &str) {
        self.state.send_if_modified(|views| {
            let Some(current) = views.current_match.as_ref() else {
                return false;
            };
            if current.id != match_id {
                return false;
            }
            let Some(events) = current.events.as_ref() else {
                return false;
            };
            let Some((index, _)) = events.iter().find_position(|e| e.id == event_id) else {
                return false;
            };
            let mut next = Match::clone(current);
            if let Some(events) = next.events.as_mut() {
                events.remove(index);
            }
            views.current_match = Some(Arc::new(next));
            true
        });
    }

    /// Show `found` on the detail screen right away, e.g. the list entry that was tapped.
    pub fn set_current_match(&self, found: Option<Match>) {
        self.state.send_modify(|views| {
            views.current_match = found.map(Arc::new);
        });
    }

    pub fn clear_current_match(&self) {
        self.state
            .send_if_modified(|views| views.current_match.take().is_some());
    }

    pub fn clear_error(&self) {
        self.state.send_if_modified(|views| views.error.take().is_some());
    }

    /// Forget everything, e.g. on sign-out.
    pub fn reset(&self) {
        self.state.send_replace(MatchViews::default());
    }

    /// The freshest copy of match `id` in any view, detail screen first.
    pub fn find_match(&self, id: &str) -> Option<Match> {
        let views = self.state.borrow();
        let found = views
            .current_match
            .iter()
            .chain(views.featured_match.iter())
            .map(|m| m.as_ref())
            .chain(views.live_matches.iter())
            .chain(views.matches.iter())
            .find(|m| m.id == id)
            .cloned();
        found
    }

    fn begin_loading(&self) {
        self.state.send_modify(|views| {
            views.loading = true;
            views.error = None;
        });
    }

    fn finish<T>(&self, result: Result<T>, apply: impl FnOnce(&mut MatchViews, T)) -> Result<()> {
        match result {
            Ok(value) => {
                self.state.send_modify(|views| {
                    apply(views, value);
                    views.loading = false;
                });
                Ok(())
            }
            Err(err) => {
                warn!(error = %err, "match fetch failed");
                let message = err.to_string();
                self.state.send_modify(|views| {
                    views.loading = false;
                    views.error = Some(message);
                });
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for MatchStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MatchStore")
            .field("api", &self.api.base_url())
            .finish_non_exhaustive()
    }
}

/// Rewrite only the views containing `patch.id`. Returns whether anything changed.
fn apply_patch(views: &mut MatchViews, patch: &MatchPatch) -> bool {
    let mut touched = patch_list(&mut views.matches, patch);
    touched |= patch_list(&mut views.live_matches, patch);
    touched |= patch_slot(&mut views.featured_match, patch);
    touched |= patch_slot(&mut views.current_match, patch);
    touched
}

fn patch_list(list: &mut Arc<Vec<Match>>, patch: &MatchPatch) -> bool {
    if !list.iter().any(|m| m.id == patch.id) {
        return false;
    }
    let next = list
        .iter()
        .map(|m| {
            if m.id == patch.id {
                m.patched(patch)
            } else {
                m.clone()
            }
        })
        .collect_vec();
    *list = Arc::new(next);
    true
}

fn patch_slot(slot: &mut Option<Arc<Match>>, patch: &MatchPatch) -> bool {
    let next = match slot {
        Some(current) if current.id == patch.id => current.patched(patch),
        _ => return false,
    };
    *slot = Some(Arc::new(next));
    true
}
