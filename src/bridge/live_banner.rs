use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::watch;
use tracing::{debug, warn};

use crate::config::BANNER_LIFETIME;
use crate::model::LiveBannerData;

type BannerCallback = Arc<dyn Fn(LiveBannerData) + Send + Sync>;

/// Single-slot registry connecting banner producers to the one banner host.
#[derive(Clone, Default)]
pub struct LiveBannerBridge {
    slot: Arc<Mutex<Option<BannerCallback>>>,
}

impl LiveBannerBridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Install `callback` as the banner host, replacing any previous one.
    pub fn register<F>(&self, callback: F)
    where
        F: Fn(LiveBannerData) + Send + Sync + 'static,
    {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(Arc::new(callback));
    }

    pub fn unregister(&self) {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner).take();
    }

    pub fn is_registered(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Hand `data` to the registered host. Without a host the banner is dropped
    /// and `false` is returned.
    pub fn show(&self, data: LiveBannerData) -> bool {
        let callback = self
            .slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        match callback {
            Some(callback) => {
                callback(data);
                true
            }
            None => {
                debug!(match_id = %data.match_id, "no banner host registered, dropping banner");
                false
            }
        }
    }
}

impl std::fmt::Debug for LiveBannerBridge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LiveBannerBridge")
            .field("registered", &self.is_registered())
            .finish()
    }
}

/// The rendering side of the banner: holds the banner on screen and dismisses
/// it once its lifetime elapses. A newer banner replaces the current one and
/// restarts the timer.
#[derive(Clone)]
pub struct BannerHost {
    current: Arc<watch::Sender<Option<LiveBannerData>>>,
    generation: Arc<AtomicU64>,
    lifetime: Duration,
}

impl Default for BannerHost {
    fn default() -> Self {
        Self::new(BANNER_LIFETIME)
    }
}

impl BannerHost {
    pub fn new(lifetime: Duration) -> Self {
        Self {
            current: Arc::new(watch::Sender::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
            lifetime,
        }
    }

    /// Register this host on `bridge`.
    pub fn attach(&self, bridge: &LiveBannerBridge) {
        let host = self.clone();
        bridge.register(move |data| host.present(data));
    }

    pub fn current(&self) -> Option<LiveBannerData> {
        self.current.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<Option<LiveBannerData>> {
        self.current.subscribe()
    }

    pub fn present(&self, data: LiveBannerData) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.current.send_replace(Some(data));

        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            warn!("no tokio runtime, banner will not auto-dismiss");
            return;
        };
        let host = self.clone();
        runtime.spawn(async move {
            tokio::time::sleep(host.lifetime).await;
            if host.generation.load(Ordering::SeqCst) == generation {
                host.dismiss();
            }
        });
    }

    pub fn dismiss(&self) {
        self.current.send_if_modified(|current| current.take().is_some());
    }
}

impl std::fmt::Debug for BannerHost {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BannerHost")
            .field("showing", &self.current.borrow().is_some())
            .field("lifetime", &self.lifetime)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::model::MatchEventType;

    fn banner(match_id: &str, home_score: u32) -> LiveBannerData {
        LiveBannerData {
            match_id: match_id.to_string(),
            event_type: MatchEventType::Goal,
            title: "GOAL!".into(),
            subtitle: None,
            home_team_name: "Harbor FC".into(),
            away_team_name: "Mill Town".into(),
            home_team_logo: None,
            away_team_logo: None,
            home_score,
            away_score: 0,
            minute: Some(12),
        }
    }

    #[test]
    fn show_without_host_is_dropped() {
        let bridge = LiveBannerBridge::new();
        assert!(!bridge.show(banner("m1", 1)));
    }

    #[test]
    fn second_register_replaces_first() {
        let bridge = LiveBannerBridge::new();
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        {
            let first = first.clone();
            bridge.register(move |_| {
                first.fetch_add(1, Ordering::SeqCst);
            });
        }
        {
            let second = second.clone();
            bridge.register(move |_| {
                second.fetch_add(1, Ordering::SeqCst);
            });
        }

        assert!(bridge.show(banner("m1", 1)));
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        bridge.unregister();
        assert!(!bridge.show(banner("m1", 2)));
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn host_dismisses_after_lifetime() {
        let bridge = LiveBannerBridge::new();
        let host = BannerHost::default();
        host.attach(&bridge);

        bridge.show(banner("m1", 1));
        assert_eq!(host.current().map(|b| b.home_score), Some(1));

        tokio::time::sleep(Duration::from_secs(5)).await;
        assert!(host.current().is_some());

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert!(host.current().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn newer_banner_restarts_timer() {
        let host = BannerHost::new(Duration::from_secs(6));
        host.present(banner("m1", 1));
        tokio::time::sleep(Duration::from_secs(4)).await;
        host.present(banner("m1", 2));
        tokio::time::sleep(Duration::from_secs(4)).await;

        assert_eq!(host.current().map(|b| b.home_score), Some(2));

        tokio::time::sleep(Duration::from_secs(3)).await;
        assert!(host.current().is_none());
    }
}
