use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use tracing::{debug, instrument, warn};

use crate::api::ApiClient;
use crate::config::CATALOG_COOLDOWN;
use crate::error::{LiveScoreError, Result};
use crate::model::{StoreOverview, StoreShell};

/// What a guarded fetch ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// A request went out and the cache was refreshed.
    Fetched,
    /// The last successful fetch is younger than the cooldown.
    Fresh,
    /// An identical fetch is already running.
    InFlight,
}

#[derive(Debug, Default)]
struct Slot<T> {
    value: T,
    fetched_at: Option<Instant>,
    last_fetched: Option<DateTime<Utc>>,
}

#[derive(Debug, Default)]
struct CatalogState {
    shell: Slot<StoreShell>,
    overview: Slot<StoreOverview>,
    error: Option<String>,
}

/// TTL-gated read cache over the store catalog endpoints.
#[derive(Debug, Clone)]
pub struct StoreCatalog {
    api: ApiClient,
    cooldown: Duration,
    state: Arc<Mutex<CatalogState>>,
    shell_in_flight: Arc<AtomicBool>,
    overview_in_flight: Arc<AtomicBool>,
}

/// Clears an in-flight flag when the fetch finishes, however it finishes.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| InFlight(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl StoreCatalog {
    pub fn new(api: ApiClient) -> Self {
        Self::with_cooldown(api, CATALOG_COOLDOWN)
    }

    pub fn with_cooldown(api: ApiClient, cooldown: Duration) -> Self {
        Self {
            api,
            cooldown,
            state: Arc::new(Mutex::new(CatalogState::default())),
            shell_in_flight: Arc::new(AtomicBool::new(false)),
            overview_in_flight: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn shell(&self) -> StoreShell {
        self.lock().shell.value.clone()
    }

    pub fn overview(&self) -> StoreOverview {
        self.lock().overview.value.clone()
    }

    pub fn error(&self) -> Option<String> {
        self.lock().error.clone()
    }

    pub fn shell_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.lock().shell.last_fetched
    }

    pub fn overview_fetched_at(&self) -> Option<DateTime<Utc>> {
        self.lock().overview.last_fetched
    }

    /// Refresh categories and banners unless fresh or already loading.
    #[instrument(skip(self))]
    pub async fn fetch_shell(&self, force: bool) -> Result<FetchOutcome> {
        if !force && self.is_fresh(|s| s.shell.fetched_at) {
            return Ok(FetchOutcome::Fresh);
        }
        let Some(_guard) = InFlight::acquire(&self.shell_in_flight) else {
            return Ok(FetchOutcome::InFlight);
        };

        let result = async {
            let categories = self.api.get_categories().await?;
            let banners = self.api.get_store_banners().await?;
            Ok::<_, LiveScoreError>(StoreShell {
                categories,
                banners,
            })
        }
        .await;
        self.store(result, |state, shell| {
            debug!(
                categories = shell.categories.len(),
                banners = shell.banners.len(),
                "store shell refreshed"
            );
            stamp(&mut state.shell, shell);
        })
    }

    /// Refresh the product overview unless fresh or already loading.
    #[instrument(skip(self))]
    pub async fn fetch_overview(&self, force: bool) -> Result<FetchOutcome> {
        if !force && self.is_fresh(|s| s.overview.fetched_at) {
            return Ok(FetchOutcome::Fresh);
        }
        let Some(_guard) = InFlight::acquire(&self.overview_in_flight) else {
            return Ok(FetchOutcome::InFlight);
        };

        let result = self.api.get_products().await.map(StoreOverview::from_products);
        self.store(result, |state, overview| {
            debug!(
                products = overview.products.len(),
                featured = overview.featured.len(),
                "store overview refreshed"
            );
            stamp(&mut state.overview, overview);
        })
    }

    fn is_fresh(&self, fetched_at: impl FnOnce(&CatalogState) -> Option<Instant>) -> bool {
        fetched_at(&*self.lock()).is_some_and(|at| at.elapsed() < self.cooldown)
    }

    fn store<T>(
        &self,
        result: Result<T>,
        apply: impl FnOnce(&mut CatalogState, T),
    ) -> Result<FetchOutcome> {
        let mut state = self.lock();
        match result {
            Ok(value) => {
                apply(&mut state, value);
                state.error = None;
                Ok(FetchOutcome::Fetched)
            }
            Err(err) => {
                warn!(error = %err, "store catalog fetch failed");
                state.error = Some(err.to_string());
                Err(err)
            }
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn stamp<T>(slot: &mut Slot<T>, value: T) {
    slot.value = value;
    slot.fetched_at = Some(Instant::now());
    slot.last_fetched = Some(Utc::now());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::MockApi;

    #[tokio::test]
    async fn test_overview_cooldown_skips_second_fetch() {
        let api = MockApi::spawn().await;
        let catalog = StoreCatalog::new(ApiClient::new(api.base_url()));

        assert_eq!(catalog.fetch_overview(false).await.unwrap(), FetchOutcome::Fetched);
        assert_eq!(catalog.fetch_overview(false).await.unwrap(), FetchOutcome::Fresh);

        assert_eq!(api.hits("/store/products"), 1);
        let overview = catalog.overview();
        assert_eq!(overview.products.len(), 2);
        assert_eq!(overview.featured.len(), 1);
        assert!(catalog.overview_fetched_at().is_some());
    }

    #[tokio::test]
    async fn test_force_bypasses_cooldown() {
        let api = MockApi::spawn().await;
        let catalog = StoreCatalog::new(ApiClient::new(api.base_url()));

        catalog.fetch_overview(false).await.unwrap();
        assert_eq!(catalog.fetch_overview(true).await.unwrap(), FetchOutcome::Fetched);

        assert_eq!(api.hits("/store/products"), 2);
    }

    #[tokio::test]
    async fn test_expired_cooldown_refetches() {
        let api = MockApi::spawn().await;
        let catalog =
            StoreCatalog::with_cooldown(ApiClient::new(api.base_url()), Duration::from_millis(20));

        catalog.fetch_shell(false).await.unwrap();
        tokio::time::sleep(Duration::from_millis(40)).await;
        catalog.fetch_shell(false).await.unwrap();

        assert_eq!(api.hits("/store/categories"), 2);
        assert_eq!(catalog.shell().banners.len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_fetch_is_deduplicated() {
        let api = MockApi::spawn().await;
        let catalog = StoreCatalog::new(ApiClient::new(api.base_url()));

        let (a, b) = tokio::join!(catalog.fetch_shell(false), catalog.fetch_shell(false));
        let mut outcomes = vec![a.unwrap(), b.unwrap()];
        outcomes.sort_by_key(|o| *o == FetchOutcome::InFlight);

        assert_eq!(outcomes, vec![FetchOutcome::Fetched, FetchOutcome::InFlight]);
        assert_eq!(api.hits("/store/categories"), 1);
    }

    #[tokio::test]
    async fn test_failure_sets_error_and_releases_flag() {
        let catalog = StoreCatalog::new(ApiClient::new("http://127.0.0.1:9"));

        assert!(catalog.fetch_overview(false).await.is_err());
        assert!(catalog.error().is_some());
        assert!(catalog.overview_fetched_at().is_none());

        // The in-flight flag was released, so the next call tries again.
        assert!(catalog.fetch_overview(false).await.is_err());
    }
}
