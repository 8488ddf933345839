use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, instrument};

use crate::api::ApiClient;
use crate::bridge::{BannerHost, LiveBannerBridge, MatchUpdateBridge};
use crate::config::ClientConfig;
use crate::error::Result;
use crate::model::User;
use crate::realtime::ConnectionManager;
use crate::storage::{LocalStorage, Preferences, SessionStore};
use crate::store::{Cart, MatchStore, StoreCatalog};

/// The main entry point: every piece of the client layer, wired together.
///
/// # Examples
///
/// ```no_run
/// # async fn example() -> livescore_client::Result<()> {
/// use livescore_client::{ClientConfig, LiveScoreClient};
///
/// let client = LiveScoreClient::new(ClientConfig::from_env())?;
/// client.matches().fetch_live_matches().await?;
/// client.start_realtime();
/// println!("{} live matches", client.matches().snapshot().live_matches.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct LiveScoreClient {
    config: ClientConfig,
    api: ApiClient,
    matches: MatchStore,
    updates: MatchUpdateBridge,
    banner: LiveBannerBridge,
    banner_host: BannerHost,
    connection: Mutex<Arc<ConnectionManager>>,
    catalog: StoreCatalog,
    cart: Cart,
    session: SessionStore,
    preferences: Preferences,
}

impl LiveScoreClient {
    /// Build the client, loading persisted session and cart from the storage dir.
    pub fn new(config: ClientConfig) -> Result<Self> {
        Self::with_http(config, reqwest::Client::new())
    }

    /// Like [`LiveScoreClient::new`] but with a preconfigured [`reqwest::Client`].
    pub fn with_http(config: ClientConfig, http: reqwest::Client) -> Result<Self> {
        let api = ApiClient::with_client(http, config.api_base_url.clone());
        let storage = LocalStorage::new(config.storage_dir.clone());
        let session = SessionStore::load(storage.clone())?;
        let cart = Cart::load(storage.clone());
        let preferences = Preferences::new(storage);

        let updates = MatchUpdateBridge::new();
        let matches = MatchStore::new(api.clone(), updates.clone());
        let banner = LiveBannerBridge::new();
        let banner_host = BannerHost::new(config.banner_lifetime);
        banner_host.attach(&banner);
        let connection = ConnectionManager::new(&config, matches.clone(), Some(banner.clone()));
        let catalog = StoreCatalog::with_cooldown(api.clone(), config.catalog_cooldown);

        debug!(api = %config.api_base_url, socket = %config.socket_url, "client assembled");
        Ok(Self {
            config,
            api,
            matches,
            updates,
            banner,
            banner_host,
            connection: Mutex::new(Arc::new(connection)),
            catalog,
            cart,
            session,
            preferences,
        })
    }

    /// Connect the realtime socket if a session token is available.
    #[instrument(skip(self))]
    pub fn start_realtime(&self) -> bool {
        match self.session.token() {
            Some(token) => self.connection().connect(&token),
            None => {
                debug!("no auth token yet, realtime stays offline");
                false
            }
        }
    }

    /// Persist the session and bring the realtime connection up.
    pub fn sign_in(&self, token: impl Into<String>, user: User) -> Result<()> {
        self.session.sign_in(token, user)?;
        self.start_realtime();
        Ok(())
    }

    /// Swap in a fresh connection manager with a full attempt budget, then
    /// connect if a token is available.
    pub fn restart_realtime(&self) -> bool {
        self.replace_connection();
        self.start_realtime()
    }

    /// Drop the session, the socket and every cached match.
    pub fn sign_out(&self) -> Result<()> {
        self.replace_connection();
        self.matches.reset();
        self.session.sign_out()?;
        info!("client signed out");
        Ok(())
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn matches(&self) -> &MatchStore {
        &self.matches
    }

    pub fn match_updates(&self) -> &MatchUpdateBridge {
        &self.updates
    }

    pub fn live_banner(&self) -> &LiveBannerBridge {
        &self.banner
    }

    pub fn banner_host(&self) -> &BannerHost {
        &self.banner_host
    }

    /// The current connection manager. It is replaced on sign-out and by
    /// [`LiveScoreClient::restart_realtime`].
    pub fn connection(&self) -> Arc<ConnectionManager> {
        self.lock_connection().clone()
    }

    pub fn catalog(&self) -> &StoreCatalog {
        &self.catalog
    }

    pub fn cart(&self) -> &Cart {
        &self.cart
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn preferences(&self) -> &Preferences {
        &self.preferences
    }

    fn replace_connection(&self) {
        let fresh = Arc::new(ConnectionManager::new(
            &self.config,
            self.matches.clone(),
            Some(self.banner.clone()),
        ));
        let previous = std::mem::replace(&mut *self.lock_connection(), fresh);
        previous.disconnect();
        debug!(attempts = previous.attempts(), "connection manager replaced");
    }

    fn lock_connection(&self) -> MutexGuard<'_, Arc<ConnectionManager>> {
        self.connection.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
