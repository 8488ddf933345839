//! Device-local persisted state: one JSON file per fixed key.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{LiveScoreError, Result};
use crate::model::{Theme, User};

pub mod keys {
    pub const AUTH_TOKEN: &str = "auth_token";
    pub const USER: &str = "user";
    pub const CART: &str = "cart";
    pub const THEME: &str = "theme";
    pub const LANGUAGE: &str = "language";
}

/// Key-value store backed by a directory of JSON files.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    dir: PathBuf,
}

impl LocalStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }

    /// Read `key`. A missing file is `Ok(None)`.
    pub fn get<T: DeserializeOwned>(&self, key: &'static str) -> Result<Option<T>> {
        let path = self.path(key);
        let raw = match std::fs::read_to_string(&path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(source) => return Err(LiveScoreError::Storage { path, source }),
        };
        serde_json::from_str(&raw)
            .map(Some)
            .map_err(|source| LiveScoreError::StorageFormat { key, source })
    }

    pub fn set<T: Serialize>(&self, key: &'static str, value: &T) -> Result<()> {
        std::fs::create_dir_all(&self.dir).map_err(|source| LiveScoreError::Storage {
            path: self.dir.clone(),
            source,
        })?;
        let raw = serde_json::to_string(value)
            .map_err(|source| LiveScoreError::StorageFormat { key, source })?;
        let path = self.path(key);
        atomic_write(&path, raw.as_bytes())
            .map_err(|source| LiveScoreError::Storage { path, source })?;
        debug!(key, "persisted value");
        Ok(())
    }

    pub fn remove(&self, key: &'static str) -> Result<()> {
        let path = self.path(key);
        match std::fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(source) => Err(LiveScoreError::Storage { path, source }),
        }
    }
}

/// Write next to `path` and rename over it, so readers never see a torn file.
fn atomic_write(path: &Path, data: &[u8]) -> std::io::Result<()> {
    let mut tmp = path.to_path_buf();
    tmp.set_extension("json.tmp");
    std::fs::write(&tmp, data)?;
    std::fs::rename(tmp, path)
}

#[derive(Debug, Default)]
struct SessionState {
    token: Option<String>,
    user: Option<User>,
}

/// The persisted auth token and user record.
#[derive(Debug, Clone)]
pub struct SessionStore {
    storage: LocalStorage,
    state: Arc<Mutex<SessionState>>,
}

impl SessionStore {
    pub fn load(storage: LocalStorage) -> Result<Self> {
        let token = storage.get(keys::AUTH_TOKEN)?;
        let user = storage.get(keys::USER)?;
        Ok(Self {
            storage,
            state: Arc::new(Mutex::new(SessionState { token, user })),
        })
    }

    pub fn token(&self) -> Option<String> {
        self.lock().token.clone()
    }

    pub fn user(&self) -> Option<User> {
        self.lock().user.clone()
    }

    pub fn sign_in(&self, token: impl Into<String>, user: User) -> Result<()> {
        let token = token.into();
        self.storage.set(keys::AUTH_TOKEN, &token)?;
        self.storage.set(keys::USER, &user)?;
        info!(user_id = %user.id, "signed in");
        let mut state = self.lock();
        state.token = Some(token);
        state.user = Some(user);
        Ok(())
    }

    pub fn sign_out(&self) -> Result<()> {
        self.storage.remove(keys::AUTH_TOKEN)?;
        self.storage.remove(keys::USER)?;
        *self.lock() = SessionState::default();
        info!("signed out");
        Ok(())
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Theme and language preferences.
#[derive(Debug, Clone)]
pub struct Preferences {
    storage: LocalStorage,
}

impl Preferences {
    pub const DEFAULT_LANGUAGE: &'static str = "en";

    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    pub fn theme(&self) -> Result<Theme> {
        Ok(self.storage.get(keys::THEME)?.unwrap_or_default())
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        self.storage.set(keys::THEME, &theme)
    }

    pub fn language(&self) -> Result<String> {
        Ok(self
            .storage
            .get(keys::LANGUAGE)?
            .unwrap_or_else(|| Self::DEFAULT_LANGUAGE.to_string()))
    }

    pub fn set_language(&self, language: &str) -> Result<()> {
        self.storage.set(keys::LANGUAGE, &language)
    }
}
