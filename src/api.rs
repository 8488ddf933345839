use itertools::Itertools;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument};

use crate::error::{LiveScoreError, Result};
use crate::model::{
    project_banners, Category, Match, Product, RawCategory, RawProduct, RawStoreBanner,
    StoreBanner,
};

/// Thin typed wrapper around the REST API.
///
/// Cloning is cheap: the inner [`reqwest::Client`] is reference counted.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// Create a client with default HTTP settings.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), base_url)
    }

    /// Create a client using the provided [`reqwest::Client`].
    ///
    /// Use this when you need to configure timeouts, proxies, headers, etc.
    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: client,
            base_url,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /matches`
    #[instrument(skip(self))]
    pub async fn get_matches(&self) -> Result<Vec<Match>> {
        let matches: Vec<Match> = self.get_json("/matches").await?;
        debug!(count = matches.len(), "fetched matches");
        Ok(matches)
    }

    /// `GET /matches/live`
    #[instrument(skip(self))]
    pub async fn get_live_matches(&self) -> Result<Vec<Match>> {
        let matches: Vec<Match> = self.get_json("/matches/live").await?;
        debug!(count = matches.len(), "fetched live matches");
        Ok(matches)
    }

    /// `GET /matches/featured`; the API answers `null` when nothing is featured.
    #[instrument(skip(self))]
    pub async fn get_featured_match(&self) -> Result<Option<Match>> {
        self.get_json("/matches/featured").await
    }

    /// `GET /matches/:id`
    #[instrument(skip(self))]
    pub async fn get_match(&self, id: &str) -> Result<Match> {
        self.get_json(&format!("/matches/{id}")).await
    }

    #[instrument(skip(self))]
    pub async fn get_categories(&self) -> Result<Vec<Category>> {
        let raw: Vec<RawCategory> = self.get_json("/store/categories").await?;
        Ok(raw.into_iter().map(Category::from).collect_vec())
    }

    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Vec<Product>> {
        let raw: Vec<RawProduct> = self.get_json("/store/products").await?;
        debug!(count = raw.len(), "fetched products");
        Ok(raw.into_iter().map(Product::from).collect_vec())
    }

    #[instrument(skip(self))]
    pub async fn get_store_banners(&self) -> Result<Vec<StoreBanner>> {
        let raw: Vec<RawStoreBanner> = self.get_json("/store/banners").await?;
        Ok(project_banners(raw))
    }

    /// Fetch `path` relative to the base URL and decode the body as JSON.
    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, "fetching");

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| LiveScoreError::Http {
                url: url.clone(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(LiveScoreError::UnexpectedStatus { url, status });
        }

        let body = response
            .text()
            .await
            .map_err(|e| LiveScoreError::ResponseBody {
                url: url.clone(),
                source: e,
            })?;

        serde_json::from_str(&body).map_err(|e| LiveScoreError::Decode { url, source: e })
    }
}
