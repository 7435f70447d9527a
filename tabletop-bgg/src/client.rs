use tabletop_catalog::{CatalogId, FamilyEntity, GameEntity};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::error::FetchError;
use crate::limiter::RateLimiter;
use crate::source::CatalogSource;
use crate::xml;

pub const DEFAULT_BASE_URL: &str = "https://boardgamegeek.com/xmlapi2";
pub const DEFAULT_REQUEST_INTERVAL: Duration = Duration::from_secs(5);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection options for [`BggClient`].
#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub base_url: String,
    /// Sent as a bearer token when set.
    pub api_token: Option<String>,
    /// Minimum spacing between requests.
    pub request_interval: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_token: None,
            request_interval: DEFAULT_REQUEST_INTERVAL,
        }
    }
}

/// HTTP client for the catalog service's XML API with rate limiting.
///
/// Each client owns its limiter; two clients pace independently.
pub struct BggClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
    limiter: RateLimiter,
}

impl BggClient {
    pub fn new(options: ClientOptions) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .user_agent(concat!("tabletop-catalog/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: options.base_url.trim_end_matches('/').to_string(),
            api_token: options.api_token,
            limiter: RateLimiter::new(options.request_interval),
        })
    }

    /// Fetch a game or expansion by id.
    pub async fn get_game(
        &self,
        id: CatalogId,
        cancel: &CancellationToken,
    ) -> Result<GameEntity, FetchError> {
        let url = format!(
            "{}/thing?type=boardgame,boardgameexpansion&stats=1&id={}",
            self.base_url, id
        );
        let body = self.get(&url, cancel).await?;
        match xml::decode_thing(&body)? {
            Some(thing) => thing.into_game(id),
            None => Err(FetchError::NotACatalogEntry { kind: "game", id }),
        }
    }

    /// Fetch a family by id.
    pub async fn get_family(
        &self,
        id: CatalogId,
        cancel: &CancellationToken,
    ) -> Result<FamilyEntity, FetchError> {
        let url = format!("{}/family?id={}", self.base_url, id);
        let body = self.get(&url, cancel).await?;
        match xml::decode_family(&body)? {
            Some(family) => family.into_family(id),
            None => Err(FetchError::NotACatalogEntry { kind: "family", id }),
        }
    }

    /// Wait for the limiter, then GET `url` and return the body.
    async fn get(&self, url: &str, cancel: &CancellationToken) -> Result<String, FetchError> {
        self.limiter.acquire(cancel).await?;
        log::debug!("GET {}", url);

        let mut request = self.http.get(url);
        if let Some(ref token) = self.api_token {
            request = request.bearer_auth(token);
        }

        let resp = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            resp = request.send() => resp?,
        };

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            return Err(FetchError::UpstreamUnavailable(format!(
                "unexpected HTTP status {} for {}",
                status, url
            )));
        }

        Ok(resp.text().await?)
    }
}

impl CatalogSource for BggClient {
    async fn fetch_game(
        &self,
        id: CatalogId,
        cancel: &CancellationToken,
    ) -> Result<GameEntity, FetchError> {
        self.get_game(id, cancel).await
    }

    async fn fetch_family(
        &self,
        id: CatalogId,
        cancel: &CancellationToken,
    ) -> Result<FamilyEntity, FetchError> {
        self.get_family(id, cancel).await
    }
}
