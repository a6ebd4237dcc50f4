use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use url::Url;

use super::{GraphService, SearchHit, SearchOutcome};
use crate::config::Config;
use crate::error::{ApiError, EquityNavError, Result};
use crate::model::{de, EquityAnalysisResult, Entity, GraphStats};

/// Raw `/api/search` body: exactly one of the three shapes is populated.
#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default, deserialize_with = "de::opt_id")]
    id: Option<String>,
    #[serde(default, deserialize_with = "de::lenient_string")]
    name: String,
    #[serde(default, rename = "type", deserialize_with = "de::lenient_string")]
    entity_type: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    level: Option<String>,
    #[serde(default)]
    partial_matches: Option<Vec<SearchHit>>,
    #[serde(default)]
    error: Option<String>,
}

/// Error body the service attaches to non-success responses
#[derive(Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// HTTP client for the graph service
///
/// Every request is bounded by the configured timeout; an expired request
/// surfaces as [`ApiError::Timeout`].
pub struct HttpGraphService {
    client: Client,
    base_url: Url,
    timeout: Duration,
}

impl HttpGraphService {
    /// Create a client for the service rooted at `base_url`
    ///
    /// # Arguments
    ///
    /// * `base_url` - e.g. "http://127.0.0.1:8888"; a trailing slash is fine
    /// * `timeout` - Per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| EquityNavError::Config(format!("invalid base URL {}: {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(EquityNavError::Config(format!(
                "base URL {} cannot carry a path",
                base_url
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EquityNavError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url,
            timeout,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(&config.service.base_url, config.timeout())
    }

    /// Resolve `/api/<segments...>`, percent-encoding each segment.
    fn endpoint(&self, segments: &[&str]) -> std::result::Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Transport(format!("{} cannot carry a path", self.base_url)))?
            .pop_if_empty()
            .push("api")
            .extend(segments);
        Ok(url)
    }

    fn transport_error(&self, err: reqwest::Error) -> ApiError {
        if err.is_timeout() {
            ApiError::Timeout(self.timeout.as_secs())
        } else {
            ApiError::Transport(err.to_string())
        }
    }

    /// GET `url` and decode the JSON body
    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> std::result::Result<T, ApiError> {
        let start = std::time::Instant::now();
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorBody>(&body)
                .ok()
                .and_then(|b| b.error)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| {
                    status
                        .canonical_reason()
                        .unwrap_or("Unknown error")
                        .to_string()
                });

            log::debug!("GET {} -> {} ({})", url, status, message);
            return Err(ApiError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| self.transport_error(e))?;

        log::debug!("GET {} -> {} in {:?}", url, status, start.elapsed());

        serde_json::from_slice(&bytes).map_err(|e| ApiError::Decode(e.to_string()))
    }
}

#[async_trait]
impl GraphService for HttpGraphService {
    async fn graph_stats(&self) -> std::result::Result<GraphStats, ApiError> {
        let url = self.endpoint(&["graph", "stats"])?;
        self.get_json(url).await
    }

    async fn search(&self, query: &str) -> std::result::Result<SearchOutcome, ApiError> {
        let mut url = self.endpoint(&["search"])?;
        url.query_pairs_mut().append_pair("q", query);

        let response: SearchResponse = match self.get_json(url).await {
            Ok(response) => response,
            Err(ApiError::Status { status: 404, message }) => {
                return Ok(SearchOutcome::NotFound(message));
            }
            Err(e) => return Err(e),
        };

        if let Some(id) = response.id {
            return Ok(SearchOutcome::Exact(SearchHit {
                id,
                name: response.name,
                entity_type: response.entity_type,
                level: response.level,
            }));
        }

        match response.partial_matches {
            Some(hits) if !hits.is_empty() => Ok(SearchOutcome::Partial(hits)),
            _ => Ok(SearchOutcome::NotFound(
                response
                    .error
                    .unwrap_or_else(|| "no matching entity".to_string()),
            )),
        }
    }

    async fn node(&self, id: &str) -> std::result::Result<Entity, ApiError> {
        let url = self.endpoint(&["node", id])?;
        self.get_json(url).await
    }

    async fn equity_analysis(&self, id: &str) -> std::result::Result<EquityAnalysisResult, ApiError> {
        let url = self.endpoint(&["equity_analysis", id])?;
        self.get_json(url).await
    }
}
