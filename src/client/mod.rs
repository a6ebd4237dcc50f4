//! Graph service boundary.
//!
//! Statistics, search, entity lookup and equity analysis are computed
//! server-side; [`GraphService`] is the request/response contract the session
//! layer talks to, [`HttpGraphService`] the production implementation.

mod http;
#[cfg(test)]
pub(crate) mod scripted;

pub use http::HttpGraphService;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ApiError;
use crate::model::{de, EquityAnalysisResult, Entity, GraphStats};

/// A search candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub name: String,
    #[serde(default, rename = "type", deserialize_with = "de::lenient_string")]
    pub entity_type: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub level: Option<String>,
}

/// What a name search resolved to.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    /// Exactly one entity carries the queried name.
    Exact(SearchHit),
    /// Case-insensitive substring matches, in service order.
    Partial(Vec<SearchHit>),
    /// The service answered but nothing matched; carries its message.
    NotFound(String),
}

/// Request/response contract of the graph service.
#[async_trait]
pub trait GraphService: Send + Sync {
    /// `GET /api/graph/stats`
    async fn graph_stats(&self) -> Result<GraphStats, ApiError>;

    /// `GET /api/search?q=<query>`. A 404 is `Ok(SearchOutcome::NotFound)`.
    async fn search(&self, query: &str) -> Result<SearchOutcome, ApiError>;

    /// `GET /api/node/{id}`
    async fn node(&self, id: &str) -> Result<Entity, ApiError>;

    /// `GET /api/equity_analysis/{id}`
    async fn equity_analysis(&self, id: &str) -> Result<EquityAnalysisResult, ApiError>;
}
