use serde::Serialize;

use crate::model::{Entity, RawMetrics, Relationship};

/// Anything carrying graph metrics, either inlined or under `metrics`.
pub trait MetricRecord {
    /// Top-level `pagerank`, when the payload inlines it.
    fn inline_pagerank(&self) -> Option<f64>;
    /// Nested metric bag.
    fn metrics(&self) -> Option<&RawMetrics>;
}

impl MetricRecord for Relationship {
    fn inline_pagerank(&self) -> Option<f64> {
        self.pagerank
    }

    fn metrics(&self) -> Option<&RawMetrics> {
        self.metrics.as_ref()
    }
}

impl MetricRecord for Entity {
    fn inline_pagerank(&self) -> Option<f64> {
        self.pagerank
    }

    fn metrics(&self) -> Option<&RawMetrics> {
        self.metrics.as_ref()
    }
}

impl MetricRecord for RawMetrics {
    fn inline_pagerank(&self) -> Option<f64> {
        None
    }

    fn metrics(&self) -> Option<&RawMetrics> {
        Some(self)
    }
}

/// Canonical per-entity metrics.
///
/// Centralities are `None` when the service had no data; degree counts are
/// always defined and default to 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct NormalizedMetrics {
    pub pagerank: Option<f64>,
    pub degree_centrality: Option<f64>,
    pub betweenness_centrality: Option<f64>,
    pub indegree: u64,
    pub outdegree: u64,
}

/// Normalize a record's metrics.
///
/// Resolution order:
/// - `pagerank`: inlined value, then `metrics.pagerank`, else `None`
/// - `degree_centrality`, `betweenness_centrality`: `metrics` only
/// - `indegree`/`outdegree`: `metrics.in_degree`/`metrics.out_degree`, else 0
pub fn normalize<R: MetricRecord + ?Sized>(record: &R) -> NormalizedMetrics {
    let nested = record.metrics();
    NormalizedMetrics {
        pagerank: record
            .inline_pagerank()
            .or_else(|| nested.and_then(|m| m.pagerank)),
        degree_centrality: nested.and_then(|m| m.degree_centrality),
        betweenness_centrality: nested.and_then(|m| m.betweenness_centrality),
        indegree: degree_count(nested.and_then(|m| m.in_degree)),
        outdegree: degree_count(nested.and_then(|m| m.out_degree)),
    }
}

// Wire degrees are JSON numbers; anything negative or non-finite counts as 0.
fn degree_count(value: Option<f64>) -> u64 {
    match value {
        Some(v) if v.is_finite() && v > 0.0 => v.round() as u64,
        _ => 0,
    }
}

/// Profile card for a fully loaded entity.
///
/// Unlike [`normalize`], degrees here count the loaded relationship lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InvestorProfile {
    pub pagerank: Option<f64>,
    pub degree_centrality: Option<f64>,
    pub betweenness_centrality: Option<f64>,
    pub indegree: usize,
    pub outdegree: usize,
    pub level: String,
    pub entity_type: String,
    pub investees: Vec<Relationship>,
}

pub fn investor_profile(entity: &Entity) -> InvestorProfile {
    let metrics = normalize(entity);
    InvestorProfile {
        pagerank: metrics.pagerank,
        degree_centrality: metrics.degree_centrality,
        betweenness_centrality: metrics.betweenness_centrality,
        indegree: entity.investors().len(),
        outdegree: entity.investees().len(),
        level: entity.level.clone().unwrap_or_default(),
        entity_type: entity.entity_type.clone(),
        investees: entity.investees().to_vec(),
    }
}
