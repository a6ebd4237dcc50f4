use std::fmt;
use std::str::FromStr;

use crate::error::EquityNavError;
use crate::model::{GraphStats, RankedScore};

/// Ranked metric lists published in [`GraphStats`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    PageRank,
    DegreeCentrality,
}

impl MetricKind {
    fn ranking(self, stats: &GraphStats) -> Option<&[RankedScore]> {
        match self {
            MetricKind::PageRank => stats.top_pagerank.as_deref(),
            MetricKind::DegreeCentrality => stats.top_degree_centrality.as_deref(),
        }
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricKind::PageRank => f.write_str("pagerank"),
            MetricKind::DegreeCentrality => f.write_str("degree_centrality"),
        }
    }
}

impl FromStr for MetricKind {
    type Err = EquityNavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pagerank" => Ok(MetricKind::PageRank),
            "degree_centrality" => Ok(MetricKind::DegreeCentrality),
            other => Err(EquityNavError::Validation(format!(
                "unknown ranked metric '{}'",
                other
            ))),
        }
    }
}

/// Look up an entity's score in the cached top-N ranking.
///
/// `None` when stats are not loaded yet, the list is absent, or the entity is
/// outside the top-N. The lists are short, so this is a linear scan.
pub fn lookup_ranked_metric(
    stats: Option<&GraphStats>,
    entity_id: &str,
    kind: MetricKind,
) -> Option<f64> {
    kind.ranking(stats?)?
        .iter()
        .find(|entry| entry.id == entity_id)
        .map(|entry| entry.score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn stats() -> GraphStats {
        serde_json::from_value(json!({
            "top_pagerank": [
                {"id": "E1", "name": "Acme", "score": 0.12},
                {"id": "E2", "name": "Beta", "score": 0.08}
            ],
            "top_degree_centrality": [{"id": "E2", "score": 0.5}]
        }))
        .unwrap()
    }

    #[test]
    fn test_lookup_hit() {
        let stats = stats();
        assert_eq!(lookup_ranked_metric(Some(&stats), "E2", MetricKind::PageRank), Some(0.08));
        assert_eq!(
            lookup_ranked_metric(Some(&stats), "E2", MetricKind::DegreeCentrality),
            Some(0.5)
        );
    }

    #[test]
    fn test_lookup_miss() {
        let stats = stats();
        assert_eq!(lookup_ranked_metric(Some(&stats), "E9", MetricKind::PageRank), None);
        assert_eq!(
            lookup_ranked_metric(Some(&stats), "E1", MetricKind::DegreeCentrality),
            None
        );
    }

    #[test]
    fn test_lookup_before_stats_loaded() {
        assert_eq!(lookup_ranked_metric(None, "E1", MetricKind::PageRank), None);
    }

    #[test]
    fn test_lookup_absent_list() {
        let stats = GraphStats::default();
        assert_eq!(lookup_ranked_metric(Some(&stats), "E1", MetricKind::PageRank), None);
    }

    #[test]
    fn test_metric_kind_parse() {
        assert_eq!("pagerank".parse::<MetricKind>().unwrap(), MetricKind::PageRank);
        assert!("betweenness".parse::<MetricKind>().is_err());
        assert_eq!(MetricKind::DegreeCentrality.to_string(), "degree_centrality");
    }
}
