//! Ownership-graph payloads as served by the graph service.
//!
//! Entities and relationships are decoded leniently: identifiers may be
//! strings or numbers, metrics may be missing or nested, and a relationship may
//! arrive without any id at all (those are resolved by name, see
//! [`crate::session::Explorer::focus_neighbor`]).

pub(crate) mod de;
mod analysis;
mod stats;

pub use analysis::{EquityAnalysisResult, OwnershipNode, OwnershipTree, ShareholderRow};
pub use stats::{DegreeEntry, GraphStats, RankedScore};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Placeholder shown for any missing textual cell.
pub const NOT_AVAILABLE: &str = "N/A";

/// Metric bag nested under `metrics` on nodes and relationships.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RawMetrics {
    pub pagerank: Option<f64>,
    pub degree_centrality: Option<f64>,
    pub betweenness_centrality: Option<f64>,
    pub in_degree: Option<f64>,
    pub out_degree: Option<f64>,
}

/// Ownership share on an edge.
///
/// The service usually sends preformatted text ("30.00%", "N/A"); raw
/// numeric shares are fractions in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Percent {
    Ratio(f64),
    Text(String),
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Percent::Ratio(r) => write!(f, "{:.2}%", r * 100.0),
            Percent::Text(t) if t.trim().is_empty() => f.write_str(NOT_AVAILABLE),
            Percent::Text(t) => f.write_str(t),
        }
    }
}

/// Display label for an optional share.
pub fn percent_label(percent: Option<&Percent>) -> String {
    percent
        .map(Percent::to_string)
        .unwrap_or_else(|| NOT_AVAILABLE.to_string())
}

/// A node of the ownership graph with its direct neighborhood.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::lenient_string")]
    pub name: String,
    #[serde(default, rename = "type", deserialize_with = "de::lenient_string")]
    pub entity_type: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub short_name: Option<String>,
    #[serde(default)]
    pub pagerank: Option<f64>,
    #[serde(default)]
    pub metrics: Option<RawMetrics>,
    /// Upstream side: who owns this entity.
    #[serde(default)]
    pub investors: Option<Vec<Relationship>>,
    /// Downstream side: what this entity owns.
    #[serde(default)]
    pub investees: Option<Vec<Relationship>>,
}

impl Entity {
    pub fn investors(&self) -> &[Relationship] {
        self.investors.as_deref().unwrap_or_default()
    }

    pub fn investees(&self) -> &[Relationship] {
        self.investees.as_deref().unwrap_or_default()
    }
}

/// One endpoint of an ownership edge, seen from the centered entity.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "de::lenient_string")]
    pub entity_type: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub level: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub short_name: Option<String>,
    #[serde(default)]
    pub percent: Option<Percent>,
    /// Flattened copy of `metrics.pagerank` some payloads inline.
    #[serde(default)]
    pub pagerank: Option<f64>,
    #[serde(default)]
    pub metrics: Option<RawMetrics>,
}

impl Relationship {
    /// Name usable for the search fallback; blank names don't count.
    pub fn search_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
    }

    pub fn display_name(&self) -> &str {
        self.search_name().unwrap_or(NOT_AVAILABLE)
    }

    pub fn percent_label(&self) -> String {
        percent_label(self.percent.as_ref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_entity_from_node_payload() {
        let entity: Entity = serde_json::from_value(json!({
            "id": "E1",
            "name": "Acme Holdings",
            "type": "company",
            "level": "",
            "metrics": {"pagerank": 0.02, "in_degree": 2, "out_degree": 1},
            "investors": [
                {"id": "F1", "name": "Fund X", "type": "fund", "percent": "30.00%", "pagerank": 0.1},
                {"name": "Person Y", "percent": null}
            ]
        }))
        .unwrap();

        assert_eq!(entity.id, "E1");
        assert_eq!(entity.entity_type, "company");
        assert_eq!(entity.investors().len(), 2);
        assert!(entity.investees().is_empty());
        assert_eq!(entity.investors()[0].id.as_deref(), Some("F1"));
        assert_eq!(entity.investors()[1].id, None);
        assert_eq!(entity.investors()[1].percent_label(), "N/A");
    }

    #[test]
    fn test_numeric_ids_and_null_names() {
        let rel: Relationship =
            serde_json::from_value(json!({"id": 42, "name": null, "type": null})).unwrap();
        assert_eq!(rel.id.as_deref(), Some("42"));
        assert_eq!(rel.search_name(), None);
        assert_eq!(rel.display_name(), "N/A");
        assert_eq!(rel.entity_type, "");
    }

    #[test]
    fn test_blank_id_is_missing() {
        let rel: Relationship = serde_json::from_value(json!({"id": "  ", "name": "Fund X"})).unwrap();
        assert_eq!(rel.id, None);
        assert_eq!(rel.search_name(), Some("Fund X"));
    }

    #[test]
    fn test_percent_display() {
        let text: Percent = serde_json::from_value(json!("12.50%")).unwrap();
        let ratio: Percent = serde_json::from_value(json!(0.3)).unwrap();
        let blank: Percent = serde_json::from_value(json!("")).unwrap();

        assert_eq!(text.to_string(), "12.50%");
        assert_eq!(ratio.to_string(), "30.00%");
        assert_eq!(blank.to_string(), "N/A");
        assert_eq!(percent_label(None), "N/A");
    }
}
