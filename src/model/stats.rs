use serde::{Deserialize, Serialize};

use super::de;

/// One entry of a ranked centrality list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedScore {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    pub score: f64,
}

/// One entry of a ranked degree list.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DegreeEntry {
    #[serde(deserialize_with = "de::id")]
    pub id: String,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    pub degree: u64,
}

/// Whole-graph statistics snapshot from `/api/graph/stats`.
///
/// The ranked lists are cut at a top-N chosen by the service and are already
/// sorted by descending score.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphStats {
    pub node_count: Option<u64>,
    pub edge_count: Option<u64>,
    pub top_in_degree: Option<Vec<DegreeEntry>>,
    pub top_out_degree: Option<Vec<DegreeEntry>>,
    pub top_pagerank: Option<Vec<RankedScore>>,
    pub top_degree_centrality: Option<Vec<RankedScore>>,
    /// Ownership cycles, each as the list of entity names along it.
    pub cycles: Option<Vec<Vec<String>>>,
    pub centrality_error: Option<String>,
    pub cycles_error: Option<String>,
}
