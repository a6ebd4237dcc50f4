use serde::{Deserialize, Serialize};

use super::{de, percent_label, Percent, NOT_AVAILABLE};

/// A node of an upstream or downstream ownership tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OwnershipNode {
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "de::lenient_string")]
    pub entity_type: String,
    /// Share held on the edge towards the parent node.
    #[serde(default)]
    pub percent: Option<Percent>,
    #[serde(default)]
    pub pagerank: Option<f64>,
    #[serde(default, deserialize_with = "de::vec_or_null")]
    pub children: Vec<OwnershipNode>,
}

impl OwnershipNode {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(NOT_AVAILABLE)
    }

    pub fn percent_label(&self) -> String {
        percent_label(self.percent.as_ref())
    }
}

/// Ownership tree as returned by the analysis service.
///
/// Two wire shapes exist: a single root carrying `children`, or just the list
/// of first-level nodes with the root (the anchor itself) elided.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OwnershipTree {
    Forest(Vec<OwnershipNode>),
    Rooted(OwnershipNode),
}

impl OwnershipTree {
    pub fn root(&self) -> Option<&OwnershipNode> {
        match self {
            OwnershipTree::Rooted(root) => Some(root),
            OwnershipTree::Forest(_) => None,
        }
    }

    /// First-level nodes: the root's direct children.
    pub fn first_level(&self) -> &[OwnershipNode] {
        match self {
            OwnershipTree::Rooted(root) => &root.children,
            OwnershipTree::Forest(nodes) => nodes,
        }
    }
}

/// Direct upstream shareholder row used to cross-check the upstream tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ShareholderRow {
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "de::opt_string")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub percent: Option<Percent>,
}

impl ShareholderRow {
    pub fn name_label(&self) -> &str {
        non_blank(self.name.as_deref())
    }

    pub fn type_label(&self) -> &str {
        non_blank(self.entity_type.as_deref())
    }

    pub fn percent_label(&self) -> String {
        percent_label(self.percent.as_ref())
    }
}

fn non_blank(value: Option<&str>) -> &str {
    match value {
        Some(v) if !v.trim().is_empty() => v,
        _ => NOT_AVAILABLE,
    }
}

/// Multi-hop equity penetration result for one anchor entity.
///
/// `Default` is the emptied shape: both trees absent, no shareholder rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EquityAnalysisResult {
    /// Anchor id echoed by the service, when it does.
    #[serde(default, deserialize_with = "de::opt_id")]
    pub id: Option<String>,
    #[serde(default, deserialize_with = "de::opt_string")]
    pub name: Option<String>,
    #[serde(default, rename = "type", deserialize_with = "de::opt_string")]
    pub entity_type: Option<String>,
    #[serde(default)]
    pub upstream: Option<OwnershipTree>,
    #[serde(default)]
    pub downstream: Option<OwnershipTree>,
    #[serde(default, deserialize_with = "de::vec_or_null")]
    pub direct_upstream_shareholders_flat: Vec<ShareholderRow>,
}

impl EquityAnalysisResult {
    pub fn is_empty(&self) -> bool {
        self.upstream.is_none()
            && self.downstream.is_none()
            && self.direct_upstream_shareholders_flat.is_empty()
    }
}
