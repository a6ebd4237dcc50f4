use serde::Serialize;

use crate::metrics::normalize;
use crate::model::{EquityAnalysisResult, Entity, OwnershipNode, OwnershipTree, ShareholderRow};

/// Side of the ownership graph, relative to the anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    /// Shareholders of the anchor.
    Upstream,
    /// Holdings of the anchor.
    Downstream,
}

/// Handle for one analysis request. Only the ticket of the latest request for
/// the currently centered entity may write a result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisTicket {
    pub anchor: String,
    generation: u64,
}

/// Equity analysis state for the current anchor.
#[derive(Debug, Clone, Default)]
pub struct AnalysisState {
    in_flight: bool,
    anchor: Option<String>,
    generation: u64,
    result: EquityAnalysisResult,
    upstream_rows: Vec<OwnershipNode>,
    downstream_rows: Vec<OwnershipNode>,
}

impl AnalysisState {
    pub fn in_flight(&self) -> bool {
        self.in_flight
    }

    /// Anchor of the request in flight or of the applied result.
    pub fn anchor(&self) -> Option<&str> {
        self.anchor.as_deref()
    }

    pub fn result(&self) -> &EquityAnalysisResult {
        &self.result
    }

    /// Flattened upstream table.
    pub fn upstream_rows(&self) -> &[OwnershipNode] {
        &self.upstream_rows
    }

    /// Flattened downstream table.
    pub fn downstream_rows(&self) -> &[OwnershipNode] {
        &self.downstream_rows
    }

    /// First-hop shareholders reported independently of the upstream tree.
    pub fn direct_shareholders(&self) -> &[ShareholderRow] {
        &self.result.direct_upstream_shareholders_flat
    }

    /// Drop any result and orphan outstanding tickets.
    pub(crate) fn invalidate(&mut self) {
        self.generation += 1;
        self.in_flight = false;
        self.anchor = None;
        self.clear_result();
    }

    /// Start a request for `anchor`: the result is emptied before the call is issued.
    pub(crate) fn begin(&mut self, anchor: &str) -> AnalysisTicket {
        self.generation += 1;
        self.in_flight = true;
        self.anchor = Some(anchor.to_string());
        self.clear_result();
        AnalysisTicket {
            anchor: anchor.to_string(),
            generation: self.generation,
        }
    }

    pub(crate) fn is_current(&self, ticket: &AnalysisTicket, centered: Option<&str>) -> bool {
        ticket.generation == self.generation && centered == Some(ticket.anchor.as_str())
    }

    /// Apply a response; returns false (and changes nothing) for a stale ticket.
    pub(crate) fn apply(
        &mut self,
        ticket: &AnalysisTicket,
        centered: Option<&str>,
        result: EquityAnalysisResult,
    ) -> bool {
        if !self.is_current(ticket, centered) {
            return false;
        }

        if let Some(echoed) = result.id.as_deref() {
            if echoed != ticket.anchor {
                log::warn!(
                    "Equity analysis for {} echoed anchor {}; keeping requested anchor",
                    ticket.anchor,
                    echoed
                );
            }
        }

        self.upstream_rows = flatten(result.upstream.as_ref(), Direction::Upstream);
        self.downstream_rows = flatten(result.downstream.as_ref(), Direction::Downstream);
        self.result = result;
        self.in_flight = false;
        true
    }

    /// Record a failed request; the emptied result is kept.
    pub(crate) fn fail(&mut self, ticket: &AnalysisTicket, centered: Option<&str>) -> bool {
        if !self.is_current(ticket, centered) {
            return false;
        }
        self.in_flight = false;
        true
    }

    fn clear_result(&mut self) {
        self.result = EquityAnalysisResult::default();
        self.upstream_rows.clear();
        self.downstream_rows.clear();
    }
}

/// Flatten an ownership tree for tabular display.
///
/// Yields the root's direct children in order and stops there: deeper levels
/// stay nested under each row's `children` for on-demand expansion.
///
/// The caller picks which tree to pass; `direction` only names it in the
/// debug log so upstream and downstream flattening can be told apart.
pub fn flatten(tree: Option<&OwnershipTree>, direction: Direction) -> Vec<OwnershipNode> {
    let rows = tree.map(|t| t.first_level().to_vec()).unwrap_or_default();
    log::debug!("Flattened {:?} tree into {} rows", direction, rows.len());
    rows
}

/// One-hop tree rooted at `entity`, built from its already-loaded relationships.
pub fn build_local_tree(entity: &Entity, direction: Direction) -> OwnershipTree {
    let relationships = match direction {
        Direction::Upstream => entity.investors(),
        Direction::Downstream => entity.investees(),
    };

    let children = relationships
        .iter()
        .map(|rel| OwnershipNode {
            id: rel.id.clone(),
            name: rel.name.clone(),
            entity_type: rel.entity_type.clone(),
            percent: rel.percent.clone(),
            pagerank: normalize(rel).pagerank,
            children: Vec::new(),
        })
        .collect();

    OwnershipTree::Rooted(OwnershipNode {
        id: Some(entity.id.clone()),
        name: Some(entity.name.clone()),
        entity_type: entity.entity_type.clone(),
        percent: None,
        pagerank: normalize(entity).pagerank,
        children,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn analysis(value: serde_json::Value) -> EquityAnalysisResult {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_flatten_takes_only_direct_children() {
        let tree: OwnershipTree = serde_json::from_value(json!({
            "id": "E1",
            "children": [
                {"id": "A", "children": [{"id": "A1"}, {"id": "A2"}]},
                {"id": "B"}
            ]
        }))
        .unwrap();

        let rows = flatten(Some(&tree), Direction::Upstream);
        let ids: Vec<_> = rows.iter().filter_map(|r| r.id.as_deref()).collect();
        assert_eq!(ids, vec!["A", "B"]);
        assert_eq!(rows[0].children.len(), 2);
    }

    #[test]
    fn test_flatten_forest_and_missing_tree() {
        let forest: OwnershipTree =
            serde_json::from_value(json!([{"id": "X"}, {"id": "Y"}])).unwrap();
        assert_eq!(flatten(Some(&forest), Direction::Downstream).len(), 2);
        assert!(flatten(None, Direction::Downstream).is_empty());
    }

    #[test]
    fn test_begin_empties_previous_result() {
        let mut state = AnalysisState::default();
        let first = state.begin("E1");
        assert!(state.apply(&first, Some("E1"), analysis(json!({"upstream": [{"id": "S1"}]}))));
        assert_eq!(state.upstream_rows().len(), 1);

        state.begin("E1");
        assert!(state.in_flight());
        assert!(state.result().is_empty());
        assert!(state.upstream_rows().is_empty());
    }

    #[test]
    fn test_stale_ticket_is_rejected() {
        let mut state = AnalysisState::default();
        let old = state.begin("E1");
        let new = state.begin("E2");

        assert!(!state.apply(&old, Some("E2"), analysis(json!({"upstream": []}))));
        assert!(state.result().is_empty());
        assert!(state.in_flight());

        assert!(state.apply(&new, Some("E2"), analysis(json!({"upstream": []}))));
        assert!(!state.in_flight());
        assert_eq!(state.anchor(), Some("E2"));
    }

    #[test]
    fn test_ticket_rejected_after_anchor_moves() {
        let mut state = AnalysisState::default();
        let ticket = state.begin("E1");
        assert!(!state.apply(&ticket, Some("E9"), analysis(json!({}))));
        assert!(!state.fail(&ticket, Some("E9")));
        assert!(state.in_flight());
    }

    #[test]
    fn test_fail_clears_in_flight_and_keeps_empty_shape() {
        let mut state = AnalysisState::default();
        let ticket = state.begin("E1");
        assert!(state.fail(&ticket, Some("E1")));
        assert!(!state.in_flight());
        assert!(state.result().is_empty());
    }

    #[test]
    fn test_invalidate_orphans_tickets() {
        let mut state = AnalysisState::default();
        let ticket = state.begin("E1");
        state.invalidate();
        assert!(!state.in_flight());
        assert_eq!(state.anchor(), None);
        assert!(!state.apply(&ticket, Some("E1"), analysis(json!({}))));
    }

    #[test]
    fn test_build_local_tree() {
        let entity: Entity = serde_json::from_value(json!({
            "id": "E1",
            "name": "Acme",
            "type": "company",
            "investors": [
                {"id": "F1", "name": "Fund One", "percent": "40.00%", "pagerank": 0.2},
                {"name": "Fund X", "percent": 0.6, "metrics": {"pagerank": 0.05}}
            ],
            "investees": [{"id": "S1", "name": "Sub"}]
        }))
        .unwrap();

        let upstream = build_local_tree(&entity, Direction::Upstream);
        let root = upstream.root().unwrap();
        assert_eq!(root.id.as_deref(), Some("E1"));
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].percent_label(), "40.00%");
        assert_eq!(root.children[0].pagerank, Some(0.2));
        assert_eq!(root.children[1].id, None);
        assert_eq!(root.children[1].percent_label(), "60.00%");
        assert_eq!(root.children[1].pagerank, Some(0.05));
        assert!(root.children.iter().all(|c| c.children.is_empty()));

        let downstream = build_local_tree(&entity, Direction::Downstream);
        assert_eq!(downstream.first_level().len(), 1);
    }
}
