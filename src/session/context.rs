use serde::{Deserialize, Serialize};

use crate::metrics::{normalize, NormalizedMetrics};
use crate::model::{Entity, Relationship};

/// Which relationship list feeds the neighbor table.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NeighborView {
    /// Upstream: who owns the centered entity.
    #[default]
    Investors,
    /// Downstream: what the centered entity owns.
    Investees,
}

/// A relationship of the centered entity together with its normalized metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Neighbor {
    pub relationship: Relationship,
    pub metrics: NormalizedMetrics,
}

impl From<&Relationship> for Neighbor {
    fn from(relationship: &Relationship) -> Self {
        Self {
            metrics: normalize(relationship),
            relationship: relationship.clone(),
        }
    }
}

/// The centered entity and its normalized neighborhood.
///
/// Entities are only ever replaced wholesale; neighbors and focus are always
/// derived from the entity currently held.
#[derive(Debug, Clone, Default)]
pub struct EntityContext {
    centered: Option<Entity>,
    view: NeighborView,
    neighbors: Vec<Neighbor>,
    focused: Option<Neighbor>,
}

impl EntityContext {
    pub fn new(view: NeighborView) -> Self {
        Self {
            view,
            ..Self::default()
        }
    }

    pub fn centered(&self) -> Option<&Entity> {
        self.centered.as_ref()
    }

    pub fn centered_id(&self) -> Option<&str> {
        self.centered.as_ref().map(|e| e.id.as_str())
    }

    pub fn view(&self) -> NeighborView {
        self.view
    }

    pub fn neighbors(&self) -> &[Neighbor] {
        &self.neighbors
    }

    pub fn focused(&self) -> Option<&Neighbor> {
        self.focused.as_ref()
    }

    /// Center on `entity`, re-deriving neighbors and focusing the first one.
    pub(crate) fn replace(&mut self, entity: Entity) {
        self.centered = Some(entity);
        self.rebuild();
    }

    pub(crate) fn set_view(&mut self, view: NeighborView) {
        if self.view != view {
            self.view = view;
            self.rebuild();
        }
    }

    fn rebuild(&mut self) {
        let source = match (&self.centered, self.view) {
            (Some(entity), NeighborView::Investors) => entity.investors(),
            (Some(entity), NeighborView::Investees) => entity.investees(),
            (None, _) => &[],
        };
        self.neighbors = source.iter().map(Neighbor::from).collect();
        self.focused = self.neighbors.first().cloned();
    }

    /// Focus `relationship`, reusing its already-normalized row when it is one
    /// of the current neighbors.
    pub(crate) fn focus(&mut self, relationship: &Relationship) -> &Neighbor {
        let existing = relationship.id.as_ref().and_then(|id| {
            self.neighbors
                .iter()
                .find(|n| n.relationship.id.as_ref() == Some(id))
        });
        let neighbor = existing
            .cloned()
            .unwrap_or_else(|| Neighbor::from(relationship));
        self.focused.insert(neighbor)
    }

    /// True iff `row` is the focused neighbor. Rows without an id never match.
    pub fn row_highlight_key(&self, row: &Relationship) -> bool {
        match (&self.focused, &row.id) {
            (Some(focused), Some(id)) => focused.relationship.id.as_ref() == Some(id),
            _ => false,
        }
    }
}
