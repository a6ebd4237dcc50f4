//! Navigation session: the centered entity, its neighborhood and the equity
//! analysis anchored on it.
//!
//! [`Explorer`] is the single owner of session state. All operations take
//! `&self`; the state mutex is only held between network calls, so concurrent
//! navigation futures interleave at `.await` points only. Every navigation
//! bumps a counter before its lookup and applies the fetched entity only if no
//! newer navigation started meanwhile. Analysis results go through the same
//! kind of check via [`AnalysisTicket`].

mod analysis;
mod context;

pub use analysis::{build_local_tree, flatten, AnalysisState, AnalysisTicket, Direction};
pub use context::{EntityContext, Neighbor, NeighborView};

use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use crate::client::{GraphService, HttpGraphService, SearchHit, SearchOutcome};
use crate::config::Config;
use crate::error::{EquityNavError, Result};
use crate::metrics::{self, MetricKind};
use crate::model::{GraphStats, OwnershipTree, Relationship};

/// Which panel the analyst is looking at.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub enum ActiveView {
    #[default]
    Overview,
    InvestorDetails,
    EquityAnalysis,
}

/// Result of focusing or opening a neighbor.
#[derive(Debug, Clone, PartialEq)]
pub enum NeighborFocus {
    /// The neighbor is now the focused row.
    Focused,
    /// The neighbor is now the centered entity.
    Centered,
    /// The neighbor could not be addressed by id; a name search ran instead.
    SearchedByName(SearchOutcome),
}

/// Result of an analysis request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnalysisOutcome {
    /// Nothing is centered; no request was issued.
    Skipped,
    /// The response is now the session's analysis.
    Applied { anchor: String },
    /// The session moved on before the response arrived; it was dropped.
    Discarded { anchor: String },
}

/// Last search's candidate list and message.
#[derive(Debug, Clone, Default)]
pub struct SearchState {
    pub query: Option<String>,
    pub results: Vec<SearchHit>,
    pub error: Option<String>,
}

/// Snapshot of everything the session shows.
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    context: EntityContext,
    analysis: AnalysisState,
    search: SearchState,
    active_view: ActiveView,
    navigation: u64,
}

impl SessionState {
    pub fn context(&self) -> &EntityContext {
        &self.context
    }

    pub fn analysis(&self) -> &AnalysisState {
        &self.analysis
    }

    pub fn search(&self) -> &SearchState {
        &self.search
    }

    pub fn active_view(&self) -> ActiveView {
        self.active_view
    }
}

/// Session controller over a [`GraphService`].
pub struct Explorer {
    service: Arc<dyn GraphService>,
    stats: OnceLock<GraphStats>,
    state: Mutex<SessionState>,
}

impl Explorer {
    pub fn new(service: Arc<dyn GraphService>) -> Self {
        Self::with_view(service, NeighborView::default())
    }

    pub fn with_view(service: Arc<dyn GraphService>, view: NeighborView) -> Self {
        Self {
            service,
            stats: OnceLock::new(),
            state: Mutex::new(SessionState {
                context: EntityContext::new(view),
                ..SessionState::default()
            }),
        }
    }

    /// Explorer over the HTTP service described by `config`
    pub fn from_config(config: &Config) -> Result<Self> {
        let service = HttpGraphService::from_config(config)?;
        Ok(Self::with_view(
            Arc::new(service),
            config.session.default_neighbor_view,
        ))
    }

    fn state(&self) -> MutexGuard<'_, SessionState> {
        // State is replaced field-wise under the lock; a panicked holder
        // cannot leave it half-written.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Clone of the current session state for read-only consumers.
    pub fn snapshot(&self) -> SessionState {
        self.state().clone()
    }

    /// Fetch graph statistics once; later calls return the cached snapshot.
    pub async fn load_graph_stats(&self) -> Result<&GraphStats> {
        if let Some(stats) = self.stats.get() {
            return Ok(stats);
        }

        let stats = self.service.graph_stats().await.map_err(|e| {
            log::warn!("Failed to load graph statistics: {}", e);
            EquityNavError::Stats(e)
        })?;

        Ok(self.stats.get_or_init(|| stats))
    }

    /// Cached statistics, `None` until [`Self::load_graph_stats`] succeeded.
    pub fn graph_stats(&self) -> Option<&GraphStats> {
        self.stats.get()
    }

    /// Score of `entity_id` in the cached ranking for `kind`.
    pub fn lookup_ranked_metric(&self, entity_id: &str, kind: MetricKind) -> Option<f64> {
        metrics::lookup_ranked_metric(self.graph_stats(), entity_id, kind)
    }

    /// Search entities by name. An exact match centers the session on it.
    pub async fn search_by_name(&self, query: &str) -> Result<SearchOutcome> {
        let query = query.trim();
        if query.is_empty() {
            return Err(EquityNavError::Validation(
                "search query is empty".to_string(),
            ));
        }

        {
            let mut state = self.state();
            state.search = SearchState {
                query: Some(query.to_string()),
                ..SearchState::default()
            };
        }

        let outcome = match self.service.search(query).await {
            Ok(outcome) => outcome,
            Err(source) => {
                log::warn!("Search for '{}' failed: {}", query, source);
                self.state().search.error = Some(source.to_string());
                return Err(EquityNavError::Search {
                    query: query.to_string(),
                    source,
                });
            }
        };

        match outcome {
            SearchOutcome::Exact(hit) => {
                log::info!("Search '{}' matched {} exactly", query, hit.id);
                self.center_on(&hit.id).await?;
                Ok(SearchOutcome::Exact(hit))
            }
            SearchOutcome::Partial(hits) if !hits.is_empty() => {
                log::info!("Search '{}' returned {} candidates", query, hits.len());
                self.state().search.results = hits.clone();
                Ok(SearchOutcome::Partial(hits))
            }
            SearchOutcome::Partial(_) => self.search_not_found(query, "no matching entity".to_string()),
            SearchOutcome::NotFound(message) => self.search_not_found(query, message),
        }
    }

    fn search_not_found(&self, query: &str, message: String) -> Result<SearchOutcome> {
        log::info!("Search '{}' found nothing: {}", query, message);
        self.state().search.error = Some(message.clone());
        Err(EquityNavError::SearchNotFound {
            query: query.to_string(),
            message,
        })
    }

    /// Center on a candidate from the last partial-match list.
    pub async fn select_search_result(&self, hit: &SearchHit) -> Result<()> {
        self.center_on(&hit.id).await
    }

    /// Fetch `id` and make it the centered entity.
    ///
    /// On failure the previous entity, neighbors and focus are left untouched.
    /// If another navigation starts while the lookup is pending, the fetched
    /// entity is dropped and the newer navigation wins.
    pub async fn center_on(&self, id: &str) -> Result<()> {
        self.navigate(id).await.map(|_| ())
    }

    /// Returns false when a newer navigation superseded this one.
    async fn navigate(&self, id: &str) -> Result<bool> {
        let id = id.trim();
        if id.is_empty() {
            return Err(EquityNavError::Validation(
                "entity id is empty".to_string(),
            ));
        }

        let ticket = {
            let mut state = self.state();
            state.navigation += 1;
            state.navigation
        };

        let entity = self.service.node(id).await.map_err(|source| {
            log::warn!("Lookup of {} failed: {}", id, source);
            EquityNavError::Lookup {
                id: id.to_string(),
                source,
            }
        })?;

        let mut state = self.state();
        if state.navigation != ticket {
            log::warn!(
                "Dropping lookup of {}; a newer navigation started while it was pending",
                entity.id
            );
            return Ok(false);
        }
        if state.analysis.anchor().is_some_and(|anchor| anchor != entity.id) {
            state.analysis.invalidate();
        }
        log::info!(
            "Centered on {} ({}), {} investors, {} investees",
            entity.id,
            entity.name,
            entity.investors().len(),
            entity.investees().len()
        );
        state.context.replace(entity);
        state.search.results.clear();
        state.search.error = None;
        state.active_view = ActiveView::InvestorDetails;
        Ok(true)
    }

    /// Switch the neighbor table between investors and investees.
    pub fn set_neighbor_view(&self, view: NeighborView) {
        self.state().context.set_view(view);
    }

    /// Focus a neighbor row.
    ///
    /// A neighbor without an id cannot be addressed directly; its name is
    /// searched instead.
    pub async fn focus_neighbor(&self, neighbor: &Relationship) -> Result<NeighborFocus> {
        if neighbor.id.is_some() {
            self.state().context.focus(neighbor);
            return Ok(NeighborFocus::Focused);
        }
        self.search_missing_id(neighbor).await
    }

    /// Open a neighbor's own relationships by centering on it.
    ///
    /// Falls back to a name search when the neighbor has no id, or when the
    /// lookup by id fails and a name is known.
    pub async fn view_neighbor_relations(&self, neighbor: &Relationship) -> Result<NeighborFocus> {
        let Some(id) = neighbor.id.as_deref() else {
            return self.search_missing_id(neighbor).await;
        };

        match self.center_on(id).await {
            Ok(()) => Ok(NeighborFocus::Centered),
            Err(err @ EquityNavError::Lookup { .. }) => match neighbor.search_name() {
                Some(name) => {
                    log::warn!("{}; retrying as a search for '{}'", err, name);
                    let outcome = self.search_by_name(name).await?;
                    Ok(NeighborFocus::SearchedByName(outcome))
                }
                None => Err(err),
            },
            Err(err) => Err(err),
        }
    }

    async fn search_missing_id(&self, neighbor: &Relationship) -> Result<NeighborFocus> {
        let Some(name) = neighbor.search_name() else {
            return Err(EquityNavError::Validation(
                "neighbor has neither an id nor a name".to_string(),
            ));
        };
        log::warn!("Neighbor '{}' has no id; falling back to name search", name);
        let outcome = self.search_by_name(name).await?;
        Ok(NeighborFocus::SearchedByName(outcome))
    }

    /// True iff `row` is the focused neighbor.
    pub fn row_highlight_key(&self, row: &Relationship) -> bool {
        self.state().context.row_highlight_key(row)
    }

    /// Run the equity analysis for the centered entity.
    ///
    /// The previous result is emptied before the request goes out. A response
    /// is applied only if the session is still on the same request and anchor.
    pub async fn run_analysis(&self) -> Result<AnalysisOutcome> {
        let ticket = {
            let mut state = self.state();
            let Some(anchor) = state.context.centered_id().map(str::to_string) else {
                log::debug!("No centered entity; skipping equity analysis");
                return Ok(AnalysisOutcome::Skipped);
            };
            state.analysis.begin(&anchor)
        };

        log::info!("Requesting equity analysis for {}", ticket.anchor);
        let response = self.service.equity_analysis(&ticket.anchor).await;

        let mut state = self.state();
        let current = state.context.centered_id().map(str::to_string);

        match response {
            Ok(result) => {
                if state.analysis.apply(&ticket, current.as_deref(), result) {
                    log::info!(
                        "Equity analysis for {}: {} upstream rows, {} downstream rows",
                        ticket.anchor,
                        state.analysis.upstream_rows().len(),
                        state.analysis.downstream_rows().len()
                    );
                    Ok(AnalysisOutcome::Applied {
                        anchor: ticket.anchor,
                    })
                } else {
                    log::warn!(
                        "Discarding equity analysis for {}; session is on {}",
                        ticket.anchor,
                        current.as_deref().unwrap_or("nothing")
                    );
                    Ok(AnalysisOutcome::Discarded {
                        anchor: ticket.anchor,
                    })
                }
            }
            Err(source) => {
                if state.analysis.fail(&ticket, current.as_deref()) {
                    log::warn!("Equity analysis for {} failed: {}", ticket.anchor, source);
                    Err(EquityNavError::Analysis {
                        anchor: ticket.anchor,
                        source,
                    })
                } else {
                    log::debug!(
                        "Ignoring failure of superseded analysis for {}: {}",
                        ticket.anchor,
                        source
                    );
                    Ok(AnalysisOutcome::Discarded {
                        anchor: ticket.anchor,
                    })
                }
            }
        }
    }

    /// Promote `node_id` to the centered entity and analyse it.
    pub async fn recenter(&self, node_id: &str) -> Result<AnalysisOutcome> {
        let node_id = node_id.trim();
        if node_id.is_empty() {
            return Err(EquityNavError::Validation(
                "node id is empty; cannot recenter".to_string(),
            ));
        }

        log::info!("Recentering on {}", node_id);
        // Orphan any analysis still in flight before the lookup starts.
        self.state().analysis.invalidate();

        if !self.navigate(node_id).await? {
            return Ok(AnalysisOutcome::Discarded {
                anchor: node_id.to_string(),
            });
        }
        self.state().active_view = ActiveView::EquityAnalysis;
        self.run_analysis().await
    }

    /// One-hop tree from the centered entity's loaded relationships.
    pub fn build_local_tree(&self, direction: Direction) -> Option<OwnershipTree> {
        let state = self.state();
        state
            .context
            .centered()
            .map(|entity| build_local_tree(entity, direction))
    }
}
