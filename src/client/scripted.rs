//! In-memory [`GraphService`] for session tests.
//!
//! Responses are scripted per id/query; node and analysis calls can be held
//! on a [`Notify`] gate to force out-of-order completion.

use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use super::{GraphService, SearchOutcome};
use crate::error::ApiError;
use crate::model::{EquityAnalysisResult, Entity, GraphStats};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Call {
    Stats,
    Search(String),
    Node(String),
    Analysis(String),
}

#[derive(Default)]
pub(crate) struct ScriptedService {
    stats: Mutex<Option<GraphStats>>,
    nodes: Mutex<HashMap<String, Entity>>,
    searches: Mutex<HashMap<String, SearchOutcome>>,
    analyses: Mutex<HashMap<String, EquityAnalysisResult>>,
    gates: Mutex<HashMap<String, Arc<Notify>>>,
    node_gates: Mutex<HashMap<String, Arc<Notify>>>,
    calls: Mutex<Vec<Call>>,
}

impl ScriptedService {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn with_stats(self, stats: Value) -> Self {
        *self.stats.lock().unwrap() = Some(serde_json::from_value(stats).unwrap());
        self
    }

    pub(crate) fn with_node(self, node: Value) -> Self {
        let entity: Entity = serde_json::from_value(node).unwrap();
        self.nodes.lock().unwrap().insert(entity.id.clone(), entity);
        self
    }

    pub(crate) fn with_search(self, query: &str, outcome: SearchOutcome) -> Self {
        self.searches.lock().unwrap().insert(query.to_string(), outcome);
        self
    }

    pub(crate) fn with_analysis(self, id: &str, result: Value) -> Self {
        let result = serde_json::from_value(result).unwrap();
        self.analyses.lock().unwrap().insert(id.to_string(), result);
        self
    }

    /// Hold analysis responses for `id` until the returned gate is notified.
    pub(crate) fn gate_analysis(&self, id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.gates.lock().unwrap().insert(id.to_string(), Arc::clone(&gate));
        gate
    }

    /// Hold node lookups for `id` until the returned gate is notified.
    pub(crate) fn gate_node(&self, id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.node_gates.lock().unwrap().insert(id.to_string(), Arc::clone(&gate));
        gate
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub(crate) fn count(&self, call: &Call) -> usize {
        self.calls.lock().unwrap().iter().filter(|c| *c == call).count()
    }

    /// Yield until `call` has been issued at least once.
    pub(crate) async fn wait_for(&self, call: &Call) {
        for _ in 0..1000 {
            if self.count(call) > 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
        panic!("{:?} was never issued; calls: {:?}", call, self.calls());
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl GraphService for ScriptedService {
    async fn graph_stats(&self) -> Result<GraphStats, ApiError> {
        self.record(Call::Stats);
        self.stats
            .lock()
            .unwrap()
            .clone()
            .ok_or_else(|| ApiError::Transport("stats service down".to_string()))
    }

    async fn search(&self, query: &str) -> Result<SearchOutcome, ApiError> {
        self.record(Call::Search(query.to_string()));
        Ok(self
            .searches
            .lock()
            .unwrap()
            .get(query)
            .cloned()
            .unwrap_or_else(|| SearchOutcome::NotFound("no matching node".to_string())))
    }

    async fn node(&self, id: &str) -> Result<Entity, ApiError> {
        self.record(Call::Node(id.to_string()));
        let gate = self.node_gates.lock().unwrap().get(id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.nodes
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 404,
                message: "node does not exist".to_string(),
            })
    }

    async fn equity_analysis(&self, id: &str) -> Result<EquityAnalysisResult, ApiError> {
        self.record(Call::Analysis(id.to_string()));
        let gate = self.gates.lock().unwrap().get(id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }
        self.analyses
            .lock()
            .unwrap()
            .get(id)
            .cloned()
            .ok_or_else(|| ApiError::Status {
                status: 500,
                message: "traversal failed".to_string(),
            })
    }
}
