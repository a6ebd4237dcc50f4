pub mod client;
pub mod config;
pub mod error;
pub mod metrics;
pub mod model;
pub mod session;

pub use client::{GraphService, HttpGraphService, SearchHit, SearchOutcome};
pub use config::Config;
pub use error::{ApiError, EquityNavError, Result};
pub use metrics::{lookup_ranked_metric, normalize, MetricKind, NormalizedMetrics};
pub use session::{AnalysisOutcome, Direction, Explorer, NeighborFocus, NeighborView};
