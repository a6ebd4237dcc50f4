//! Metric normalization: reconcile inlined and nested metric fields into one
//! canonical record, plus the ranked-list fallback lookup.

mod normalize;
mod ranked;

pub use normalize::{investor_profile, normalize, InvestorProfile, MetricRecord, NormalizedMetrics};
pub use ranked::{lookup_ranked_metric, MetricKind};
