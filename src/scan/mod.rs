//! The scan pipeline: discovery, per-query analysis, scoring and
//! recommendations, wired together by [`pipeline::run_scan`].

pub mod analysis;
pub mod discovery;
pub mod pipeline;
pub mod recommendations;
pub mod scoring;

pub use analysis::analyze_response;
pub use discovery::discover_domain;
pub use pipeline::{run_queries, run_scan, PipelineResult};
pub use recommendations::generate_recommendations;
pub use scoring::{compute_metrics, source_breakdown};
