//! TrackAI: measure how AI answer engines talk about a brand's domain.
//!
//! A scan asks an AI provider to propose the questions a prospect would
//! ask, asks each of them, has the provider judge its own answers, scores
//! the result and stores a report with recommendations.

pub mod config;
pub mod db;
pub mod domain;
pub mod error;
pub mod models;
pub mod parse;
pub mod provider;
pub mod routes;
pub mod scan;
pub mod testing;

pub use config::Config;
pub use db::{ScanStore, SqliteStore};
pub use error::{ScanError, StoreError};
pub use provider::{create_provider, AiProvider, PerplexityProvider};
pub use routes::{build_rocket, AppState};
pub use scan::{run_scan, PipelineResult};
