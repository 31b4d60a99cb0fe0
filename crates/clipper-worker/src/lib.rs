//! Clip curation worker.
//!
//! This crate provides:
//! - Environment-driven run configuration
//! - The curation engine tying acquisition to the curation stages
//! - Stage-tagged error reporting

pub mod config;
pub mod engine;
pub mod error;

pub use config::WorkerConfig;
pub use engine::{build_batch, CurationEngine};
pub use error::{EngineError, EngineResult};
