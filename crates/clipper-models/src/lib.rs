//! Shared data models for the clip curation engine.
//!
//! This crate provides Serde-serializable types for:
//! - Clips as returned by the API and after normalization
//! - Games (categories)
//! - Paginated response envelopes
//! - The curated batch produced by a curation run

pub mod batch;
pub mod clip;
pub mod game;
pub mod page;

// Re-export common types
pub use batch::{CuratedBatch, DiversityOutcome};
pub use clip::{broadcaster_url, derive_clip_url, Clip, RawClip};
pub use game::Game;
pub use page::{Page, Pagination};
