//! Clip curation stages.
//!
//! Pure, synchronous stages applied after acquisition:
//! - Filtering against [`CurationCriteria`] with near-duplicate removal
//! - Stable ranking by views and recency
//! - Broadcaster-diversity ordering

pub mod criteria;
pub mod error;
pub mod filter;
pub mod rank;
pub mod reorder;

pub use criteria::CurationCriteria;
pub use error::{CurationError, CurationResult};
pub use filter::{curate, overlaps, Curator, RejectReason, Verdict};
pub use rank::rank;
pub use reorder::{has_adjacent_duplicates, reorder, ReorderOptions, Reordered};
