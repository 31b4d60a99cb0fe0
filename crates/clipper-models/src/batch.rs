//! Curated batch handed to the downstream composition stage.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::Clip;

/// How the broadcaster-diversity ordering was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum DiversityOutcome {
    /// Exhaustive search found an ordering (or the input already satisfied it).
    Exact,
    /// Exhaustive search was skipped and the greedy pass produced a
    /// verified ordering.
    Repaired,
    /// No ordering exists under the requested constraints.
    Unsatisfiable,
    /// Exhaustive search was skipped and no verified ordering was produced.
    Skipped,
}

impl DiversityOutcome {
    /// True when no two adjacent items share a key.
    pub fn is_satisfied(&self) -> bool {
        matches!(self, DiversityOutcome::Exact | DiversityOutcome::Repaired)
    }
}

/// Final ordered batch of clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct CuratedBatch {
    pub clips: Vec<Clip>,
    /// False for a best-effort batch that may contain adjacent clips from
    /// the same broadcaster.
    pub satisfied: bool,
    pub diversity: DiversityOutcome,
    /// Number of API pages fetched to build the batch.
    pub pages_fetched: usize,
    /// True when acquisition stopped on an error and the batch holds only
    /// what was collected before it.
    #[serde(default)]
    pub partial: bool,
}

impl CuratedBatch {
    pub fn len(&self) -> usize {
        self.clips.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clips.is_empty()
    }

    /// Total running time of the batch in seconds.
    pub fn total_duration(&self) -> f64 {
        self.clips.iter().map(|clip| clip.duration).sum()
    }
}
