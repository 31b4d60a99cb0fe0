//! Candidate filtering and near-duplicate removal.
//!
//! Candidates are checked in order: blacklist, whitelist, then the regular
//! criteria (views, source video, language, duration). Accepted clips are
//! deduplicated against everything accepted before them: two clips of the
//! same source video whose offsets are within the longer clip's duration
//! of each other are treated as the same moment re-clipped, and only the
//! first one encountered is kept.

use clipper_models::Clip;
use tracing::debug;

use crate::criteria::CurationCriteria;
use crate::error::CurationResult;

/// Why a candidate was not accepted.
#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    Blacklisted,
    LowViews { views: u64 },
    NoSourceVideo,
    Language { language: String },
    Duration { duration: f64 },
    /// Overlaps the accepted clip with this id.
    Duplicate { of: String },
    CapReached,
}

/// Outcome of offering one candidate to the [`Curator`].
#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Accepted,
    Rejected(RejectReason),
}

impl Verdict {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Verdict::Accepted)
    }
}

/// True when both clips come from the same source video and their offsets
/// are within `max(duration_a, duration_b)` of each other.
///
/// Clips without a source video and offset never overlap anything.
pub fn overlaps(a: &Clip, b: &Clip) -> bool {
    match (a.source_window(), b.source_window()) {
        (Some((video_a, offset_a, duration_a)), Some((video_b, offset_b, duration_b))) => {
            video_a == video_b && (offset_a - offset_b).abs() <= duration_a.max(duration_b)
        }
        _ => false,
    }
}

/// Incremental filter and deduplicator.
///
/// Candidates are offered one at a time so a pagination predicate can stop
/// fetching as soon as the cap is reached.
#[derive(Debug, Clone)]
pub struct Curator {
    criteria: CurationCriteria,
    accepted: Vec<Clip>,
}

impl Curator {
    /// Create a curator, failing fast on malformed criteria.
    pub fn new(criteria: CurationCriteria) -> CurationResult<Self> {
        criteria.validate()?;
        Ok(Self {
            criteria,
            accepted: Vec::new(),
        })
    }

    pub fn criteria(&self) -> &CurationCriteria {
        &self.criteria
    }

    /// Offer one candidate.
    pub fn offer(&mut self, clip: Clip) -> Verdict {
        let verdict = match self.check(&clip) {
            Some(reason) => Verdict::Rejected(reason),
            None => Verdict::Accepted,
        };

        match &verdict {
            Verdict::Accepted => self.accepted.push(clip),
            Verdict::Rejected(reason) => {
                debug!(clip_id = %clip.id, reason = ?reason, "Clip rejected");
            }
        }
        verdict
    }

    /// Offer every candidate until the cap is reached.
    pub fn offer_all<I: IntoIterator<Item = Clip>>(&mut self, clips: I) -> usize {
        let before = self.accepted.len();
        for clip in clips {
            if self.is_full() {
                break;
            }
            self.offer(clip);
        }
        self.accepted.len() - before
    }

    fn check(&self, clip: &Clip) -> Option<RejectReason> {
        let criteria = &self.criteria;

        if self.is_full() {
            return Some(RejectReason::CapReached);
        }
        if criteria.blacklist.contains(&clip.broadcaster_id) {
            return Some(RejectReason::Blacklisted);
        }

        if !criteria.whitelist.contains(&clip.broadcaster_id) {
            if clip.view_count < criteria.min_views {
                return Some(RejectReason::LowViews {
                    views: clip.view_count,
                });
            }
            if !clip.has_source_video() {
                return Some(RejectReason::NoSourceVideo);
            }
            if !criteria.language_matches(&clip.language) {
                return Some(RejectReason::Language {
                    language: clip.language.clone(),
                });
            }
            if !criteria.duration_in_range(clip.duration) {
                return Some(RejectReason::Duration {
                    duration: clip.duration,
                });
            }
        }

        self.accepted
            .iter()
            .find(|accepted| overlaps(accepted, clip))
            .map(|accepted| RejectReason::Duplicate {
                of: accepted.id.clone(),
            })
    }

    pub fn is_full(&self) -> bool {
        self.criteria.is_full(self.accepted.len())
    }

    pub fn len(&self) -> usize {
        self.accepted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accepted.is_empty()
    }

    /// Accepted clips, in acceptance order.
    pub fn accepted(&self) -> &[Clip] {
        &self.accepted
    }

    pub fn into_accepted(self) -> Vec<Clip> {
        self.accepted
    }
}

/// Filter and deduplicate `raw` against `criteria`.
pub fn curate<I>(raw: I, criteria: &CurationCriteria) -> CurationResult<Vec<Clip>>
where
    I: IntoIterator<Item = Clip>,
{
    let mut curator = Curator::new(criteria.clone())?;
    curator.offer_all(raw);
    Ok(curator.into_accepted())
}
