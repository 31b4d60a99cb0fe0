//! Curation run orchestration.
//!
//! One run walks the clip pages of a game, feeding every page to the
//! incremental curator, then ranks the accepted clips and orders them for
//! broadcaster diversity. Pagination stops once the curator is full or a
//! page leads with a clip below the view floor (pages are sorted by views,
//! so nothing after it can qualify).

use clipper_curation::{rank, reorder, Curator, ReorderOptions};
use clipper_models::{Clip, CuratedBatch, RawClip};
use clipper_twitch::{PageControl, TwitchClient};
use tracing::{info, info_span, warn, Instrument};

use crate::config::WorkerConfig;
use crate::error::{EngineError, EngineResult};

/// Runs curation for one game at a time.
#[derive(Debug, Clone)]
pub struct CurationEngine {
    config: WorkerConfig,
    client: TwitchClient,
}

impl CurationEngine {
    pub fn new(config: WorkerConfig, client: TwitchClient) -> Self {
        Self { config, client }
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    /// Resolve `game_name` and curate its clips.
    pub async fn run(&self, game_name: &str) -> EngineResult<CuratedBatch> {
        let game = self
            .client
            .get_game_by_name(game_name)
            .await?
            .ok_or_else(|| EngineError::GameNotFound(game_name.to_string()))?;

        info!(game = %game.name, game_id = %game.id, "Resolved game");
        self.curate_game(&game.id).await
    }

    /// Curate the clips of the game with id `game_id`.
    pub async fn curate_game(&self, game_id: &str) -> EngineResult<CuratedBatch> {
        let span = info_span!("curation_run", game_id = %game_id);
        self.curate(game_id).instrument(span).await
    }

    async fn curate(&self, game_id: &str) -> EngineResult<CuratedBatch> {
        let mut curator = Curator::new(self.config.criteria.clone())?;
        let min_views = curator.criteria().min_views;

        let walked = self
            .client
            .for_each_game_clip_page(
                game_id,
                self.config.period_days,
                self.config.page_size,
                |_, page: Vec<RawClip>| {
                    let below_floor = page.first().is_some_and(|lead| lead.view_count < min_views);
                    curator.offer_all(page.into_iter().map(Clip::from));

                    if curator.is_full() || below_floor {
                        PageControl::Stop
                    } else {
                        PageControl::Continue
                    }
                },
            )
            .await;

        let (pages, partial) = match walked {
            Ok(summary) => {
                info!(
                    pages = summary.pages,
                    fetched = summary.records,
                    stop_reason = ?summary.stop_reason,
                    "Acquisition finished"
                );
                (summary.pages, false)
            }
            Err(err)
                if self.config.keep_partial_on_error
                    && err.pages > 0
                    && err.source.is_rate_limited() =>
            {
                warn!(
                    pages = err.pages,
                    error = %err.source,
                    "Rate limited, keeping partial result"
                );
                (err.pages, true)
            }
            Err(err) => return Err(EngineError::from_twitch(err.source)),
        };

        let batch = build_batch(curator.into_accepted(), &self.config.reorder, pages, partial);

        if !batch.satisfied {
            warn!(
                clips = batch.len(),
                diversity = ?batch.diversity,
                "Broadcaster diversity not satisfied, returning best-effort order"
            );
        }
        info!(
            clips = batch.len(),
            total_duration = batch.total_duration(),
            satisfied = batch.satisfied,
            partial = batch.partial,
            "Curation finished"
        );
        Ok(batch)
    }
}

/// Rank accepted clips and order them so that no two adjacent clips share a
/// broadcaster.
pub fn build_batch(
    accepted: Vec<Clip>,
    options: &ReorderOptions,
    pages_fetched: usize,
    partial: bool,
) -> CuratedBatch {
    let ranked = rank(accepted);
    let reordered = reorder(ranked, |clip: &Clip| clip.broadcaster_name.clone(), options);

    CuratedBatch {
        satisfied: reordered.satisfied(),
        diversity: reordered.outcome,
        clips: reordered.items,
        pages_fetched,
        partial,
    }
}
