//! Cursor-driven pagination over collection routes.
//!
//! The walker requests a route, hands every page to a caller-supplied
//! predicate and follows the opaque `pagination.cursor` through the `after`
//! query parameter until one of the stop conditions holds. Business rules
//! (view-count floors, "enough accepted clips") live entirely in the
//! predicate.
//!
//! [`PageWalker::walk`] collects every record it fetched;
//! [`PageWalker::for_each_page`] hands each page over by value and keeps only
//! counts.

use clipper_models::Page;
use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tracing::{debug, info, info_span, Instrument};

use crate::error::TwitchError;
use crate::executor::RequestExecutor;
use crate::metrics::record_page;
use crate::routing::{Query, RouteRegistry};

/// Default hard ceiling on the number of pages fetched by one walk.
pub const DEFAULT_PAGE_CAP: usize = 10;

/// Query parameter carrying the cursor.
pub const CURSOR_PARAM: &str = "after";

// =============================================================================
// Walk types
// =============================================================================

/// Decision returned by the page predicate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageControl {
    Continue,
    Stop,
}

/// Why a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The API returned a page with no records.
    EmptyPage,
    /// The caller's predicate asked to stop.
    Predicate,
    /// No cursor was returned for a further page.
    CursorExhausted,
    /// The page cap was reached.
    PageCap,
}

/// What the predicate sees after each non-empty page.
#[derive(Debug)]
pub struct PageView<'a, T> {
    /// Zero-based index of the page within the walk.
    pub index: usize,
    /// Records of the current page, in API order.
    pub items: &'a [T],
    /// Records collected so far, this page included.
    pub total_items: usize,
}

impl<T> PageView<'_, T> {
    /// First record of the page.
    pub fn lead(&self) -> Option<&T> {
        self.items.first()
    }
}

/// Result of a completed walk.
#[derive(Debug, Clone)]
pub struct WalkOutcome<T> {
    pub items: Vec<T>,
    pub pages: usize,
    pub stop_reason: StopReason,
}

/// Counts from a walk whose records were handed to the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WalkSummary {
    pub pages: usize,
    pub records: usize,
    pub stop_reason: StopReason,
}

/// A page-by-page walk that failed part way. Pages delivered before the
/// failure stay with the caller.
#[derive(Debug, Error)]
#[error("pagination failed after {pages} pages: {source}")]
pub struct PageWalkError {
    pub pages: usize,
    pub records: usize,
    #[source]
    pub source: TwitchError,
}

/// A walk that failed part way. Records from the pages fetched before the
/// failure are kept so the caller can decide to use them.
#[derive(Debug, Error)]
#[error("pagination failed after {pages} pages: {source}")]
pub struct WalkError<T> {
    pub items: Vec<T>,
    pub pages: usize,
    #[source]
    pub source: TwitchError,
}

// =============================================================================
// Walker
// =============================================================================

/// Walks a paginated route through the executor.
#[derive(Debug, Clone)]
pub struct PageWalker<'a> {
    registry: &'a RouteRegistry,
    executor: &'a RequestExecutor,
    headers: HeaderMap,
    page_cap: usize,
}

impl<'a> PageWalker<'a> {
    pub fn new(registry: &'a RouteRegistry, executor: &'a RequestExecutor, headers: HeaderMap) -> Self {
        Self {
            registry,
            executor,
            headers,
            page_cap: DEFAULT_PAGE_CAP,
        }
    }

    /// Set the page cap (at least one page is always fetched).
    pub fn with_page_cap(mut self, page_cap: usize) -> Self {
        self.page_cap = page_cap.max(1);
        self
    }

    pub fn page_cap(&self) -> usize {
        self.page_cap
    }

    /// Walk `route` starting from `base_query` without a cursor, collecting
    /// every record.
    ///
    /// The predicate is called once per non-empty page; an empty page ends
    /// the walk without calling it. The page cap applies whatever the
    /// predicate decides.
    pub async fn walk<T, F>(
        &self,
        route: &str,
        base_query: &Query,
        mut predicate: F,
    ) -> Result<WalkOutcome<T>, WalkError<T>>
    where
        T: DeserializeOwned,
        F: FnMut(&PageView<'_, T>) -> PageControl,
    {
        let mut items: Vec<T> = Vec::new();

        let result = self
            .for_each_page(route, base_query, |index, page: Vec<T>| {
                let start = items.len();
                items.extend(page);
                predicate(&PageView {
                    index,
                    items: &items[start..],
                    total_items: items.len(),
                })
            })
            .await;

        match result {
            Ok(summary) => Ok(WalkOutcome {
                items,
                pages: summary.pages,
                stop_reason: summary.stop_reason,
            }),
            Err(e) => Err(WalkError {
                items,
                pages: e.pages,
                source: e.source,
            }),
        }
    }

    /// Walk `route` handing each non-empty page to `on_page` by value.
    ///
    /// `on_page` receives the zero-based page index and the page records in
    /// API order. Stop conditions are the same as for [`PageWalker::walk`].
    pub async fn for_each_page<T, F>(
        &self,
        route: &str,
        base_query: &Query,
        mut on_page: F,
    ) -> Result<WalkSummary, PageWalkError>
    where
        T: DeserializeOwned,
        F: FnMut(usize, Vec<T>) -> PageControl,
    {
        let span = info_span!("walk", route = %route, page_cap = self.page_cap);

        async move {
            let mut query = base_query.clone();
            query.remove(CURSOR_PARAM);

            let mut pages = 0usize;
            let mut records = 0usize;

            loop {
                let page = match self.fetch_page::<T>(route, &query).await {
                    Ok(page) => page,
                    Err(source) => {
                        return Err(PageWalkError {
                            pages,
                            records,
                            source,
                        })
                    }
                };
                pages += 1;
                record_page(route);

                let cursor = page.next_cursor().map(str::to_owned);
                let page_len = page.data.len();
                debug!(page = pages, records = page_len, has_cursor = cursor.is_some(), "Fetched page");

                if page.data.is_empty() {
                    return Ok(finish(route, pages, records, StopReason::EmptyPage));
                }

                records += page_len;
                if on_page(pages - 1, page.data) == PageControl::Stop {
                    return Ok(finish(route, pages, records, StopReason::Predicate));
                }
                let Some(cursor) = cursor else {
                    return Ok(finish(route, pages, records, StopReason::CursorExhausted));
                };
                if pages >= self.page_cap {
                    return Ok(finish(route, pages, records, StopReason::PageCap));
                }

                query.insert(CURSOR_PARAM.to_string(), cursor);
            }
        }
        .instrument(span)
        .await
    }

    /// Walk with a predicate that never stops early.
    pub async fn collect<T: DeserializeOwned>(
        &self,
        route: &str,
        base_query: &Query,
    ) -> Result<WalkOutcome<T>, WalkError<T>> {
        self.walk(route, base_query, |_| PageControl::Continue).await
    }

    async fn fetch_page<T: DeserializeOwned>(
        &self,
        route: &str,
        query: &Query,
    ) -> Result<Page<T>, TwitchError> {
        let url = self.registry.build_url(route, query)?;
        self.executor.get_json(route, &url, &self.headers).await
    }
}

fn finish(route: &str, pages: usize, records: usize, stop_reason: StopReason) -> WalkSummary {
    info!(
        route = %route,
        pages,
        records,
        stop_reason = ?stop_reason,
        "Pagination finished"
    );
    WalkSummary {
        pages,
        records,
        stop_reason,
    }
}
