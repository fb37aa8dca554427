//! Paginated catalog query with request identity tracking
//!
//! [`PaginatedQuery`] decides *which* page request may go out and whether a
//! response is still wanted; it does not own the accumulated results. Each
//! request is described by a [`PageTicket`] tagged with the generation of the
//! params it was issued for. Changing params bumps the generation, so a
//! response that arrives for older params is recognised and discarded.

use crate::catalog::CatalogSource;
use crate::core::{Cursor, ProductPage, QueryParams, Result, RetryPolicy, StorefrontError};
use crate::shop::cache::{CachedQuery, QueryCache};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;

/// One page request, tagged with the identity it belongs to
#[derive(Debug, Clone)]
pub struct PageTicket {
    generation: u64,
    params: Arc<QueryParams>,
    cursor: Cursor,
}

impl PageTicket {
    pub fn cursor(&self) -> Cursor {
        self.cursor
    }

    pub fn params(&self) -> &QueryParams {
        &self.params
    }

    /// Whether this is the first page of its identity
    pub fn is_initial(&self) -> bool {
        self.cursor.is_first()
    }
}

/// Outcome of [`PaginatedQuery::start`]
#[derive(Debug)]
pub enum Start {
    /// Fresh pages were in the cache; nothing to fetch
    Cached(CachedQuery),
    /// The first page has to be fetched
    Fetch(PageTicket),
}

/// Outcome of [`PaginatedQuery::resolve`]
#[derive(Debug)]
pub enum Resolution {
    /// The page belongs to the current identity
    Loaded { cursor: Cursor, page: ProductPage },
    /// The request for the current identity failed
    Failed {
        cursor: Cursor,
        error: StorefrontError,
    },
    /// The response belongs to params that were superseded
    Discarded,
}

/// Request bookkeeping for the shop page's infinite list
pub struct PaginatedQuery {
    source: Arc<dyn CatalogSource>,
    retry: RetryPolicy,
    cache: Arc<QueryCache>,
    generation: u64,
    params: Option<Arc<QueryParams>>,
    next_cursor: Option<Cursor>,
    in_flight: Option<Cursor>,
    failed: Option<Cursor>,
}

impl PaginatedQuery {
    pub fn new(source: Arc<dyn CatalogSource>, retry: RetryPolicy, cache: Arc<QueryCache>) -> Self {
        Self {
            source,
            retry,
            cache,
            generation: 0,
            params: None,
            next_cursor: None,
            in_flight: None,
            failed: None,
        }
    }

    pub fn params(&self) -> Option<&QueryParams> {
        self.params.as_deref()
    }

    pub fn is_fetching(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn has_next(&self) -> bool {
        self.next_cursor.is_some()
    }

    pub fn next_cursor(&self) -> Option<Cursor> {
        self.next_cursor
    }

    /// Switch to new params
    ///
    /// Any request still in flight for the previous params is superseded.
    pub fn start(&mut self, params: QueryParams, now: Instant) -> Start {
        self.generation += 1;
        self.in_flight = None;
        self.failed = None;
        self.next_cursor = None;

        let params = Arc::new(params);
        self.params = Some(params.clone());

        if let Some(cached) = self.cache.fresh(params.key(), now) {
            tracing::debug!(key = %params.key(), pages = cached.pages.len(), "Serving query from cache");
            self.next_cursor = cached.next;
            return Start::Cached(cached);
        }

        Start::Fetch(self.issue(params, Cursor::first()))
    }

    /// Restart the current params from page 1, bypassing the cache
    pub fn reload(&mut self, now: Instant) -> Option<PageTicket> {
        let params = self.params.clone()?;
        self.cache.invalidate(params.key());
        match self.start(QueryParams::clone(&params), now) {
            Start::Fetch(ticket) => Some(ticket),
            Start::Cached(_) => None,
        }
    }

    /// Ticket for the next page, or `None` when there is no next page or a
    /// request for this identity is already in flight
    pub fn fetch_next_page(&mut self) -> Option<PageTicket> {
        if let Some(cursor) = self.in_flight {
            tracing::trace!(%cursor, "Fetch already in flight, next page ignored");
            return None;
        }
        let cursor = self.next_cursor?;
        let params = self.params.clone()?;
        Some(self.issue(params, cursor))
    }

    /// Ticket re-issuing the request that failed last
    pub fn retry(&mut self) -> Option<PageTicket> {
        if self.in_flight.is_some() {
            return None;
        }
        let cursor = self.failed.take()?;
        let params = self.params.clone()?;
        Some(self.issue(params, cursor))
    }

    /// Feed a finished request back
    pub fn resolve(
        &mut self,
        ticket: &PageTicket,
        result: Result<ProductPage>,
        now: Instant,
    ) -> Resolution {
        if ticket.generation != self.generation {
            tracing::warn!(
                cursor = %ticket.cursor,
                key = %ticket.params.key(),
                "Discarding response for superseded query"
            );
            return Resolution::Discarded;
        }

        self.in_flight = None;
        match result {
            Ok(page) => {
                self.next_cursor = page.next;
                self.cache
                    .store(ticket.params.key(), ticket.cursor, page.clone(), now);
                Resolution::Loaded {
                    cursor: ticket.cursor,
                    page,
                }
            }
            Err(error) => {
                self.failed = Some(ticket.cursor);
                Resolution::Failed {
                    cursor: ticket.cursor,
                    error,
                }
            }
        }
    }

    /// Future performing the request of `ticket`, retries included
    ///
    /// The future owns everything it needs and can be spawned.
    pub fn execute(
        &self,
        ticket: &PageTicket,
    ) -> impl Future<Output = Result<ProductPage>> + Send + 'static {
        let source = self.source.clone();
        let retry = self.retry;
        let params = ticket.params.clone();
        let cursor = ticket.cursor;
        async move { fetch_with_retry(source.as_ref(), retry, &params, cursor).await }
    }

    /// Fetch one page for arbitrary params, with retries, without touching
    /// the identity bookkeeping
    pub async fn fetch_page(&self, params: &QueryParams, cursor: Cursor) -> Result<ProductPage> {
        fetch_with_retry(self.source.as_ref(), self.retry, params, cursor).await
    }

    fn issue(&mut self, params: Arc<QueryParams>, cursor: Cursor) -> PageTicket {
        self.in_flight = Some(cursor);
        self.failed = None;
        tracing::debug!(generation = self.generation, %cursor, key = %params.key(), "Page requested");
        PageTicket {
            generation: self.generation,
            params,
            cursor,
        }
    }
}

async fn fetch_with_retry(
    source: &dyn CatalogSource,
    retry: RetryPolicy,
    params: &QueryParams,
    cursor: Cursor,
) -> Result<ProductPage> {
    let what = format!("catalog {}", cursor);
    retry
        .run(&what, || source.fetch_page(params, cursor))
        .await
}
