//! Shop page orchestrator
//!
//! [`ShopPage`] glues the filter store, the paginated query and the grid
//! renderer together. It is the only owner of the accumulated result set.
//!
//! # State machine
//!
//! ```text
//!            emission / sort change
//!   Idle ───────────────────────────▶ FilterChanging ──reset──▶ FetchingInitial
//!    ▲ ▲                                                             │
//!    │ └──────────────── first page / error ─────────────────────────┘
//!    │
//!    └──── next page / error ──── FetchingNext ◀──── scroll end (cursor, idle)
//! ```
//!
//! Requests run on spawned tasks and report back through a channel;
//! [`ShopPage::step`] waits for the next completion or debounce deadline and
//! applies it. Nothing blocks the caller while a request is outstanding.

use crate::catalog::CatalogSource;
use crate::config::CatalogConfig;
use crate::core::{
    BrandId, CategoryId, FilterDescriptor, FilterKey, PriceRange, Product, ProductId, ProductPage,
    QueryParams, Result, RetryPolicy, SortKey, StorefrontError,
};
use crate::shop::cache::QueryCache;
use crate::shop::filter_store::FilterStore;
use crate::shop::grid::{GridContext, GridLayout, GridView, render_grid};
use crate::shop::paginated::{PageTicket, PaginatedQuery, Resolution, Start};
use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::time::Instant;

/// Default viewport width until the first resize
const DEFAULT_VIEWPORT_WIDTH: u32 = 1024;

/// Orchestrator states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShopState {
    Idle,
    FetchingInitial,
    FetchingNext,
    FilterChanging,
}

/// What a call to [`ShopPage::step`] changed
#[derive(Debug, Clone)]
pub enum ShopUpdate {
    /// A debounced filter change was emitted and a new query started
    FiltersEmitted(FilterDescriptor),
    /// A page for the current query arrived
    PageLoaded { page: u32, received: usize },
    /// A request for the current query failed; earlier results are kept
    FetchFailed(StorefrontError),
    /// A response for superseded params arrived and was dropped
    StaleDiscarded,
}

/// Everything the shop template renders
#[derive(Debug, Clone, Serialize)]
pub struct ShopView {
    pub state: ShopState,
    pub grid: GridView,
    pub total: Option<usize>,
    pub has_more: bool,
    pub fetching_more: bool,
    pub filters: FilterDescriptor,
}

struct Completion {
    ticket: PageTicket,
    result: Result<ProductPage>,
}

/// Builder for [`ShopPage`]
///
/// # Example
///
/// ```ignore
/// let mut shop = ShopPageBuilder::new(Arc::new(catalog))
///     .with_catalog_config(&config.catalog)
///     .with_layout(config.grid.clone())
///     .mount();
/// shop.settle().await;
/// ```
pub struct ShopPageBuilder {
    source: Arc<dyn CatalogSource>,
    cache: Option<Arc<QueryCache>>,
    catalog: CatalogConfig,
    layout: GridLayout,
    viewport_width: u32,
    wishlisted: HashSet<ProductId>,
}

impl ShopPageBuilder {
    pub fn new(source: Arc<dyn CatalogSource>) -> Self {
        Self {
            source,
            cache: None,
            catalog: CatalogConfig::default(),
            layout: GridLayout::default(),
            viewport_width: DEFAULT_VIEWPORT_WIDTH,
            wishlisted: HashSet::new(),
        }
    }

    /// Share a query cache across mounts
    pub fn with_cache(mut self, cache: Arc<QueryCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn with_catalog_config(mut self, catalog: &CatalogConfig) -> Self {
        self.catalog = catalog.clone();
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.catalog.retry = retry;
        self
    }

    pub fn with_layout(mut self, layout: GridLayout) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_viewport_width(mut self, width: u32) -> Self {
        self.viewport_width = width;
        self
    }

    pub fn with_wishlisted(mut self, wishlisted: HashSet<ProductId>) -> Self {
        self.wishlisted = wishlisted;
        self
    }

    /// Create the page and start loading the first page
    ///
    /// Must be called inside a tokio runtime.
    pub fn mount(self) -> ShopPage {
        let cache = self
            .cache
            .unwrap_or_else(|| Arc::new(QueryCache::new(self.catalog.stale_after())));
        let query = PaginatedQuery::new(self.source, self.catalog.retry, cache);
        let filters = FilterStore::new(self.catalog.price_domain, self.catalog.debounce());
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();

        let mut page = ShopPage {
            filters,
            query,
            ordering: self.catalog.ordering.clone(),
            page_size: self.catalog.page_size,
            layout: self.layout,
            viewport_width: self.viewport_width,
            wishlisted: self.wishlisted,
            state: ShopState::Idle,
            results: Vec::new(),
            total: None,
            error: None,
            outstanding: 0,
            completions_tx,
            completions_rx,
        };
        let initial = page.filters.emitted().clone();
        page.restart(initial);
        page
    }
}

/// The shop page
pub struct ShopPage {
    filters: FilterStore,
    query: PaginatedQuery,
    ordering: SortKey,
    page_size: usize,
    layout: GridLayout,
    viewport_width: u32,
    wishlisted: HashSet<ProductId>,
    state: ShopState,
    results: Vec<Product>,
    total: Option<usize>,
    error: Option<StorefrontError>,
    outstanding: usize,
    completions_tx: mpsc::UnboundedSender<Completion>,
    completions_rx: mpsc::UnboundedReceiver<Completion>,
}

impl ShopPage {
    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn state(&self) -> ShopState {
        self.state
    }

    /// The accumulated result set
    pub fn products(&self) -> &[Product] {
        &self.results
    }

    pub fn error(&self) -> Option<&StorefrontError> {
        self.error.as_ref()
    }

    pub fn total(&self) -> Option<usize> {
        self.total
    }

    pub fn has_more(&self) -> bool {
        self.query.has_next()
    }

    /// Filter state as the controls show it
    pub fn filters(&self) -> &FilterDescriptor {
        self.filters.current()
    }

    /// Filter state the current query was built from
    pub fn applied_filters(&self) -> &FilterDescriptor {
        self.filters.emitted()
    }

    pub fn params(&self) -> Option<&QueryParams> {
        self.query.params()
    }

    pub fn ordering(&self) -> &SortKey {
        &self.ordering
    }

    /// Whether a request or a debounced emission is still pending
    pub fn is_settled(&self) -> bool {
        self.outstanding == 0 && self.filters.deadline().is_none()
    }

    // =========================================================================
    // UI events
    // =========================================================================

    pub fn toggle_category(&mut self, id: CategoryId) {
        if let Some(descriptor) = self.filters.toggle_category(id) {
            self.restart(descriptor);
        }
    }

    pub fn toggle_brand(&mut self, id: BrandId) {
        if let Some(descriptor) = self.filters.toggle_brand(id) {
            self.restart(descriptor);
        }
    }

    /// Slider moved; the query follows after the quiet period
    pub fn set_price_range(&mut self, min: f64, max: f64) {
        self.filters.set_price_range(min, max, Instant::now());
    }

    pub fn set_price_min(&mut self, min: f64) {
        self.filters.set_price_min(min, Instant::now());
    }

    pub fn set_price_max(&mut self, max: f64) {
        self.filters.set_price_max(max, Instant::now());
    }

    /// Slider released: apply a pending price change without waiting
    pub fn commit_price(&mut self) {
        if let Some(descriptor) = self.filters.flush() {
            self.restart(descriptor);
        }
    }

    pub fn clear_filter(&mut self, key: FilterKey) {
        if let Some(descriptor) = self.filters.clear_filter(key) {
            self.restart(descriptor);
        }
    }

    pub fn clear_all(&mut self) {
        if let Some(descriptor) = self.filters.clear_all() {
            self.restart(descriptor);
        }
    }

    /// Bound the price slider by the catalog's observed prices
    pub fn set_price_domain(&mut self, domain: PriceRange) {
        if let Some(descriptor) = self.filters.set_domain(domain) {
            self.restart(descriptor);
        }
    }

    pub fn set_ordering(&mut self, ordering: SortKey) {
        if ordering == self.ordering {
            return;
        }
        self.ordering = ordering;
        let descriptor = self.filters.emitted().clone();
        self.restart(descriptor);
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        if page_size == self.page_size {
            return;
        }
        self.page_size = page_size;
        let descriptor = self.filters.emitted().clone();
        self.restart(descriptor);
    }

    /// The infinite-scroll sentinel became visible
    ///
    /// Returns whether a request was issued.
    pub fn on_scroll_end(&mut self) -> bool {
        if self.state != ShopState::Idle {
            return false;
        }
        match self.query.fetch_next_page() {
            Some(ticket) => {
                self.transition(ShopState::FetchingNext);
                self.spawn(ticket);
                true
            }
            None => false,
        }
    }

    /// Re-issue the request that failed last
    pub fn retry(&mut self) -> bool {
        if self.state != ShopState::Idle {
            return false;
        }
        match self.query.retry() {
            Some(ticket) => {
                self.error = None;
                self.transition(if ticket.is_initial() {
                    ShopState::FetchingInitial
                } else {
                    ShopState::FetchingNext
                });
                self.spawn(ticket);
                true
            }
            None => false,
        }
    }

    /// Drop cached pages for the current params and load them again
    pub fn reload(&mut self) {
        self.results.clear();
        self.total = None;
        self.error = None;
        if let Some(ticket) = self.query.reload(Instant::now()) {
            self.transition(ShopState::FetchingInitial);
            self.spawn(ticket);
        }
    }

    /// The viewport was resized; only the layout changes
    pub fn resize(&mut self, viewport_width: u32) {
        self.viewport_width = viewport_width;
    }

    pub fn set_wishlisted(&mut self, wishlisted: HashSet<ProductId>) {
        self.wishlisted = wishlisted;
    }

    // =========================================================================
    // Event loop
    // =========================================================================

    /// Wait for the next completion or debounce deadline and apply it
    ///
    /// Returns `None` when nothing is pending.
    pub async fn step(&mut self) -> Option<ShopUpdate> {
        enum Wake {
            Deadline,
            Completion(Completion),
        }

        let deadline = self.filters.deadline();
        if self.outstanding == 0 && deadline.is_none() {
            return None;
        }

        let wake = tokio::select! {
            _ = tokio::time::sleep_until(deadline.unwrap_or_else(Instant::now)), if deadline.is_some() => Wake::Deadline,
            Some(completion) = self.completions_rx.recv(), if self.outstanding > 0 => Wake::Completion(completion),
        };

        match wake {
            Wake::Deadline => {
                let descriptor = self.filters.poll(Instant::now())?;
                self.restart(descriptor.clone());
                Some(ShopUpdate::FiltersEmitted(descriptor))
            }
            Wake::Completion(completion) => {
                self.outstanding -= 1;
                Some(self.complete(completion))
            }
        }
    }

    /// Drive the page until no request or emission is pending
    pub async fn settle(&mut self) -> Vec<ShopUpdate> {
        let mut updates = Vec::new();
        while !self.is_settled() {
            if let Some(update) = self.step().await {
                updates.push(update);
            }
        }
        updates
    }

    /// Current view model
    pub fn view(&self) -> ShopView {
        let loading = matches!(
            self.state,
            ShopState::FetchingInitial | ShopState::FilterChanging
        );
        let ctx = GridContext {
            layout: &self.layout,
            viewport_width: self.viewport_width,
            wishlisted: &self.wishlisted,
        };
        ShopView {
            state: self.state,
            grid: render_grid(&self.results, loading, self.error.as_ref(), &ctx),
            total: self.total,
            has_more: self.query.has_next(),
            fetching_more: self.state == ShopState::FetchingNext,
            filters: self.filters.current().clone(),
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Switch the query to a new identity; results never mix identities
    fn restart(&mut self, descriptor: FilterDescriptor) {
        self.transition(ShopState::FilterChanging);
        self.results.clear();
        self.total = None;
        self.error = None;

        let params = QueryParams::new(descriptor, self.ordering.clone(), self.page_size);
        match self.query.start(params, Instant::now()) {
            Start::Cached(cached) => {
                self.results = cached.products();
                self.total = cached.total();
                self.transition(ShopState::Idle);
            }
            Start::Fetch(ticket) => {
                self.transition(ShopState::FetchingInitial);
                self.spawn(ticket);
            }
        }
    }

    fn spawn(&mut self, ticket: PageTicket) {
        let request = self.query.execute(&ticket);
        let tx = self.completions_tx.clone();
        self.outstanding += 1;
        tokio::spawn(async move {
            let result = request.await;
            // The page may have been dropped meanwhile
            let _ = tx.send(Completion { ticket, result });
        });
    }

    fn complete(&mut self, completion: Completion) -> ShopUpdate {
        let Completion { ticket, result } = completion;
        match self.query.resolve(&ticket, result, Instant::now()) {
            Resolution::Loaded { cursor, page } => {
                let received = page.results.len();
                if cursor.is_first() {
                    self.results = page.results;
                } else {
                    self.results.extend(page.results);
                }
                self.total = Some(page.count);
                self.error = None;
                self.transition(ShopState::Idle);
                ShopUpdate::PageLoaded {
                    page: cursor.number(),
                    received,
                }
            }
            Resolution::Failed { cursor, error } => {
                tracing::warn!(%cursor, error = %error, "Catalog page failed");
                self.error = Some(error.clone());
                self.transition(ShopState::Idle);
                ShopUpdate::FetchFailed(error)
            }
            Resolution::Discarded => ShopUpdate::StaleDiscarded,
        }
    }

    fn transition(&mut self, next: ShopState) {
        if self.state != next {
            tracing::debug!(from = ?self.state, to = ?next, "Shop state");
            self.state = next;
        }
    }
}
