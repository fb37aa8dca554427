//! In-memory implementation of CatalogSource for testing and development

use crate::catalog::{CatalogSource, PRODUCTS_PATH};
use crate::core::{
    Cursor, NetworkError, Product, ProductPage, QueryParams, RawProductPage, Result, SortKey,
};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};
use std::time::Duration;

#[derive(Default)]
struct State {
    products: Vec<Product>,
    requests: Vec<String>,
    failures_left: u32,
}

/// In-memory catalog
///
/// Applies the backend's filter, ordering and pagination rules to a fixed set
/// of products. Every request is recorded as its query string so tests can
/// assert on what the shop page asked for.
#[derive(Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<State>>,
    latency: Option<Duration>,
}

impl InMemoryCatalog {
    /// Create a catalog over the given products
    pub fn new(products: Vec<Product>) -> Self {
        Self {
            state: Arc::new(RwLock::new(State {
                products,
                ..State::default()
            })),
            latency: None,
        }
    }

    /// Delay every response by `latency`
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    pub fn insert(&self, product: Product) {
        self.with_state(|state| state.products.push(product));
    }

    /// Make the next `n` requests fail with a 503
    pub fn fail_next(&self, n: u32) {
        self.with_state(|state| state.failures_left = n);
    }

    /// Query strings of every request received so far
    pub fn requests(&self) -> Vec<String> {
        self.with_state(|state| state.requests.clone())
    }

    fn with_state<T>(&self, f: impl FnOnce(&mut State) -> T) -> T {
        match self.state.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }

    fn query(&self, params: &QueryParams, cursor: Cursor) -> Result<RawProductPage> {
        let query_string = encode(params, cursor);
        let url = format!("{}?{}", PRODUCTS_PATH, query_string);

        self.with_state(|state| {
            state.requests.push(query_string.clone());

            if state.failures_left > 0 {
                state.failures_left -= 1;
                return Err(NetworkError::Status {
                    url: url.clone(),
                    status: StatusCode::SERVICE_UNAVAILABLE,
                    body: String::new(),
                }
                .into());
            }

            let filters = params.filters();
            let mut matching: Vec<Product> = state
                .products
                .iter()
                .filter(|p| {
                    filters.categories.is_empty()
                        || p.category_id
                            .is_some_and(|c| filters.categories.iter().any(|id| id.0 == c))
                })
                .filter(|p| {
                    filters.brands.is_empty()
                        || p.vendor_id
                            .is_some_and(|v| filters.brands.iter().any(|id| id.0 == v))
                })
                .filter(|p| filters.price_min().is_none_or(|min| p.price >= min))
                .filter(|p| filters.price_max().is_none_or(|max| p.price <= max))
                .cloned()
                .collect();

            matching.sort_by(|a, b| compare(params.ordering(), a, b));

            let count = matching.len();
            let size = params.page_size();
            let start = (cursor.number() as usize - 1) * size;
            if start >= count && !cursor.is_first() {
                return Err(NetworkError::Status {
                    url: url.clone(),
                    status: StatusCode::NOT_FOUND,
                    body: "Invalid page.".to_string(),
                }
                .into());
            }

            let results: Vec<Product> = matching.into_iter().skip(start).take(size).collect();
            let next = (start + size < count).then(|| {
                format!(
                    "{}?{}",
                    PRODUCTS_PATH,
                    encode(params, Cursor::page(cursor.number() + 1))
                )
            });

            Ok(RawProductPage {
                results,
                next,
                previous: None,
                count,
            })
        })
    }
}

#[async_trait]
impl CatalogSource for InMemoryCatalog {
    async fn fetch_page(&self, params: &QueryParams, cursor: Cursor) -> Result<ProductPage> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        let raw = self.query(params, cursor)?;
        Ok(ProductPage::try_from(raw)?)
    }
}

fn encode(params: &QueryParams, cursor: Cursor) -> String {
    params
        .to_pairs(cursor)
        .iter()
        .map(|(k, v)| format!("{}={}", k, v))
        .collect::<Vec<_>>()
        .join("&")
}

fn compare(ordering: &SortKey, a: &Product, b: &Product) -> Ordering {
    let primary = match ordering {
        SortKey::PriceAsc => a.price.total_cmp(&b.price),
        SortKey::PriceDesc => b.price.total_cmp(&a.price),
        SortKey::Newest => b.created_at.cmp(&a.created_at),
        SortKey::TopRated => b
            .rating
            .unwrap_or(0.0)
            .total_cmp(&a.rating.unwrap_or(0.0)),
        SortKey::Name => a.name.to_lowercase().cmp(&b.name.to_lowercase()),
        SortKey::MenuOrder | SortKey::Custom(_) => a.menu_order.cmp(&b.menu_order),
    };
    primary.then(a.id.cmp(&b.id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{CategoryId, FilterDescriptor};

    fn catalog() -> InMemoryCatalog {
        let products = (1..=30)
            .map(|i| {
                let mut p = Product::new(i, format!("Product {}", i), (i * 10) as f64);
                p.category_id = Some(if i % 2 == 0 { 7 } else { 9 });
                p.menu_order = i as i64;
                p
            })
            .collect();
        InMemoryCatalog::new(products)
    }

    #[tokio::test]
    async fn test_pages_and_next_cursor() {
        let catalog = catalog();
        let params = QueryParams::new(FilterDescriptor::default(), SortKey::MenuOrder, 12);

        let first = catalog.fetch_page(&params, Cursor::first()).await.unwrap();
        assert_eq!(first.results.len(), 12);
        assert_eq!(first.count, 30);
        assert_eq!(first.next, Some(Cursor::page(2)));

        let last = catalog.fetch_page(&params, Cursor::page(3)).await.unwrap();
        assert_eq!(last.results.len(), 6);
        assert_eq!(last.next, None);

        let err = catalog.fetch_page(&params, Cursor::page(4)).await.unwrap_err();
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_filters_and_ordering() {
        let catalog = catalog();
        let mut filters = FilterDescriptor::default();
        filters.toggle_category(CategoryId(7));
        filters.set_price_range(50.0, 200.0);
        let params = QueryParams::new(filters, SortKey::PriceDesc, 12);

        let page = catalog.fetch_page(&params, Cursor::first()).await.unwrap();
        let prices: Vec<f64> = page.results.iter().map(|p| p.price).collect();
        assert_eq!(prices, vec![200.0, 180.0, 160.0, 140.0, 120.0, 100.0, 80.0, 60.0]);
        assert_eq!(
            catalog.requests(),
            vec!["page=1&page_size=12&ordering=-price&category=7&price_min=50&price_max=200"]
        );
    }

    #[tokio::test]
    async fn test_injected_failures_are_transient() {
        let catalog = catalog();
        catalog.fail_next(1);
        let params = QueryParams::new(FilterDescriptor::default(), SortKey::MenuOrder, 12);

        let err = catalog.fetch_page(&params, Cursor::first()).await.unwrap_err();
        assert!(err.is_transient());
        assert!(catalog.fetch_page(&params, Cursor::first()).await.is_ok());
    }
}
