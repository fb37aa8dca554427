//! Query parameters and pagination types for the catalog endpoint
//!
//! A [`QueryParams`] is the projection of the shop's filter state plus sort and
//! page size. Its [`QueryKey`] (the canonical query string of every non-page
//! field) is the identity of a paginated query: pages fetched under one key
//! may be concatenated, pages from different keys never are.
//!
//! # Example
//! ```rust,ignore
//! let params = QueryParams::new(filters, SortKey::MenuOrder, 12);
//! // GET /api/vendors/products/?page=1&page_size=12&ordering=menu_order
//! let pairs = params.to_pairs(Cursor::first());
//! ```

use crate::core::error::ParseError;
use crate::core::filter::FilterDescriptor;
use crate::core::product::Product;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default number of products per page
pub const DEFAULT_PAGE_SIZE: usize = 12;

/// Largest page size the backend accepts
pub const MAX_PAGE_SIZE: usize = 100;

/// Sort order understood by the catalog endpoint
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum SortKey {
    /// Merchandiser-defined order
    #[default]
    MenuOrder,
    PriceAsc,
    PriceDesc,
    Newest,
    TopRated,
    Name,
    /// Any other ordering expression the backend supports
    Custom(String),
}

impl SortKey {
    /// The `ordering` query value
    pub fn as_str(&self) -> &str {
        match self {
            SortKey::MenuOrder => "menu_order",
            SortKey::PriceAsc => "price",
            SortKey::PriceDesc => "-price",
            SortKey::Newest => "-created_at",
            SortKey::TopRated => "-rating",
            SortKey::Name => "name",
            SortKey::Custom(s) => s,
        }
    }

    /// Parse an ordering expression
    pub fn parse(s: &str) -> Self {
        match s {
            "" | "menu_order" => SortKey::MenuOrder,
            "price" => SortKey::PriceAsc,
            "-price" => SortKey::PriceDesc,
            "-created_at" => SortKey::Newest,
            "-rating" => SortKey::TopRated,
            "name" => SortKey::Name,
            other => SortKey::Custom(other.to_string()),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<SortKey> for String {
    fn from(key: SortKey) -> Self {
        key.as_str().to_string()
    }
}

impl From<String> for SortKey {
    fn from(s: String) -> Self {
        SortKey::parse(&s)
    }
}

/// Pointer to a page of results (page numbers start at 1)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cursor(u32);

impl Cursor {
    pub fn first() -> Self {
        Cursor(1)
    }

    /// Cursor for an explicit page number; page 0 is treated as page 1
    pub fn page(page: u32) -> Self {
        Cursor(page.max(1))
    }

    pub fn number(&self) -> u32 {
        self.0
    }

    pub fn is_first(&self) -> bool {
        self.0 == 1
    }

    /// Derive a cursor from the backend's `next` link
    ///
    /// The link may be absolute or relative; only its `page` query parameter
    /// is used, the rest of the request is rebuilt from [`QueryParams`].
    pub fn from_next_link(link: &str) -> Result<Self, ParseError> {
        let invalid = |message: &str| ParseError::Cursor {
            value: link.to_string(),
            message: message.to_string(),
        };

        let query = link
            .split_once('?')
            .map(|(_, query)| query)
            .ok_or_else(|| invalid("missing query string"))?;
        let query = query.split('#').next().unwrap_or_default();

        let page = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(key, _)| *key == "page")
            .map(|(_, value)| value)
            .ok_or_else(|| invalid("missing 'page' parameter"))?;

        match page.parse::<u32>() {
            Ok(n) if n >= 1 => Ok(Cursor(n)),
            _ => Err(invalid("'page' is not a positive integer")),
        }
    }
}

impl fmt::Display for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "page {}", self.0)
    }
}

/// Identity of a paginated query: the canonical query string without `page`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QueryKey(Arc<str>);

impl QueryKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Filters plus sort and page size; read-only once built
#[derive(Debug, Clone, PartialEq)]
pub struct QueryParams {
    filters: FilterDescriptor,
    ordering: SortKey,
    page_size: usize,
    key: QueryKey,
}

impl QueryParams {
    /// Build params; the page size is clamped to `1..=MAX_PAGE_SIZE`
    pub fn new(filters: FilterDescriptor, ordering: SortKey, page_size: usize) -> Self {
        let page_size = page_size.clamp(1, MAX_PAGE_SIZE);
        let key = Self::compute_key(&filters, &ordering, page_size);
        Self {
            filters,
            ordering,
            page_size,
            key,
        }
    }

    pub fn filters(&self) -> &FilterDescriptor {
        &self.filters
    }

    pub fn ordering(&self) -> &SortKey {
        &self.ordering
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    pub fn key(&self) -> &QueryKey {
        &self.key
    }

    /// Query pairs for one page, in wire order
    ///
    /// `page`, `page_size` and `ordering` are always present; filter
    /// parameters appear only when they narrow the catalog.
    pub fn to_pairs(&self, cursor: Cursor) -> IndexMap<&'static str, String> {
        let mut pairs = IndexMap::new();
        pairs.insert("page", cursor.number().to_string());
        pairs.extend(self.filter_pairs());
        pairs
    }

    fn filter_pairs(&self) -> IndexMap<&'static str, String> {
        Self::non_page_pairs(&self.filters, &self.ordering, self.page_size)
    }

    fn non_page_pairs(
        filters: &FilterDescriptor,
        ordering: &SortKey,
        page_size: usize,
    ) -> IndexMap<&'static str, String> {
        let mut pairs = IndexMap::new();
        pairs.insert("page_size", page_size.to_string());
        pairs.insert("ordering", ordering.as_str().to_string());

        if !filters.categories.is_empty() {
            pairs.insert("category", join(filters.categories.iter()));
        }
        if !filters.brands.is_empty() {
            pairs.insert("vendor", join(filters.brands.iter()));
        }
        if let Some(min) = filters.price_min() {
            pairs.insert("price_min", format_price(min));
        }
        if let Some(max) = filters.price_max() {
            pairs.insert("price_max", format_price(max));
        }
        pairs
    }

    fn compute_key(filters: &FilterDescriptor, ordering: &SortKey, page_size: usize) -> QueryKey {
        let encoded = Self::non_page_pairs(filters, ordering, page_size)
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&");
        QueryKey(encoded.into())
    }
}

fn join<T: fmt::Display>(items: impl Iterator<Item = T>) -> String {
    items.map(|i| i.to_string()).collect::<Vec<_>>().join(",")
}

/// Prices are sent without a trailing `.0` when whole
fn format_price(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}

/// Wire shape of a catalog page
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RawProductPage {
    pub results: Vec<Product>,
    #[serde(default)]
    pub next: Option<String>,
    #[serde(default)]
    pub previous: Option<String>,
    pub count: usize,
}

/// One page of catalog results; immutable once fetched
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub results: Vec<Product>,
    pub next: Option<Cursor>,
    pub count: usize,
}

impl ProductPage {
    pub fn has_next(&self) -> bool {
        self.next.is_some()
    }
}

impl TryFrom<RawProductPage> for ProductPage {
    type Error = ParseError;

    fn try_from(raw: RawProductPage) -> Result<Self, Self::Error> {
        let next = raw
            .next
            .as_deref()
            .filter(|link| !link.is_empty())
            .map(Cursor::from_next_link)
            .transpose()?;
        Ok(Self {
            results: raw.results,
            next,
            count: raw.count,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::filter::{BrandId, CategoryId};

    fn query_string(params: &QueryParams, cursor: Cursor) -> String {
        params
            .to_pairs(cursor)
            .iter()
            .map(|(k, v)| format!("{}={}", k, v))
            .collect::<Vec<_>>()
            .join("&")
    }

    #[test]
    fn test_default_params_wire_form() {
        let params = QueryParams::new(FilterDescriptor::default(), SortKey::default(), 12);
        assert_eq!(
            query_string(&params, Cursor::first()),
            "page=1&page_size=12&ordering=menu_order"
        );
    }

    #[test]
    fn test_filters_on_the_wire() {
        let mut filters = FilterDescriptor::default();
        filters.toggle_category(CategoryId(9));
        filters.toggle_category(CategoryId(7));
        filters.toggle_brand(BrandId(3));
        filters.set_price_range(50.0, 299.5);
        let params = QueryParams::new(filters, SortKey::PriceDesc, 24);

        assert_eq!(
            query_string(&params, Cursor::page(2)),
            "page=2&page_size=24&ordering=-price&category=7,9&vendor=3&price_min=50&price_max=299.5"
        );
    }

    #[test]
    fn test_key_ignores_page_but_not_page_size() {
        let a = QueryParams::new(FilterDescriptor::default(), SortKey::default(), 12);
        let b = QueryParams::new(FilterDescriptor::default(), SortKey::default(), 12);
        let c = QueryParams::new(FilterDescriptor::default(), SortKey::default(), 24);
        assert_eq!(a.key(), b.key());
        assert_ne!(a.key(), c.key());
        assert!(!a.key().as_str().contains("page="));
    }

    #[test]
    fn test_page_size_is_clamped() {
        let params = QueryParams::new(FilterDescriptor::default(), SortKey::default(), 0);
        assert_eq!(params.page_size(), 1);
        let params = QueryParams::new(FilterDescriptor::default(), SortKey::default(), 1000);
        assert_eq!(params.page_size(), MAX_PAGE_SIZE);
    }

    #[test]
    fn test_cursor_from_next_link() {
        let cursor = Cursor::from_next_link(
            "http://api.example.com/api/vendors/products/?category=7&page=3&page_size=12",
        )
        .unwrap();
        assert_eq!(cursor.number(), 3);

        assert!(Cursor::from_next_link("/api/vendors/products/").is_err());
        assert!(Cursor::from_next_link("/api/vendors/products/?page=zero").is_err());
        assert!(Cursor::from_next_link("/api/vendors/products/?page=0").is_err());
    }

    #[test]
    fn test_sort_key_round_trips_through_strings() {
        assert_eq!(SortKey::parse("-price"), SortKey::PriceDesc);
        assert_eq!(SortKey::parse("-stock"), SortKey::Custom("-stock".to_string()));
        assert_eq!(SortKey::parse(""), SortKey::MenuOrder);
    }
}
