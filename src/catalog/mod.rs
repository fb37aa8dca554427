//! Catalog sources
//!
//! The shop page never talks HTTP directly: it asks a [`CatalogSource`] for one
//! page of products. The backend implementation lives on [`ApiClient`]; the
//! in-memory one serves fixtures for tests and demos with the same filtering,
//! ordering and pagination rules.

use crate::client::ApiClient;
use crate::core::{Cursor, ProductPage, QueryParams, RawProductPage, Result};
use async_trait::async_trait;

#[cfg(feature = "in-memory")]
pub mod in_memory;

#[cfg(feature = "in-memory")]
pub use in_memory::InMemoryCatalog;

/// Catalog query endpoint
pub const PRODUCTS_PATH: &str = "/api/vendors/products/";

/// Source of catalog pages
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Fetch the page at `cursor` for the given params (single attempt)
    async fn fetch_page(&self, params: &QueryParams, cursor: Cursor) -> Result<ProductPage>;
}

#[async_trait]
impl CatalogSource for ApiClient {
    async fn fetch_page(&self, params: &QueryParams, cursor: Cursor) -> Result<ProductPage> {
        let query: Vec<(&str, String)> = params.to_pairs(cursor).into_iter().collect();
        let raw: RawProductPage = self.get(PRODUCTS_PATH, &query).await?;
        Ok(ProductPage::try_from(raw)?)
    }
}
