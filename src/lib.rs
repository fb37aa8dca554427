//! # Storefront
//!
//! Client-side core of a multi-vendor storefront: catalog browsing with
//! filters and infinite scroll, the cart and wishlist, and a session that
//! refreshes its tokens on its own.
//!
//! ## Features
//!
//! - **Filter state**: category and brand toggles emit at once, price slider
//!   changes are debounced and collapse into a single query
//! - **Infinite list**: page-by-page loading that never mixes results from
//!   different filter or sort selections
//! - **Stale-response safety**: responses for superseded queries are dropped
//! - **Query cache**: switching back to a recent selection is instant
//! - **Token refresh**: a rejected access token is refreshed once and the
//!   request replayed; concurrent rejections share one refresh
//! - **Typed errors**: network, parse, auth and config failures are distinct
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use storefront::prelude::*;
//!
//! let app = AppContext::new(StorefrontConfig::from_env()?)?;
//! let mut shop = app.shop_page();
//! shop.settle().await;
//!
//! shop.toggle_category(CategoryId(7));
//! shop.settle().await;
//! println!("{}", shop.view().grid);
//!
//! if shop.on_scroll_end() {
//!     shop.settle().await;
//! }
//! ```

pub mod app;
pub mod catalog;
pub mod client;
pub mod config;
pub mod core;
pub mod geocode;
pub mod shop;

/// Re-exports of commonly used types and traits
pub mod prelude {
    // === Application ===
    pub use crate::app::AppContext;
    pub use crate::config::{ApiConfig, CatalogConfig, GeocoderConfig, StorefrontConfig};

    // === Core types ===
    pub use crate::core::{
        AuthError, BrandId, Cart, CartItem, CategoryId, ConfigError, Cursor, FilterDescriptor,
        FilterKey, NetworkError, ParseError, PriceRange, Product, ProductId, ProductPage,
        QueryKey, QueryParams, Result, RetryPolicy, SortKey, StorefrontError, WishlistItem,
    };

    // === Catalog ===
    pub use crate::catalog::CatalogSource;

    #[cfg(feature = "in-memory")]
    pub use crate::catalog::InMemoryCatalog;

    // === Client ===
    pub use crate::client::{
        ApiClient, CartContext, LogoutReason, Session, SessionEvent, TokenPair, WishlistContext,
    };

    // === Shop page ===
    pub use crate::shop::{
        FilterStore, GridLayout, GridView, QueryCache, ShopPage, ShopPageBuilder, ShopState,
        ShopUpdate, ShopView,
    };

    // === Geocoding ===
    pub use crate::geocode::{Geocoder, Place};

    // === External dependencies ===
    pub use async_trait::async_trait;
}
