//! Core types shared by the client and the shop page

pub mod error;
pub mod filter;
pub mod product;
pub mod query;
pub mod retry;

pub use error::{
    AuthError, ConfigError, NetworkError, ParseError, Result, StorefrontError,
};
pub use filter::{BrandId, CategoryId, FilterDescriptor, FilterKey, PriceRange};
pub use product::{Cart, CartItem, Product, ProductId, WishlistItem, WishlistToggle};
pub use query::{Cursor, ProductPage, QueryKey, QueryParams, RawProductPage, SortKey};
pub use retry::RetryPolicy;
