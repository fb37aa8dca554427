//! The shop page: filter state, paginated catalog query and product grid

pub mod cache;
pub mod filter_store;
pub mod grid;
pub mod page;
pub mod paginated;

pub use cache::{CachedQuery, QueryCache};
pub use filter_store::FilterStore;
pub use grid::{GridContext, GridLayout, GridView, ProductCard, render_grid};
pub use page::{ShopPage, ShopPageBuilder, ShopState, ShopUpdate, ShopView};
pub use paginated::{PageTicket, PaginatedQuery, Resolution, Start};
