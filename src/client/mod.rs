//! Backend access: the HTTP gateway, the session and the cart/wishlist contexts

pub mod cart;
pub mod gateway;
pub mod session;
pub mod wishlist;

pub use cart::CartContext;
pub use gateway::ApiClient;
pub use session::{LogoutReason, Session, SessionEvent, TokenPair};
pub use wishlist::WishlistContext;
