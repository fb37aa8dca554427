//! Cart context over the cart endpoints

use crate::client::gateway::ApiClient;
use crate::core::{Cart, CartItem, ProductId, Result};
use serde_json::json;
use std::sync::{Arc, RwLock};

const CURRENT_CART_PATH: &str = "/api/cart/carts/current/";
const ADD_ITEM_PATH: &str = "/api/cart/carts/add_item/";
const MERGE_CART_PATH: &str = "/api/cart/carts/merge_cart/";

fn item_path(item_id: u64) -> String {
    format!("/api/cart/items/{}/", item_id)
}

/// The cart of the current user, with the last state the backend returned
///
/// Every mutation goes to the backend first; the local snapshot only changes
/// once the backend has confirmed it.
pub struct CartContext {
    api: Arc<ApiClient>,
    cart: RwLock<Option<Cart>>,
}

impl CartContext {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            cart: RwLock::new(None),
        }
    }

    /// Last known cart, if it was loaded
    pub fn snapshot(&self) -> Option<Cart> {
        match self.cart.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Number of units in the cart (header badge)
    pub fn item_count(&self) -> u32 {
        self.snapshot().map(|cart| cart.item_count()).unwrap_or(0)
    }

    /// Quantity of one product currently in the cart
    pub fn quantity_of(&self, product_id: ProductId) -> u32 {
        self.snapshot()
            .and_then(|cart| cart.find_product(product_id).map(|item| item.quantity))
            .unwrap_or(0)
    }

    /// Reload the cart from the backend
    pub async fn refresh(&self) -> Result<Cart> {
        let cart: Cart = self.api.get(CURRENT_CART_PATH, &[]).await?;
        self.store(cart.clone());
        Ok(cart)
    }

    /// Add `quantity` units of a product
    pub async fn add_item(&self, product_id: ProductId, quantity: u32) -> Result<Cart> {
        let quantity = quantity.max(1);
        let cart: Cart = self
            .api
            .post(
                ADD_ITEM_PATH,
                &json!({ "product_id": product_id, "quantity": quantity }),
            )
            .await?;
        tracing::debug!(product_id, quantity, "Added to cart");
        self.store(cart.clone());
        Ok(cart)
    }

    /// Change the quantity of a cart line; zero removes the line
    pub async fn update_quantity(&self, item_id: u64, quantity: u32) -> Result<Cart> {
        if quantity == 0 {
            return self.remove_item(item_id).await;
        }
        let _: CartItem = self
            .api
            .patch(&item_path(item_id), &json!({ "quantity": quantity }))
            .await?;
        self.refresh().await
    }

    /// Remove a cart line
    pub async fn remove_item(&self, item_id: u64) -> Result<Cart> {
        self.api.delete(&item_path(item_id)).await?;
        tracing::debug!(item_id, "Removed from cart");
        self.refresh().await
    }

    /// Merge a guest cart into the cart of the logged in user
    pub async fn merge_guest_cart(&self, session_key: &str) -> Result<Cart> {
        let cart: Cart = self
            .api
            .post(MERGE_CART_PATH, &json!({ "session_key": session_key }))
            .await?;
        tracing::info!(items = cart.items.len(), "Guest cart merged");
        self.store(cart.clone());
        Ok(cart)
    }

    /// Forget the local snapshot (on logout)
    pub fn reset(&self) {
        self.write(None);
    }

    fn store(&self, cart: Cart) {
        self.write(Some(cart));
    }

    fn write(&self, cart: Option<Cart>) {
        match self.cart.write() {
            Ok(mut guard) => *guard = cart,
            Err(poisoned) => *poisoned.into_inner() = cart,
        }
    }
}
