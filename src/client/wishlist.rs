//! Wishlist context over the wishlist endpoints

use crate::client::gateway::ApiClient;
use crate::core::{ProductId, Result, WishlistItem, WishlistToggle};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashSet;
use std::sync::{Arc, RwLock};

const WISHLIST_PATH: &str = "/api/users/wishlist/";
const TOGGLE_PATH: &str = "/api/users/wishlist/toggle/";

fn item_path(item_id: u64) -> String {
    format!("/api/users/wishlist/{}/", item_id)
}

/// The list endpoint is paginated on some deployments and a bare array on others
#[derive(Deserialize)]
#[serde(untagged)]
enum WishlistListing {
    Page { results: Vec<WishlistItem> },
    Plain(Vec<WishlistItem>),
}

impl WishlistListing {
    fn into_items(self) -> Vec<WishlistItem> {
        match self {
            WishlistListing::Page { results } => results,
            WishlistListing::Plain(items) => items,
        }
    }
}

/// Wishlist of the logged in user
pub struct WishlistContext {
    api: Arc<ApiClient>,
    items: RwLock<Vec<WishlistItem>>,
}

impl WishlistContext {
    pub fn new(api: Arc<ApiClient>) -> Self {
        Self {
            api,
            items: RwLock::new(Vec::new()),
        }
    }

    pub fn items(&self) -> Vec<WishlistItem> {
        match self.items.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Products currently wishlisted, for marking grid cards
    pub fn product_ids(&self) -> HashSet<ProductId> {
        self.items().iter().map(|item| item.product.id).collect()
    }

    pub fn contains(&self, product_id: ProductId) -> bool {
        self.items().iter().any(|item| item.product.id == product_id)
    }

    /// Reload from the backend
    pub async fn refresh(&self) -> Result<Vec<WishlistItem>> {
        let listing: WishlistListing = self.api.get(WISHLIST_PATH, &[]).await?;
        let items = listing.into_items();
        self.update(|current| *current = items.clone());
        Ok(items)
    }

    /// Add a product
    pub async fn add(&self, product_id: ProductId) -> Result<WishlistItem> {
        let item: WishlistItem = self
            .api
            .post(WISHLIST_PATH, &json!({ "product_id": product_id }))
            .await?;
        let added = item.clone();
        self.update(move |current| {
            current.retain(|i| i.id != added.id);
            current.push(added);
        });
        Ok(item)
    }

    /// Remove an entry by its wishlist id
    pub async fn remove(&self, item_id: u64) -> Result<()> {
        self.api.delete(&item_path(item_id)).await?;
        self.update(|current| current.retain(|i| i.id != item_id));
        Ok(())
    }

    /// Toggle a product; returns whether it is wishlisted afterwards
    pub async fn toggle(&self, product_id: ProductId) -> Result<bool> {
        let toggle: WishlistToggle = self
            .api
            .post(TOGGLE_PATH, &json!({ "product_id": product_id }))
            .await?;

        match (toggle.added, toggle.item) {
            (true, Some(item)) => self.update(move |current| {
                current.retain(|i| i.product.id != product_id);
                current.push(item);
            }),
            // Added without the entry in the response: reload to learn its id
            (true, None) => {
                self.refresh().await?;
            }
            (false, _) => self.update(|current| current.retain(|i| i.product.id != product_id)),
        }
        tracing::debug!(product_id, added = toggle.added, "Wishlist toggled");
        Ok(toggle.added)
    }

    /// Forget the local state (on logout)
    pub fn reset(&self) {
        self.update(|current| current.clear());
    }

    fn update<F: FnOnce(&mut Vec<WishlistItem>)>(&self, f: F) {
        match self.items.write() {
            Ok(mut guard) => f(&mut guard),
            Err(poisoned) => f(&mut poisoned.into_inner()),
        }
    }
}
