//! Typed response schemas for catalog, cart and wishlist payloads
//!
//! The backend serializes decimal fields (prices, ratings) as strings. Every
//! schema here accepts both strings and JSON numbers so a payload either way
//! round-trips into `f64`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Product identifier as assigned by the backend
pub type ProductId = u64;

/// A catalog product, consumed as-is from the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub name: String,

    #[serde(deserialize_with = "decimal")]
    pub price: f64,

    #[serde(default, deserialize_with = "optional_decimal")]
    pub old_price: Option<f64>,

    #[serde(default)]
    pub stock: u32,

    #[serde(default, deserialize_with = "optional_decimal")]
    pub rating: Option<f64>,

    #[serde(default)]
    pub thumbnail: Option<String>,

    #[serde(default)]
    pub category_name: Option<String>,

    /// Category the product belongs to (used by local filtering)
    #[serde(default, alias = "category")]
    pub category_id: Option<u64>,

    /// Vendor selling the product (the "brand" filter of the shop)
    #[serde(default, alias = "vendor")]
    pub vendor_id: Option<u64>,

    #[serde(default)]
    pub menu_order: i64,

    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

impl Product {
    /// Minimal product, mostly useful for fixtures
    pub fn new(id: ProductId, name: impl Into<String>, price: f64) -> Self {
        Self {
            id,
            name: name.into(),
            price,
            old_price: None,
            stock: 1,
            rating: None,
            thumbnail: None,
            category_name: None,
            category_id: None,
            vendor_id: None,
            menu_order: 0,
            created_at: None,
        }
    }

    pub fn in_stock(&self) -> bool {
        self.stock > 0
    }

    /// Whole-percent discount when `old_price` is above `price`
    pub fn discount_percent(&self) -> Option<u32> {
        let old = self.old_price?;
        if old <= self.price || old <= 0.0 {
            return None;
        }
        Some((((old - self.price) / old) * 100.0).round() as u32)
    }
}

// =============================================================================
// Cart
// =============================================================================

/// One line of the cart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: u64,
    pub product: Product,
    pub quantity: u32,

    #[serde(default, deserialize_with = "optional_decimal")]
    pub total_price: Option<f64>,
}

impl CartItem {
    /// Line total, falling back to `price * quantity` when the backend omits it
    pub fn line_total(&self) -> f64 {
        self.total_price
            .unwrap_or(self.product.price * f64::from(self.quantity))
    }
}

/// The shopping cart of the current user or guest session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cart {
    pub id: u64,

    #[serde(default)]
    pub items: Vec<CartItem>,

    #[serde(default, deserialize_with = "optional_decimal")]
    pub total_price: Option<f64>,

    /// Guest session this cart is bound to, used for merging after login
    #[serde(default)]
    pub session_key: Option<String>,
}

impl Cart {
    pub fn item_count(&self) -> u32 {
        self.items.iter().map(|item| item.quantity).sum()
    }

    pub fn total(&self) -> f64 {
        self.total_price
            .unwrap_or_else(|| self.items.iter().map(CartItem::line_total).sum())
    }

    pub fn find_product(&self, product_id: ProductId) -> Option<&CartItem> {
        self.items.iter().find(|item| item.product.id == product_id)
    }
}

// =============================================================================
// Wishlist
// =============================================================================

/// A wishlist entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistItem {
    pub id: u64,
    pub product: Product,
}

/// Response of the wishlist toggle endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WishlistToggle {
    /// Whether the product is in the wishlist after the toggle
    #[serde(alias = "in_wishlist")]
    pub added: bool,

    #[serde(default)]
    pub item: Option<WishlistItem>,
}

// =============================================================================
// Decimal helpers
// =============================================================================

#[derive(Deserialize)]
#[serde(untagged)]
enum Decimal {
    Number(f64),
    Text(String),
}

impl Decimal {
    fn into_f64<E: serde::de::Error>(self) -> Result<f64, E> {
        match self {
            Decimal::Number(n) => Ok(n),
            Decimal::Text(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| E::custom(format!("invalid decimal '{}'", s))),
        }
    }
}

pub(crate) fn decimal<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    Decimal::deserialize(deserializer)?.into_f64()
}

pub(crate) fn optional_decimal<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Decimal>::deserialize(deserializer)?
        .map(Decimal::into_f64)
        .transpose()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_product_accepts_decimal_strings() {
        let product: Product = serde_json::from_value(json!({
            "id": 3,
            "name": "Desk lamp",
            "price": "19.90",
            "old_price": "24.90",
            "stock": 4,
            "rating": 4.5,
            "thumbnail": "https://cdn/lamp.jpg",
            "category": 7
        }))
        .unwrap();

        assert_eq!(product.price, 19.90);
        assert_eq!(product.old_price, Some(24.90));
        assert_eq!(product.rating, Some(4.5));
        assert_eq!(product.category_id, Some(7));
        assert_eq!(product.discount_percent(), Some(20));
    }

    #[test]
    fn test_product_rejects_garbage_price() {
        let result: Result<Product, _> =
            serde_json::from_value(json!({"id": 1, "name": "x", "price": "cheap"}));
        assert!(result.is_err());
    }

    #[test]
    fn test_cart_totals() {
        let cart: Cart = serde_json::from_value(json!({
            "id": 1,
            "items": [
                {"id": 10, "quantity": 2, "product": {"id": 1, "name": "a", "price": "5.00"}},
                {"id": 11, "quantity": 1, "product": {"id": 2, "name": "b", "price": 2.5}}
            ]
        }))
        .unwrap();

        assert_eq!(cart.item_count(), 3);
        assert_eq!(cart.total(), 12.5);
        assert_eq!(cart.find_product(2).map(|i| i.id), Some(11));
    }

    #[test]
    fn test_no_discount_when_not_cheaper() {
        let mut product = Product::new(1, "x", 10.0);
        product.old_price = Some(10.0);
        assert_eq!(product.discount_percent(), None);
    }
}
