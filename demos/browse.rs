//! Browsing session against the in-memory catalog
//!
//! Mounts a shop page, narrows it by category, drags the price slider,
//! scrolls to the end and prints the grid after each step.
//!
//! ```sh
//! RUST_LOG=storefront=debug cargo run --example browse
//! ```

use anyhow::Result;
use std::sync::Arc;
use std::time::Duration;
use storefront::prelude::*;
use tracing_subscriber::EnvFilter;

const CATEGORIES: [(u64, &str); 3] = [(1, "Lighting"), (2, "Furniture"), (3, "Textiles")];

fn catalog() -> InMemoryCatalog {
    let products = (1..=40u64)
        .map(|id| {
            let (category, category_name) = CATEGORIES[(id % 3) as usize];
            let mut product =
                Product::new(id, format!("{} #{}", category_name, id), 15.0 + (id * 7 % 90) as f64);
            product.category_id = Some(category);
            product.category_name = Some(category_name.to_string());
            product.vendor_id = Some(id % 4 + 1);
            product.menu_order = id as i64;
            product.stock = (id % 5) as u32;
            product.rating = Some(3.0 + (id % 3) as f64 * 0.5);
            if id % 6 == 0 {
                product.old_price = Some(product.price * 1.25);
            }
            product
        })
        .collect();
    InMemoryCatalog::new(products).with_latency(Duration::from_millis(80))
}

fn show(title: &str, shop: &ShopPage) {
    let view = shop.view();
    println!("== {} ==", title);
    println!(
        "{} of {} products, more: {}",
        shop.products().len(),
        view.total.unwrap_or(0),
        view.has_more
    );
    print!("{}", view.grid);
    println!();
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("storefront=info")),
        )
        .init();

    let config = StorefrontConfig::from_env()?;
    let catalog = Arc::new(catalog());

    let mut shop = ShopPageBuilder::new(catalog.clone())
        .with_catalog_config(&config.catalog)
        .with_layout(config.grid.clone())
        .with_viewport_width(800)
        .mount();
    shop.settle().await;
    show("All products", &shop);

    shop.toggle_category(CategoryId(2));
    shop.settle().await;
    show("Furniture", &shop);

    // Dragging the slider: only the last position is queried
    for max in [90.0, 75.0, 60.0] {
        shop.set_price_max(max);
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    shop.settle().await;
    show("Furniture up to 60", &shop);

    while shop.on_scroll_end() {
        shop.settle().await;
    }
    show("Scrolled to the end", &shop);

    shop.set_ordering(SortKey::PriceAsc);
    shop.resize(1280);
    shop.settle().await;
    show("Cheapest first, wide screen", &shop);

    println!("Requests sent:");
    for request in catalog.requests() {
        println!("  GET /api/vendors/products/?{}", request);
    }
    Ok(())
}
