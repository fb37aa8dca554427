//! Product grid view model
//!
//! [`render_grid`] is a pure function of the product list, the loading flag
//! and the last error. It decides between four mutually exclusive outputs:
//!
//! | input                          | output                                  |
//! |--------------------------------|-----------------------------------------|
//! | `loading`                      | skeleton sized to the column count      |
//! | error                          | retry affordance + previous products    |
//! | no products                    | explicit empty state                    |
//! | otherwise                      | product rows                            |

use crate::core::{Product, ProductId, StorefrontError};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Column count from `min_width` (pixels) upwards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Breakpoint {
    pub min_width: u32,
    pub columns: usize,
}

/// Responsive layout rules
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridLayout {
    /// Sorted by `min_width`, first entry at 0
    pub breakpoints: Vec<Breakpoint>,

    /// Rows of placeholders shown while the first page loads
    pub skeleton_rows: usize,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self {
            breakpoints: vec![
                Breakpoint { min_width: 0, columns: 1 },
                Breakpoint { min_width: 480, columns: 2 },
                Breakpoint { min_width: 768, columns: 3 },
                Breakpoint { min_width: 1024, columns: 4 },
            ],
            skeleton_rows: 2,
        }
    }
}

impl GridLayout {
    /// Column count for a viewport width (step function over the breakpoints)
    pub fn columns_for(&self, viewport_width: u32) -> usize {
        self.breakpoints
            .iter()
            .take_while(|bp| bp.min_width <= viewport_width)
            .last()
            .map(|bp| bp.columns)
            .unwrap_or(1)
            .max(1)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.breakpoints.is_empty() {
            return Err("at least one breakpoint is required".to_string());
        }
        if self.breakpoints.iter().any(|bp| bp.columns == 0) {
            return Err("columns must be at least 1".to_string());
        }
        if self
            .breakpoints
            .windows(2)
            .any(|pair| pair[0].min_width >= pair[1].min_width)
        {
            return Err("breakpoints must be sorted by increasing min_width".to_string());
        }
        Ok(())
    }
}

/// Everything about a card the template needs
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductCard {
    pub id: ProductId,
    pub name: String,
    pub price: String,
    pub old_price: Option<String>,
    pub discount_percent: Option<u32>,
    pub in_stock: bool,
    pub rating: Option<f64>,
    pub thumbnail: Option<String>,
    pub category_name: Option<String>,
    pub wishlisted: bool,
}

impl ProductCard {
    pub fn from_product(product: &Product, wishlisted: bool) -> Self {
        Self {
            id: product.id,
            name: product.name.clone(),
            price: format_price(product.price),
            old_price: product
                .discount_percent()
                .and(product.old_price)
                .map(format_price),
            discount_percent: product.discount_percent(),
            in_stock: product.in_stock(),
            rating: product.rating,
            thumbnail: product.thumbnail.clone(),
            category_name: product.category_name.clone(),
            wishlisted,
        }
    }
}

fn format_price(value: f64) -> String {
    format!("{:.2}", value)
}

/// What the error banner offers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorAction {
    /// Try the same request again
    Retry,
    /// The session is gone; go to the login screen
    Login,
}

/// Rendered grid
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GridView {
    Skeleton {
        columns: usize,
        placeholders: usize,
    },
    Error {
        message: String,
        code: &'static str,
        action: ErrorAction,
        columns: usize,
        rows: Vec<Vec<ProductCard>>,
    },
    Empty,
    Items {
        columns: usize,
        rows: Vec<Vec<ProductCard>>,
    },
}

impl GridView {
    /// Products shown, in display order
    pub fn product_ids(&self) -> Vec<ProductId> {
        match self {
            GridView::Items { rows, .. } | GridView::Error { rows, .. } => {
                rows.iter().flatten().map(|card| card.id).collect()
            }
            GridView::Skeleton { .. } | GridView::Empty => Vec::new(),
        }
    }

    pub fn product_count(&self) -> usize {
        self.product_ids().len()
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, GridView::Skeleton { .. })
    }
}

/// Layout inputs that are not part of the data
#[derive(Debug, Clone, Copy)]
pub struct GridContext<'a> {
    pub layout: &'a GridLayout,
    pub viewport_width: u32,
    pub wishlisted: &'a HashSet<ProductId>,
}

/// Render the product grid
pub fn render_grid(
    products: &[Product],
    loading: bool,
    error: Option<&StorefrontError>,
    ctx: &GridContext<'_>,
) -> GridView {
    let columns = ctx.layout.columns_for(ctx.viewport_width);

    if loading {
        return GridView::Skeleton {
            columns,
            placeholders: columns * ctx.layout.skeleton_rows.max(1),
        };
    }

    let rows = || -> Vec<Vec<ProductCard>> {
        products
            .chunks(columns)
            .map(|chunk| {
                chunk
                    .iter()
                    .map(|p| ProductCard::from_product(p, ctx.wishlisted.contains(&p.id)))
                    .collect()
            })
            .collect()
    };

    if let Some(error) = error {
        return GridView::Error {
            message: error.to_string(),
            code: error.error_code(),
            action: if error.requires_login() {
                ErrorAction::Login
            } else {
                ErrorAction::Retry
            },
            columns,
            rows: rows(),
        };
    }

    if products.is_empty() {
        return GridView::Empty;
    }

    GridView::Items {
        columns,
        rows: rows(),
    }
}

impl fmt::Display for GridView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let write_rows = |f: &mut fmt::Formatter<'_>, rows: &[Vec<ProductCard>]| -> fmt::Result {
            for row in rows {
                let cells: Vec<String> = row
                    .iter()
                    .map(|card| {
                        let mut cell = format!("#{} {} {}", card.id, card.name, card.price);
                        if let Some(discount) = card.discount_percent {
                            cell.push_str(&format!(" (-{}%)", discount));
                        }
                        if !card.in_stock {
                            cell.push_str(" [sold out]");
                        }
                        if card.wishlisted {
                            cell.push_str(" ♥");
                        }
                        cell
                    })
                    .collect();
                writeln!(f, "| {} |", cells.join(" | "))?;
            }
            Ok(())
        };

        match self {
            GridView::Skeleton { placeholders, .. } => {
                writeln!(f, "{}", "[....] ".repeat(*placeholders).trim_end())
            }
            GridView::Error {
                message,
                action,
                rows,
                ..
            } => {
                write_rows(f, rows)?;
                let hint = match action {
                    ErrorAction::Retry => "retry",
                    ErrorAction::Login => "log in",
                };
                writeln!(f, "! {} ({})", message, hint)
            }
            GridView::Empty => writeln!(f, "No products match these filters."),
            GridView::Items { rows, .. } => write_rows(f, rows),
        }
    }
}
