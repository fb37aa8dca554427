//! Normalized filter state of the shop page

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// Category identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategoryId(pub u64);

/// Brand identifier; brands are vendors on the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BrandId(pub u64);

impl fmt::Display for CategoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for BrandId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Closed price interval, `min <= max`
///
/// Deserialized values go through [`PriceRange::new`], so a domain read from
/// a config file is always ordered and finite.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "PriceBounds")]
pub struct PriceRange {
    pub min: f64,
    pub max: f64,
}

#[derive(Deserialize)]
struct PriceBounds {
    min: f64,
    max: f64,
}

impl From<PriceBounds> for PriceRange {
    fn from(bounds: PriceBounds) -> Self {
        PriceRange::new(bounds.min, bounds.max)
    }
}

impl PriceRange {
    /// Build a range, ordering the bounds if needed
    ///
    /// A non-finite bound falls back to the default one. Used for domains;
    /// user input goes through the clamping rules of [`FilterDescriptor`].
    pub fn new(min: f64, max: f64) -> Self {
        let fallback = Self::default();
        let min = if min.is_finite() { min } else { fallback.min };
        let max = if max.is_finite() { max } else { fallback.max };
        if min <= max {
            Self { min, max }
        } else {
            Self { min: max, max: min }
        }
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

impl Default for PriceRange {
    fn default() -> Self {
        Self {
            min: 0.0,
            max: 1000.0,
        }
    }
}

/// Individual filters that can be cleared on their own
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterKey {
    Categories,
    Brands,
    PriceRange,
}

/// The user's selected filters
///
/// Invariant: `domain.min <= price_range.min <= price_range.max <= domain.max`.
/// Every mutator preserves it by clamping; out-of-range input is corrected,
/// never rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterDescriptor {
    pub categories: BTreeSet<CategoryId>,
    pub brands: BTreeSet<BrandId>,
    pub price_range: PriceRange,

    /// Price domain of the catalog; bounds for `price_range`
    pub domain: PriceRange,
}

impl FilterDescriptor {
    /// Defaults for a freshly mounted shop page
    pub fn new(domain: PriceRange) -> Self {
        let domain = PriceRange::new(domain.min, domain.max);
        Self {
            categories: BTreeSet::new(),
            brands: BTreeSet::new(),
            price_range: domain,
            domain,
        }
    }

    /// Toggle membership of a category
    pub fn toggle_category(&mut self, id: CategoryId) {
        if !self.categories.remove(&id) {
            self.categories.insert(id);
        }
    }

    /// Toggle membership of a brand
    pub fn toggle_brand(&mut self, id: BrandId) {
        if !self.brands.remove(&id) {
            self.brands.insert(id);
        }
    }

    /// Set both price bounds
    ///
    /// Bounds are clamped to the domain; a min above the max is lowered to
    /// the max. Non-finite values leave the corresponding bound unchanged.
    pub fn set_price_range(&mut self, min: f64, max: f64) {
        let max = if max.is_finite() {
            self.domain.clamp(max)
        } else {
            self.price_range.max
        };
        let min = if min.is_finite() {
            self.domain.clamp(min)
        } else {
            self.price_range.min
        };
        self.price_range = PriceRange {
            min: min.min(max),
            max,
        };
    }

    /// Move the lower handle; clamped to `[domain.min, current max]`
    pub fn set_price_min(&mut self, min: f64) {
        if min.is_finite() {
            self.price_range.min = min.clamp(self.domain.min, self.price_range.max);
        }
    }

    /// Move the upper handle; clamped to `[current min, domain.max]`
    pub fn set_price_max(&mut self, max: f64) {
        if max.is_finite() {
            self.price_range.max = max.clamp(self.price_range.min, self.domain.max);
        }
    }

    /// Replace the price domain, e.g. once the catalog's prices are known
    ///
    /// A bound that did not narrow the old domain follows the new one; a
    /// narrowing bound is clamped into it.
    pub fn set_domain(&mut self, domain: PriceRange) {
        let domain = PriceRange::new(domain.min, domain.max);
        let min = match self.price_min() {
            Some(min) => domain.clamp(min),
            None => domain.min,
        };
        let max = match self.price_max() {
            Some(max) => domain.clamp(max),
            None => domain.max,
        };
        self.domain = domain;
        self.price_range = PriceRange {
            min: min.min(max),
            max,
        };
    }

    /// Reset one filter to its default
    pub fn clear(&mut self, key: FilterKey) {
        match key {
            FilterKey::Categories => self.categories.clear(),
            FilterKey::Brands => self.brands.clear(),
            FilterKey::PriceRange => self.price_range = self.domain,
        }
    }

    /// Reset every filter to its default
    pub fn clear_all(&mut self) {
        *self = Self::new(self.domain);
    }

    /// Whether no filter narrows the catalog
    pub fn is_default(&self) -> bool {
        self.categories.is_empty() && self.brands.is_empty() && self.price_range == self.domain
    }

    /// Lower price bound, only when it narrows the domain
    pub fn price_min(&self) -> Option<f64> {
        (self.price_range.min > self.domain.min).then_some(self.price_range.min)
    }

    /// Upper price bound, only when it narrows the domain
    pub fn price_max(&self) -> Option<f64> {
        (self.price_range.max < self.domain.max).then_some(self.price_range.max)
    }
}

impl Default for FilterDescriptor {
    fn default() -> Self {
        Self::new(PriceRange::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toggle_is_membership_flip() {
        let mut filters = FilterDescriptor::default();
        filters.toggle_category(CategoryId(7));
        assert!(filters.categories.contains(&CategoryId(7)));
        filters.toggle_category(CategoryId(7));
        assert!(filters.categories.is_empty());
        assert!(filters.is_default());
    }

    #[test]
    fn test_price_range_clamps_to_domain() {
        let mut filters = FilterDescriptor::default();
        filters.set_price_range(-50.0, 5000.0);
        assert_eq!(filters.price_range, PriceRange::new(0.0, 1000.0));
        assert_eq!(filters.price_min(), None);
        assert_eq!(filters.price_max(), None);
    }

    #[test]
    fn test_inverted_range_is_clamped_not_swapped() {
        let mut filters = FilterDescriptor::default();
        filters.set_price_range(400.0, 300.0);
        assert_eq!(filters.price_range.min, 300.0);
        assert_eq!(filters.price_range.max, 300.0);
    }

    #[test]
    fn test_single_handles_respect_each_other() {
        let mut filters = FilterDescriptor::default();
        filters.set_price_max(200.0);
        filters.set_price_min(350.0);
        assert_eq!(filters.price_range.min, 200.0);

        filters.set_price_min(100.0);
        filters.set_price_max(50.0);
        assert_eq!(filters.price_range.max, 100.0);
    }

    #[test]
    fn test_non_finite_input_is_ignored() {
        let mut filters = FilterDescriptor::default();
        filters.set_price_range(f64::NAN, 300.0);
        assert_eq!(filters.price_range, PriceRange::new(0.0, 300.0));
        filters.set_price_min(f64::INFINITY);
        assert_eq!(filters.price_range.min, 0.0);
    }

    #[test]
    fn test_inverted_domain_is_reordered() {
        let domain: PriceRange = serde_json::from_value(serde_json::json!({
            "min": 1000.0,
            "max": 0.0
        }))
        .unwrap();
        assert_eq!(domain, PriceRange::new(0.0, 1000.0));

        let mut filters = FilterDescriptor::new(PriceRange {
            min: 500.0,
            max: 100.0,
        });
        filters.set_price_range(50.0, 300.0);
        filters.set_price_min(120.0);
        filters.set_price_max(900.0);
        assert_eq!(filters.domain, PriceRange::new(100.0, 500.0));
        assert_eq!(filters.price_range, PriceRange::new(120.0, 500.0));
    }

    #[test]
    fn test_non_finite_domain_falls_back() {
        assert_eq!(
            PriceRange::new(f64::NAN, 200.0),
            PriceRange::new(0.0, 200.0)
        );
        assert_eq!(
            PriceRange::new(50.0, f64::INFINITY),
            PriceRange::new(50.0, 1000.0)
        );
    }

    #[test]
    fn test_set_domain_reclamps_selection() {
        let mut filters = FilterDescriptor::default();
        filters.set_domain(PriceRange::new(0.0, 400.0));
        assert!(filters.is_default(), "unnarrowed bounds follow the domain");

        filters.set_price_range(100.0, 300.0);
        filters.set_domain(PriceRange::new(150.0, 250.0));
        assert_eq!(filters.price_range, PriceRange::new(150.0, 250.0));
        assert_eq!(filters.price_min(), None);

        // The lower bound sits on the domain edge, so it widens with it
        filters.set_price_max(200.0);
        filters.set_domain(PriceRange::new(0.0, 1000.0));
        assert_eq!(filters.price_range, PriceRange::new(0.0, 200.0));
    }

    #[test]
    fn test_clear_single_filter() {
        let mut filters = FilterDescriptor::default();
        filters.toggle_brand(BrandId(2));
        filters.set_price_range(10.0, 20.0);
        filters.clear(FilterKey::PriceRange);
        assert_eq!(filters.price_range, filters.domain);
        assert!(filters.brands.contains(&BrandId(2)));
        filters.clear_all();
        assert!(filters.is_default());
    }
}
