//! Filter state store with debounced price emission
//!
//! The store keeps two descriptors: the *current* one, which follows every
//! user interaction so controls render responsively, and the *emitted* one,
//! which is what the query layer has been told about.
//!
//! - Category and brand toggles and clears emit at once.
//! - Price changes arm a quiet-period deadline; each new change pushes it
//!   back. When it passes, [`FilterStore::poll`] emits the latest state.
//! - An emission equal to the previously emitted descriptor is suppressed.
//!
//! Time is passed in explicitly, so the coalescing policy does not depend on
//! who drives the clock.

use crate::core::{BrandId, CategoryId, FilterDescriptor, FilterKey, PriceRange};
use std::time::Duration;
use tokio::time::Instant;

/// Default quiet period for price changes
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

/// Holds the user's filter selection and decides when to emit it
#[derive(Debug, Clone)]
pub struct FilterStore {
    current: FilterDescriptor,
    emitted: FilterDescriptor,
    quiet_period: Duration,
    deadline: Option<Instant>,
}

impl FilterStore {
    /// A store with default filters; the defaults count as already emitted
    pub fn new(domain: PriceRange, quiet_period: Duration) -> Self {
        let defaults = FilterDescriptor::new(domain);
        Self {
            current: defaults.clone(),
            emitted: defaults,
            quiet_period,
            deadline: None,
        }
    }

    /// State the controls should render
    pub fn current(&self) -> &FilterDescriptor {
        &self.current
    }

    /// Last descriptor handed to the query layer
    pub fn emitted(&self) -> &FilterDescriptor {
        &self.emitted
    }

    /// When a pending price change will be emitted
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }

    pub fn toggle_category(&mut self, id: CategoryId) -> Option<FilterDescriptor> {
        self.current.toggle_category(id);
        self.emit_now()
    }

    pub fn toggle_brand(&mut self, id: BrandId) -> Option<FilterDescriptor> {
        self.current.toggle_brand(id);
        self.emit_now()
    }

    /// Update both price bounds; emission waits for the quiet period
    pub fn set_price_range(&mut self, min: f64, max: f64, now: Instant) {
        self.current.set_price_range(min, max);
        self.arm(now);
    }

    pub fn set_price_min(&mut self, min: f64, now: Instant) {
        self.current.set_price_min(min);
        self.arm(now);
    }

    pub fn set_price_max(&mut self, max: f64, now: Instant) {
        self.current.set_price_max(max);
        self.arm(now);
    }

    pub fn clear_filter(&mut self, key: FilterKey) -> Option<FilterDescriptor> {
        self.current.clear(key);
        self.emit_now()
    }

    pub fn clear_all(&mut self) -> Option<FilterDescriptor> {
        self.current.clear_all();
        self.emit_now()
    }

    /// Adopt a new price domain
    ///
    /// Both descriptors are re-clamped. The emitted one is returned only when
    /// the bounds sent to the backend changed; a pending price change stays
    /// pending.
    pub fn set_domain(&mut self, domain: PriceRange) -> Option<FilterDescriptor> {
        let sent = (self.emitted.price_min(), self.emitted.price_max());
        self.current.set_domain(domain);
        self.emitted.set_domain(domain);
        if (self.emitted.price_min(), self.emitted.price_max()) == sent {
            return None;
        }
        tracing::debug!(
            domain_min = self.emitted.domain.min,
            domain_max = self.emitted.domain.max,
            "Price domain narrowed the applied filters"
        );
        Some(self.emitted.clone())
    }

    /// Emit the pending price change if its quiet period has passed
    pub fn poll(&mut self, now: Instant) -> Option<FilterDescriptor> {
        match self.deadline {
            Some(deadline) if now >= deadline => self.emit_now(),
            _ => None,
        }
    }

    /// Emit a pending price change right away (e.g. slider released)
    pub fn flush(&mut self) -> Option<FilterDescriptor> {
        self.deadline?;
        self.emit_now()
    }

    fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.quiet_period);
    }

    /// The current state is emitted in full, which settles any pending change
    fn emit_now(&mut self) -> Option<FilterDescriptor> {
        self.deadline = None;
        if self.current == self.emitted {
            tracing::trace!("Filters unchanged, emission skipped");
            return None;
        }
        self.emitted = self.current.clone();
        tracing::debug!(
            categories = ?self.emitted.categories,
            brands = ?self.emitted.brands,
            price_min = self.emitted.price_range.min,
            price_max = self.emitted.price_range.max,
            "Filters emitted"
        );
        Some(self.emitted.clone())
    }
}

impl Default for FilterStore {
    fn default() -> Self {
        Self::new(PriceRange::default(), DEFAULT_DEBOUNCE)
    }
}
