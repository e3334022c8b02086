//! Tradable-universe filter.
//!
//! A row survives when the entity's previous-date price is strictly above
//! the floor and the signal, predicted beta and specific risk are all
//! present. The predicate reads only the row itself, so the filter is
//! idempotent and never alters a surviving row.

use crate::SIGNAL;
use hobart_data::schema::{PREDICTED_BETA, PREV_PRICE, SPECIFIC_RISK};
use polars::prelude::*;

/// Row filter applied between signal construction and scoring.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UniverseFilter {
    price_floor: f64,
}

impl UniverseFilter {
    /// Create a filter with the given price floor.
    pub const fn new(price_floor: f64) -> Self {
        Self { price_floor }
    }

    /// The configured price floor.
    pub const fn price_floor(&self) -> f64 {
        self.price_floor
    }

    /// The conjunctive predicate as a boolean expression.
    ///
    /// Null comparisons evaluate to null and are dropped by `filter`, so an
    /// entity's first date never passes.
    pub fn predicate(&self) -> Expr {
        col(PREV_PRICE)
            .gt(lit(self.price_floor))
            .and(col(SIGNAL).is_not_null())
            .and(col(PREDICTED_BETA).is_not_null())
            .and(col(SPECIFIC_RISK).is_not_null())
    }

    /// Keep eligible rows.
    pub fn apply(&self, frame: LazyFrame) -> LazyFrame {
        frame.filter(self.predicate())
    }
}
