//! Column names shared by every pipeline stage.
//!
//! The panel is a single table keyed by `(entity_id, date)`. Input columns
//! come from the asset and factor tables; derived columns are appended by
//! [`prepare_panel`](crate::prepare_panel) and later stages.

use derive_more::Display;
use serde::{Deserialize, Serialize};

/// Observation date.
pub const DATE: &str = "date";
/// Entity (security) identifier.
pub const ENTITY_ID: &str = "entity_id";
/// Ticker symbol, informational only.
pub const TICKER: &str = "ticker";
/// Price on the observation date.
pub const PRICE: &str = "price";
/// Total return.
pub const RETURN: &str = "return";
/// Vendor idiosyncratic return.
pub const SPECIFIC_RETURN: &str = "specific_return";
/// Vendor idiosyncratic risk estimate.
pub const SPECIFIC_RISK: &str = "specific_risk";
/// Vendor predicted market beta.
pub const PREDICTED_BETA: &str = "predicted_beta";
/// Risk-free rate from the factor table.
pub const RISK_FREE: &str = "rf";

/// Excess return (`return - rf`).
pub const EXCESS_RETURN: &str = "return_rf";
/// Price on the previous observation date of the same entity.
pub const PREV_PRICE: &str = "prev_price";
/// Next-period return of the same entity.
pub const FORWARD_RETURN: &str = "fwd_return";

/// Columns every asset table must provide.
pub const ASSET_COLUMNS: [&str; 7] = [
    DATE,
    ENTITY_ID,
    PRICE,
    RETURN,
    SPECIFIC_RETURN,
    SPECIFIC_RISK,
    PREDICTED_BETA,
];

/// Asset columns delivered in percent and divided by 100 on load.
pub const PERCENT_ASSET_COLUMNS: [&str; 3] = [RETURN, SPECIFIC_RETURN, SPECIFIC_RISK];

/// A factor return column available in the factor table.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorColumn {
    /// Market excess return
    #[display("mkt_rf")]
    MktRf,
    /// Small minus big
    #[display("smb")]
    Smb,
    /// High minus low
    #[display("hml")]
    Hml,
    /// Robust minus weak
    #[display("rmw")]
    Rmw,
    /// Conservative minus aggressive
    #[display("cma")]
    Cma,
}

impl FactorColumn {
    /// All factor columns in canonical order.
    pub const fn all() -> [Self; 5] {
        [Self::MktRf, Self::Smb, Self::Hml, Self::Rmw, Self::Cma]
    }

    /// Column name in the factor table.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::MktRf => "mkt_rf",
            Self::Smb => "smb",
            Self::Hml => "hml",
            Self::Rmw => "rmw",
            Self::Cma => "cma",
        }
    }

    /// Look up a factor by its column name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::all().into_iter().find(|f| f.name() == name)
    }
}
