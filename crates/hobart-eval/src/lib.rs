#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod correlation;
pub mod error;
pub mod evaluator;
pub mod ic;
pub mod summary;

pub use error::{EvalError, Result};
pub use evaluator::{IcEvaluator, IcReport};
pub use ic::{IcMethod, IcPoint, IcSeries, join_forward_returns};
pub use summary::IcSummary;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
