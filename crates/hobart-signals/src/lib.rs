#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod alpha;
pub mod builder;
pub mod config;
pub mod error;
pub mod regression;
pub mod registry;
pub mod residual;
pub mod scoring;
pub mod universe;

pub use alpha::{ALPHA, ALPHA_COLUMNS, AlphaConverter};
pub use builder::{SIGNAL, SignalBuilder, TRANSFORMED};
pub use config::{AlphaConfig, RegressionConfig, SignalConfig, SignalSource, VolBasis, VolScale};
pub use error::{Result, SignalError};
pub use regression::RollingOls;
pub use registry::{SignalFamily, SignalInfo, available_signals, preset, signal_info};
pub use residual::{CONSTANT, RESIDUAL, coefficient_column, fit_factor_model};
pub use scoring::{SCORE, cross_sectional_zscore, score_signals};
pub use universe::UniverseFilter;

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
