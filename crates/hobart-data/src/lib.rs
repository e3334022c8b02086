#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod error;
pub mod forward;
pub mod panel;
pub mod schema;
pub mod source;

pub use error::{DataError, Result};
pub use forward::forward_returns;
pub use panel::{Panel, PrepareOptions, load_panel, prepare_panel};
pub use schema::FactorColumn;
pub use source::{FileSource, PanelSource};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
