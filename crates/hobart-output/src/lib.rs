#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/hobart/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod chart;
pub mod export;
pub mod report;

pub use chart::{ChartPoint, ChartRenderer, DataFileRenderer, IcChart};
pub use export::{
    ExportError, ExportFormat, Exporter, IcRecord, alpha_file_name, ic_records, write_frame,
};
pub use report::{ReportBuilder, ReportError, RunReport};

/// Version information.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
