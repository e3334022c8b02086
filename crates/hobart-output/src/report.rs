//! Run reports.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Errors that can occur during report generation.
#[derive(Debug, Error)]
pub enum ReportError {
    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A mandatory field was never set.
    #[error("Report is missing {0}")]
    Missing(&'static str),
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Signal name.
    pub signal: String,

    /// Display title.
    pub title: String,

    /// Report generation timestamp.
    pub timestamp: DateTime<Utc>,

    /// First date of the evaluated panel.
    pub start: NaiveDate,

    /// Last date of the evaluated panel.
    pub end: NaiveDate,

    /// Report contents (JSON format).
    pub contents: serde_json::Value,
}

impl RunReport {
    /// Create a new report.
    pub fn new(
        signal: String,
        title: String,
        start: NaiveDate,
        end: NaiveDate,
        contents: serde_json::Value,
    ) -> Self {
        Self {
            signal,
            title,
            timestamp: Utc::now(),
            start,
            end,
            contents,
        }
    }

    /// Convert report to JSON string.
    pub fn to_json(&self) -> Result<String, ReportError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Write the report as pretty JSON.
    pub fn write(&self, path: &Path) -> Result<(), ReportError> {
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Builder for creating reports.
#[derive(Debug, Default)]
pub struct ReportBuilder {
    signal: Option<String>,
    title: Option<String>,
    period: Option<(NaiveDate, NaiveDate)>,
    contents: serde_json::Map<String, serde_json::Value>,
}

impl ReportBuilder {
    /// Create a new report builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the signal name.
    pub fn signal(mut self, signal: impl Into<String>) -> Self {
        self.signal = Some(signal.into());
        self
    }

    /// Set the display title.
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Set the evaluated period.
    pub fn period(mut self, start: NaiveDate, end: NaiveDate) -> Self {
        self.period = Some((start, end));
        self
    }

    /// Add a serialisable section under `key`.
    pub fn section<T: Serialize>(mut self, key: &str, value: &T) -> Result<Self, ReportError> {
        self.contents
            .insert(key.to_string(), serde_json::to_value(value)?);
        Ok(self)
    }

    /// Build the report.
    pub fn build(self) -> Result<RunReport, ReportError> {
        let signal = self.signal.ok_or(ReportError::Missing("signal"))?;
        let (start, end) = self.period.ok_or(ReportError::Missing("period"))?;
        Ok(RunReport::new(
            signal.clone(),
            self.title.unwrap_or(signal),
            start,
            end,
            serde_json::Value::Object(self.contents),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_report_builder() {
        let report = ReportBuilder::new()
            .signal("capm_momentum")
            .title("CAPM Momentum")
            .period(day(2), day(31))
            .section("alphas", &serde_json::json!({"rows": 10}))
            .unwrap()
            .build()
            .unwrap();

        assert_eq!(report.signal, "capm_momentum");
        assert_eq!(report.title, "CAPM Momentum");
        assert_eq!(report.contents["alphas"]["rows"], 10);
    }

    #[test]
    fn test_title_defaults_to_signal() {
        let report = ReportBuilder::new()
            .signal("momentum")
            .period(day(2), day(3))
            .build()
            .unwrap();
        assert_eq!(report.title, "momentum");
    }

    #[test]
    fn test_missing_fields() {
        assert!(matches!(
            ReportBuilder::new().period(day(2), day(3)).build(),
            Err(ReportError::Missing("signal"))
        ));
        assert!(matches!(
            ReportBuilder::new().signal("momentum").build(),
            Err(ReportError::Missing("period"))
        ));
    }

    #[test]
    fn test_write_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let report = RunReport::new(
            "momentum".to_string(),
            "Momentum".to_string(),
            day(2),
            day(3),
            serde_json::json!({"ic": {"rank": 0.02}}),
        );
        report.write(&path).unwrap();

        let back: RunReport =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back.signal, "momentum");
        assert_eq!(back.contents["ic"]["rank"], 0.02);
    }
}
