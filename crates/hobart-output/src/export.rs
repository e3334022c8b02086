//! Export of tables and IC series.
//!
//! Record types implement [`Exporter`] for CSV and JSON; polars frames are
//! written with [`write_frame`], which also supports Parquet.

use chrono::NaiveDate;
use hobart_eval::{IcMethod, IcReport};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors that can occur during export operations.
#[derive(Debug, Error)]
pub enum ExportError {
    /// CSV serialization error.
    #[error("CSV serialization error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON serialization error.
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    /// Polars error.
    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    /// IC aggregation error.
    #[error(transparent)]
    Eval(#[from] hobart_eval::EvalError),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid format error.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

/// Export format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportFormat {
    /// Comma-separated values format.
    Csv,

    /// Compact JSON format.
    Json,

    /// Pretty-printed JSON format.
    PrettyJson,

    /// Apache Parquet, tables only.
    Parquet,
}

impl ExportFormat {
    /// Get the file extension for this format.
    pub const fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Json | Self::PrettyJson => "json",
            Self::Parquet => "parquet",
        }
    }
}

/// File name of a signal's alpha table.
pub fn alpha_file_name(signal: &str, format: ExportFormat) -> String {
    format!("{signal}_alphas.{}", format.extension())
}

/// Write a polars frame as Parquet or CSV.
pub fn write_frame(
    frame: &mut DataFrame,
    path: &Path,
    format: ExportFormat,
) -> Result<PathBuf, ExportError> {
    if matches!(format, ExportFormat::Json | ExportFormat::PrettyJson) {
        return Err(ExportError::InvalidFormat(format!(
            "tables are written as parquet or csv, not {}",
            format.extension()
        )));
    }
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    if format == ExportFormat::Parquet {
        ParquetWriter::new(file).finish(frame)?;
    } else {
        CsvWriter::new(file).include_header(true).finish(frame)?;
    }
    debug!(path = %path.display(), rows = frame.height(), "Wrote table");
    Ok(path.to_path_buf())
}

/// Trait for exporting data in various formats.
pub trait Exporter {
    /// Export data to a string in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails or the format is not textual.
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError>;

    /// Export data to a file in the specified format.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or file writing fails.
    fn export_to_file(&self, path: &Path, format: ExportFormat) -> Result<(), ExportError> {
        let content = self.export_to_string(format)?;
        let mut file = File::create(path)?;
        file.write_all(content.as_bytes())?;
        Ok(())
    }
}

/// One row of the IC table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IcRecord {
    /// Evaluation date.
    pub date: NaiveDate,

    /// Number of (alpha, forward return) pairs.
    pub observations: usize,

    /// Daily Spearman IC.
    pub rank_ic: Option<f64>,

    /// Daily Pearson IC.
    pub pearson_ic: Option<f64>,

    /// Trailing mean of rank IC.
    pub rank_ic_rolling: Option<f64>,

    /// Trailing mean of Pearson IC.
    pub pearson_ic_rolling: Option<f64>,

    /// Cumulative rank IC.
    pub rank_ic_cumulative: Option<f64>,

    /// Cumulative Pearson IC.
    pub pearson_ic_cumulative: Option<f64>,
}

/// Flatten an IC report into per-date records.
pub fn ic_records(report: &IcReport) -> Result<Vec<IcRecord>, ExportError> {
    let series = &report.series;
    let rank_rolling = series.rolling_mean(IcMethod::Rank, report.window)?;
    let pearson_rolling = series.rolling_mean(IcMethod::Pearson, report.window)?;
    let rank_cumulative = series.cumulative(IcMethod::Rank);
    let pearson_cumulative = series.cumulative(IcMethod::Pearson);

    Ok(series
        .points()
        .iter()
        .enumerate()
        .map(|(i, point)| IcRecord {
            date: point.date,
            observations: point.observations,
            rank_ic: point.rank,
            pearson_ic: point.pearson,
            rank_ic_rolling: rank_rolling[i],
            pearson_ic_rolling: pearson_rolling[i],
            rank_ic_cumulative: rank_cumulative[i],
            pearson_ic_cumulative: pearson_cumulative[i],
        })
        .collect())
}

impl Exporter for Vec<IcRecord> {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut wtr = csv::Writer::from_writer(vec![]);
                for record in self {
                    wtr.serialize(record)?;
                }
                csv_to_string(wtr)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Parquet => Err(ExportError::InvalidFormat(
                "IC records are exported as csv or json".to_string(),
            )),
        }
    }
}

/// Finish a CSV writer into a UTF-8 string.
pub(crate) fn csv_to_string(wtr: csv::Writer<Vec<u8>>) -> Result<String, ExportError> {
    let bytes = wtr.into_inner().map_err(|e| e.into_error())?;
    String::from_utf8(bytes).map_err(|e| ExportError::InvalidFormat(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hobart_eval::{IcPoint, IcSeries, IcSummary};
    use polars::df;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn report() -> IcReport {
        let points = vec![
            IcPoint {
                date: day(1),
                observations: 40,
                rank: Some(0.1),
                pearson: Some(0.05),
            },
            IcPoint {
                date: day(2),
                observations: 1,
                rank: None,
                pearson: None,
            },
            IcPoint {
                date: day(5),
                observations: 38,
                rank: Some(-0.02),
                pearson: Some(0.01),
            },
        ];
        IcReport {
            window: 2,
            pairs: 79,
            series: IcSeries::new(points),
            rank: IcSummary::from_values(&[0.1, -0.02]),
            pearson: IcSummary::from_values(&[0.05, 0.01]),
        }
    }

    #[test]
    fn test_alpha_file_name() {
        assert_eq!(
            alpha_file_name("ff3_momentum", ExportFormat::Parquet),
            "ff3_momentum_alphas.parquet"
        );
        assert_eq!(alpha_file_name("momentum", ExportFormat::Csv), "momentum_alphas.csv");
    }

    #[test]
    fn test_ic_records() {
        let records = ic_records(&report()).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[1].rank_ic, None);
        assert_eq!(records[1].rank_ic_cumulative, None);
        assert_eq!(records[0].rank_ic_rolling, None);
        assert!(records[2].rank_ic_rolling.is_some());
    }

    #[test]
    fn test_ic_records_csv() {
        let csv = ic_records(&report())
            .unwrap()
            .export_to_string(ExportFormat::Csv)
            .unwrap();
        let mut lines = csv.lines();
        assert!(lines.next().unwrap().starts_with("date,observations,rank_ic,pearson_ic"));
        assert!(lines.next().unwrap().starts_with("2024-02-01,40,0.1,0.05"));
        assert!(lines.next().unwrap().starts_with("2024-02-02,1,,"));
    }

    #[test]
    fn test_ic_records_json() {
        let json = ic_records(&report())
            .unwrap()
            .export_to_string(ExportFormat::PrettyJson)
            .unwrap();
        assert!(json.contains("\"rank_ic_cumulative\""));
        assert!(json.contains("null"));
    }

    #[test]
    fn test_write_frame_parquet_and_csv() {
        let dir = tempfile::tempdir().unwrap();
        let mut frame = df![
            "date" => [day(1), day(1)],
            "entity_id" => ["A", "B"],
            "alpha" => [Some(0.01), None],
            "predicted_beta" => [1.0, 0.8],
        ]
        .unwrap();

        let parquet = dir.path().join("nested").join(alpha_file_name("x", ExportFormat::Parquet));
        write_frame(&mut frame, &parquet, ExportFormat::Parquet).unwrap();
        let back = LazyFrame::scan_parquet(&parquet, ScanArgsParquet::default())
            .unwrap()
            .collect()
            .unwrap();
        assert!(frame.equals_missing(&back));

        let csv = dir.path().join("x_alphas.csv");
        write_frame(&mut frame, &csv, ExportFormat::Csv).unwrap();
        let text = std::fs::read_to_string(&csv).unwrap();
        assert!(text.starts_with("date,entity_id,alpha,predicted_beta"));

        let json = dir.path().join("x.json");
        assert!(matches!(
            write_frame(&mut frame, &json, ExportFormat::Json),
            Err(ExportError::InvalidFormat(_))
        ));
    }
}
