//! Cumulative IC charts.
//!
//! The pipeline produces the chart data and its title; drawing is delegated
//! to a [`ChartRenderer`].

use crate::export::{ExportError, ExportFormat, Exporter, csv_to_string};
use chrono::NaiveDate;
use hobart_eval::{IcMethod, IcSeries};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// One point of a chart series.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ChartPoint {
    /// X coordinate.
    pub date: NaiveDate,

    /// Y coordinate.
    pub value: f64,
}

/// A cumulative IC curve ready for rendering.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IcChart {
    /// Chart title.
    pub title: String,

    /// Correlation the curve accumulates.
    pub method: IcMethod,

    /// Y-axis label.
    pub y_label: String,

    /// Points in date order; dates without an IC are omitted.
    pub points: Vec<ChartPoint>,
}

impl IcChart {
    /// Cumulative curve of `method` titled `"{title} Cumulative IC"`.
    pub fn cumulative(title: &str, method: IcMethod, series: &IcSeries) -> Self {
        let points = series
            .dates()
            .into_iter()
            .zip(series.cumulative(method))
            .filter_map(|(date, value)| value.map(|value| ChartPoint { date, value }))
            .collect();
        Self {
            title: format!("{title} Cumulative IC"),
            method,
            y_label: format!("Cumulative {method} IC"),
            points,
        }
    }

    /// Default file stem, e.g. `rank_ic_chart`.
    pub fn file_stem(&self) -> String {
        format!("{}_ic_chart", self.method.key())
    }
}

impl Exporter for IcChart {
    fn export_to_string(&self, format: ExportFormat) -> Result<String, ExportError> {
        match format {
            ExportFormat::Csv => {
                let mut output = String::new();

                // Write chart metadata as comments
                output.push_str(&format!("# Title: {}\n", self.title));
                output.push_str(&format!("# Y Label: {}\n", self.y_label));

                let mut wtr = csv::Writer::from_writer(vec![]);
                wtr.write_record(["date", "cumulative_ic"])?;
                for point in &self.points {
                    wtr.write_record([point.date.to_string(), point.value.to_string()])?;
                }
                output.push_str(&csv_to_string(wtr)?);
                Ok(output)
            }
            ExportFormat::Json => Ok(serde_json::to_string(self)?),
            ExportFormat::PrettyJson => Ok(serde_json::to_string_pretty(self)?),
            ExportFormat::Parquet => Err(ExportError::InvalidFormat(
                "charts are exported as csv or json".to_string(),
            )),
        }
    }
}

/// Turns chart data into a file.
pub trait ChartRenderer {
    /// Render `chart` into `dir`, returning the written path.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    fn render(&self, chart: &IcChart, dir: &Path) -> Result<PathBuf, ExportError>;
}

/// Writes the chart series as a data file for an external plotting tool.
#[derive(Debug, Clone, Copy)]
pub struct DataFileRenderer {
    format: ExportFormat,
}

impl DataFileRenderer {
    /// Renderer writing `format` data files.
    pub fn new(format: ExportFormat) -> Result<Self, ExportError> {
        if format == ExportFormat::Parquet {
            return Err(ExportError::InvalidFormat(
                "chart data files are csv or json".to_string(),
            ));
        }
        Ok(Self { format })
    }
}

impl Default for DataFileRenderer {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
        }
    }
}

impl ChartRenderer for DataFileRenderer {
    fn render(&self, chart: &IcChart, dir: &Path) -> Result<PathBuf, ExportError> {
        std::fs::create_dir_all(dir)?;
        let path = dir.join(format!("{}.{}", chart.file_stem(), self.format.extension()));
        chart.export_to_file(&path, self.format)?;
        Ok(path)
    }
}
