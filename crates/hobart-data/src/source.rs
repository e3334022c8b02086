//! Input sources for the asset panel and the factor-return table.
//!
//! Market-data vendors are external to the pipeline; anything that can hand
//! back the two tables as polars frames implements [`PanelSource`]. The
//! bundled [`FileSource`] reads Parquet or CSV extracts from disk.

use crate::{DataError, Result};
use chrono::NaiveDate;
use polars::prelude::*;
use std::path::{Path, PathBuf};

/// A provider of the raw asset and factor tables.
///
/// Implementations may pre-filter to `[start, end]`; [`prepare_panel`]
/// applies the range again, so returning more rows is harmless.
///
/// [`prepare_panel`]: crate::prepare_panel
pub trait PanelSource {
    /// Asset table with at least the columns in
    /// [`ASSET_COLUMNS`](crate::schema::ASSET_COLUMNS).
    fn load_assets(&self, start: NaiveDate, end: NaiveDate) -> Result<LazyFrame>;

    /// Factor table keyed by `date`.
    fn load_factors(&self, start: NaiveDate, end: NaiveDate) -> Result<LazyFrame>;
}

/// Reads both tables from files on disk.
#[derive(Debug, Clone)]
pub struct FileSource {
    assets: PathBuf,
    factors: PathBuf,
}

impl FileSource {
    /// Create a source from an asset file and a factor file.
    pub fn new(assets: impl Into<PathBuf>, factors: impl Into<PathBuf>) -> Self {
        Self {
            assets: assets.into(),
            factors: factors.into(),
        }
    }

    /// Path of the asset file.
    pub fn assets_path(&self) -> &Path {
        &self.assets
    }

    /// Path of the factor file.
    pub fn factors_path(&self) -> &Path {
        &self.factors
    }
}

impl PanelSource for FileSource {
    fn load_assets(&self, _start: NaiveDate, _end: NaiveDate) -> Result<LazyFrame> {
        scan_table(&self.assets)
    }

    fn load_factors(&self, _start: NaiveDate, _end: NaiveDate) -> Result<LazyFrame> {
        scan_table(&self.factors)
    }
}

/// Lazily scan a Parquet or CSV file, chosen by extension.
pub fn scan_table(path: &Path) -> Result<LazyFrame> {
    if !path.exists() {
        return Err(DataError::Io(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} does not exist", path.display()),
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "parquet" | "pq" => Ok(LazyFrame::scan_parquet(path, ScanArgsParquet::default())?),
        "csv" => Ok(LazyCsvReader::new(path)
            .with_has_header(true)
            .with_try_parse_dates(true)
            .finish()?),
        _ => Err(DataError::UnsupportedFormat(path.display().to_string())),
    }
}
