//! Backtest job planning.
//!
//! An alpha table is split into one independent job per calendar year. Jobs
//! share no state, so any subset can be rerun without touching the others.

use crate::{BacktestConfig, BacktestError, Constraint, Result};
use chrono::{Datelike, NaiveDate};
use hobart_data::schema::DATE;
use hobart_data::source::scan_table;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// One year of alphas for the backtester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestJob {
    /// Signal name, used to label results
    pub signal: String,
    /// Calendar year covered
    pub year: i32,
    /// First alpha date in the year
    pub start: NaiveDate,
    /// Last alpha date in the year
    pub end: NaiveDate,
    /// Alpha rows in the year
    pub rows: usize,
    /// Optimizer risk aversion
    pub gamma: f64,
    /// Optimizer constraints
    pub constraints: Vec<Constraint>,
}

/// Where the alpha table lives.
#[derive(Debug, Clone)]
pub enum AlphaSource {
    /// Table held by the current process
    InMemory(Arc<DataFrame>),
    /// Table persisted as Parquet or CSV
    Persisted(PathBuf),
}

impl AlphaSource {
    /// Persisted path, if any.
    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::InMemory(_) => None,
            Self::Persisted(path) => Some(path),
        }
    }

    /// Materialise the table.
    pub fn load(&self) -> Result<Arc<DataFrame>> {
        match self {
            Self::InMemory(frame) => Ok(Arc::clone(frame)),
            Self::Persisted(path) => Ok(Arc::new(scan_table(path)?.collect()?)),
        }
    }
}

/// Plan one job per calendar year present in `alphas`.
///
/// Jobs come back in year order.
pub fn plan_jobs(
    signal: &str,
    alphas: &DataFrame,
    config: &BacktestConfig,
) -> Result<Vec<BacktestJob>> {
    if alphas.column(DATE).is_err() {
        return Err(BacktestError::MissingColumn(DATE.to_string()));
    }

    let dates = alphas.column(DATE)?.cast(&DataType::Date)?;
    let mut years: BTreeMap<i32, (NaiveDate, NaiveDate, usize)> = BTreeMap::new();
    for date in dates.date()?.as_date_iter().flatten() {
        years
            .entry(date.year())
            .and_modify(|(start, end, rows)| {
                *start = (*start).min(date);
                *end = (*end).max(date);
                *rows += 1;
            })
            .or_insert((date, date, 1));
    }

    if years.is_empty() {
        return Err(BacktestError::NoJobs);
    }

    Ok(years
        .into_iter()
        .map(|(year, (start, end, rows))| BacktestJob {
            signal: signal.to_string(),
            year,
            start,
            end,
            rows,
            gamma: config.gamma,
            constraints: config.constraints.clone(),
        })
        .collect())
}

/// Rows of `alphas` dated within `job`'s year.
pub fn job_slice(alphas: &DataFrame, job: &BacktestJob) -> Result<DataFrame> {
    Ok(alphas
        .clone()
        .lazy()
        .filter(
            col(DATE)
                .cast(DataType::Date)
                .dt()
                .year()
                .eq(lit(job.year)),
        )
        .collect()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use polars::df;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn alphas() -> DataFrame {
        df![
            "date" => [date(2021, 3, 1), date(2020, 12, 30), date(2021, 7, 9), date(2020, 12, 31), date(2023, 1, 2)],
            "entity_id" => ["A", "A", "B", "B", "A"],
            "alpha" => [Some(0.1), None, Some(-0.2), Some(0.05), Some(0.0)],
            "predicted_beta" => [1.0, 1.0, 0.9, 0.9, 1.0],
        ]
        .unwrap()
    }

    #[test]
    fn test_one_job_per_year() {
        let jobs = plan_jobs("momentum", &alphas(), &BacktestConfig::default()).unwrap();
        let years: Vec<i32> = jobs.iter().map(|j| j.year).collect();
        assert_eq!(years, vec![2020, 2021, 2023]);

        assert_eq!(jobs[0].start, date(2020, 12, 30));
        assert_eq!(jobs[0].end, date(2020, 12, 31));
        assert_eq!(jobs[1].rows, 2);
        assert_eq!(jobs[2].signal, "momentum");
        assert_eq!(jobs[2].gamma, 60.0);
    }

    #[test]
    fn test_empty_table_has_no_jobs() {
        let empty = alphas().head(Some(0));
        assert!(matches!(
            plan_jobs("momentum", &empty, &BacktestConfig::default()),
            Err(BacktestError::NoJobs)
        ));

        let no_date = alphas().drop("date").unwrap();
        assert!(matches!(
            plan_jobs("momentum", &no_date, &BacktestConfig::default()),
            Err(BacktestError::MissingColumn(_))
        ));
    }

    #[test]
    fn test_job_slice() {
        let frame = alphas();
        let jobs = plan_jobs("momentum", &frame, &BacktestConfig::default()).unwrap();
        let slice = job_slice(&frame, &jobs[1]).unwrap();
        assert_eq!(slice.height(), 2);
        let ids: Vec<_> = slice.column("entity_id").unwrap().str().unwrap().into_iter().collect();
        assert_eq!(ids, vec![Some("A"), Some("B")]);
    }

    #[test]
    fn test_persisted_source() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("momentum_alphas.parquet");
        let mut frame = alphas();
        ParquetWriter::new(std::fs::File::create(&path).unwrap())
            .finish(&mut frame)
            .unwrap();

        let source = AlphaSource::Persisted(path.clone());
        assert_eq!(source.path(), Some(path.as_path()));
        assert!(source.load().unwrap().equals_missing(&frame));
        assert!(AlphaSource::InMemory(Arc::new(frame)).path().is_none());
    }
}
