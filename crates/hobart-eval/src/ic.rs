//! Daily information coefficients and their aggregates.

use crate::correlation::{pearson, spearman};
use crate::{EvalError, Result};
use chrono::NaiveDate;
use derive_more::Display;
use hobart_data::schema::{DATE, ENTITY_ID, FORWARD_RETURN};
use hobart_signals::ALPHA;
use polars::prelude::*;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::ops::Range;

/// Correlation used for an IC.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IcMethod {
    /// Spearman rank correlation
    #[display("Rank")]
    Rank,
    /// Pearson linear correlation
    #[display("Pearson")]
    Pearson,
}

impl IcMethod {
    /// Both methods, rank first.
    pub const fn all() -> [Self; 2] {
        [Self::Rank, Self::Pearson]
    }

    /// Lower-case identifier used in column and file names.
    pub const fn key(&self) -> &'static str {
        match self {
            Self::Rank => "rank",
            Self::Pearson => "pearson",
        }
    }
}

/// IC of a single date.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IcPoint {
    /// Evaluation date
    pub date: NaiveDate,
    /// Number of (alpha, forward return) pairs
    pub observations: usize,
    /// Spearman IC, if defined
    pub rank: Option<f64>,
    /// Pearson IC, if defined
    pub pearson: Option<f64>,
}

impl IcPoint {
    /// IC for the given method.
    pub const fn value(&self, method: IcMethod) -> Option<f64> {
        match method {
            IcMethod::Rank => self.rank,
            IcMethod::Pearson => self.pearson,
        }
    }
}

/// Inner join of alphas to forward returns.
///
/// Only `(date, entity_id)` pairs present in both tables with non-null
/// alpha and forward return survive.
pub fn join_forward_returns(alphas: LazyFrame, forward: LazyFrame) -> LazyFrame {
    alphas
        .select([col(DATE), col(ENTITY_ID), col(ALPHA)])
        .join(
            forward.select([col(DATE), col(ENTITY_ID), col(FORWARD_RETURN)]),
            [col(DATE), col(ENTITY_ID)],
            [col(DATE), col(ENTITY_ID)],
            JoinArgs::new(JoinType::Inner),
        )
        .filter(col(ALPHA).is_not_null().and(col(FORWARD_RETURN).is_not_null()))
        .sort([DATE, ENTITY_ID], SortMultipleOptions::default())
}

/// Per-date IC series.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IcSeries {
    points: Vec<IcPoint>,
}

impl IcSeries {
    /// Wrap points already sorted by date.
    pub const fn new(points: Vec<IcPoint>) -> Self {
        Self { points }
    }

    /// Compute daily ICs from a joined `(date, entity_id, alpha, fwd_return)`
    /// table.
    pub fn from_joined(joined: &DataFrame) -> Result<Self> {
        for column in [DATE, ALPHA, FORWARD_RETURN] {
            if joined.column(column).is_err() {
                return Err(EvalError::MissingColumn(column.to_string()));
            }
        }

        let joined = joined.sort([DATE], SortMultipleOptions::default())?;
        let dates: Vec<Option<NaiveDate>> = joined
            .column(DATE)?
            .cast(&DataType::Date)?
            .date()?
            .as_date_iter()
            .collect();
        let alpha = float_values(&joined, ALPHA)?;
        let forward = float_values(&joined, FORWARD_RETURN)?;

        let groups = date_ranges(&dates);
        let points = groups
            .par_iter()
            .map(|(date, range)| {
                let (x, y): (Vec<f64>, Vec<f64>) = range
                    .clone()
                    .filter_map(|i| match (alpha[i], forward[i]) {
                        (Some(a), Some(f)) if a.is_finite() && f.is_finite() => Some((a, f)),
                        _ => None,
                    })
                    .unzip();
                IcPoint {
                    date: *date,
                    observations: x.len(),
                    rank: spearman(&x, &y),
                    pearson: pearson(&x, &y),
                }
            })
            .collect();

        Ok(Self { points })
    }

    /// Daily points in date order.
    pub fn points(&self) -> &[IcPoint] {
        &self.points
    }

    /// Number of dates.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True when no date was evaluated.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Dates in order.
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.points.iter().map(|p| p.date).collect()
    }

    /// Daily IC values for a method.
    pub fn values(&self, method: IcMethod) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value(method)).collect()
    }

    /// Defined daily ICs for a method.
    pub fn defined(&self, method: IcMethod) -> Vec<f64> {
        self.points.iter().filter_map(|p| p.value(method)).collect()
    }

    /// Trailing mean of the last `window` defined ICs.
    ///
    /// Dates without an IC are skipped, not counted as zero, and get a null.
    /// The first `window - 1` defined dates are null as well.
    pub fn rolling_mean(&self, method: IcMethod, window: usize) -> Result<Vec<Option<f64>>> {
        if window == 0 {
            return Err(EvalError::InvalidWindow(window));
        }

        let mut trailing: Vec<f64> = Vec::with_capacity(self.points.len());
        Ok(self
            .points
            .iter()
            .map(|point| {
                let value = point.value(method)?;
                trailing.push(value);
                (trailing.len() >= window).then(|| {
                    trailing[trailing.len() - window..].iter().sum::<f64>() / window as f64
                })
            })
            .collect())
    }

    /// Running sum of defined ICs; null on dates without an IC.
    pub fn cumulative(&self, method: IcMethod) -> Vec<Option<f64>> {
        let mut total = 0.0;
        self.points
            .iter()
            .map(|point| {
                let value = point.value(method)?;
                total += value;
                Some(total)
            })
            .collect()
    }

    /// Tabulate daily, rolling and cumulative ICs for both methods.
    ///
    /// Columns: `date`, `observations`, then `<method>_ic`,
    /// `<method>_ic_rolling` and `<method>_ic_cumulative` for rank and
    /// Pearson.
    pub fn to_dataframe(&self, window: usize) -> Result<DataFrame> {
        let mut columns: Vec<Column> = vec![
            Series::new(DATE.into(), self.dates()).into(),
            Series::new(
                "observations".into(),
                self.points
                    .iter()
                    .map(|p| p.observations as u32)
                    .collect::<Vec<u32>>(),
            )
            .into(),
        ];
        for method in IcMethod::all() {
            let key = method.key();
            columns.push(Series::new(format!("{key}_ic").into(), self.values(method)).into());
            columns.push(
                Series::new(
                    format!("{key}_ic_rolling").into(),
                    self.rolling_mean(method, window)?,
                )
                .into(),
            );
            columns.push(
                Series::new(
                    format!("{key}_ic_cumulative").into(),
                    self.cumulative(method),
                )
                .into(),
            );
        }
        Ok(DataFrame::new(columns)?)
    }
}

fn float_values(frame: &DataFrame, name: &str) -> Result<Vec<Option<f64>>> {
    Ok(frame
        .column(name)?
        .cast(&DataType::Float64)?
        .f64()?
        .into_iter()
        .collect())
}

/// Contiguous row ranges sharing a date; null dates are skipped.
fn date_ranges(dates: &[Option<NaiveDate>]) -> Vec<(NaiveDate, Range<usize>)> {
    let mut groups: Vec<(NaiveDate, Range<usize>)> = Vec::new();
    for (row, date) in dates.iter().enumerate() {
        let Some(date) = *date else { continue };
        match groups.last_mut() {
            Some((current, range)) if *current == date && range.end == row => range.end = row + 1,
            _ => groups.push((date, row..row + 1)),
        }
    }
    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polars::df;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    fn series(values: &[Option<f64>]) -> IcSeries {
        IcSeries::new(
            values
                .iter()
                .enumerate()
                .map(|(i, v)| IcPoint {
                    date: day(i as u32 + 1),
                    observations: if v.is_some() { 10 } else { 1 },
                    rank: *v,
                    pearson: v.map(|x| x / 2.0),
                })
                .collect(),
        )
    }

    #[test]
    fn test_daily_ics() {
        let joined = df![
            DATE => [day(1), day(1), day(1), day(2), day(2), day(3)],
            ENTITY_ID => ["A", "B", "C", "A", "B", "A"],
            ALPHA => [0.1, 0.2, 0.3, 0.5, -0.5, 0.9],
            FORWARD_RETURN => [0.01, 0.03, 0.02, -0.01, 0.02, 0.01],
        ]
        .unwrap();
        let ics = IcSeries::from_joined(&joined).unwrap();

        assert_eq!(ics.len(), 3);
        let first = ics.points()[0];
        assert_eq!(first.observations, 3);
        assert_relative_eq!(first.rank.unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(ics.points()[1].rank.unwrap(), -1.0, epsilon = 1e-12);
        // One entity on the third date.
        assert_eq!(ics.points()[2].rank, None);
        assert_eq!(ics.points()[2].pearson, None);
    }

    #[test]
    fn test_rolling_mean_skips_undefined_dates() {
        let ics = series(&[Some(0.1), None, Some(0.3), Some(0.2), None, Some(0.4)]);
        let rolling = ics.rolling_mean(IcMethod::Rank, 2).unwrap();

        assert_eq!(rolling[0], None);
        assert_eq!(rolling[1], None);
        assert_relative_eq!(rolling[2].unwrap(), 0.2, epsilon = 1e-12);
        assert_relative_eq!(rolling[3].unwrap(), 0.25, epsilon = 1e-12);
        assert_eq!(rolling[4], None);
        assert_relative_eq!(rolling[5].unwrap(), 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_rolling_mean_rejects_zero_window() {
        assert!(matches!(
            series(&[Some(0.1)]).rolling_mean(IcMethod::Rank, 0),
            Err(EvalError::InvalidWindow(0))
        ));
    }

    #[test]
    fn test_cumulative() {
        let ics = series(&[Some(0.1), None, Some(-0.3), Some(0.5)]);
        let cumulative = ics.cumulative(IcMethod::Pearson);
        assert_relative_eq!(cumulative[0].unwrap(), 0.05);
        assert_eq!(cumulative[1], None);
        assert_relative_eq!(cumulative[2].unwrap(), -0.1, epsilon = 1e-12);
        assert_relative_eq!(cumulative[3].unwrap(), 0.15, epsilon = 1e-12);
    }

    #[test]
    fn test_to_dataframe() {
        let df = series(&[Some(0.1), None, Some(0.3)]).to_dataframe(2).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 8);
        let rolling = df.column("rank_ic_rolling").unwrap().f64().unwrap();
        assert_relative_eq!(rolling.get(2).unwrap(), 0.2, epsilon = 1e-12);
        assert_eq!(df.column("pearson_ic").unwrap().null_count(), 1);
    }

    #[test]
    fn test_join_is_inner() {
        let alphas = df![
            DATE => [day(1), day(1), day(2)],
            ENTITY_ID => ["A", "B", "A"],
            ALPHA => [Some(0.1), None, Some(0.3)],
            "predicted_beta" => [1.0, 1.0, 1.0],
        ]
        .unwrap();
        let forward = df![
            DATE => [day(1), day(1), day(3)],
            ENTITY_ID => ["A", "B", "A"],
            FORWARD_RETURN => [0.01, 0.02, 0.03],
        ]
        .unwrap();
        let joined = join_forward_returns(alphas.lazy(), forward.lazy())
            .collect()
            .unwrap();
        assert_eq!(joined.height(), 1);
        assert_eq!(joined.column(ENTITY_ID).unwrap().str().unwrap().get(0), Some("A"));
    }
}
