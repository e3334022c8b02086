//! Cross-sectional z-scores.

use crate::SIGNAL;
use hobart_data::schema::DATE;
use polars::prelude::*;

/// Standardised signal.
pub const SCORE: &str = "score";

/// Spreads at or below this fraction of the cross-sectional mean are treated
/// as zero; rounding leaves identical values with a tiny nonzero std.
const RELATIVE_SPREAD_TOLERANCE: f64 = 1e-12;

/// Z-score `value` within each date.
///
/// Uses the sample standard deviation. A date with fewer than two non-null
/// values or with zero spread gets a null score on every row.
pub fn cross_sectional_zscore(frame: LazyFrame, value: &str, output: &str) -> LazyFrame {
    let mean = format!("{value}_mean");
    let std = format!("{value}_std");
    let count = format!("{value}_count");

    frame
        .with_columns([
            col(value).mean().over([col(DATE)]).alias(mean.as_str()),
            col(value).std(1).over([col(DATE)]).alias(std.as_str()),
            col(value).count().over([col(DATE)]).alias(count.as_str()),
        ])
        .with_column(
            when(
                col(count.as_str())
                    .gt(lit(1))
                    .and(col(std.as_str()).gt(lit(0.0)))
                    .and(
                        col(std.as_str())
                            .gt(col(mean.as_str()).abs() * lit(RELATIVE_SPREAD_TOLERANCE)),
                    ),
            )
            .then((col(value) - col(mean.as_str())) / col(std.as_str()))
            .otherwise(lit(NULL))
            .cast(DataType::Float64)
            .alias(output),
        )
        .drop([mean.as_str(), std.as_str(), count.as_str()])
}

/// Score the `signal` column of a filtered frame into `score`.
pub fn score_signals(filtered: LazyFrame) -> LazyFrame {
    cross_sectional_zscore(filtered, SIGNAL, SCORE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hobart_data::schema::ENTITY_ID;
    use polars::df;

    fn scores(frame: DataFrame) -> Vec<Option<f64>> {
        score_signals(frame.lazy())
            .sort([DATE, ENTITY_ID], SortMultipleOptions::default())
            .collect()
            .unwrap()
            .column(SCORE)
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .collect()
    }

    #[test]
    fn test_two_entities() {
        let df = df!(
            DATE => [1, 1],
            ENTITY_ID => ["A", "B"],
            SIGNAL => [1.0, 3.0],
        )
        .unwrap();
        let s = scores(df);
        let sd = 2.0_f64.sqrt();
        assert_relative_eq!(s[0].unwrap(), -1.0 / sd, epsilon = 1e-12);
        assert_relative_eq!(s[1].unwrap(), 1.0 / sd, epsilon = 1e-12);
    }

    #[test]
    fn test_single_entity_is_null_not_zero() {
        let df = df!(
            DATE => [1, 2, 2],
            ENTITY_ID => ["A", "A", "B"],
            SIGNAL => [0.7, 0.1, 0.2],
        )
        .unwrap();
        let s = scores(df);
        assert_eq!(s[0], None);
        assert!(s[1].is_some());
    }

    #[test]
    fn test_zero_spread_is_null() {
        let df = df!(
            DATE => [1, 1, 1],
            ENTITY_ID => ["A", "B", "C"],
            SIGNAL => [0.1, 0.1, 0.1],
        )
        .unwrap();
        assert!(scores(df).iter().all(Option::is_none));
    }

    #[test]
    fn test_moments_per_date() {
        let df = df!(
            DATE => [1, 1, 1, 1, 2, 2, 2],
            ENTITY_ID => ["A", "B", "C", "D", "A", "B", "C"],
            SIGNAL => [0.3, -1.2, 2.5, 0.9, 10.0, 40.0, 25.0],
        )
        .unwrap();
        let s = scores(df);
        for day in [&s[..4], &s[4..]] {
            let values: Vec<f64> = day.iter().map(|v| v.unwrap()).collect();
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
            assert_relative_eq!(mean, 0.0, epsilon = 1e-12);
            assert_relative_eq!(var.sqrt(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_null_signals_do_not_count() {
        let df = df!(
            DATE => [1, 1, 1],
            ENTITY_ID => ["A", "B", "C"],
            SIGNAL => [Some(1.0), None, Some(3.0)],
        )
        .unwrap();
        let s = scores(df);
        assert!(s[0].is_some());
        assert_eq!(s[1], None);
        assert!(s[2].is_some());
    }
}
