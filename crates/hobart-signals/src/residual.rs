//! Factor-model residuals.
//!
//! Regresses excess return on a constant and the configured factors per
//! entity, appends the coefficient columns (`B_const`, `B_<factor>`), and
//! derives `residual = return_rf - (B_const + Σ B_f * f)`.

use crate::{RegressionConfig, Result, RollingOls, SignalError};
use hobart_data::schema::{DATE, ENTITY_ID, EXCESS_RETURN};
use ndarray::{Array1, Array2};
use polars::prelude::*;
use std::ops::Range;
use tracing::debug;

/// Residual of the factor regression.
pub const RESIDUAL: &str = "residual";

/// Name of the intercept regressor.
pub const CONSTANT: &str = "const";

/// Name of the coefficient column for a regressor.
pub fn coefficient_column(regressor: &str) -> String {
    format!("B_{regressor}")
}

/// Append rolling coefficients and residuals to a panel frame.
///
/// The frame must hold `entity_id`, `date`, `return_rf` and every factor in
/// `regression`. The result is sorted by `(entity_id, date)`.
pub fn fit_factor_model(frame: DataFrame, regression: &RegressionConfig) -> Result<DataFrame> {
    let ols = RollingOls::new(regression.window, regression.min_periods())?;

    let mut frame = frame.sort([ENTITY_ID, DATE], SortMultipleOptions::default())?;

    let response = float_values(&frame, EXCESS_RETURN)?;
    let k = regression.factors.len() + 1;
    let mut design = Array2::<f64>::ones((frame.height(), k));
    for (j, factor) in regression.factors.iter().enumerate() {
        design
            .column_mut(j + 1)
            .assign(&float_values(&frame, factor.name())?);
    }

    let groups = entity_ranges(&frame)?;
    debug!(
        entities = groups.len(),
        rows = frame.height(),
        regressors = k,
        window = ols.window(),
        "Fitting rolling factor regression"
    );
    let coefficients = ols.fit_groups(response.view(), design.view(), &groups);

    let regressors: Vec<&str> = std::iter::once(CONSTANT)
        .chain(regression.factors.iter().map(|f| f.name()))
        .collect();
    for (j, regressor) in regressors.iter().enumerate() {
        let values: Vec<Option<f64>> = coefficients
            .column(j)
            .iter()
            .map(|v| v.is_finite().then_some(*v))
            .collect();
        let column: Column = Series::new(coefficient_column(regressor).into(), values).into();
        frame.with_column(column)?;
    }

    let fitted = regression
        .factors
        .iter()
        .fold(col(coefficient_column(CONSTANT)), |acc, factor| {
            acc + col(coefficient_column(factor.name())) * col(factor.name())
        });

    Ok(frame
        .lazy()
        .with_column((col(EXCESS_RETURN) - fitted).alias(RESIDUAL))
        .collect()?)
}

/// Column as a dense vector with NaN for nulls.
fn float_values(frame: &DataFrame, name: &str) -> Result<Array1<f64>> {
    let column = frame
        .column(name)
        .map_err(|_| SignalError::MissingColumn(name.to_string()))?
        .cast(&DataType::Float64)?;
    Ok(column
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(f64::NAN))
        .collect())
}

/// Contiguous row ranges of each entity in a frame sorted by entity.
fn entity_ranges(frame: &DataFrame) -> Result<Vec<Range<usize>>> {
    let ids = frame
        .column(ENTITY_ID)
        .map_err(|_| SignalError::MissingColumn(ENTITY_ID.to_string()))?
        .str()?;

    let mut ranges = Vec::new();
    let mut start = 0;
    let mut current: Option<&str> = None;
    for (row, id) in ids.into_iter().enumerate() {
        if row > 0 && id != current {
            ranges.push(start..row);
            start = row;
        }
        current = id;
    }
    if frame.height() > 0 {
        ranges.push(start..frame.height());
    }
    Ok(ranges)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use hobart_data::FactorColumn;
    use polars::df;

    fn two_entity_frame(rows: usize) -> DataFrame {
        let mut ids = Vec::new();
        let mut dates = Vec::new();
        let mut excess = Vec::new();
        let mut market = Vec::new();
        // Interleave entities by date to exercise the sort.
        for t in 0..rows {
            let f = 0.01 * ((t % 5) as f64 - 2.0) + 0.001 * t as f64;
            for (id, alpha, beta) in [("B", -0.002, 0.5), ("A", 0.001, 1.2)] {
                ids.push(id);
                dates.push(t as i32);
                market.push(f);
                excess.push(alpha + beta * f + if t % 3 == 0 { 0.004 } else { -0.002 });
            }
        }
        df!(
            ENTITY_ID => ids,
            DATE => dates,
            EXCESS_RETURN => excess,
            "mkt_rf" => market,
        )
        .unwrap()
    }

    #[test]
    fn test_coefficient_column_names() {
        assert_eq!(coefficient_column(CONSTANT), "B_const");
        assert_eq!(coefficient_column("mkt_rf"), "B_mkt_rf");
    }

    #[test]
    fn test_residual_reconstruction() {
        let regression = RegressionConfig::new(vec![FactorColumn::MktRf], 30);
        let result = fit_factor_model(two_entity_frame(60), &regression).unwrap();

        let excess = result.column(EXCESS_RETURN).unwrap().f64().unwrap();
        let residual = result.column(RESIDUAL).unwrap().f64().unwrap();
        let b0 = result.column("B_const").unwrap().f64().unwrap();
        let b1 = result.column("B_mkt_rf").unwrap().f64().unwrap();
        let f = result.column("mkt_rf").unwrap().f64().unwrap();

        let mut checked = 0;
        for i in 0..result.height() {
            match (excess.get(i), residual.get(i), b0.get(i), b1.get(i), f.get(i)) {
                (Some(y), Some(e), Some(c), Some(b), Some(x)) => {
                    assert_relative_eq!(y - e, c + b * x, epsilon = 1e-12);
                    checked += 1;
                }
                (_, None, ..) => {}
                _ => panic!("residual present without its inputs at row {i}"),
            }
        }
        // 31 fitted rows per entity.
        assert_eq!(checked, 62);
    }

    #[test]
    fn test_entities_are_fitted_separately() {
        let regression = RegressionConfig::new(vec![FactorColumn::MktRf], 30);
        let result = fit_factor_model(two_entity_frame(60), &regression).unwrap();

        let ids = result.column(ENTITY_ID).unwrap().str().unwrap();
        assert_eq!(ids.get(0), Some("A"));
        assert_eq!(ids.get(60), Some("B"));

        let b1 = result.column("B_mkt_rf").unwrap().f64().unwrap();
        assert!(b1.get(28).is_none());
        assert!(b1.get(29).is_some());
        assert!(b1.get(60 + 28).is_none());
        let a_beta = b1.get(59).unwrap();
        let b_beta = b1.get(119).unwrap();
        assert!((a_beta - 1.2).abs() < 0.2, "A beta {a_beta}");
        assert!((b_beta - 0.5).abs() < 0.2, "B beta {b_beta}");
    }

    #[test]
    fn test_missing_factor_column() {
        let regression = RegressionConfig::new(vec![FactorColumn::Smb], 30);
        let result = fit_factor_model(two_entity_frame(40), &regression);
        assert!(matches!(result, Err(SignalError::MissingColumn(c)) if c == "smb"));
    }
}
