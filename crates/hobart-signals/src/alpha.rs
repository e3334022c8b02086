//! Score-to-alpha conversion.

use crate::SCORE;
use hobart_data::schema::{DATE, ENTITY_ID, PREDICTED_BETA, SPECIFIC_RISK};
use polars::prelude::*;

/// Expected residual return.
pub const ALPHA: &str = "alpha";

/// Columns of the alpha table, in order.
pub const ALPHA_COLUMNS: [&str; 4] = [DATE, ENTITY_ID, ALPHA, PREDICTED_BETA];

/// Grinold scaling: `alpha = score * IC * specific_risk`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlphaConverter {
    information_coefficient: f64,
}

impl AlphaConverter {
    /// Create a converter for an assumed information coefficient.
    pub const fn new(information_coefficient: f64) -> Self {
        Self {
            information_coefficient,
        }
    }

    /// The assumed information coefficient.
    pub const fn information_coefficient(&self) -> f64 {
        self.information_coefficient
    }

    /// Produce the `(date, entity_id, alpha, predicted_beta)` table.
    ///
    /// Rows with a null score keep a null alpha; evaluation drops them.
    pub fn convert(&self, scores: LazyFrame) -> LazyFrame {
        scores
            .with_column(
                (col(SCORE) * lit(self.information_coefficient) * col(SPECIFIC_RISK)).alias(ALPHA),
            )
            .select(ALPHA_COLUMNS.map(col))
            .sort([DATE, ENTITY_ID], SortMultipleOptions::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use polars::df;

    fn scores() -> DataFrame {
        df!(
            DATE => [1, 1, 2],
            ENTITY_ID => ["B", "A", "A"],
            SCORE => [Some(1.0), Some(-0.5), None],
            SPECIFIC_RISK => [0.3, 0.2, 0.25],
            PREDICTED_BETA => [1.1, 0.9, 0.95],
            "signal" => [0.4, 0.1, 0.2],
        )
        .unwrap()
    }

    fn alphas(converter: AlphaConverter) -> DataFrame {
        converter.convert(scores().lazy()).collect().unwrap()
    }

    #[test]
    fn test_alpha_table() {
        let df = alphas(AlphaConverter::new(0.05));
        let names: Vec<&str> = df.get_column_names().iter().map(|n| n.as_str()).collect();
        assert_eq!(names, ALPHA_COLUMNS);

        let alpha = df.column(ALPHA).unwrap().f64().unwrap();
        let beta = df.column(PREDICTED_BETA).unwrap().f64().unwrap();
        assert_relative_eq!(alpha.get(0).unwrap(), -0.5 * 0.05 * 0.2);
        assert_relative_eq!(alpha.get(1).unwrap(), 1.0 * 0.05 * 0.3);
        assert_eq!(alpha.get(2), None);
        assert_eq!(beta.get(1), Some(1.1));
    }

    #[test]
    fn test_linear_in_ic() {
        let single = alphas(AlphaConverter::new(0.05));
        let double = alphas(AlphaConverter::new(0.10));
        let a = single.column(ALPHA).unwrap().f64().unwrap();
        let b = double.column(ALPHA).unwrap().f64().unwrap();
        for (x, y) in a.into_iter().zip(b.into_iter()) {
            match (x, y) {
                (Some(x), Some(y)) => assert_relative_eq!(y, 2.0 * x, epsilon = 1e-15),
                (None, None) => {}
                _ => panic!("null pattern changed with IC"),
            }
        }
    }
}
