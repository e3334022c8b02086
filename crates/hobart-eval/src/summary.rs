//! Summary statistics of an IC series.

use serde::{Deserialize, Serialize};

/// IC statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct IcSummary {
    /// Mean IC
    pub mean: f64,
    /// Sample standard deviation of IC
    pub std: f64,
    /// Information ratio (mean / std)
    pub ir: f64,
    /// Share of dates with positive IC
    pub hit_rate: f64,
    /// t-statistic of the mean
    pub t_stat: f64,
    /// Number of dates with a defined IC
    pub count: usize,
}

impl IcSummary {
    /// Summarise defined daily ICs.
    ///
    /// With fewer than two values the dispersion-based fields are zero.
    pub fn from_values(values: &[f64]) -> Self {
        if values.is_empty() {
            return Self::default();
        }

        let n = values.len() as f64;
        let mean = values.iter().sum::<f64>() / n;
        let std = if values.len() > 1 {
            (values.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / (n - 1.0)).sqrt()
        } else {
            0.0
        };
        let (ir, t_stat) = if std > 0.0 {
            (mean / std, mean / (std / n.sqrt()))
        } else {
            (0.0, 0.0)
        };
        let hit_rate = values.iter().filter(|&&x| x > 0.0).count() as f64 / n;

        Self {
            mean,
            std,
            ir,
            hit_rate,
            t_stat,
            count: values.len(),
        }
    }

    /// Whether the mean IC is significant at |t| > 2.
    pub fn is_significant(&self) -> bool {
        self.t_stat.abs() > 2.0
    }
}
