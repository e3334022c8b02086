//! Sample correlation coefficients.

use std::cmp::Ordering;

/// Pearson correlation of two equal-length samples.
///
/// `None` for fewer than two pairs or when either sample has no variance.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }

    let n = x.len() as f64;
    let mean_x = x.iter().sum::<f64>() / n;
    let mean_y = y.iter().sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (xi, yi) in x.iter().zip(y) {
        let dx = xi - mean_x;
        let dy = yi - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x <= 0.0 || var_y <= 0.0 {
        return None;
    }
    let r = cov / (var_x.sqrt() * var_y.sqrt());
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}

/// Spearman rank correlation, ties ranked by their average position.
pub fn spearman(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    pearson(&average_ranks(x), &average_ranks(y))
}

/// 1-based ranks with tied values sharing the mean of their positions.
pub fn average_ranks(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| values[a].partial_cmp(&values[b]).unwrap_or(Ordering::Equal));

    let mut ranks = vec![0.0; n];
    let mut i = 0;
    while i < n {
        let mut j = i + 1;
        while j < n && values[order[j]] == values[order[i]] {
            j += 1;
        }
        // Positions i..j (0-based) share rank (i + 1 + j) / 2.
        let rank = (i + j + 1) as f64 / 2.0;
        for &index in &order[i..j] {
            ranks[index] = rank;
        }
        i = j;
    }
    ranks
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_pearson_perfect() {
        let x = [1.0, 2.0, 3.0, 4.0, 5.0];
        let y = [2.0, 4.0, 6.0, 8.0, 10.0];
        assert_relative_eq!(pearson(&x, &y).unwrap(), 1.0, epsilon = 1e-12);

        let y = [10.0, 8.0, 6.0, 4.0, 2.0];
        assert_relative_eq!(pearson(&x, &y).unwrap(), -1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_pearson_known_value() {
        let x = [1.0, 2.0, 3.0, 4.0];
        let y = [1.0, 3.0, 2.0, 4.0];
        assert_relative_eq!(pearson(&x, &y).unwrap(), 0.8, epsilon = 1e-12);
    }

    #[test]
    fn test_degenerate_samples() {
        assert_eq!(pearson(&[1.0], &[2.0]), None);
        assert_eq!(pearson(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), None);
        assert_eq!(pearson(&[1.0, 2.0], &[1.0]), None);
        assert_eq!(spearman(&[3.0], &[1.0]), None);
    }

    #[test]
    fn test_average_ranks_with_ties() {
        assert_eq!(average_ranks(&[10.0, 20.0, 20.0, 5.0]), vec![2.0, 3.5, 3.5, 1.0]);
        assert_eq!(average_ranks(&[1.0, 1.0, 1.0]), vec![2.0, 2.0, 2.0]);
    }

    #[test]
    fn test_spearman_is_monotone_invariant() {
        let x = [0.1, 0.5, 0.2, 0.9, 0.7];
        let y: Vec<f64> = x.iter().map(|v: &f64| v.powi(3) + 2.0).collect();
        assert_relative_eq!(spearman(&x, &y).unwrap(), 1.0, epsilon = 1e-12);
        assert!(pearson(&x, &y).unwrap() < 1.0);
    }
}
