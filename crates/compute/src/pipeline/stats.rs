//! Summary statistics over series that may contain missing points.

/// Mean of the present values, `None` if there are none.
pub fn mean(values: impl IntoIterator<Item = f64>) -> Option<f64> {
    let (sum, n) = values
        .into_iter()
        .fold((0.0, 0usize), |(s, n), v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Mean and sample standard deviation. A single sample has std 0.
pub fn mean_std(values: &[f64]) -> Option<(f64, f64)> {
    let mean = mean(values.iter().copied())?;
    if values.len() < 2 {
        return Some((mean, 0.0));
    }
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>()
        / (values.len() - 1) as f64;
    Some((mean, variance.sqrt()))
}

/// Divisor to use for a standard deviation: zero becomes one.
pub fn safe_std(std: f64) -> f64 {
    if std <= f64::EPSILON {
        1.0
    } else {
        std
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mean_of_nothing_is_none() {
        assert_eq!(mean(std::iter::empty()), None);
        assert_eq!(mean_std(&[]), None);
    }

    #[test]
    fn single_sample_has_zero_std() {
        assert_eq!(mean_std(&[4.0]), Some((4.0, 0.0)));
    }

    #[test]
    fn sample_std() {
        let (m, s) = mean_std(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert!((m - 5.0).abs() < 1e-10);
        // population std is 2, sample std is sqrt(32/7)
        assert!((s - (32.0_f64 / 7.0).sqrt()).abs() < 1e-10);
    }

    #[test]
    fn zero_std_is_replaced() {
        assert_eq!(safe_std(0.0), 1.0);
        assert_eq!(safe_std(2.5), 2.5);
    }
}
