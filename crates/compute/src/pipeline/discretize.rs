//! SAX-style discretization of control and test series.
//!
//! Both windows are normalized by the control window's global mean and
//! standard deviation, averaged into buckets of `smooth_window` points and
//! mapped through the alphabet's breakpoints. When the control window is
//! too tight to discretize meaningfully every present bucket gets the same
//! symbol and only presence is compared downstream.

use crate::symbols::{Alphabet, Symbol};

use super::stats::{mean_std, safe_std};

/// Fraction of missing points at which a bucket becomes a gap.
pub const INVALID_BUCKET_FRACTION: f64 = 0.7;

/// Coefficient of variation at or below which discretization is skipped.
pub const MIN_VARIATION: f64 = 0.01;

/// Bucketed view of one host's series.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolSeries {
    /// Raw-scale bucket means.
    pub buckets: Vec<Option<f64>>,
    pub symbols: Vec<Symbol>,
}

impl SymbolSeries {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Buckets carrying a value.
    pub fn valid_count(&self) -> usize {
        self.buckets.iter().filter(|b| b.is_some()).count()
    }
}

/// Output of [`discretize`], one entry per input row.
#[derive(Debug, Clone, PartialEq)]
pub struct Discretized {
    pub apply_sax: bool,
    pub mean: f64,
    pub std: f64,
    pub control: Vec<SymbolSeries>,
    pub test: Vec<SymbolSeries>,
}

/// Reduce a series to bucket means of `window` consecutive points.
/// A trailing short bucket is kept.
pub fn bucket_means(values: &[Option<f64>], window: usize) -> Vec<Option<f64>> {
    values
        .chunks(window.max(1))
        .map(|chunk| {
            let present: Vec<f64> = chunk.iter().filter_map(|v| *v).collect();
            let missing = chunk.len() - present.len();
            let invalid = missing as f64 >= INVALID_BUCKET_FRACTION * chunk.len() as f64;
            if present.is_empty() || invalid {
                None
            } else {
                Some(present.iter().sum::<f64>() / present.len() as f64)
            }
        })
        .collect()
}

/// Whether a distribution is spread enough to discretize.
pub fn should_apply_sax(mean: f64, std: f64) -> bool {
    if std == 0.0 {
        return false;
    }
    if mean == 0.0 {
        return true;
    }
    std / mean.abs() > MIN_VARIATION
}

/// Discretize every control and test row against the control distribution.
pub fn discretize(
    control: &[&[Option<f64>]],
    test: &[&[Option<f64>]],
    smooth_window: usize,
    alphabet: &Alphabet,
) -> Discretized {
    let pooled: Vec<f64> = control
        .iter()
        .flat_map(|row| row.iter().filter_map(|v| *v))
        .collect();
    let (mean, std) = mean_std(&pooled).unwrap_or((0.0, 0.0));
    let apply_sax = should_apply_sax(mean, std);
    let scale = safe_std(std);

    let encode = |row: &&[Option<f64>]| {
        let buckets = bucket_means(row, smooth_window);
        let symbols = buckets
            .iter()
            .map(|b| match b {
                None => Symbol::GAP,
                Some(v) if apply_sax => alphabet.symbolize((v - mean) / scale),
                Some(_) => alphabet.flat_symbol(),
            })
            .collect();
        SymbolSeries { buckets, symbols }
    };

    Discretized {
        apply_sax,
        mean,
        std,
        control: control.iter().map(encode).collect(),
        test: test.iter().map(encode).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alphabet() -> Alphabet {
        Alphabet::new(7).unwrap()
    }

    #[test]
    fn buckets_average_their_points() {
        let v = [Some(1.0), Some(3.0), Some(5.0), None, Some(7.0)];
        assert_eq!(bucket_means(&v, 2), vec![Some(2.0), Some(5.0), Some(7.0)]);
    }

    #[test]
    fn mostly_missing_bucket_is_a_gap() {
        let v = [Some(1.0), None, None, None, Some(2.0), Some(2.0), None, None, None, None];
        // 3/4 missing -> gap; 2/4 missing -> kept; 2/2 missing -> gap
        assert_eq!(bucket_means(&v, 4), vec![None, Some(2.0), None]);
    }

    #[test]
    fn tight_distribution_skips_sax() {
        assert!(!should_apply_sax(100.0, 0.0));
        assert!(!should_apply_sax(100.0, 1.0));
        assert!(should_apply_sax(100.0, 1.5));
        assert!(should_apply_sax(0.0, 0.3));
    }

    #[test]
    fn constant_series_uses_flat_symbols() {
        let row = [Some(10.0); 4];
        let d = discretize(&[&row[..], &row[..]], &[&row[..]], 1, &alphabet());
        assert!(!d.apply_sax);
        assert_eq!(d.std, 0.0);
        let flat = alphabet().flat_symbol();
        assert!(d.control[0].symbols.iter().all(|s| *s == flat));
        assert!(d.test[0].symbols.iter().all(|s| *s == flat));
    }

    #[test]
    fn low_variation_ratio_skips_sax() {
        let row = [Some(1000.0), Some(1001.0), Some(999.0), Some(1000.0)];
        let d = discretize(&[&row[..]], &[&row[..]], 1, &alphabet());
        assert!(d.std / d.mean <= MIN_VARIATION);
        assert!(!d.apply_sax);
    }

    #[test]
    fn spread_series_is_symbolized_against_control() {
        let control = [Some(1.0), Some(5.0), Some(9.0), Some(5.0)];
        let test = [Some(100.0), None, Some(-100.0), Some(5.0)];
        let d = discretize(&[&control[..]], &[&test[..]], 1, &alphabet());
        assert!(d.apply_sax);
        assert_eq!(d.test[0].symbols[0], Symbol::new(6));
        assert_eq!(d.test[0].symbols[1], Symbol::GAP);
        assert_eq!(d.test[0].symbols[2], Symbol::new(0));
        assert_eq!(d.test[0].symbols[3], Symbol::new(3));
        assert_eq!(d.test[0].buckets[0], Some(100.0));
        assert_eq!(d.control[0].valid_count(), 4);
    }
}
