use verdict_core::{Result, VerifyError};

use super::alphabet::Symbol;
use super::matrix::SymbolDistanceMatrix;

pub const MAX_TOLERANCE: u8 = 5;

/// Level-1 threshold as a fraction of level 2.
const LEVEL_ONE_FACTOR: f64 = 0.75;

/// Score threshold per tolerance level.
///
/// Level `t >= 2` is the worst distance reachable by moving `t` alphabet
/// steps from any starting symbol.
#[derive(Debug, Clone, PartialEq)]
pub struct ToleranceThresholds {
    levels: [f64; MAX_TOLERANCE as usize],
}

impl ToleranceThresholds {
    pub fn new(matrix: &SymbolDistanceMatrix) -> Self {
        let n = matrix.alphabet_size();
        let mut levels = [0.0; MAX_TOLERANCE as usize];

        for t in 2..=MAX_TOLERANCE as usize {
            levels[t - 1] = (0..n)
                .map(|i| matrix.get(Symbol::new(i), Symbol::new((i + t).min(n - 1))))
                .fold(0.0, f64::max);
        }
        levels[0] = LEVEL_ONE_FACTOR * levels[1];

        Self { levels }
    }

    pub fn get(&self, tolerance: u8) -> Result<f64> {
        if !(1..=MAX_TOLERANCE).contains(&tolerance) {
            return Err(VerifyError::UnsupportedTolerance(tolerance));
        }
        Ok(self.levels[tolerance as usize - 1])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbols::alphabet::Alphabet;

    fn thresholds(size: usize) -> ToleranceThresholds {
        ToleranceThresholds::new(&SymbolDistanceMatrix::new(&Alphabet::new(size).unwrap()))
    }

    #[test]
    fn non_decreasing_in_level() {
        for size in [3, 5, 7, 12] {
            let t = thresholds(size);
            for level in 1..MAX_TOLERANCE {
                assert!(t.get(level).unwrap() <= t.get(level + 1).unwrap());
            }
        }
    }

    #[test]
    fn level_one_is_three_quarters_of_level_two() {
        let t = thresholds(7);
        assert_eq!(t.get(1).unwrap(), 0.75 * t.get(2).unwrap());
        assert!(t.get(2).unwrap() > 0.0);
    }

    #[test]
    fn level_two_is_the_outer_interval_width() {
        let a = Alphabet::new(7).unwrap();
        let t = ToleranceThresholds::new(&SymbolDistanceMatrix::new(&a));
        let cuts = a.cuts();
        assert!((t.get(2).unwrap() - (cuts[1] - cuts[0])).abs() < 1e-12);
    }

    #[test]
    fn unsupported_levels_error() {
        let t = thresholds(7);
        assert!(matches!(t.get(0), Err(VerifyError::UnsupportedTolerance(0))));
        assert!(matches!(t.get(6), Err(VerifyError::UnsupportedTolerance(6))));
    }
}
