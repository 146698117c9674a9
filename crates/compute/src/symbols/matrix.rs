use super::alphabet::{Alphabet, Symbol};

/// Added on top of the largest symbol distance for any comparison that
/// involves a gap.
pub const GAP_MARGIN: f64 = 0.1;

/// Pairwise symbol distances, including the gap row and column.
///
/// Non-gap entries follow the SAX lower-bounding distance: adjacent or equal
/// symbols are 0 apart, otherwise the distance is the gap between the
/// innermost breakpoints separating them.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDistanceMatrix {
    /// Alphabet size plus one (gap).
    dim: usize,
    data: Vec<f64>,
    max: f64,
}

impl SymbolDistanceMatrix {
    pub fn new(alphabet: &Alphabet) -> Self {
        let n = alphabet.size();
        let cuts = alphabet.cuts();
        let dim = n + 1;
        let mut data = vec![0.0; dim * dim];
        let mut max = 0.0_f64;

        for i in 0..n {
            for j in 0..n {
                let (lo, hi) = if i < j { (i, j) } else { (j, i) };
                let d = if hi - lo <= 1 { 0.0 } else { cuts[hi - 1] - cuts[lo] };
                data[i * dim + j] = d;
                max = max.max(d);
            }
        }

        let gap = max + GAP_MARGIN;
        for k in 0..n {
            data[n * dim + k] = gap;
            data[k * dim + n] = gap;
        }
        data[n * dim + n] = 0.0;

        Self { dim, data, max }
    }

    fn slot(&self, s: Symbol) -> usize {
        s.index().unwrap_or(self.dim - 1)
    }

    /// Distance from control symbol `control` to test symbol `test`.
    pub fn get(&self, control: Symbol, test: Symbol) -> f64 {
        self.data[self.slot(control) * self.dim + self.slot(test)]
    }

    /// Largest distance between two non-gap symbols.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Distance charged when exactly one side is a gap.
    pub fn gap_distance(&self) -> f64 {
        self.max + GAP_MARGIN
    }

    /// Smallest strictly positive distance between two non-gap symbols.
    pub fn min_nonzero(&self) -> f64 {
        let n = self.dim - 1;
        let mut min = f64::INFINITY;
        for i in 0..n {
            for j in 0..n {
                let d = self.data[i * self.dim + j];
                if d > 0.0 && d < min {
                    min = d;
                }
            }
        }
        if min.is_finite() { min } else { self.max }
    }

    /// Non-gap alphabet size.
    pub fn alphabet_size(&self) -> usize {
        self.dim - 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(size: usize) -> SymbolDistanceMatrix {
        SymbolDistanceMatrix::new(&Alphabet::new(size).unwrap())
    }

    #[test]
    fn symmetric_for_non_gap_symbols() {
        for size in [3, 5, 7, 10] {
            let m = matrix(size);
            for i in 0..size {
                for j in 0..size {
                    assert_eq!(
                        m.get(Symbol::new(i), Symbol::new(j)),
                        m.get(Symbol::new(j), Symbol::new(i))
                    );
                }
            }
        }
    }

    #[test]
    fn diagonal_and_neighbours_are_zero() {
        let m = matrix(7);
        for i in 0..7 {
            assert_eq!(m.get(Symbol::new(i), Symbol::new(i)), 0.0);
            if i + 1 < 7 {
                assert_eq!(m.get(Symbol::new(i), Symbol::new(i + 1)), 0.0);
            }
        }
        assert!(m.get(Symbol::new(0), Symbol::new(2)) > 0.0);
    }

    #[test]
    fn gap_row_exceeds_maximum() {
        let m = matrix(7);
        assert!((m.max() - m.get(Symbol::new(0), Symbol::new(6))).abs() < 1e-12);
        for i in 0..7 {
            assert_eq!(m.get(Symbol::GAP, Symbol::new(i)), m.gap_distance());
            assert_eq!(m.get(Symbol::new(i), Symbol::GAP), m.gap_distance());
        }
        assert_eq!(m.get(Symbol::GAP, Symbol::GAP), 0.0);
        assert!(m.gap_distance() > m.max());
    }

    #[test]
    fn min_nonzero_is_the_central_interval() {
        let a = Alphabet::new(7).unwrap();
        let m = SymbolDistanceMatrix::new(&a);
        let cuts = a.cuts();
        assert!((m.min_nonzero() - (cuts[3] - cuts[2])).abs() < 1e-12);
    }
}
