use verdict_core::{Result, VerifyError};
use verdict_core::config::{MAX_ALPHABET_SIZE, MIN_ALPHABET_SIZE};

/// One discretized bucket: an index into the alphabet, or the gap marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u8);

impl Symbol {
    /// Marker for a bucket with too little data.
    pub const GAP: Symbol = Symbol(u8::MAX);

    pub fn new(index: usize) -> Self {
        Symbol(index as u8)
    }

    pub fn is_gap(self) -> bool {
        self == Self::GAP
    }

    /// Alphabet index; `None` for the gap.
    pub fn index(self) -> Option<usize> {
        if self.is_gap() {
            None
        } else {
            Some(self.0 as usize)
        }
    }
}

/// Rendered character for the gap symbol.
pub const GAP_CHAR: char = 'X';

/// Ordered symbol set whose members map to equiprobable intervals of the
/// standard normal distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct Alphabet {
    size: usize,
    cuts: Vec<f64>,
}

impl Alphabet {
    pub fn new(size: usize) -> Result<Self> {
        if !(MIN_ALPHABET_SIZE..=MAX_ALPHABET_SIZE).contains(&size) {
            return Err(VerifyError::InvalidConfig(format!(
                "alphabet size {} outside {}..={}",
                size, MIN_ALPHABET_SIZE, MAX_ALPHABET_SIZE
            )));
        }
        let cuts = (1..size)
            .map(|i| inverse_normal_cdf(i as f64 / size as f64))
            .collect();
        Ok(Self { size, cuts })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    /// The `size - 1` ascending breakpoints.
    pub fn cuts(&self) -> &[f64] {
        &self.cuts
    }

    /// Symbol for a normalized value.
    pub fn symbolize(&self, z: f64) -> Symbol {
        Symbol::new(self.cuts.partition_point(|c| *c <= z))
    }

    /// Symbol used for every present bucket when the series is too flat to discretize.
    pub fn flat_symbol(&self) -> Symbol {
        Symbol::new(self.size / 2)
    }

    pub fn render(&self, symbols: &[Symbol]) -> String {
        symbols
            .iter()
            .map(|s| match s.index() {
                Some(i) => (b'a' + i as u8) as char,
                None => GAP_CHAR,
            })
            .collect()
    }
}

/// Quantile function of the standard normal distribution
/// (Acklam's rational approximation, relative error < 1.2e-9).
pub fn inverse_normal_cdf(p: f64) -> f64 {
    const A: [f64; 6] = [
        -3.969_683_028_665_376e1,
        2.209_460_984_245_205e2,
        -2.759_285_104_469_687e2,
        1.383_577_518_672_69e2,
        -3.066_479_806_614_716e1,
        2.506_628_277_459_239,
    ];
    const B: [f64; 5] = [
        -5.447_609_879_822_406e1,
        1.615_858_368_580_409e2,
        -1.556_989_798_598_866e2,
        6.680_131_188_771_972e1,
        -1.328_068_155_288_572e1,
    ];
    const C: [f64; 6] = [
        -7.784_894_002_430_293e-3,
        -3.223_964_580_411_365e-1,
        -2.400_758_277_161_838,
        -2.549_732_539_343_734,
        4.374_664_141_464_968,
        2.938_163_982_698_783,
    ];
    const D: [f64; 4] = [
        7.784_695_709_041_462e-3,
        3.224_671_290_700_398e-1,
        2.445_134_137_142_996,
        3.754_408_661_907_416,
    ];
    const P_LOW: f64 = 0.02425;

    if p <= 0.0 {
        return f64::NEG_INFINITY;
    }
    if p >= 1.0 {
        return f64::INFINITY;
    }

    let tail = |q: f64| {
        (((((C[0] * q + C[1]) * q + C[2]) * q + C[3]) * q + C[4]) * q + C[5])
            / ((((D[0] * q + D[1]) * q + D[2]) * q + D[3]) * q + 1.0)
    };

    if p < P_LOW {
        tail((-2.0 * p.ln()).sqrt())
    } else if p <= 1.0 - P_LOW {
        let q = p - 0.5;
        let r = q * q;
        (((((A[0] * r + A[1]) * r + A[2]) * r + A[3]) * r + A[4]) * r + A[5]) * q
            / (((((B[0] * r + B[1]) * r + B[2]) * r + B[3]) * r + B[4]) * r + 1.0)
    } else {
        -tail((-2.0 * (1.0 - p).ln()).sqrt())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantiles_match_reference_values() {
        assert!(inverse_normal_cdf(0.5).abs() < 1e-9);
        assert!((inverse_normal_cdf(0.975) - 1.959_963_985).abs() < 1e-6);
        assert!((inverse_normal_cdf(0.01) + 2.326_347_874).abs() < 1e-6);
    }

    #[test]
    fn cuts_are_ascending_and_symmetric() {
        let a = Alphabet::new(7).unwrap();
        let cuts = a.cuts();
        assert_eq!(cuts.len(), 6);
        assert!(cuts.windows(2).all(|w| w[0] < w[1]));
        for i in 0..cuts.len() {
            assert!((cuts[i] + cuts[cuts.len() - 1 - i]).abs() < 1e-8);
        }
    }

    #[test]
    fn symbolize_covers_the_whole_line() {
        let a = Alphabet::new(7).unwrap();
        assert_eq!(a.symbolize(-10.0), Symbol::new(0));
        assert_eq!(a.symbolize(0.0), Symbol::new(3));
        assert_eq!(a.symbolize(10.0), Symbol::new(6));
    }

    #[test]
    fn render_uses_letters_and_gap_marker() {
        let a = Alphabet::new(5).unwrap();
        let s = a.render(&[Symbol::new(0), Symbol::GAP, Symbol::new(4)]);
        assert_eq!(s, "aXe");
    }

    #[test]
    fn rejects_out_of_range_sizes() {
        assert!(Alphabet::new(2).is_err());
        assert!(Alphabet::new(21).is_err());
    }
}
