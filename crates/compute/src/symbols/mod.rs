//! Process-independent constants of the symbolic comparison: the alphabet,
//! the symbol distance matrix and the tolerance thresholds derived from it.
//!
//! They are bundled into an [`AnalysisContext`] that the caller builds and
//! passes by reference; nothing here is global.

pub mod alphabet;
pub mod matrix;
pub mod thresholds;

pub use alphabet::{Alphabet, Symbol, GAP_CHAR};
pub use matrix::SymbolDistanceMatrix;
pub use thresholds::ToleranceThresholds;

use verdict_core::Result;

/// Derived constants shared by every comparison in a worker.
#[derive(Debug, Clone)]
pub struct AnalysisContext {
    pub alphabet: Alphabet,
    pub matrix: SymbolDistanceMatrix,
    pub thresholds: ToleranceThresholds,
}

impl AnalysisContext {
    pub fn new(alphabet_size: usize) -> Result<Self> {
        let alphabet = Alphabet::new(alphabet_size)?;
        let matrix = SymbolDistanceMatrix::new(&alphabet);
        let thresholds = ToleranceThresholds::new(&matrix);
        Ok(Self {
            alphabet,
            matrix,
            thresholds,
        })
    }
}
