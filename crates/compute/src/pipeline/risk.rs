use verdict_core::Risk;

/// Maps an aggregate score onto a risk band for one tolerance threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RiskClassifier {
    threshold: f64,
}

impl RiskClassifier {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Skip-flagged hosts are always `NotApplicable`.
    pub fn classify(&self, score: f64, skip: bool) -> Risk {
        if skip {
            Risk::NotApplicable
        } else if score <= self.threshold {
            Risk::None
        } else if score <= 2.0 * self.threshold {
            Risk::Low
        } else {
            Risk::High
        }
    }
}
