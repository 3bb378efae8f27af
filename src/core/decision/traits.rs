//! Trait definitions for decision policies.

use super::{decide, Decision};

/// Strategy trait for deciding whether a score is a match
pub trait DecisionPolicy: Send + Sync {
    /// Classify a similarity score
    fn decide(&self, score: f64) -> Decision;

    /// Get the threshold used
    fn threshold(&self) -> f64;

    /// Human-readable description of the policy
    fn description(&self) -> String;
}

/// Simple threshold-based decision policy
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPolicy {
    /// Minimum score to consider similar, always within `[0, 1]`
    threshold: f64,
}

impl ThresholdPolicy {
    /// Create a new threshold policy, clamping to `[0, 1]`
    ///
    /// Recommended thresholds:
    /// - 0.95: Strict, flags small lighting changes
    /// - 0.85: Balanced (default)
    /// - 0.70: Lenient, tolerates noise and slight movement
    pub fn new(threshold: f64) -> Self {
        let threshold = if threshold.is_nan() {
            Self::BALANCED
        } else {
            threshold.clamp(0.0, 1.0)
        };
        Self { threshold }
    }

    const BALANCED: f64 = 0.85;

    /// Create a strict policy (threshold = 0.95)
    pub fn strict() -> Self {
        Self::new(0.95)
    }

    /// Create a balanced policy (threshold = 0.85)
    pub fn balanced() -> Self {
        Self::new(Self::BALANCED)
    }

    /// Create a lenient policy (threshold = 0.70)
    pub fn lenient() -> Self {
        Self::new(0.70)
    }
}

impl Default for ThresholdPolicy {
    fn default() -> Self {
        Self::balanced()
    }
}

impl DecisionPolicy for ThresholdPolicy {
    fn decide(&self, score: f64) -> Decision {
        decide(score, self.threshold)
    }

    fn threshold(&self) -> f64 {
        self.threshold
    }

    fn description(&self) -> String {
        format!(
            "Threshold policy: regions with SSIM >= {:.2} are considered similar",
            self.threshold
        )
    }
}
