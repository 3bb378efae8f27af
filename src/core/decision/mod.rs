//! # Decision Module
//!
//! Turns a similarity score into a yes/no answer for the operator.
//!
//! A score at or above the threshold counts as a match. The display emphasis
//! is derived from the label and carries no state of its own.

mod traits;

pub use traits::{DecisionPolicy, ThresholdPolicy};

use image::Rgb;
use serde::{Deserialize, Serialize};

/// Whether the live region still matches the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Label {
    Similar,
    Dissimilar,
}

/// Display emphasis for a label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Emphasis {
    Positive,
    Negative,
}

impl Emphasis {
    /// Colour used when drawing the region outline
    pub fn color(&self) -> Rgb<u8> {
        match self {
            Emphasis::Positive => Rgb([0, 200, 0]),
            Emphasis::Negative => Rgb([220, 0, 0]),
        }
    }
}

/// Classification of a single comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Decision {
    pub label: Label,
    pub emphasis: Emphasis,
}

impl Decision {
    fn from_label(label: Label) -> Self {
        let emphasis = match label {
            Label::Similar => Emphasis::Positive,
            Label::Dissimilar => Emphasis::Negative,
        };
        Self { label, emphasis }
    }

    pub fn is_similar(&self) -> bool {
        self.label == Label::Similar
    }
}

/// Classify `score` against `threshold`. The boundary counts as similar.
///
/// NaN scores never match.
pub fn decide(score: f64, threshold: f64) -> Decision {
    if score >= threshold {
        Decision::from_label(Label::Similar)
    } else {
        Decision::from_label(Label::Dissimilar)
    }
}

impl std::fmt::Display for Label {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Label::Similar => write!(f, "Similar"),
            Label::Dissimilar => write!(f, "Dissimilar"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundary_counts_as_similar() {
        for score in [0.0, 0.25, 0.5, 0.85, 1.0] {
            assert_eq!(decide(score, score).label, Label::Similar);
        }
    }

    #[test]
    fn below_threshold_is_dissimilar() {
        let decision = decide(0.84, 0.85);
        assert_eq!(decision.label, Label::Dissimilar);
        assert_eq!(decision.emphasis, Emphasis::Negative);
    }

    #[test]
    fn raising_threshold_never_flips_back_to_similar() {
        let thresholds: Vec<f64> = (0..=100).map(|t| t as f64 / 100.0).collect();
        for score in [0.0, 0.13, 0.5, 0.77, 0.999, 1.0] {
            let labels: Vec<Label> = thresholds.iter().map(|&t| decide(score, t).label).collect();
            let first_dissimilar = labels.iter().position(|l| *l == Label::Dissimilar);
            if let Some(index) = first_dissimilar {
                assert!(labels[index..].iter().all(|l| *l == Label::Dissimilar));
            }
        }
    }

    #[test]
    fn emphasis_follows_label() {
        assert_eq!(decide(0.9, 0.5).emphasis, Emphasis::Positive);
        assert_eq!(decide(0.1, 0.5).emphasis, Emphasis::Negative);
        assert_ne!(Emphasis::Positive.color(), Emphasis::Negative.color());
    }

    #[test]
    fn nan_score_is_dissimilar() {
        assert_eq!(decide(f64::NAN, 0.0).label, Label::Dissimilar);
    }

    #[test]
    fn label_display() {
        assert_eq!(Label::Similar.to_string(), "Similar");
        assert_eq!(Label::Dissimilar.to_string(), "Dissimilar");
    }
}
