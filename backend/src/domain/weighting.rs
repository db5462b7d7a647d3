//! Bounded impact-weighting multipliers.
//!
//! The external model is advisory only: whatever it returns is clamped to
//! [`WeightedFactor::MIN`]..[`WeightedFactor::MAX`] before it can touch an
//! aggregate, and any failure or timeout degrades to the deterministic 1.0
//! fallback flagged as unweighted. Aggregation correctness never depends
//! on the model behaving.

use serde::{Deserialize, Serialize};

/// A clamped multiplier applied to raw impact units before aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightedFactor {
    multiplier: f64,
    weighted: bool,
}

impl WeightedFactor {
    /// Lower clamp bound.
    pub const MIN: f64 = 0.5;
    /// Upper clamp bound.
    pub const MAX: f64 = 2.0;
    /// Deterministic fallback multiplier.
    pub const FALLBACK: f64 = 1.0;

    /// Wrap a model suggestion, clamping it into the documented range.
    ///
    /// Non-finite suggestions are treated as model failures and degrade to
    /// the unweighted fallback.
    #[must_use]
    pub fn weighted(suggestion: f64) -> Self {
        if !suggestion.is_finite() {
            return Self::unweighted();
        }
        Self {
            multiplier: suggestion.clamp(Self::MIN, Self::MAX),
            weighted: true,
        }
    }

    /// The deterministic fallback used when the model is unavailable.
    #[must_use]
    pub fn unweighted() -> Self {
        Self {
            multiplier: Self::FALLBACK,
            weighted: false,
        }
    }

    /// The clamped multiplier, guaranteed inside `[MIN, MAX]`.
    #[must_use]
    pub fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// False when this factor is the unavailability fallback.
    #[must_use]
    pub fn is_weighted(&self) -> bool {
        self.weighted
    }
}

/// Baseline environmental context for a community.
///
/// Supplied by the external environmental-data service and treated as
/// read-only advisory input to the impact model.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommunityBaseline {
    /// Baseline air-quality index.
    pub aqi: f64,
    /// Existing green cover fraction in `[0, 1]`.
    pub green_cover: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(0.0, WeightedFactor::MIN)]
    #[case(0.5, 0.5)]
    #[case(1.3, 1.3)]
    #[case(2.0, 2.0)]
    #[case(17.0, WeightedFactor::MAX)]
    #[case(-3.0, WeightedFactor::MIN)]
    fn suggestions_are_clamped(#[case] suggestion: f64, #[case] expected: f64) {
        let factor = WeightedFactor::weighted(suggestion);
        assert!((factor.multiplier() - expected).abs() < f64::EPSILON);
        assert!(factor.is_weighted());
    }

    #[rstest]
    #[case(f64::NAN)]
    #[case(f64::INFINITY)]
    #[case(f64::NEG_INFINITY)]
    fn non_finite_suggestions_fall_back(#[case] suggestion: f64) {
        let factor = WeightedFactor::weighted(suggestion);
        assert!((factor.multiplier() - WeightedFactor::FALLBACK).abs() < f64::EPSILON);
        assert!(!factor.is_weighted());
    }

    #[test]
    fn fallback_is_flagged_unweighted() {
        let factor = WeightedFactor::unweighted();
        assert!((factor.multiplier() - 1.0).abs() < f64::EPSILON);
        assert!(!factor.is_weighted());
    }
}
