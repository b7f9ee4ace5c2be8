//! # Connection Model
//!
//! Turns normalized geometric gaps between two Inters into support
//! coefficients, one per endpoint.
//!
//! ```text
//!   gaps (interline fractions)
//!     → hard check: every gap < its maximum, otherwise no relation
//!     → closeness per axis: curve(1 − gap / max)  ∈ (0, 1]
//!     → weighted mean with the inward or outward weight profile
//!     → × source_coeff / × target_coeff
//! ```
//!
//! Horizontal gaps have a sign: an *inward* gap is an overlap of the two
//! footprints, an *outward* gap is a separation. Each sign has its own
//! maximum and its own weight profile.

use serde::{Deserialize, Serialize};
use crate::model::Fraction;
use crate::{Error, Result};

// ============================================================================
// Gaps
// ============================================================================

/// Horizontal gap, split by sign.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum HorizontalGap {
    /// Overlap depth.
    Inward(f64),
    /// Separation distance.
    Outward(f64),
}

impl HorizontalGap {
    pub fn magnitude(self) -> f64 {
        match self {
            HorizontalGap::Inward(d) | HorizontalGap::Outward(d) => d,
        }
    }
}

/// Gap measurements between two footprints, as interline fractions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gaps {
    pub horizontal: HorizontalGap,
    pub vertical: f64,
}

impl Gaps {
    pub fn new(horizontal: HorizontalGap, vertical: f64) -> Self {
        Self { horizontal, vertical }
    }

    /// Build from a signed horizontal gap: negative `dx` is an overlap.
    pub fn from_signed(dx: f64, dy: f64) -> Self {
        let horizontal = if dx < 0.0 {
            HorizontalGap::Inward(-dx)
        } else {
            HorizontalGap::Outward(dx)
        };
        Self { horizontal, vertical: dy }
    }

    fn validate(&self) -> Result<()> {
        for (axis, value) in [("horizontal", self.horizontal.magnitude()), ("vertical", self.vertical)] {
            if value.is_nan() || value < 0.0 || value.is_infinite() {
                return Err(Error::InvalidGeometry(format!("{axis} gap {value} is not a finite non-negative number")));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Weights & curve
// ============================================================================

/// Relative evidentiary weight of each axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisWeights {
    pub x: f64,
    pub y: f64,
}

impl AxisWeights {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    fn sum(&self) -> f64 {
        self.x + self.y
    }
}

/// Mapping from `t = 1 − gap / max` to a closeness score.
///
/// Both curves are continuous, strictly increasing in `t` and pin
/// `curve(0) = 0`, `curve(1) = 1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum ClosenessCurve {
    #[default]
    Linear,
    /// `3t² − 2t³`: flat near both ends.
    Smoothstep,
}

impl ClosenessCurve {
    /// Closeness of `gap` against `max`. Callers guarantee `0 ≤ gap ≤ max`.
    pub fn closeness(self, gap: f64, max: f64) -> f64 {
        let t = (1.0 - gap / max).clamp(0.0, 1.0);
        match self {
            ClosenessCurve::Linear => t,
            ClosenessCurve::Smoothstep => t * t * (3.0 - 2.0 * t),
        }
    }
}

// ============================================================================
// ConnectionSpec
// ============================================================================

/// Support coefficients produced for one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SupportCoeffs {
    /// Weighted closeness before the per-endpoint factors.
    pub raw: f64,
    pub source: f64,
    pub target: f64,
}

fn one() -> f64 { 1.0 }

/// Geometric parameters of one relation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionSpec {
    pub x_in_gap_max: Fraction,
    pub x_out_gap_max: Fraction,
    pub y_gap_max: Fraction,
    pub in_weights: AxisWeights,
    pub out_weights: AxisWeights,
    #[serde(default = "one")]
    pub source_coeff: f64,
    #[serde(default = "one")]
    pub target_coeff: f64,
    #[serde(default)]
    pub curve: ClosenessCurve,
}

impl ConnectionSpec {
    /// Check that the parameters can only ever yield coefficients in [0, 1].
    pub fn validate(&self, name: &str) -> Result<()> {
        for (label, max) in [
            ("x_in_gap_max", self.x_in_gap_max),
            ("x_out_gap_max", self.x_out_gap_max),
            ("y_gap_max", self.y_gap_max),
        ] {
            if !max.0.is_finite() || max.0 <= 0.0 {
                return Err(Error::Config(format!("{name}: {label} must be positive, got {}", max.0)));
            }
        }
        for (label, w) in [("in_weights", self.in_weights), ("out_weights", self.out_weights)] {
            let finite = w.x.is_finite() && w.y.is_finite();
            if !finite || w.x < 0.0 || w.y < 0.0 || w.sum() <= 0.0 {
                return Err(Error::Config(format!(
                    "{name}: {label} must be non-negative with a positive sum, got ({}, {})",
                    w.x, w.y
                )));
            }
        }
        for (label, c) in [("source_coeff", self.source_coeff), ("target_coeff", self.target_coeff)] {
            if !(0.0..=1.0).contains(&c) {
                return Err(Error::Config(format!("{name}: {label} must lie in [0, 1], got {c}")));
            }
        }
        Ok(())
    }

    /// Evaluate a connection.
    ///
    /// Returns `Ok(None)` when any gap reaches its maximum: the pair is not
    /// connected at all. Malformed gaps, a weight profile without a positive
    /// sum and endpoint coefficients outside [0, 1] are `InvalidGeometry`.
    pub fn evaluate(&self, gaps: &Gaps) -> Result<Option<SupportCoeffs>> {
        gaps.validate()?;

        let (x_gap, x_max, weights) = match gaps.horizontal {
            HorizontalGap::Inward(d) => (d, self.x_in_gap_max.0, self.in_weights),
            HorizontalGap::Outward(d) => (d, self.x_out_gap_max.0, self.out_weights),
        };
        let y_max = self.y_gap_max.0;

        let total = weights.sum();
        if !(weights.x >= 0.0 && weights.y >= 0.0 && total.is_finite() && total > 0.0) {
            return Err(Error::InvalidGeometry(format!(
                "axis weights ({}, {}) must be non-negative with a positive finite sum",
                weights.x, weights.y
            )));
        }
        for c in [self.source_coeff, self.target_coeff] {
            if !(0.0..=1.0).contains(&c) {
                return Err(Error::InvalidGeometry(format!("endpoint coefficient {c} is outside [0, 1]")));
            }
        }

        if x_gap >= x_max || gaps.vertical >= y_max {
            return Ok(None);
        }

        let cx = self.curve.closeness(x_gap, x_max);
        let cy = self.curve.closeness(gaps.vertical, y_max);
        let raw = (weights.x * cx + weights.y * cy) / total;

        Ok(Some(SupportCoeffs {
            raw,
            source: raw * self.source_coeff,
            target: raw * self.target_coeff,
        }))
    }
}
