//! # Relation-Type Catalog
//!
//! Every geometric relation type is data: a name, the shape families it
//! pairs, the footprint layout used to measure gaps, and the connection
//! parameters. Adding a relation type means adding an entry here (or in a
//! configuration file), never touching the connection model or the resolver.
//!
//! | Type | Source → Target | Layout |
//! |------|-----------------|--------|
//! | `Accid-Note` | Accidental → Head | accidental left of the head |
//! | `Head-Stem` | Head → Stem | stem on either side of the head |
//! | `Beam-Stem` | Beam → Stem | stem under/over a beam portion |

use serde::{Deserialize, Serialize};
use crate::connection::{AxisWeights, ClosenessCurve, ConnectionSpec};
use crate::model::{Fraction, ShapeFamily};
use crate::{Error, Result};

// ============================================================================
// Support types
// ============================================================================

/// How gaps are measured between the two footprints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Layout {
    /// Source sits to the left of target, vertically centered on it.
    SourceLeftOfTarget,
    /// Target (a stem) runs along the left or right side of source (a head).
    StemBesideHead,
    /// Target (a stem) meets source (a beam). A stem within `end_margin` of
    /// a beam end attaches to that end, otherwise to the center portion.
    StemOnBeam { end_margin: Fraction },
}

/// A supporting relation type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SupportType {
    pub name: String,
    pub source: ShapeFamily,
    pub target: ShapeFamily,
    pub layout: Layout,
    pub connection: ConnectionSpec,
}

impl SupportType {
    pub fn matches(&self, source: ShapeFamily, target: ShapeFamily) -> bool {
        self.source == source && self.target == target
    }
}

// ============================================================================
// Exclusion rules
// ============================================================================

/// Two candidates of these families overlapping by at least `min_overlap`
/// (intersection over the smaller area) exclude each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExclusionRule {
    pub name: String,
    pub first: ShapeFamily,
    pub second: ShapeFamily,
    pub min_overlap: f64,
}

impl ExclusionRule {
    /// Pair match in either orientation.
    pub fn matches(&self, a: ShapeFamily, b: ShapeFamily) -> bool {
        (self.first == a && self.second == b) || (self.first == b && self.second == a)
    }
}

// ============================================================================
// Catalog
// ============================================================================

/// Immutable table of relation types, built once at startup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationCatalog {
    #[serde(default)]
    pub supports: Vec<SupportType>,
    #[serde(default)]
    pub exclusions: Vec<ExclusionRule>,
}

impl Default for RelationCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl RelationCatalog {
    /// Empty catalog, for callers assembling their own types.
    pub fn empty() -> Self {
        Self { supports: Vec::new(), exclusions: Vec::new() }
    }

    /// The standard relation types.
    pub fn builtin() -> Self {
        Self {
            supports: vec![accid_note(), head_stem(), beam_stem()],
            exclusions: vec![
                overlap_rule("Head-Head", ShapeFamily::Head, ShapeFamily::Head, 0.5),
                overlap_rule("Accid-Accid", ShapeFamily::Accidental, ShapeFamily::Accidental, 0.5),
                overlap_rule("Head-Accid", ShapeFamily::Head, ShapeFamily::Accidental, 0.3),
            ],
        }
    }

    pub fn with_support(mut self, support: SupportType) -> Self {
        self.supports.push(support);
        self
    }

    pub fn with_exclusion(mut self, rule: ExclusionRule) -> Self {
        self.exclusions.push(rule);
        self
    }

    pub fn lookup(&self, name: &str) -> Option<&SupportType> {
        self.supports.iter().find(|s| s.name == name)
    }

    pub fn validate(&self) -> Result<()> {
        let mut seen = hashbrown::HashSet::new();
        for support in &self.supports {
            if !seen.insert(support.name.as_str()) {
                return Err(Error::Config(format!("duplicate relation type '{}'", support.name)));
            }
            support.connection.validate(&support.name)?;
            if let Layout::StemOnBeam { end_margin } = support.layout {
                if !end_margin.0.is_finite() || end_margin.0 < 0.0 {
                    return Err(Error::Config(format!(
                        "{}: end_margin must be non-negative, got {}",
                        support.name, end_margin.0
                    )));
                }
            }
        }
        for rule in &self.exclusions {
            if !(rule.min_overlap > 0.0 && rule.min_overlap <= 1.0) {
                return Err(Error::Config(format!(
                    "{}: min_overlap must lie in (0, 1], got {}",
                    rule.name, rule.min_overlap
                )));
            }
        }
        Ok(())
    }
}

// ============================================================================
// Built-in types
// ============================================================================

/// An accidental alters the note; the note confirms nothing about the
/// accidental, so no support flows to the target.
fn accid_note() -> SupportType {
    SupportType {
        name: "Accid-Note".into(),
        source: ShapeFamily::Accidental,
        target: ShapeFamily::Head,
        layout: Layout::SourceLeftOfTarget,
        connection: ConnectionSpec {
            x_in_gap_max: Fraction(0.2),
            x_out_gap_max: Fraction(2.0),
            y_gap_max: Fraction(0.4),
            in_weights: AxisWeights::new(1.0, 4.0),
            out_weights: AxisWeights::new(1.0, 4.0),
            source_coeff: 1.0,
            target_coeff: 0.0,
            curve: ClosenessCurve::Linear,
        },
    }
}

fn head_stem() -> SupportType {
    SupportType {
        name: "Head-Stem".into(),
        source: ShapeFamily::Head,
        target: ShapeFamily::Stem,
        layout: Layout::StemBesideHead,
        connection: ConnectionSpec {
            x_in_gap_max: Fraction(0.25),
            x_out_gap_max: Fraction(0.3),
            y_gap_max: Fraction(0.8),
            in_weights: AxisWeights::new(2.0, 1.0),
            out_weights: AxisWeights::new(4.0, 1.0),
            source_coeff: 1.0,
            target_coeff: 1.0,
            curve: ClosenessCurve::Linear,
        },
    }
}

fn beam_stem() -> SupportType {
    SupportType {
        name: "Beam-Stem".into(),
        source: ShapeFamily::Beam,
        target: ShapeFamily::Stem,
        layout: Layout::StemOnBeam { end_margin: Fraction(0.5) },
        connection: ConnectionSpec {
            x_in_gap_max: Fraction(1.0),
            x_out_gap_max: Fraction(0.3),
            y_gap_max: Fraction(0.6),
            in_weights: AxisWeights::new(1.0, 2.0),
            out_weights: AxisWeights::new(4.0, 2.0),
            source_coeff: 1.0,
            target_coeff: 1.0,
            curve: ClosenessCurve::Linear,
        },
    }
}

fn overlap_rule(name: &str, first: ShapeFamily, second: ShapeFamily, min_overlap: f64) -> ExclusionRule {
    ExclusionRule { name: name.into(), first, second, min_overlap }
}
