//! Relation (edge) between two Inters.

use serde::{Deserialize, Serialize};
use super::InterId;

/// Stable relation handle, assigned in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelId(pub u32);

impl std::fmt::Display for RelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Which portion of a beam a stem connects to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BeamPortion {
    Left,
    Center,
    Right,
}

/// Why two Inters cannot both be kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExclusionCause {
    /// Footprints share too many pixels.
    Overlap,
    /// Declared incompatible by a caller.
    Incompatible,
}

/// Positive evidence: each endpoint gains confidence from the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Support {
    /// Relation type name, e.g. `"Accid-Note"`.
    pub name: String,
    /// Support flowing to the source Inter.
    pub source_coeff: f64,
    /// Support flowing to the target Inter.
    pub target_coeff: f64,
    pub portion: Option<BeamPortion>,
}

impl Support {
    pub fn new(name: impl Into<String>, source_coeff: f64, target_coeff: f64) -> Self {
        Self { name: name.into(), source_coeff, target_coeff, portion: None }
    }

    pub fn with_portion(mut self, portion: BeamPortion) -> Self {
        self.portion = Some(portion);
        self
    }
}

/// Mutual incompatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Exclusion {
    pub cause: ExclusionCause,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RelationKind {
    Support(Support),
    Exclusion(Exclusion),
}

impl RelationKind {
    pub fn is_support(&self) -> bool {
        matches!(self, RelationKind::Support(_))
    }

    pub fn is_exclusion(&self) -> bool {
        matches!(self, RelationKind::Exclusion(_))
    }
}

/// Edge filter for neighbor queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelFilter {
    Any,
    Support,
    Exclusion,
}

impl RelFilter {
    pub fn accepts(self, kind: &RelationKind) -> bool {
        match self {
            RelFilter::Any => true,
            RelFilter::Support => kind.is_support(),
            RelFilter::Exclusion => kind.is_exclusion(),
        }
    }
}

/// A typed edge. Holds handles only; the `Sig` owns both endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relation {
    pub id: RelId,
    pub source: InterId,
    pub target: InterId,
    pub kind: RelationKind,
}

impl Relation {
    /// The "other" end of the relation from the given Inter.
    pub fn other(&self, from: InterId) -> Option<InterId> {
        if from == self.source { Some(self.target) }
        else if from == self.target { Some(self.source) }
        else { None }
    }

    pub fn involves(&self, inter: InterId) -> bool {
        self.source == inter || self.target == inter
    }

    pub fn support(&self) -> Option<&Support> {
        match &self.kind {
            RelationKind::Support(s) => Some(s),
            RelationKind::Exclusion(_) => None,
        }
    }

    /// Support coefficient received by `inter` through this relation.
    pub fn support_coeff_for(&self, inter: InterId) -> Option<f64> {
        let support = self.support()?;
        if inter == self.source {
            Some(support.source_coeff)
        } else if inter == self.target {
            Some(support.target_coeff)
        } else {
            None
        }
    }
}
