//! Inter: one candidate interpretation of a detected shape.

use std::sync::atomic::{AtomicU64, Ordering};
use serde::{Deserialize, Serialize};
use super::Footprint;
use crate::{Error, Result};

static NEXT_UID: AtomicU64 = AtomicU64::new(1);

/// Stable handle of an Inter inside one `Sig`, assigned in creation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct InterId(pub u32);

impl std::fmt::Display for InterId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Process-unique identity of an `Inter` value. Clones share it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InterUid(pub u64);

/// Shape family, used by the catalog to pair Inters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ShapeFamily {
    Head,
    Accidental,
    Beam,
    Stem,
    Flag,
    Other,
}

/// Symbol kind assigned to a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    NoteheadBlack,
    NoteheadVoid,
    WholeNote,
    Sharp,
    Flat,
    Natural,
    DoubleSharp,
    DoubleFlat,
    Beam,
    BeamHook,
    Stem,
    FlagUp,
    FlagDown,
    Dot,
}

impl Shape {
    pub fn family(self) -> ShapeFamily {
        match self {
            Shape::NoteheadBlack | Shape::NoteheadVoid | Shape::WholeNote => ShapeFamily::Head,
            Shape::Sharp
            | Shape::Flat
            | Shape::Natural
            | Shape::DoubleSharp
            | Shape::DoubleFlat => ShapeFamily::Accidental,
            Shape::Beam | Shape::BeamHook => ShapeFamily::Beam,
            Shape::Stem => ShapeFamily::Stem,
            Shape::FlagUp | Shape::FlagDown => ShapeFamily::Flag,
            Shape::Dot => ShapeFamily::Other,
        }
    }

    /// Secondary key when two conflicting Inters have the same grade.
    /// Higher survives.
    pub fn priority(self) -> u8 {
        match self.family() {
            ShapeFamily::Head => 50,
            ShapeFamily::Beam => 40,
            ShapeFamily::Stem => 30,
            ShapeFamily::Accidental => 20,
            ShapeFamily::Flag => 10,
            ShapeFamily::Other => 0,
        }
    }
}

/// A candidate interpretation node.
///
/// Not deserializable: uids are issued only by `Inter::new`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Inter {
    uid: InterUid,
    pub shape: Shape,
    pub footprint: Footprint,
    intrinsic_grade: f64,
    contextual_grade: Option<f64>,
}

impl Inter {
    /// Create a candidate. The grade must lie in [0, 1] and the footprint
    /// must not have a negative size.
    pub fn new(shape: Shape, footprint: Footprint, intrinsic_grade: f64) -> Result<Self> {
        if !footprint.is_well_formed() {
            return Err(Error::InvalidGeometry(format!(
                "footprint of {shape:?} has negative size {}x{}",
                footprint.width, footprint.height
            )));
        }
        if !(0.0..=1.0).contains(&intrinsic_grade) {
            return Err(Error::InvalidGeometry(format!(
                "intrinsic grade {intrinsic_grade} of {shape:?} is outside [0, 1]"
            )));
        }
        Ok(Self {
            uid: InterUid(NEXT_UID.fetch_add(1, Ordering::Relaxed)),
            shape,
            footprint,
            intrinsic_grade,
            contextual_grade: None,
        })
    }

    pub fn uid(&self) -> InterUid { self.uid }

    pub fn family(&self) -> ShapeFamily { self.shape.family() }

    pub fn intrinsic_grade(&self) -> f64 { self.intrinsic_grade }

    /// Last value computed by the resolver, if any.
    pub fn contextual_grade(&self) -> Option<f64> { self.contextual_grade }

    /// Best known grade: contextual once resolved, intrinsic before.
    pub fn grade(&self) -> f64 {
        self.contextual_grade.unwrap_or(self.intrinsic_grade)
    }

    pub(crate) fn set_contextual_grade(&mut self, grade: f64) {
        self.contextual_grade = Some(grade);
    }
}
