//! # Interpretation Model
//!
//! Plain data shared by the graph, the builders and the resolver:
//! Inters, Relations, footprints and the reference unit.
//!
//! Design rule: no graph state here. Grades are stored on Inters but
//! computed only by the resolver.

pub mod geometry;
pub mod inter;
pub mod relation;

pub use geometry::{Footprint, Fraction, Scale};
pub use inter::{Inter, InterId, InterUid, Shape, ShapeFamily};
pub use relation::{
    BeamPortion, Exclusion, ExclusionCause, RelFilter, RelId, Relation, RelationKind, Support,
};
