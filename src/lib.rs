//! # omr-sig: Symbol Interpretation Graph
//!
//! Turns a field of competing music-symbol candidates into one consistent,
//! conflict-free interpretation.
//!
//! ## Design Principles
//!
//! 1. **Arena-first**: the `Sig` owns every Inter and Relation; edges hold
//!    handles, and removing an Inter removes its edges in the same call
//! 2. **Relation types are data**: the `RelationCatalog` declares gap maxima
//!    and weights, one shared connection model consumes them
//! 3. **Mutation never scores**: only the `Resolver` writes contextual grades
//! 4. **Single writer**: builders may scan in parallel, the graph is mutated
//!    from one thread
//!
//! ## Quick Start
//!
//! ```rust
//! use omr_sig::{Footprint, PageGraph, Shape};
//!
//! # fn example() -> omr_sig::Result<()> {
//! let mut page = PageGraph::with_defaults(20.0)?;
//! let sharp = page.add_candidate(Shape::Sharp, Footprint::new(90, 40, 10, 30), 0.7)?;
//! let head = page.add_candidate(Shape::NoteheadBlack, Footprint::new(110, 50, 20, 10), 0.5)?;
//!
//! page.link()?;
//! let report = page.resolve().into_result()?;
//!
//! assert!(report.removed.is_empty());
//! assert!(page.sig().inter(sharp).unwrap().grade() > 0.7);
//! assert_eq!(page.sig().inter(head).unwrap().grade(), 0.5);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

use std::sync::Arc;

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod connection;
pub mod catalog;
pub mod sig;
pub mod builder;
pub mod resolver;
pub mod config;

// ============================================================================
// Re-exports: Model
// ============================================================================

pub use model::{
    BeamPortion, Exclusion, ExclusionCause, Footprint, Fraction, Inter, InterId, InterUid,
    RelFilter, RelId, Relation, RelationKind, Scale, Shape, ShapeFamily, Support,
};

// ============================================================================
// Re-exports: Graph, evidence, resolution
// ============================================================================

pub use sig::{EventLog, Neighbors, Sig, SigEvent, SigListener, SigSnapshot};
pub use connection::{AxisWeights, ClosenessCurve, ConnectionSpec, Gaps, HorizontalGap, SupportCoeffs};
pub use catalog::{ExclusionRule, Layout, RelationCatalog, SupportType};
pub use builder::{Candidate, RelationScan};
pub use resolver::{ResolutionReport, ResolutionStatus, Resolver, ResolverConfig};
pub use config::SigConfig;

// ============================================================================
// Top-level page handle
// ============================================================================

/// The primary entry point: one page's graph, its scale and the shared
/// configuration.
pub struct PageGraph {
    config: Arc<SigConfig>,
    scale: Scale,
    sig: Sig,
}

impl PageGraph {
    /// Fails with `Error::Config` if the configuration does not validate.
    pub fn new(config: Arc<SigConfig>, scale: Scale) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, scale, sig: Sig::new() })
    }

    /// Built-in catalog and resolver settings at the given interline.
    pub fn with_defaults(interline: f64) -> Result<Self> {
        Self::new(Arc::new(SigConfig::default()), Scale::new(interline)?)
    }

    /// Accept a detection into the graph.
    pub fn add_candidate(&mut self, shape: Shape, footprint: Footprint, grade: f64) -> Result<InterId> {
        self.sig.add_inter(Inter::new(shape, footprint, grade)?)
    }

    /// Run every builder in the catalog and insert what they find.
    pub fn link(&mut self) -> Result<Vec<RelId>> {
        let candidates = RelationScan::new(&self.config.catalog, &self.scale).collect(&self.sig);
        builder::apply(&mut self.sig, candidates)
    }

    /// Compute contextual grades and remove conflict losers.
    pub fn resolve(&mut self) -> ResolutionReport {
        Resolver::new(self.config.resolver.clone()).resolve(&mut self.sig)
    }

    pub fn sig(&self) -> &Sig {
        &self.sig
    }

    /// Direct access, for editors that add or delete Inters by hand.
    pub fn sig_mut(&mut self) -> &mut Sig {
        &mut self.sig
    }

    pub fn scale(&self) -> &Scale {
        &self.scale
    }

    pub fn config(&self) -> &SigConfig {
        &self.config
    }

    pub fn snapshot(&self) -> SigSnapshot {
        self.sig.snapshot()
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Duplicate node: this inter is already in the graph as {0}")]
    DuplicateNode(InterId),

    #[error("Dangling endpoint: relation {from} -> {to} names an inter not in the graph")]
    DanglingEndpoint { from: InterId, to: InterId },

    #[error("Self relation on {0}")]
    SelfRelation(InterId),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Resolution budget exceeded after {passes} passes, {remaining_conflicts} conflicts left")]
    ResolutionBudgetExceeded { passes: usize, remaining_conflicts: usize },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
