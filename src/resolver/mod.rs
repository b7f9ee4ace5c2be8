//! # Resolver
//!
//! Computes contextual grades and prunes the losing side of every exclusion.
//!
//! ## Grade propagation
//!
//! Each support contributes `coeff · partner.intrinsic_grade` to a support
//! ratio `r = 1 + gain · Σ contributions`. The contextual grade multiplies
//! the odds of the intrinsic grade `g` by `r`:
//!
//! ```text
//!   contextual = r·g / (1 + (r − 1)·g)
//! ```
//!
//! which stays in [0, 1], equals `g` when there is no support and never
//! decreases when a contribution grows. Partners contribute their intrinsic
//! grade, so one propagation is already a fixpoint.
//!
//! ## Conflict resolution
//!
//! A pass collects every exclusion with two live endpoints, orders them by
//! descending winner grade (relation id breaks ties) and removes each loser
//! whose opponent is still live. Passes repeat, re-propagating grades, until
//! no conflict remains or the pass budget runs out.

use std::cmp::Ordering;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::model::*;
use crate::sig::Sig;
use crate::{Error, Result};

// ============================================================================
// Configuration
// ============================================================================

fn default_max_passes() -> usize { 64 }
fn default_support_gain() -> f64 { 1.0 }

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Upper bound on removal passes.
    #[serde(default = "default_max_passes")]
    pub max_passes: usize,
    /// Scales every support contribution.
    #[serde(default = "default_support_gain")]
    pub support_gain: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            max_passes: default_max_passes(),
            support_gain: default_support_gain(),
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.support_gain.is_finite() || self.support_gain < 0.0 {
            return Err(Error::Config(format!(
                "support_gain must be a non-negative number, got {}",
                self.support_gain
            )));
        }
        Ok(())
    }
}

// ============================================================================
// Report
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResolutionStatus {
    /// No exclusion has two live endpoints.
    Converged,
    /// The pass budget ran out with conflicts left in the graph.
    BudgetExceeded { remaining_conflicts: usize },
}

/// Outcome of one `resolve()` run. The graph itself holds the result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolutionReport {
    /// Removal passes performed.
    pub passes: usize,
    /// Removed Inters, in removal order.
    pub removed: Vec<InterId>,
    pub status: ResolutionStatus,
}

impl ResolutionReport {
    pub fn is_converged(&self) -> bool {
        self.status == ResolutionStatus::Converged
    }

    /// Turn budget exhaustion into an error, for callers that won't accept a
    /// partial result. The graph keeps its best state either way.
    pub fn into_result(self) -> Result<Self> {
        match self.status {
            ResolutionStatus::Converged => Ok(self),
            ResolutionStatus::BudgetExceeded { remaining_conflicts } => {
                Err(Error::ResolutionBudgetExceeded { passes: self.passes, remaining_conflicts })
            }
        }
    }
}

// ============================================================================
// Resolver
// ============================================================================

/// Odds-boost of `intrinsic` by a support ratio `ratio ≥ 1`.
pub fn combine(intrinsic: f64, ratio: f64) -> f64 {
    let grade = ratio * intrinsic / (1.0 + (ratio - 1.0) * intrinsic);
    grade.clamp(0.0, 1.0)
}

struct Conflict {
    rel: RelId,
    winner: InterId,
    loser: InterId,
    winner_grade: f64,
}

#[derive(Debug, Clone, Default)]
pub struct Resolver {
    config: ResolverConfig,
}

impl Resolver {
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Contextual grade of a live Inter under the current graph, without
    /// storing it.
    pub fn contextual_grade(&self, sig: &Sig, id: InterId) -> Option<f64> {
        let inter = sig.inter(id)?;
        let contribution: f64 = sig
            .supports(id)
            .filter_map(|(rel, partner)| {
                let coeff = rel.support_coeff_for(id)?;
                let partner = sig.inter(partner)?;
                Some(coeff * partner.intrinsic_grade())
            })
            .sum();
        let ratio = 1.0 + self.config.support_gain * contribution;
        Some(combine(inter.intrinsic_grade(), ratio))
    }

    /// Recompute and store the contextual grade of every live Inter.
    pub fn propagate_grades(&self, sig: &mut Sig) {
        let view: &Sig = sig;
        let grades: Vec<(InterId, f64)> = view
            .inters()
            .filter_map(|(id, _)| self.contextual_grade(view, id).map(|g| (id, g)))
            .collect();
        for (id, grade) in grades {
            sig.set_contextual_grade(id, grade);
        }
    }

    /// Drive the graph to a conflict-free state.
    pub fn resolve(&self, sig: &mut Sig) -> ResolutionReport {
        let mut passes = 0;
        let mut removed = Vec::new();

        loop {
            self.propagate_grades(sig);
            let mut conflicts = self.conflicts(sig);

            if conflicts.is_empty() {
                debug!(passes, removed = removed.len(), "resolution converged");
                return ResolutionReport { passes, removed, status: ResolutionStatus::Converged };
            }
            if passes >= self.config.max_passes {
                warn!(
                    passes,
                    remaining = conflicts.len(),
                    "resolution budget exhausted with conflicts left"
                );
                return ResolutionReport {
                    passes,
                    removed,
                    status: ResolutionStatus::BudgetExceeded { remaining_conflicts: conflicts.len() },
                };
            }

            passes += 1;
            conflicts.sort_by(|a, b| {
                b.winner_grade.total_cmp(&a.winner_grade).then(a.rel.cmp(&b.rel))
            });

            for c in conflicts {
                if sig.contains(c.winner) && sig.contains(c.loser) {
                    trace!(rel = %c.rel, winner = %c.winner, loser = %c.loser, "exclusion resolved");
                    sig.remove_inter(c.loser);
                    removed.push(c.loser);
                }
            }
            debug!(pass = passes, removed = removed.len(), "resolution pass done");
        }
    }

    fn conflicts(&self, sig: &Sig) -> Vec<Conflict> {
        sig.conflicts()
            .filter_map(|rel| {
                let (winner, loser) = self.arbitrate(sig, rel.source, rel.target)?;
                Some(Conflict {
                    rel: rel.id,
                    winner,
                    loser,
                    winner_grade: sig.inter(winner)?.grade(),
                })
            })
            .collect()
    }

    /// `(winner, loser)` of an exclusion between two live Inters.
    ///
    /// Higher grade wins; then higher shape priority; then the older Inter.
    pub fn arbitrate(&self, sig: &Sig, a: InterId, b: InterId) -> Option<(InterId, InterId)> {
        let (ia, ib) = (sig.inter(a)?, sig.inter(b)?);
        let order = ia
            .grade()
            .total_cmp(&ib.grade())
            .then(ia.shape.priority().cmp(&ib.shape.priority()))
            .then(b.cmp(&a));
        match order {
            Ordering::Less => Some((b, a)),
            _ => Some((a, b)),
        }
    }
}
