//! # Relation Builders
//!
//! Two phases, matching the graph's single-writer rule:
//!
//! 1. `collect()` reads a `&Sig`, measures every pair of live Inters the
//!    catalog cares about and returns candidate relations. With the
//!    `parallel` feature each support type is scanned on its own rayon task.
//! 2. `apply()` inserts the candidates into a `&mut Sig`, one at a time.
//!
//! A pair with malformed geometry is logged and skipped; it never stops the
//! scan.

use hashbrown::HashSet;
#[cfg(feature = "parallel")]
use rayon::prelude::*;
use tracing::{debug, warn};

use crate::catalog::{ExclusionRule, Layout, RelationCatalog, SupportType};
use crate::connection::{Gaps, HorizontalGap};
use crate::model::*;
use crate::sig::Sig;
use crate::{Error, Result};

/// A relation proposed by a builder, not yet in the graph.
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub source: InterId,
    pub target: InterId,
    pub kind: RelationKind,
}

/// Scans a graph against a catalog at a given scale.
#[derive(Debug, Clone, Copy)]
pub struct RelationScan<'a> {
    catalog: &'a RelationCatalog,
    scale: &'a Scale,
}

impl<'a> RelationScan<'a> {
    pub fn new(catalog: &'a RelationCatalog, scale: &'a Scale) -> Self {
        Self { catalog, scale }
    }

    // ========================================================================
    // Single pair
    // ========================================================================

    /// Evaluate one ordered pair against one support type.
    ///
    /// `Ok(None)` when families don't match or a gap exceeds its maximum.
    pub fn evaluate(
        &self,
        support: &SupportType,
        (source_id, source): (InterId, &Inter),
        (target_id, target): (InterId, &Inter),
    ) -> Result<Option<Candidate>> {
        if source_id == target_id || !support.matches(source.family(), target.family()) {
            return Ok(None);
        }

        let (gaps, portion) = self.measure(support.layout, &source.footprint, &target.footprint);
        let Some(coeffs) = support.connection.evaluate(&gaps)? else {
            return Ok(None);
        };

        let mut payload = Support::new(support.name.clone(), coeffs.source, coeffs.target);
        payload.portion = portion;
        Ok(Some(Candidate {
            source: source_id,
            target: target_id,
            kind: RelationKind::Support(payload),
        }))
    }

    /// Gaps in interline fractions, plus the beam portion for beam layouts.
    pub fn measure(&self, layout: Layout, source: &Footprint, target: &Footprint) -> (Gaps, Option<BeamPortion>) {
        let s = self.scale;
        match layout {
            Layout::SourceLeftOfTarget => {
                let dx = (target.left() - source.right()) as f64;
                let dy = (source.center_y() - target.center_y()).abs();
                (Gaps::from_signed(s.to_fraction(dx), s.to_fraction(dy)), None)
            }
            Layout::StemBesideHead => {
                let (head, stem) = (source, target);
                let sx = stem.center_x();
                let (left, right) = (head.left() as f64, head.right() as f64);
                let side = if (sx - left).abs() <= (sx - right).abs() { left } else { right };
                let inside = sx > left && sx < right;
                let d = s.to_fraction((sx - side).abs());
                let horizontal = if inside { HorizontalGap::Inward(d) } else { HorizontalGap::Outward(d) };
                let dy = range_gap(head.center_y(), head.center_y(), stem.top() as f64, stem.bottom() as f64);
                (Gaps::new(horizontal, s.to_fraction(dy)), None)
            }
            Layout::StemOnBeam { end_margin } => {
                let (beam, stem) = (source, target);
                let sx = stem.center_x();
                let margin = s.to_pixels(end_margin);
                let (left, right) = (beam.left() as f64, beam.right() as f64);

                let (portion, dx) = if sx <= left + margin {
                    (BeamPortion::Left, sx - left)
                } else if sx >= right - margin {
                    (BeamPortion::Right, right - sx)
                } else {
                    (BeamPortion::Center, 0.0)
                };
                let horizontal = if dx >= 0.0 {
                    HorizontalGap::Inward(s.to_fraction(dx))
                } else {
                    HorizontalGap::Outward(s.to_fraction(-dx))
                };
                let dy = range_gap(
                    beam.top() as f64,
                    beam.bottom() as f64,
                    stem.top() as f64,
                    stem.bottom() as f64,
                );
                (Gaps::new(horizontal, s.to_fraction(dy)), Some(portion))
            }
        }
    }

    /// Exclusion verdict for an unordered pair.
    pub fn overlap(&self, rule: &ExclusionRule, a: &Inter, b: &Inter) -> bool {
        rule.matches(a.family(), b.family())
            && a.footprint.overlap_ratio(&b.footprint) >= rule.min_overlap
    }

    // ========================================================================
    // Whole graph
    // ========================================================================

    /// Propose every relation the catalog supports between live Inters.
    ///
    /// Order is deterministic: support types in catalog order (each by source
    /// then target id), then exclusions by pair.
    pub fn collect(&self, sig: &Sig) -> Vec<Candidate> {
        let inters: Vec<(InterId, &Inter)> = sig.inters().collect();

        #[cfg(feature = "parallel")]
        let per_type: Vec<Vec<Candidate>> = self
            .catalog
            .supports
            .par_iter()
            .map(|support| self.scan_support(support, &inters))
            .collect();
        #[cfg(not(feature = "parallel"))]
        let per_type: Vec<Vec<Candidate>> = self
            .catalog
            .supports
            .iter()
            .map(|support| self.scan_support(support, &inters))
            .collect();

        let mut candidates: Vec<Candidate> = per_type.into_iter().flatten().collect();
        let supports = candidates.len();
        candidates.extend(self.scan_exclusions(&inters));

        debug!(
            supports,
            exclusions = candidates.len() - supports,
            inters = inters.len(),
            "relation scan complete"
        );
        candidates
    }

    fn scan_support(&self, support: &SupportType, inters: &[(InterId, &Inter)]) -> Vec<Candidate> {
        let mut found = Vec::new();
        for &(sid, source) in inters.iter().filter(|(_, i)| i.family() == support.source) {
            for &(tid, target) in inters.iter().filter(|(_, i)| i.family() == support.target) {
                match self.evaluate(support, (sid, source), (tid, target)) {
                    Ok(Some(candidate)) => found.push(candidate),
                    Ok(None) => {}
                    Err(e) => warn!(relation = %support.name, source = %sid, target = %tid, "skipping pair: {e}"),
                }
            }
        }
        found
    }

    fn scan_exclusions(&self, inters: &[(InterId, &Inter)]) -> Vec<Candidate> {
        let mut found = Vec::new();
        let mut seen: HashSet<(InterId, InterId)> = HashSet::new();
        for rule in &self.catalog.exclusions {
            for (i, &(aid, a)) in inters.iter().enumerate() {
                for &(bid, b) in &inters[i + 1..] {
                    if self.overlap(rule, a, b) && seen.insert((aid, bid)) {
                        found.push(Candidate {
                            source: aid,
                            target: bid,
                            kind: RelationKind::Exclusion(Exclusion { cause: ExclusionCause::Overlap }),
                        });
                    }
                }
            }
        }
        found
    }
}

/// Distance between two closed ranges on one axis, 0 when they meet.
fn range_gap(a_min: f64, a_max: f64, b_min: f64, b_max: f64) -> f64 {
    if a_max < b_min {
        b_min - a_max
    } else if b_max < a_min {
        a_min - b_max
    } else {
        0.0
    }
}

// ============================================================================
// Apply
// ============================================================================

/// Insert candidates into the graph, in order.
///
/// Candidates whose endpoints have died since collection, that duplicate an
/// existing relation or that carry invalid coefficients are skipped. Other
/// errors abort and are returned.
pub fn apply(sig: &mut Sig, candidates: Vec<Candidate>) -> Result<Vec<RelId>> {
    let mut created = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        if already_linked(sig, &candidate) {
            continue;
        }
        let (source, target) = (candidate.source, candidate.target);
        match sig.add_relation(source, target, candidate.kind) {
            Ok(id) => created.push(id),
            Err(Error::DanglingEndpoint { from, to }) => {
                debug!(%from, %to, "candidate endpoint gone, skipped");
            }
            Err(Error::InvalidGeometry(reason)) => {
                warn!(%source, %target, "candidate skipped: {reason}");
            }
            Err(e) => return Err(e),
        }
    }
    Ok(created)
}

fn already_linked(sig: &Sig, candidate: &Candidate) -> bool {
    sig.neighbors(candidate.source, RelFilter::Any).any(|(rel, other)| {
        other == candidate.target
            && match (&rel.kind, &candidate.kind) {
                (RelationKind::Support(a), RelationKind::Support(b)) => {
                    a.name == b.name && rel.source == candidate.source
                }
                (RelationKind::Exclusion(_), RelationKind::Exclusion(_)) => true,
                _ => false,
            }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn scale() -> Scale {
        Scale::new(20.0).unwrap()
    }

    fn add(sig: &mut Sig, shape: Shape, fp: Footprint, grade: f64) -> InterId {
        sig.add_inter(Inter::new(shape, fp, grade).unwrap()).unwrap()
    }

    #[test]
    fn test_accid_note_measure() {
        let catalog = RelationCatalog::builtin();
        let scale = scale();
        let scan = RelationScan::new(&catalog, &scale);
        // accidental right edge at 100, head left at 110, same vertical center
        let accid = Footprint::new(90, 40, 10, 30);
        let head = Footprint::new(110, 50, 20, 10);
        let (gaps, portion) = scan.measure(Layout::SourceLeftOfTarget, &accid, &head);
        assert_eq!(gaps, Gaps::new(HorizontalGap::Outward(0.5), 0.0));
        assert_eq!(portion, None);
    }

    #[test]
    fn test_beam_portions() {
        let catalog = RelationCatalog::builtin();
        let scale = scale();
        let scan = RelationScan::new(&catalog, &scale);
        let layout = Layout::StemOnBeam { end_margin: Fraction(0.5) };
        let beam = Footprint::new(100, 100, 200, 10);

        let left = Footprint::new(101, 110, 2, 60);
        let center = Footprint::new(199, 110, 2, 60);
        let right = Footprint::new(297, 110, 2, 60);
        let outside = Footprint::new(95, 110, 2, 60);

        assert_eq!(scan.measure(layout, &beam, &left).1, Some(BeamPortion::Left));
        assert_eq!(scan.measure(layout, &beam, &center).1, Some(BeamPortion::Center));
        assert_eq!(scan.measure(layout, &beam, &right).1, Some(BeamPortion::Right));

        let (gaps, portion) = scan.measure(layout, &beam, &outside);
        assert_eq!(portion, Some(BeamPortion::Left));
        assert_eq!(gaps.horizontal, HorizontalGap::Outward(0.2));
        assert_eq!(gaps.vertical, 0.0);
    }

    #[test]
    fn test_collect_and_apply() {
        let catalog = RelationCatalog::builtin();
        let scale = scale();
        let mut sig = Sig::new();
        let accid = add(&mut sig, Shape::Sharp, Footprint::new(90, 40, 10, 30), 0.7);
        let head = add(&mut sig, Shape::NoteheadBlack, Footprint::new(110, 50, 20, 10), 0.5);
        // far away: no relation
        add(&mut sig, Shape::Flat, Footprint::new(500, 500, 10, 30), 0.6);

        let scan = RelationScan::new(&catalog, &scale);
        let candidates = scan.collect(&sig);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].source, accid);
        assert_eq!(candidates[0].target, head);

        let created = apply(&mut sig, candidates).unwrap();
        assert_eq!(created.len(), 1);
        let rel = sig.relation(created[0]).unwrap();
        let support = rel.support().unwrap();
        assert_eq!(support.name, "Accid-Note");
        assert_eq!(support.target_coeff, 0.0);
        assert!(support.source_coeff > 0.0);

        // Re-running the scan adds nothing
        let rescan = scan.collect(&sig);
        let again = apply(&mut sig, rescan).unwrap();
        assert!(again.is_empty());
        assert_eq!(sig.relation_count(), 1);
    }

    #[test]
    fn test_overlapping_heads_exclude() {
        let catalog = RelationCatalog::builtin();
        let scale = scale();
        let mut sig = Sig::new();
        let a = add(&mut sig, Shape::NoteheadBlack, Footprint::new(100, 100, 20, 16), 0.6);
        let b = add(&mut sig, Shape::NoteheadVoid, Footprint::new(102, 100, 20, 16), 0.5);

        let candidates = RelationScan::new(&catalog, &scale).collect(&sig);
        assert_eq!(
            candidates,
            vec![Candidate {
                source: a,
                target: b,
                kind: RelationKind::Exclusion(Exclusion { cause: ExclusionCause::Overlap }),
            }]
        );
    }

    #[test]
    fn test_apply_skips_dead_endpoints() {
        let mut sig = Sig::new();
        let a = add(&mut sig, Shape::Sharp, Footprint::new(0, 0, 10, 10), 0.5);
        let b = add(&mut sig, Shape::Natural, Footprint::new(0, 0, 10, 10), 0.5);
        let stale = Candidate {
            source: a,
            target: b,
            kind: RelationKind::Exclusion(Exclusion { cause: ExclusionCause::Overlap }),
        };
        sig.remove_inter(b);
        assert!(apply(&mut sig, vec![stale]).unwrap().is_empty());
    }

    #[test]
    fn test_range_gap() {
        assert_eq!(range_gap(0.0, 10.0, 12.0, 20.0), 2.0);
        assert_eq!(range_gap(12.0, 20.0, 0.0, 10.0), 2.0);
        assert_eq!(range_gap(0.0, 10.0, 5.0, 20.0), 0.0);
    }
}
