//! # Symbol Interpretation Graph
//!
//! The container that owns every Inter and Relation of one page.
//!
//! Inters live in an arena addressed by `InterId`; relations live in a second
//! arena addressed by `RelId`. Each Inter slot keeps the ids of its incident
//! relations in insertion order, which is the order `neighbors()` yields.
//!
//! ## Invariants
//!
//! - A stored relation always has two distinct, live endpoints. Removing an
//!   Inter removes every incident relation in the same call.
//! - Handles are never reused, so a stale `InterId` can only miss, never alias.
//! - Mutation never touches contextual grades. Only the resolver writes them.

pub mod events;
pub mod snapshot;

use std::sync::Arc;
use hashbrown::HashMap;
use smallvec::SmallVec;

use crate::model::*;
use crate::{Error, Result};

pub use events::{EventLog, SigEvent, SigListener};
pub use snapshot::{InterView, SigSnapshot};

// ============================================================================
// Sig
// ============================================================================

struct InterSlot {
    inter: Inter,
    /// Incident relations, in insertion order.
    adjacency: SmallVec<[RelId; 4]>,
}

/// The graph of interpretation candidates for one page or region.
#[derive(Default)]
pub struct Sig {
    inters: Vec<Option<InterSlot>>,
    relations: Vec<Option<Relation>>,
    /// uid → handle of every live Inter
    by_uid: HashMap<InterUid, InterId>,
    listeners: Vec<Arc<dyn SigListener>>,
    live_inters: usize,
    live_relations: usize,
}

impl Sig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener for graph-changed events.
    pub fn subscribe(&mut self, listener: Arc<dyn SigListener>) {
        self.listeners.push(listener);
    }

    fn publish(&self, event: SigEvent) {
        for listener in &self.listeners {
            listener.on_event(&event);
        }
    }

    // ========================================================================
    // Inter CRUD
    // ========================================================================

    /// Insert a new Inter. Fails if this very Inter (same uid) is already live.
    pub fn add_inter(&mut self, inter: Inter) -> Result<InterId> {
        if let Some(&existing) = self.by_uid.get(&inter.uid()) {
            return Err(Error::DuplicateNode(existing));
        }

        let id = InterId(self.inters.len() as u32);
        self.by_uid.insert(inter.uid(), id);
        self.inters.push(Some(InterSlot { inter, adjacency: SmallVec::new() }));
        self.live_inters += 1;

        self.publish(SigEvent::InterAdded(id));
        Ok(id)
    }

    /// Remove an Inter and every relation touching it.
    /// Returns false if it was not live; that is not an error.
    pub fn remove_inter(&mut self, id: InterId) -> bool {
        let Some(slot) = self.inters.get_mut(id.0 as usize).and_then(Option::take) else {
            return false;
        };
        self.by_uid.remove(&slot.inter.uid());
        self.live_inters -= 1;

        for rel_id in slot.adjacency {
            let Some(rel) = self.relations[rel_id.0 as usize].take() else {
                continue;
            };
            self.live_relations -= 1;
            if let Some(other) = rel.other(id) {
                if let Some(other_slot) = self.slot_mut(other) {
                    other_slot.adjacency.retain(|r| *r != rel_id);
                }
            }
            self.publish(SigEvent::RelationRemoved(rel_id));
        }

        self.publish(SigEvent::InterRemoved(id));
        true
    }

    pub fn inter(&self, id: InterId) -> Option<&Inter> {
        self.slot(id).map(|s| &s.inter)
    }

    pub fn contains(&self, id: InterId) -> bool {
        self.slot(id).is_some()
    }

    /// Handle of the live Inter with this identity, if any.
    pub fn find(&self, uid: InterUid) -> Option<InterId> {
        self.by_uid.get(&uid).copied()
    }

    /// Live Inters in creation order.
    pub fn inters(&self) -> impl Iterator<Item = (InterId, &Inter)> + '_ {
        self.inters
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|s| (InterId(i as u32), &s.inter)))
    }

    pub fn inter_count(&self) -> usize {
        self.live_inters
    }

    pub(crate) fn set_contextual_grade(&mut self, id: InterId, grade: f64) {
        if let Some(slot) = self.slot_mut(id) {
            slot.inter.set_contextual_grade(grade);
        }
    }

    // ========================================================================
    // Relation CRUD
    // ========================================================================

    /// Link two live Inters. Nothing is modified if validation fails.
    pub fn add_relation(
        &mut self,
        source: InterId,
        target: InterId,
        kind: RelationKind,
    ) -> Result<RelId> {
        if !self.contains(source) || !self.contains(target) {
            return Err(Error::DanglingEndpoint { from: source, to: target });
        }
        if source == target {
            return Err(Error::SelfRelation(source));
        }
        if let RelationKind::Support(support) = &kind {
            for coeff in [support.source_coeff, support.target_coeff] {
                if !(0.0..=1.0).contains(&coeff) {
                    return Err(Error::InvalidGeometry(format!(
                        "{} support coefficient {coeff} is outside [0, 1]",
                        support.name
                    )));
                }
            }
        }

        let id = RelId(self.relations.len() as u32);
        self.relations.push(Some(Relation { id, source, target, kind }));
        self.live_relations += 1;

        // Both endpoints were checked live above
        if let Some(slot) = self.slot_mut(source) {
            slot.adjacency.push(id);
        }
        if let Some(slot) = self.slot_mut(target) {
            slot.adjacency.push(id);
        }

        self.publish(SigEvent::RelationAdded(id));
        Ok(id)
    }

    pub fn add_support(&mut self, source: InterId, target: InterId, support: Support) -> Result<RelId> {
        self.add_relation(source, target, RelationKind::Support(support))
    }

    pub fn add_exclusion(
        &mut self,
        source: InterId,
        target: InterId,
        cause: ExclusionCause,
    ) -> Result<RelId> {
        self.add_relation(source, target, RelationKind::Exclusion(Exclusion { cause }))
    }

    /// Remove a single relation. Returns false if it was not present.
    pub fn remove_relation(&mut self, id: RelId) -> bool {
        let Some(rel) = self.relations.get_mut(id.0 as usize).and_then(Option::take) else {
            return false;
        };
        self.live_relations -= 1;
        for end in [rel.source, rel.target] {
            if let Some(slot) = self.slot_mut(end) {
                slot.adjacency.retain(|r| *r != id);
            }
        }
        self.publish(SigEvent::RelationRemoved(id));
        true
    }

    pub fn relation(&self, id: RelId) -> Option<&Relation> {
        self.relations.get(id.0 as usize).and_then(Option::as_ref)
    }

    /// Live relations in insertion order.
    pub fn relations(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.relations.iter().flatten()
    }

    pub fn relation_count(&self) -> usize {
        self.live_relations
    }

    // ========================================================================
    // Traversal
    // ========================================================================

    /// Relations incident to `inter`, paired with the opposite endpoint.
    ///
    /// The iterator is lazy and `Clone`: a clone resumes from the same
    /// position, a fresh call starts over from the first relation.
    pub fn neighbors(&self, inter: InterId, filter: RelFilter) -> Neighbors<'_> {
        let rels = self.slot(inter).map(|s| s.adjacency.as_slice()).unwrap_or(&[]);
        Neighbors { sig: self, inter, rels, pos: 0, filter }
    }

    pub fn supports(&self, inter: InterId) -> Neighbors<'_> {
        self.neighbors(inter, RelFilter::Support)
    }

    pub fn exclusions(&self, inter: InterId) -> Neighbors<'_> {
        self.neighbors(inter, RelFilter::Exclusion)
    }

    /// Exclusions whose two endpoints are both still live.
    pub fn conflicts(&self) -> impl Iterator<Item = &Relation> + '_ {
        self.relations()
            .filter(|r| r.kind.is_exclusion())
            .filter(|r| self.contains(r.source) && self.contains(r.target))
    }

    pub fn is_conflict_free(&self) -> bool {
        self.conflicts().next().is_none()
    }

    /// Point-in-time copy for viewers and exporters.
    pub fn snapshot(&self) -> SigSnapshot {
        SigSnapshot::capture(self)
    }

    // ========================================================================
    // Slots
    // ========================================================================

    fn slot(&self, id: InterId) -> Option<&InterSlot> {
        self.inters.get(id.0 as usize).and_then(Option::as_ref)
    }

    fn slot_mut(&mut self, id: InterId) -> Option<&mut InterSlot> {
        self.inters.get_mut(id.0 as usize).and_then(Option::as_mut)
    }
}

impl std::fmt::Debug for Sig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Sig")
            .field("inters", &self.live_inters)
            .field("relations", &self.live_relations)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

// ============================================================================
// Neighbors
// ============================================================================

/// Lazy iterator over `(relation, other endpoint)` pairs.
#[derive(Clone)]
pub struct Neighbors<'a> {
    sig: &'a Sig,
    inter: InterId,
    rels: &'a [RelId],
    pos: usize,
    filter: RelFilter,
}

impl<'a> Iterator for Neighbors<'a> {
    type Item = (&'a Relation, InterId);

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(&rel_id) = self.rels.get(self.pos) {
            self.pos += 1;
            let Some(rel) = self.sig.relation(rel_id) else {
                continue;
            };
            if !self.filter.accepts(&rel.kind) {
                continue;
            }
            if let Some(other) = rel.other(self.inter) {
                return Some((rel, other));
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.rels.len() - self.pos))
    }
}

// ============================================================================
// Tests
// ============================================================================
