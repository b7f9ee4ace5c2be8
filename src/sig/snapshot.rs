//! Read-only snapshot handed to viewers and exporters.

use serde::{Deserialize, Serialize};
use crate::model::*;
use super::Sig;

/// An Inter as seen from outside the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InterView {
    pub id: InterId,
    pub shape: Shape,
    pub footprint: Footprint,
    pub intrinsic_grade: f64,
    pub contextual_grade: Option<f64>,
}

/// Surviving Inters (creation order) and relations (insertion order).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SigSnapshot {
    pub inters: Vec<InterView>,
    pub relations: Vec<Relation>,
}

impl SigSnapshot {
    pub(crate) fn capture(sig: &Sig) -> Self {
        let inters = sig
            .inters()
            .map(|(id, inter)| InterView {
                id,
                shape: inter.shape,
                footprint: inter.footprint,
                intrinsic_grade: inter.intrinsic_grade(),
                contextual_grade: inter.contextual_grade(),
            })
            .collect();
        let relations = sig.relations().cloned().collect();
        Self { inters, relations }
    }

    pub fn inter(&self, id: InterId) -> Option<&InterView> {
        self.inters.iter().find(|v| v.id == id)
    }

    /// JSON rendering, mainly for debugging dumps.
    pub fn to_json(&self) -> crate::Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
