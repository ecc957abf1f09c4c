//! Batch connectivity detection, run after many bricks are placed at once.

use std::collections::{BTreeSet, HashSet};

use super::events::ConnectivityEvent;
use super::query::{QueryFilter, SlotPair};
use crate::model::world::{BrickId, BrickWorld, FieldId};

impl BrickWorld {
    /// Query, validate and link every field of every brick in `bricks`.
    ///
    /// Bricks in `ignore` don't count as obstacles during validation. Fields
    /// whose query is rejected are left alone. Slots that are already linked
    /// are never offered again, so a second pass over an unchanged scene
    /// touches nothing.
    pub fn detect_connectivity(&mut self, bricks: &HashSet<BrickId>, ignore: &HashSet<BrickId>) -> HashSet<FieldId> {
        let order: Vec<BrickId> = self.brick_ids().filter(|b| bricks.contains(b)).collect();
        let fields: Vec<FieldId> = order.iter().flat_map(|&b| self.brick_fields(b)).collect();
        let announced: Vec<FieldId> = fields.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        self.emit(ConnectivityEvent::WillMutate(&announced));

        let mut touched = HashSet::new();
        let mut rejected = 0;
        for field in fields {
            let result = self.query_connections(field, &QueryFilter::default());
            if result.is_reject() {
                rejected += 1;
                continue;
            }
            let valid: Vec<SlotPair> = result
                .pairs
                .into_iter()
                .filter(|pair| match self.slot_position(pair.own) {
                    Some(pivot) => self.is_connection_valid(pair.own, pair.other, pivot, Some(ignore)),
                    None => false,
                })
                .collect();
            touched.extend(self.commit_pairs(&valid));
        }

        log::debug!(
            "detected connectivity over {} bricks: {} fields touched, {rejected} rejected",
            order.len(),
            touched.len()
        );
        let touched_list: Vec<FieldId> = touched.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        self.emit(ConnectivityEvent::DidMutate(&touched_list));
        touched
    }

    /// `detect_connectivity` over every brick in the world.
    pub fn detect_all(&mut self) -> HashSet<FieldId> {
        let all: HashSet<BrickId> = self.brick_ids().collect();
        self.detect_connectivity(&all, &HashSet::new())
    }
}
