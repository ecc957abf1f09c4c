//! Link mutation. Every public operation here leaves the link table
//! symmetric: if A[i] points at B[j], B[j] points back at A[i].

use std::collections::{BTreeSet, HashSet};

use glam::Vec3;
use smallvec::SmallVec;

use super::compat::Classification;
use super::connection::{AuxPart, SlotRef};
use super::events::ConnectivityEvent;
use super::query::{QueryFilter, SlotPair};
use crate::model::world::{BrickId, BrickWorld, FieldId};

fn sorted(fields: impl IntoIterator<Item = FieldId>) -> Vec<FieldId> {
    fields.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

impl BrickWorld {
    /// Seat `src` on `dst` and link them, plus every other link the same
    /// placement implies.
    ///
    /// The source brick is stripped of all its links and moved into its
    /// seated pose (rotating about `pivot`). Then the primary pair is
    /// committed and each field of the source brick is re-queried
    /// (restricted to `only_connect_to` if given) for secondary pairs.
    /// Returns every field whose links changed, empty if validation failed.
    pub fn connect(
        &mut self,
        src: SlotRef,
        dst: SlotRef,
        pivot: Vec3,
        only_connect_to: Option<&HashSet<BrickId>>,
        ignore_for_collision: Option<&HashSet<BrickId>>,
    ) -> HashSet<FieldId> {
        if !self.is_connection_valid(src, dst, pivot, ignore_for_collision) {
            return HashSet::new();
        }
        let (Some(src_brick), Some(pose)) = (self.brick_of_field(src.field), self.connection_pose(src, dst, pivot)) else {
            return HashSet::new();
        };
        let own_fields = self.brick_fields(src_brick);
        let former_partners: Vec<FieldId> = own_fields
            .iter()
            .filter_map(|&field| self.field(field))
            .flat_map(|f| f.links().map(|(_, partner)| partner.field).collect::<Vec<_>>())
            .collect();
        let announced = sorted(own_fields.iter().copied().chain(former_partners).chain([dst.field]));
        self.emit(ConnectivityEvent::WillMutate(&announced));

        let mut touched = HashSet::new();
        for &field in &own_fields {
            touched.extend(self.unlink_field(field));
        }
        self.set_brick_pose(src_brick, pose);
        touched.extend(self.commit_pairs(&[SlotPair { own: src, other: dst }]));

        let filter = QueryFilter {
            only_bricks: only_connect_to,
            both_kinds: false,
        };
        let mut secondary = Vec::new();
        for &field in &own_fields {
            let result = self.query_connections(field, &filter);
            if result.classification != Classification::Connect {
                continue;
            }
            secondary.extend(result.pairs);
        }
        touched.extend(self.commit_pairs(&secondary));

        log::debug!(
            "connected {src:?} -> {dst:?} ({} secondary pairs, {} fields touched)",
            secondary.len(),
            touched.len()
        );
        let touched_list = sorted(touched.iter().copied());
        self.emit(ConnectivityEvent::DidMutate(&touched_list));
        touched
    }

    /// `connect` with no restriction on secondary pairs.
    pub fn snap(
        &mut self,
        src: SlotRef,
        dst: SlotRef,
        pivot: Vec3,
        ignore_for_collision: Option<&HashSet<BrickId>>,
    ) -> HashSet<FieldId> {
        self.connect(src, dst, pivot, None, ignore_for_collision)
    }

    /// Break the link of one slot, on both sides. Unlinked or missing slots are a no-op.
    pub fn disconnect(&mut self, field: FieldId, index: usize) -> bool {
        let Some(partner) = self.partner(SlotRef::new(field, index)) else {
            return false;
        };
        let fields = sorted([field, partner.field]);
        self.emit(ConnectivityEvent::WillMutate(&fields));
        self.unlink_slot(SlotRef::new(field, index));
        self.emit(ConnectivityEvent::DidMutate(&fields));
        true
    }

    /// Break every link of a field. Returns how many links were broken.
    pub fn disconnect_all(&mut self, field: FieldId) -> usize {
        let slots: Vec<usize> = match self.field(field) {
            Some(f) => f.linked_slots().collect(),
            None => return 0,
        };
        self.disconnect_slots(field, &slots)
    }

    /// Re-validate every link of a field against the current scene and drop
    /// the ones that no longer hold.
    pub fn disconnect_all_invalid(&mut self, field: FieldId) -> usize {
        let links: Vec<(usize, SlotRef)> = match self.field(field) {
            Some(f) => f.links().collect(),
            None => return 0,
        };
        let mut invalid = Vec::new();
        for (index, partner) in links {
            let own = SlotRef::new(field, index);
            let Some(pivot) = self.slot_position(own) else {
                invalid.push(index);
                continue;
            };
            if !self.is_connection_valid(own, partner, pivot, None) {
                invalid.push(index);
            }
        }
        self.disconnect_slots(field, &invalid)
    }

    /// Drop every link of a field whose partner brick is not in `keep`.
    pub fn disconnect_inverse(&mut self, field: FieldId, keep: &HashSet<BrickId>) -> usize {
        let links: Vec<(usize, SlotRef)> = match self.field(field) {
            Some(f) => f.links().collect(),
            None => return 0,
        };
        let drop: Vec<usize> = links
            .into_iter()
            .filter(|(_, partner)| {
                self.brick_of_field(partner.field)
                    .is_none_or(|b| !keep.contains(&b))
            })
            .map(|(index, _)| index)
            .collect();
        self.disconnect_slots(field, &drop)
    }

    /// Break every link on every field of a brick.
    pub fn disconnect_brick(&mut self, brick: BrickId) -> HashSet<FieldId> {
        let fields = self.brick_fields(brick);
        let announced = sorted(fields.iter().copied());
        self.emit(ConnectivityEvent::WillMutate(&announced));
        let mut touched = HashSet::new();
        for field in fields {
            touched.extend(self.unlink_field(field));
        }
        let touched_list = sorted(touched.iter().copied());
        self.emit(ConnectivityEvent::DidMutate(&touched_list));
        touched
    }

    fn disconnect_slots(&mut self, field: FieldId, slots: &[usize]) -> usize {
        if slots.is_empty() {
            return 0;
        }
        let partners: Vec<FieldId> = slots
            .iter()
            .filter_map(|&i| self.partner(SlotRef::new(field, i)).map(|p| p.field))
            .collect();
        let fields = sorted(partners.into_iter().chain([field]));
        self.emit(ConnectivityEvent::WillMutate(&fields));
        let count = slots
            .iter()
            .filter(|&&i| self.unlink_slot(SlotRef::new(field, i)).is_some())
            .count();
        self.emit(ConnectivityEvent::DidMutate(&fields));
        log::debug!("disconnected {count} slots of {field:?}");
        count
    }

    /// Unlink every slot of a field without raising will/did events.
    pub(crate) fn unlink_field(&mut self, field: FieldId) -> HashSet<FieldId> {
        let slots: Vec<usize> = match self.field(field) {
            Some(f) => f.linked_slots().collect(),
            None => return HashSet::new(),
        };
        let mut touched = HashSet::new();
        for index in slots {
            if let Some(partner) = self.unlink_slot(SlotRef::new(field, index)) {
                touched.insert(field);
                touched.insert(partner.field);
            }
        }
        touched
    }

    /// Clear both sides of a link and refresh both slots' aux visibility.
    /// Returns the former partner.
    fn unlink_slot(&mut self, slot: SlotRef) -> Option<SlotRef> {
        let partner = self.partner(slot)?;
        if let Some(f) = self.field_mut(slot.field) {
            f.set_link(slot.index, None);
        }
        // A partner that already forgot us (or is gone) is fine.
        if self.partner(partner) == Some(slot) {
            if let Some(f) = self.field_mut(partner.field) {
                f.set_link(partner.index, None);
            }
        }
        self.refresh_slot(slot);
        self.refresh_slot(partner);
        Some(partner)
    }

    /// Write a batch of links. Pairs whose slots are missing or already
    /// taken (including by an earlier pair of the same batch) are skipped.
    /// Each linked slot gets exactly one visibility refresh, after all writes.
    pub(crate) fn commit_pairs(&mut self, pairs: &[SlotPair]) -> HashSet<FieldId> {
        let mut touched = HashSet::new();
        let mut refresh = Vec::new();
        for pair in pairs {
            if !self.slot_is_free(pair.own) || !self.slot_is_free(pair.other) || pair.own == pair.other {
                log::trace!("skipping {pair:?}: slot unavailable");
                continue;
            }
            if let Some(f) = self.field_mut(pair.own.field) {
                f.set_link(pair.own.index, Some(pair.other));
            }
            if let Some(f) = self.field_mut(pair.other.field) {
                f.set_link(pair.other.index, Some(pair.own));
            }
            touched.insert(pair.own.field);
            touched.insert(pair.other.field);
            refresh.push(pair.own);
            refresh.push(pair.other);
        }
        for slot in refresh {
            self.refresh_slot(slot);
        }
        touched
    }

    fn slot_is_free(&self, slot: SlotRef) -> bool {
        self.connection(slot).is_some_and(|c| c.is_connectable()) && !self.is_linked(slot)
    }

    /// Recompute one slot's coverage from its current partner.
    fn refresh_slot(&mut self, slot: SlotRef) {
        let partner_aux: SmallVec<[AuxPart; 2]> = self
            .partner(slot)
            .and_then(|p| self.connection(p))
            .map(|c| c.aux.clone())
            .unwrap_or_default();
        let connected = self.is_linked(slot);
        let aux = match self.field_mut(slot.field).and_then(|f| f.connection_mut(slot.index)) {
            Some(conn) => {
                conn.refresh_visibility(connected, &partner_aux);
                conn.aux.clone()
            }
            None => return,
        };
        self.emit(ConnectivityEvent::AuxVisibility { slot, aux: &aux });
    }
}
