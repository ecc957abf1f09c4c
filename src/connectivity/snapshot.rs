//! Saved link state, for hosts that want undo.
//!
//! A snapshot only stores handles, so it can be restored into the world it
//! was captured from (or a world rebuilt with the same arena layout).

use std::collections::{BTreeSet, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::connection::SlotRef;
use super::events::ConnectivityEvent;
use super::query::SlotPair;
use crate::model::world::{BrickWorld, FieldId};

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding failed: {0}")]
    Encode(#[from] bincode::Error),
}

/// One side of a link: slot `index` of `field` points at `partner`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkRecord {
    pub field: FieldId,
    pub index: usize,
    pub partner: SlotRef,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct LinkSnapshot {
    pub fields: Vec<FieldId>,
    pub records: Vec<LinkRecord>,
}

impl LinkSnapshot {
    /// Links of the given fields. Fields that don't exist are skipped.
    pub fn capture(world: &BrickWorld, fields: impl IntoIterator<Item = FieldId>) -> Self {
        let fields: Vec<FieldId> = fields
            .into_iter()
            .filter(|&f| world.field(f).is_some())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        let records = fields
            .iter()
            .filter_map(|&id| world.field(id).map(|f| (id, f)))
            .flat_map(|(id, f)| {
                f.links()
                    .map(move |(index, partner)| LinkRecord { field: id, index, partner })
                    .collect::<Vec<_>>()
            })
            .collect();
        Self { fields, records }
    }

    pub fn capture_all(world: &BrickWorld) -> Self {
        Self::capture(world, world.field_ids().collect::<Vec<_>>())
    }

    pub fn save(&self, path: &Path) -> Result<(), SnapshotError> {
        let bytes = bincode::serialize(self)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, SnapshotError> {
        let bytes = std::fs::read(path)?;
        Ok(bincode::deserialize(&bytes)?)
    }

    /// Put the captured fields back the way they were.
    ///
    /// Every current link of a captured field is dropped first (partners
    /// included). Recorded links whose partner has since been removed, or
    /// whose partner slot is now taken by someone else, are not restored.
    pub fn restore(&self, world: &mut BrickWorld) -> HashSet<FieldId> {
        let fields: Vec<FieldId> = self.fields.iter().copied().filter(|&f| world.field(f).is_some()).collect();
        world.emit(ConnectivityEvent::WillMutate(&fields));

        let mut touched = HashSet::new();
        for &field in &fields {
            touched.extend(world.unlink_field(field));
        }
        let pairs: Vec<SlotPair> = self
            .records
            .iter()
            .filter(|r| world.field(r.field).is_some() && world.field(r.partner.field).is_some())
            .map(|r| SlotPair {
                own: SlotRef::new(r.field, r.index),
                other: r.partner,
            })
            .collect();
        touched.extend(world.commit_pairs(&pairs));

        log::debug!(
            "restored {} recorded links over {} fields",
            self.records.len(),
            fields.len()
        );
        let touched_list: Vec<FieldId> = touched.iter().copied().collect::<BTreeSet<_>>().into_iter().collect();
        world.emit(ConnectivityEvent::DidMutate(&touched_list));
        touched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec3;

    use crate::geometry::grid::GRID_UNIT;
    use crate::testutil::{assert_symmetric, bottom_field, plate, slot, top_field, PLATE_HEIGHT};

    fn stacked(world: &mut BrickWorld) -> (SlotRef, SlotRef) {
        let a = plate(world, 2, 2, Vec3::ZERO);
        let b = plate(world, 2, 2, Vec3::new(0.0, PLATE_HEIGHT, 0.0));
        let src = slot(bottom_field(world, b), 0);
        let dst = slot(top_field(world, a), 0);
        world.connect(src, dst, Vec3::ZERO, None, None);
        (src, dst)
    }

    #[test]
    fn capture_records_both_sides() {
        let mut world = BrickWorld::default();
        let (src, dst) = stacked(&mut world);
        let snapshot = LinkSnapshot::capture(&world, [src.field, dst.field]);
        assert_eq!(snapshot.fields.len(), 2);
        assert_eq!(snapshot.records.len(), 8);
        assert!(snapshot.records.contains(&LinkRecord {
            field: src.field,
            index: src.index,
            partner: dst,
        }));
    }

    #[test]
    fn restore_undoes_disconnect() {
        let mut world = BrickWorld::default();
        let (src, dst) = stacked(&mut world);
        let snapshot = LinkSnapshot::capture(&world, [src.field, dst.field]);
        let before: Vec<_> = world.links().collect();

        world.disconnect_all(src.field);
        assert_eq!(world.link_count(), 0);

        snapshot.restore(&mut world);
        assert_eq!(world.links().collect::<Vec<_>>(), before);
        assert!(!world.connection(dst).unwrap().aux[0].visible);
        assert_symmetric(&world);
    }

    #[test]
    fn restore_drops_links_made_since_capture() {
        let mut world = BrickWorld::default();
        let a = plate(&mut world, 1, 1, Vec3::ZERO);
        let b = plate(&mut world, 1, 1, Vec3::new(0.0, PLATE_HEIGHT, 0.0));
        let snapshot = LinkSnapshot::capture_all(&world);
        assert!(snapshot.records.is_empty());

        world.connect(slot(bottom_field(&world, b), 0), slot(top_field(&world, a), 0), Vec3::ZERO, None, None);
        assert_eq!(world.link_count(), 1);
        snapshot.restore(&mut world);
        assert_eq!(world.link_count(), 0);
        assert_symmetric(&world);
    }

    #[test]
    fn restore_skips_removed_partners() {
        let mut world = BrickWorld::default();
        let a = plate(&mut world, 1, 1, Vec3::ZERO);
        let c = plate(&mut world, 1, 1, Vec3::new(GRID_UNIT, 0.0, 0.0));
        let b = plate(&mut world, 2, 1, Vec3::new(GRID_UNIT * 0.5, PLATE_HEIGHT, 0.0));
        let a_top = slot(top_field(&world, a), 0);
        let src = world.world_to_slot(bottom_field(&world, b), world.slot_position(a_top).unwrap()).unwrap();
        world.connect(src, a_top, Vec3::ZERO, None, None);
        assert_eq!(world.link_count(), 2);

        let snapshot = LinkSnapshot::capture(&world, [bottom_field(&world, b)]);
        world.remove_brick(c);
        world.disconnect_all(src.field);
        snapshot.restore(&mut world);
        assert_eq!(world.link_count(), 1);
        assert_eq!(world.partner(src), Some(a_top));
        assert_symmetric(&world);
    }

    #[test]
    fn save_and_load_roundtrip() {
        let mut world = BrickWorld::default();
        stacked(&mut world);
        let snapshot = LinkSnapshot::capture_all(&world);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("links.bin");
        snapshot.save(&path).unwrap();
        assert_eq!(LinkSnapshot::load(&path).unwrap(), snapshot);
    }

    #[test]
    fn load_reports_missing_and_corrupt_files() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope.bin");
        assert!(matches!(LinkSnapshot::load(&missing), Err(SnapshotError::Io(_))));

        let corrupt = dir.path().join("corrupt.bin");
        std::fs::write(&corrupt, [0xff; 3]).unwrap();
        assert!(matches!(LinkSnapshot::load(&corrupt), Err(SnapshotError::Encode(_))));
    }
}
