//! Scene queries the connectivity engine needs: field bounding-volume
//! overlap (masked by layer) and brick collider overlap.
//!
//! Both go through the world's R-tree broad phase, which follows every
//! pose change, then confirm candidates with the oriented-box test.

use std::collections::HashSet;

use glam::{Quat, Vec3};

use super::spatial::VolumeKey;
use super::world::{BrickId, BrickWorld, FieldId, PartId};
use crate::connectivity::connection::FieldKind;
use crate::geometry::grid::GRID_UNIT;
use crate::geometry::obb::Obb;

/// Layer bit masks for scene queries.
pub struct PhysicsLayer;

impl PhysicsLayer {
    pub const CONNECTOR: u32 = 1 << 0;
    pub const RECEPTOR: u32 = 1 << 1;
    pub const BRICK: u32 = 1 << 2;

    pub fn for_kind(kind: FieldKind) -> u32 {
        match kind {
            FieldKind::Connector => Self::CONNECTOR,
            FieldKind::Receptor => Self::RECEPTOR,
        }
    }

    /// Mask that finds the partners of a field of `kind`.
    pub fn query_mask(kind: FieldKind, both_kinds: bool) -> u32 {
        if both_kinds {
            Self::CONNECTOR | Self::RECEPTOR
        } else {
            Self::for_kind(kind.opposite())
        }
    }
}

impl BrickWorld {
    /// Box around a field's whole grid, padded half a unit sideways and by the
    /// query margin vertically.
    pub fn field_bounds(&self, field: FieldId) -> Option<Obb> {
        let f = self.field(field)?;
        let pose = self.field_pose(field)?;
        let grid = f.grid();
        let w = grid.width as f32 * GRID_UNIT;
        let h = grid.height as f32 * GRID_UNIT;
        let center = Vec3::new(-w * 0.5, 0.0, h * 0.5);
        let half = Vec3::new(
            (w + GRID_UNIT) * 0.5,
            self.config().tolerances.query_vertical_margin,
            (h + GRID_UNIT) * 0.5,
        );
        Some(Obb::in_frame(&pose, center, half, Quat::IDENTITY))
    }

    /// Fields whose bounds overlap `bounds`, restricted to layers in `mask`
    /// and, if given, to fields on bricks in `only`. Sorted by id.
    pub fn overlap_fields(&self, bounds: &Obb, mask: u32, only: Option<&HashSet<BrickId>>) -> Vec<FieldId> {
        let mut found: Vec<FieldId> = self
            .scene_index()
            .candidates(bounds, mask)
            .into_iter()
            .filter(|v| only.is_none_or(|set| set.contains(&v.brick)))
            .filter(|v| bounds.intersects(&v.obb))
            .filter_map(|v| match v.key {
                VolumeKey::Field(id) => Some(id),
                VolumeKey::Collider(..) => None,
            })
            .collect();
        found.sort_unstable();
        found
    }

    /// World-space colliders of a part.
    pub fn part_volumes(&self, part: PartId) -> Vec<Obb> {
        let (Some(p), Some(pose)) = (self.part(part), self.part_pose(part)) else {
            return Vec::new();
        };
        p.colliders
            .iter()
            .map(|c| Obb::in_frame(&pose, c.center, c.half_extents, c.rotation))
            .collect()
    }

    /// True if any collider of `part` overlaps a collider of another brick.
    /// The part's own brick and bricks in `ignored` are skipped.
    pub fn part_overlaps_scene(&self, part: PartId, ignored: Option<&HashSet<BrickId>>) -> bool {
        let Some(own_brick) = self.part(part).map(|p| p.brick) else {
            return false;
        };
        let epsilon = self.config().tolerances.collision_epsilon;
        let volumes: Vec<Obb> = self
            .part_volumes(part)
            .iter()
            .map(|v| v.shrunk(epsilon))
            .collect();
        if volumes.is_empty() {
            return false;
        }

        for volume in &volumes {
            let hit = self
                .scene_index()
                .candidates(volume, PhysicsLayer::BRICK)
                .into_iter()
                .filter(|other| matches!(other.key, VolumeKey::Collider(..)))
                .filter(|other| other.brick != own_brick)
                .filter(|other| !ignored.is_some_and(|set| set.contains(&other.brick)))
                .find(|other| volume.intersects(&other.obb.shrunk(epsilon)));
            if let Some(other) = hit {
                log::trace!("part {part:?} overlaps brick {:?}", other.brick);
                return true;
            }
        }
        false
    }

    /// True if any part of the brick overlaps the scene.
    pub fn brick_overlaps_scene(&self, brick: BrickId, ignored: Option<&HashSet<BrickId>>) -> bool {
        let parts = match self.brick(brick) {
            Some(b) => b.parts.clone(),
            None => return false,
        };
        parts.iter().any(|&p| self.part_overlaps_scene(p, ignored))
    }
}
