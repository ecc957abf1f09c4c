//! Overlap query: find slot pairings between a field and the fields of the
//! opposite kind that lie flush against it.

use std::collections::HashSet;

use glam::{IVec2, Vec3};

use super::compat::Classification;
use super::connection::SlotRef;
use crate::geometry::grid::{grid_to_local, GRID_UNIT};
use crate::model::physics::PhysicsLayer;
use crate::model::world::{BrickId, BrickWorld, FieldId};

/// A proposed link: `own` on the queried field, `other` on a nearby one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SlotPair {
    pub own: SlotRef,
    pub other: SlotRef,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct QueryResult {
    pub classification: Classification,
    pub pairs: Vec<SlotPair>,
}

impl QueryResult {
    fn connect(pairs: Vec<SlotPair>) -> Self {
        Self {
            classification: Classification::Connect,
            pairs,
        }
    }

    fn reject() -> Self {
        Self {
            classification: Classification::Reject,
            pairs: Vec::new(),
        }
    }

    pub fn is_reject(&self) -> bool {
        self.classification == Classification::Reject
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct QueryFilter<'a> {
    /// Only consider fields on these bricks.
    pub only_bricks: Option<&'a HashSet<BrickId>>,
    /// Look for fields of both kinds instead of only the opposite one.
    pub both_kinds: bool,
}

impl<'a> QueryFilter<'a> {
    pub fn only(bricks: &'a HashSet<BrickId>) -> Self {
        Self {
            only_bricks: Some(bricks),
            both_kinds: false,
        }
    }
}

impl BrickWorld {
    /// Pair up coincident free slots between `field` and every compatible field
    /// flush against it.
    ///
    /// A single `Reject` classification anywhere discards all accumulated pairs
    /// and returns `Reject`: overlapping geometry that can't coexist vetoes the
    /// whole placement. Otherwise the result is `Connect`, possibly with no pairs.
    pub fn query_connections(&self, field: FieldId, filter: &QueryFilter<'_>) -> QueryResult {
        let (Some(own), Some(own_pose), Some(bounds), Some(own_brick)) = (
            self.field(field),
            self.field_pose(field),
            self.field_bounds(field),
            self.brick_of_field(field),
        ) else {
            return QueryResult::default();
        };
        let tol = self.config().tolerances.clone();
        let mask = PhysicsLayer::query_mask(own.kind(), filter.both_kinds);
        let to_own = own_pose.inverse();
        let own_grid = own.grid();
        let own_w = own_grid.width as f32 * GRID_UNIT;
        let own_h = own_grid.height as f32 * GRID_UNIT;
        let mut pairs = Vec::new();

        for other_id in self.overlap_fields(&bounds, mask, filter.only_bricks) {
            if other_id == field || self.brick_of_field(other_id) == Some(own_brick) {
                continue;
            }
            let (Some(other), Some(other_pose)) = (self.field(other_id), self.field_pose(other_id)) else {
                continue;
            };
            if own_pose.up().dot(other_pose.up()) < tol.parallel_dot_threshold {
                continue;
            }

            // Other footprint in our local space.
            let corners: Vec<Vec3> = other
                .grid()
                .local_corners()
                .iter()
                .map(|&c| to_own.transform_point(other_pose.transform_point(c)))
                .collect();
            let lo = corners.iter().fold(Vec3::splat(f32::INFINITY), |m, c| m.min(*c));
            let hi = corners.iter().fold(Vec3::splat(f32::NEG_INFINITY), |m, c| m.max(*c));
            if lo.y.abs() > tol.query_vertical_margin || hi.y.abs() > tol.query_vertical_margin {
                continue;
            }
            let min_x = lo.x.max(-own_w);
            let max_x = hi.x.min(0.0);
            let min_z = lo.z.max(0.0);
            let max_z = hi.z.min(own_h);
            let slack = tol.slot_match_tolerance;
            if min_x > max_x + slack || min_z > max_z + slack {
                continue;
            }

            // Grid x runs along -X, so the local x range flips.
            let eps = slack / GRID_UNIT;
            let x_from = ((-max_x / GRID_UNIT) - eps).ceil().max(0.0) as i32;
            let x_to = ((-min_x / GRID_UNIT) + eps).floor().min(own_grid.width as f32) as i32;
            let z_from = ((min_z / GRID_UNIT) - eps).ceil().max(0.0) as i32;
            let z_to = ((max_z / GRID_UNIT) + eps).floor().min(own_grid.height as f32) as i32;

            for z in z_from..=z_to {
                for x in x_from..=x_to {
                    let cell = IVec2::new(x, z);
                    let Some(own_index) = own_grid.index(cell) else { continue };
                    let own_slot = &own.slots()[own_index];
                    if !own_slot.is_connectable() || own.has_connection(own_index) {
                        continue;
                    }

                    let world_pos = own_pose.transform_point(grid_to_local(cell));
                    let other_cell = other.world_to_grid(&other_pose, world_pos);
                    let Some(other_index) = other.grid().index(other_cell) else { continue };
                    let Some(other_pos) = other.grid_to_world(&other_pose, other_cell) else { continue };
                    if other_pos.distance(world_pos) > slack {
                        continue;
                    }
                    let other_slot = &other.slots()[other_index];
                    if !other_slot.is_connectable() || other.has_connection(other_index) {
                        continue;
                    }

                    match self.rules().classify(own_slot.kind, other_slot.kind) {
                        Classification::Reject => {
                            log::trace!(
                                "query on {field:?}: {:?} at {cell} rejects {:?} on {other_id:?}",
                                own_slot.kind,
                                other_slot.kind
                            );
                            return QueryResult::reject();
                        }
                        Classification::Connect => pairs.push(SlotPair {
                            own: SlotRef::new(field, own_index),
                            other: SlotRef::new(other_id, other_index),
                        }),
                        Classification::Ignore => {}
                    }
                }
            }
        }

        QueryResult::connect(pairs)
    }

    /// Cheap pre-filter: could these two fields ever link?
    pub fn match_types(&self, a: FieldId, b: FieldId) -> bool {
        match (self.field(a), self.field(b)) {
            (Some(fa), Some(fb)) => fa.match_types(fb, self.rules()),
            _ => false,
        }
    }
}
