//! Would linking two slots be physically possible?
//!
//! Validation computes the rigid motion that snaps the source slot onto the
//! destination slot, tries it on the source brick, asks the scene whether
//! anything now overlaps, and always puts the brick back.

use std::collections::HashSet;
use std::ops::Deref;

use glam::{Quat, Vec3};

use super::compat::Classification;
use super::connection::SlotRef;
use crate::geometry::pose::Pose;
use crate::model::world::{BrickId, BrickWorld};

/// Rigid motion that carries the source brick into its connected position:
/// rotate by `rotation` about `pivot`, then translate by `offset`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Alignment {
    pub rotation: Quat,
    pub pivot: Vec3,
    pub offset: Vec3,
}

impl Alignment {
    /// Rotation as (axis, angle in radians).
    pub fn axis_angle(&self) -> (Vec3, f32) {
        self.rotation.to_axis_angle()
    }

    pub fn apply(&self, pose: &Pose) -> Pose {
        pose.rotated_about(self.pivot, self.rotation, self.offset)
    }
}

/// Temporarily moves a brick; the original pose comes back when the probe
/// is dropped, on every exit path.
struct PoseProbe<'w> {
    world: &'w mut BrickWorld,
    brick: BrickId,
    original: Pose,
}

impl<'w> PoseProbe<'w> {
    fn apply(world: &'w mut BrickWorld, brick: BrickId, pose: Pose) -> Option<Self> {
        let original = world.brick_pose(brick)?;
        world.set_brick_pose(brick, pose);
        Some(Self {
            world,
            brick,
            original,
        })
    }
}

impl Deref for PoseProbe<'_> {
    type Target = BrickWorld;

    fn deref(&self) -> &BrickWorld {
        self.world
    }
}

impl Drop for PoseProbe<'_> {
    fn drop(&mut self) {
        self.world.set_brick_pose(self.brick, self.original);
    }
}

/// Signed angle from `from` to `to` around `axis`.
fn signed_angle(from: Vec3, to: Vec3, axis: Vec3) -> f32 {
    axis.dot(from.cross(to)).atan2(from.dot(to))
}

impl BrickWorld {
    /// Motion that would seat `src` on `dst`. `None` if either slot is missing
    /// or the source would have to tilt further than the configured limit.
    ///
    /// The tilt aligns the fields' up axes; the in-plane twist then snaps the
    /// source's right axis to the closest of the destination's four in-plane
    /// axes, so bricks keep quarter-turn orientations.
    pub fn alignment(&self, src: SlotRef, dst: SlotRef, pivot: Vec3) -> Option<Alignment> {
        let src_pose = self.field_pose(src.field)?;
        let dst_pose = self.field_pose(dst.field)?;
        let src_pos = self.slot_position(src)?;
        let dst_pos = self.slot_position(dst)?;

        let src_up = src_pose.up();
        let dst_up = dst_pose.up();
        let max_tilt = self.config().tolerances.max_alignment_angle_deg.to_radians();
        if src_up.angle_between(dst_up) > max_tilt {
            return None;
        }
        let tilt = Quat::from_rotation_arc(src_up, dst_up);

        let right = tilt * src_pose.right();
        let target = [
            dst_pose.right(),
            dst_pose.forward(),
            -dst_pose.right(),
            -dst_pose.forward(),
        ]
        .into_iter()
        .max_by(|a, b| a.dot(right).total_cmp(&b.dot(right)))?;
        let twist = Quat::from_axis_angle(dst_up, signed_angle(right, target, dst_up));

        let rotation = (twist * tilt).normalize();
        let moved = pivot + rotation * (src_pos - pivot);
        Some(Alignment {
            rotation,
            pivot,
            offset: dst_pos - moved,
        })
    }

    /// Pose the source brick would take if `src` were seated on `dst`.
    pub fn connection_pose(&self, src: SlotRef, dst: SlotRef, pivot: Vec3) -> Option<Pose> {
        let brick = self.brick_of_field(src.field)?;
        let alignment = self.alignment(src, dst, pivot)?;
        Some(alignment.apply(&self.brick_pose(brick)?))
    }

    /// Could `src` link to `dst` without the source brick hitting anything?
    ///
    /// Leaves every brick pose exactly as it found it, valid or not.
    pub fn is_connection_valid(
        &mut self,
        src: SlotRef,
        dst: SlotRef,
        pivot: Vec3,
        ignored: Option<&HashSet<BrickId>>,
    ) -> bool {
        if src == dst {
            return false;
        }
        let (Some(src_conn), Some(dst_conn)) = (self.connection(src), self.connection(dst)) else {
            return false;
        };
        if self.rules().classify(src_conn.kind, dst_conn.kind) != Classification::Connect {
            log::trace!("{src:?} -> {dst:?}: types don't connect");
            return false;
        }
        let (Some(src_part), Some(dst_part)) = (self.part_of_field(src.field), self.part_of_field(dst.field)) else {
            return false;
        };
        if src_part == dst_part {
            return false;
        }
        let (Some(src_brick), Some(dst_brick)) = (self.brick_of_field(src.field), self.brick_of_field(dst.field)) else {
            return false;
        };
        if self.is_brick_colliding(src_brick) || self.is_brick_colliding(dst_brick) {
            log::trace!("{src:?} -> {dst:?}: brick flagged colliding");
            return false;
        }
        // Links on the source brick itself are released by `connect`, links
        // held by any other brick are not.
        if let Some(holder) = self.partner(dst) {
            if self.brick_of_field(holder.field) != Some(src_brick) {
                log::trace!("{src:?} -> {dst:?}: destination already linked to {holder:?}");
                return false;
            }
        }

        let Some(target) = self.connection_pose(src, dst, pivot) else {
            log::trace!("{src:?} -> {dst:?}: alignment exceeds tilt limit");
            return false;
        };
        let parts = match self.brick(src_brick) {
            Some(b) => b.parts.clone(),
            None => return false,
        };

        let Some(probe) = PoseProbe::apply(self, src_brick, target) else {
            return false;
        };
        let blocked = parts.iter().any(|&p| probe.part_overlaps_scene(p, ignored));
        drop(probe);

        if blocked {
            log::trace!("{src:?} -> {dst:?}: collides at target pose");
        }
        !blocked
    }
}
