//! Brick builders shared by the unit tests.

use glam::{Quat, Vec3};

use crate::connectivity::connection::{AuxPart, AuxRole, ConnectionType, FieldKind, SlotRef};
use crate::connectivity::field::FieldDesc;
use crate::geometry::grid::{GridSize, GRID_UNIT};
use crate::geometry::pose::Pose;
use crate::model::world::{BoxCollider, BrickId, BrickWorld, FieldId};

pub const PLATE_HEIGHT: f32 = 0.32;

/// A `w × d` plate centered on `position`: knob connector field on top,
/// tube receptor field underneath, one knob/tube aux part per slot.
pub fn plate(world: &mut BrickWorld, w: u32, d: u32, position: Vec3) -> BrickId {
    plate_with(world, w, d, Pose::from_translation(position), ConnectionType::Knob, ConnectionType::Tube)
}

pub fn plate_with(
    world: &mut BrickWorld,
    w: u32,
    d: u32,
    pose: Pose,
    top: ConnectionType,
    bottom: ConnectionType,
) -> BrickId {
    let brick = world.add_brick(format!("plate {w}x{d}"), pose);
    let half = Vec3::new(w as f32 * GRID_UNIT, PLATE_HEIGHT, d as f32 * GRID_UNIT) * 0.5;
    let part = world
        .add_part(brick, Pose::IDENTITY, vec![BoxCollider::new(Vec3::ZERO, half)])
        .unwrap();

    let grid = GridSize::new(w - 1, d - 1);
    let origin = |y: f32| {
        Pose::from_translation(Vec3::new(
            (w - 1) as f32 * 0.5 * GRID_UNIT,
            y,
            -((d - 1) as f32) * 0.5 * GRID_UNIT,
        ))
    };

    let mut top_desc = FieldDesc::uniform(FieldKind::Connector, grid, origin(half.y), top);
    let mut bottom_desc = FieldDesc::uniform(FieldKind::Receptor, grid, origin(-half.y), bottom);
    for i in 0..grid.slot_count() {
        top_desc = top_desc.with_aux(i, AuxPart::new(i as u32, AuxRole::Knob));
        bottom_desc = bottom_desc.with_aux(i, AuxPart::new(1000 + i as u32, AuxRole::Tube));
    }
    world.add_field(part, top_desc).unwrap();
    world.add_field(part, bottom_desc).unwrap();
    brick
}

/// Plate tilted about X by `degrees`.
pub fn tilted_plate(world: &mut BrickWorld, w: u32, d: u32, position: Vec3, degrees: f32) -> BrickId {
    let pose = Pose::new(position, Quat::from_rotation_x(degrees.to_radians()));
    plate_with(world, w, d, pose, ConnectionType::Knob, ConnectionType::Tube)
}

pub fn top_field(world: &BrickWorld, brick: BrickId) -> FieldId {
    world.brick_fields(brick)[0]
}

pub fn bottom_field(world: &BrickWorld, brick: BrickId) -> FieldId {
    world.brick_fields(brick)[1]
}

pub fn slot(field: FieldId, index: usize) -> SlotRef {
    SlotRef::new(field, index)
}

/// Every link in the world has a matching reverse link.
pub fn assert_symmetric(world: &BrickWorld) {
    for (id, field) in world.fields_with_ids() {
        for (index, partner) in field.links() {
            let back = world.partner(partner);
            assert_eq!(
                back,
                Some(SlotRef::new(id, index)),
                "slot {index} of {id:?} links to {partner:?} which points at {back:?}"
            );
        }
        assert_eq!(field.linked_slots().count(), field.links().count());
    }
}
