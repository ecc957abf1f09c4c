use glam::{IVec2, Quat, Vec3};
use slotmap::{new_key_type, SlotMap};
use smallvec::SmallVec;

use super::config::EngineConfig;
use super::physics::PhysicsLayer;
use super::spatial::{SceneIndex, SceneVolume, VolumeKey};
use crate::connectivity::compat::CompatibilityTable;
use crate::connectivity::connection::{Connection, SlotRef};
use crate::connectivity::events::{ConnectivityEvent, MutationHook};
use crate::connectivity::field::{ConnectionField, FieldDesc};
use crate::geometry::pose::Pose;

new_key_type! {
    /// Stable handle to a brick. Generational index via SlotMap, safe to
    /// hold across insertions and removals.
    pub struct BrickId;
    pub struct PartId;
    pub struct FieldId;
}

/// Box-shaped collision volume in part-local space.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BoxCollider {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
}

impl BoxCollider {
    pub fn new(center: Vec3, half_extents: Vec3) -> Self {
        Self {
            center,
            half_extents,
            rotation: Quat::IDENTITY,
        }
    }
}

/// The fields a part exposes for linking.
#[derive(Clone, Debug, Default)]
pub struct Connectivity {
    pub fields: SmallVec<[FieldId; 4]>,
}

#[derive(Clone, Debug)]
pub struct Part {
    pub brick: BrickId,
    /// Pose relative to the owning brick.
    pub local: Pose,
    pub colliders: Vec<BoxCollider>,
    pub connectivity: Connectivity,
    /// Set by the host when the part is known to intersect other geometry.
    /// Colliding parts neither originate nor receive new links.
    pub colliding: bool,
}

#[derive(Clone, Debug)]
pub struct Brick {
    pub name: String,
    pub pose: Pose,
    pub parts: SmallVec<[PartId; 2]>,
}

/// Arena of bricks, parts and connection fields, plus the rules that govern
/// linking them. All connectivity operations are methods on this type.
pub struct BrickWorld {
    bricks: SlotMap<BrickId, Brick>,
    parts: SlotMap<PartId, Part>,
    fields: SlotMap<FieldId, ConnectionField>,
    config: EngineConfig,
    rules: CompatibilityTable,
    index: SceneIndex,
    hook: Option<MutationHook>,
}

impl Default for BrickWorld {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

impl BrickWorld {
    pub fn new(config: EngineConfig) -> Self {
        let rules = CompatibilityTable::with_overrides(&config.compatibility.rules);
        Self {
            bricks: SlotMap::with_key(),
            parts: SlotMap::with_key(),
            fields: SlotMap::with_key(),
            config,
            rules,
            index: SceneIndex::default(),
            hook: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn rules(&self) -> &CompatibilityTable {
        &self.rules
    }

    pub fn set_rules(&mut self, rules: CompatibilityTable) {
        self.rules = rules;
    }

    // --- construction ---

    pub fn add_brick(&mut self, name: impl Into<String>, pose: Pose) -> BrickId {
        self.bricks.insert(Brick {
            name: name.into(),
            pose,
            parts: SmallVec::new(),
        })
    }

    /// `None` if the brick doesn't exist.
    pub fn add_part(&mut self, brick: BrickId, local: Pose, colliders: Vec<BoxCollider>) -> Option<PartId> {
        if !self.bricks.contains_key(brick) {
            return None;
        }
        let part = self.parts.insert(Part {
            brick,
            local,
            colliders,
            connectivity: Connectivity::default(),
            colliding: false,
        });
        self.bricks[brick].parts.push(part);
        self.reindex_brick(brick);
        Some(part)
    }

    /// `None` if the part doesn't exist or the description is malformed.
    pub fn add_field(&mut self, part: PartId, desc: FieldDesc) -> Option<FieldId> {
        if !self.parts.contains_key(part) {
            return None;
        }
        let Some(field) = ConnectionField::new(part, desc) else {
            log::warn!("rejected malformed connection field for part {part:?}");
            return None;
        };
        let id = self.fields.insert(field);
        self.parts[part].connectivity.fields.push(id);
        let brick = self.parts[part].brick;
        self.reindex_brick(brick);
        Some(id)
    }

    // --- lookup ---

    pub fn brick(&self, id: BrickId) -> Option<&Brick> {
        self.bricks.get(id)
    }

    pub fn part(&self, id: PartId) -> Option<&Part> {
        self.parts.get(id)
    }

    pub fn field(&self, id: FieldId) -> Option<&ConnectionField> {
        self.fields.get(id)
    }

    pub(crate) fn field_mut(&mut self, id: FieldId) -> Option<&mut ConnectionField> {
        self.fields.get_mut(id)
    }

    pub fn brick_ids(&self) -> impl Iterator<Item = BrickId> + '_ {
        self.bricks.keys()
    }

    pub fn field_ids(&self) -> impl Iterator<Item = FieldId> + '_ {
        self.fields.keys()
    }

    pub fn brick_count(&self) -> usize {
        self.bricks.len()
    }

    pub fn fields_with_ids(&self) -> impl Iterator<Item = (FieldId, &ConnectionField)> {
        self.fields.iter()
    }

    pub fn connection(&self, slot: SlotRef) -> Option<&Connection> {
        self.fields.get(slot.field)?.connection(slot.index)
    }

    pub fn partner(&self, slot: SlotRef) -> Option<SlotRef> {
        self.fields.get(slot.field)?.partner(slot.index)
    }

    pub fn is_linked(&self, slot: SlotRef) -> bool {
        self.fields
            .get(slot.field)
            .is_some_and(|f| f.has_connection(slot.index))
    }

    pub fn part_of_field(&self, field: FieldId) -> Option<PartId> {
        self.fields.get(field).map(|f| f.part())
    }

    pub fn brick_of_field(&self, field: FieldId) -> Option<BrickId> {
        let part = self.part_of_field(field)?;
        self.parts.get(part).map(|p| p.brick)
    }

    /// Every field on every part of a brick, in part order.
    pub fn brick_fields(&self, brick: BrickId) -> Vec<FieldId> {
        let Some(brick) = self.bricks.get(brick) else {
            return Vec::new();
        };
        brick
            .parts
            .iter()
            .filter_map(|&p| self.parts.get(p))
            .flat_map(|p| p.connectivity.fields.iter().copied())
            .collect()
    }

    /// Colliding if any of its parts is.
    pub fn is_brick_colliding(&self, brick: BrickId) -> bool {
        self.bricks.get(brick).is_some_and(|b| {
            b.parts
                .iter()
                .any(|&p| self.parts.get(p).is_some_and(|p| p.colliding))
        })
    }

    pub fn set_part_colliding(&mut self, part: PartId, colliding: bool) {
        if let Some(p) = self.parts.get_mut(part) {
            p.colliding = colliding;
        }
    }

    pub fn set_brick_colliding(&mut self, brick: BrickId, colliding: bool) {
        let parts: SmallVec<[PartId; 2]> = match self.bricks.get(brick) {
            Some(b) => b.parts.clone(),
            None => return,
        };
        for part in parts {
            self.set_part_colliding(part, colliding);
        }
    }

    // --- transforms ---

    pub fn brick_pose(&self, brick: BrickId) -> Option<Pose> {
        self.bricks.get(brick).map(|b| b.pose)
    }

    /// Moves the brick. Existing links are left alone; callers re-validate with
    /// [`BrickWorld::disconnect_all_invalid`] or reconnect.
    pub fn set_brick_pose(&mut self, brick: BrickId, pose: Pose) {
        if let Some(b) = self.bricks.get_mut(brick) {
            b.pose = pose;
            self.reindex_brick(brick);
        }
    }

    pub fn part_pose(&self, part: PartId) -> Option<Pose> {
        let part = self.parts.get(part)?;
        let brick = self.bricks.get(part.brick)?;
        Some(brick.pose * part.local)
    }

    pub fn field_pose(&self, field: FieldId) -> Option<Pose> {
        let f = self.fields.get(field)?;
        Some(self.part_pose(f.part())? * *f.local())
    }

    /// World position of a slot. `None` if the field or index doesn't exist.
    pub fn slot_position(&self, slot: SlotRef) -> Option<Vec3> {
        let field = self.fields.get(slot.field)?;
        let cell = field.grid().cell(slot.index)?;
        field.grid_to_world(&self.field_pose(slot.field)?, cell)
    }

    pub fn grid_to_world(&self, field: FieldId, cell: IVec2) -> Option<Vec3> {
        self.fields.get(field)?.grid_to_world(&self.field_pose(field)?, cell)
    }

    /// Slot under a world position, or `None` if it falls outside the grid.
    pub fn world_to_slot(&self, field: FieldId, position: Vec3) -> Option<SlotRef> {
        let f = self.fields.get(field)?;
        let cell = f.world_to_grid(&self.field_pose(field)?, position);
        f.grid().index(cell).map(|index| SlotRef::new(field, index))
    }

    // --- teardown ---

    /// Removes a field after disconnecting every one of its links.
    pub fn remove_field(&mut self, field: FieldId) -> bool {
        if !self.fields.contains_key(field) {
            return false;
        }
        self.disconnect_all(field);
        let Some(removed) = self.fields.remove(field) else {
            return false;
        };
        if let Some(part) = self.parts.get_mut(removed.part()) {
            part.connectivity.fields.retain(|f| *f != field);
            let brick = part.brick;
            self.reindex_brick(brick);
        }
        true
    }

    pub fn remove_part(&mut self, part: PartId) -> bool {
        let fields = match self.parts.get(part) {
            Some(p) => p.connectivity.fields.clone(),
            None => return false,
        };
        for field in fields {
            self.remove_field(field);
        }
        let Some(removed) = self.parts.remove(part) else {
            return false;
        };
        if let Some(brick) = self.bricks.get_mut(removed.brick) {
            brick.parts.retain(|p| *p != part);
        }
        self.reindex_brick(removed.brick);
        true
    }

    pub fn remove_brick(&mut self, brick: BrickId) -> bool {
        let parts = match self.bricks.get(brick) {
            Some(b) => b.parts.clone(),
            None => return false,
        };
        for part in parts {
            self.remove_part(part);
        }
        self.index.remove_brick(brick);
        log::debug!("removed brick {brick:?}");
        self.bricks.remove(brick).is_some()
    }

    // --- spatial index ---

    pub(crate) fn scene_index(&self) -> &SceneIndex {
        &self.index
    }

    /// Rebuild the index entries of one brick from its current pose, parts
    /// and fields.
    fn reindex_brick(&mut self, brick: BrickId) {
        let Some(b) = self.bricks.get(brick) else {
            self.index.remove_brick(brick);
            return;
        };
        let mut volumes = Vec::new();
        for &part in &b.parts {
            for (n, obb) in self.part_volumes(part).into_iter().enumerate() {
                volumes.push(SceneVolume::new(VolumeKey::Collider(part, n), brick, PhysicsLayer::BRICK, obb));
            }
        }
        for field in self.brick_fields(brick) {
            if let (Some(f), Some(obb)) = (self.fields.get(field), self.field_bounds(field)) {
                volumes.push(SceneVolume::new(VolumeKey::Field(field), brick, f.layer(), obb));
            }
        }
        self.index.replace_brick(brick, volumes);
    }

    // --- events ---

    pub fn set_mutation_hook(&mut self, hook: MutationHook) {
        self.hook = Some(hook);
    }

    pub fn clear_mutation_hook(&mut self) -> Option<MutationHook> {
        self.hook.take()
    }

    pub(crate) fn emit(&mut self, event: ConnectivityEvent<'_>) {
        if let Some(hook) = self.hook.as_mut() {
            hook(&event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{bottom_field, plate, top_field};

    #[test]
    fn add_part_to_missing_brick_fails() {
        let mut world = BrickWorld::default();
        let brick = world.add_brick("a", Pose::IDENTITY);
        world.remove_brick(brick);
        assert!(world.add_part(brick, Pose::IDENTITY, Vec::new()).is_none());
    }

    #[test]
    fn field_pose_composes_hierarchy() {
        let mut world = BrickWorld::default();
        let brick = plate(&mut world, 1, 1, Vec3::new(10.0, 0.0, 0.0));
        let top = top_field(&world, brick);
        let pose = world.field_pose(top).unwrap();
        assert!((pose.translation.x - 10.0).abs() < 1e-5);
        assert!(pose.translation.y > 0.0);
    }

    #[test]
    fn brick_fields_lists_both_faces() {
        let mut world = BrickWorld::default();
        let brick = plate(&mut world, 2, 2, Vec3::ZERO);
        let fields = world.brick_fields(brick);
        assert_eq!(fields, vec![top_field(&world, brick), bottom_field(&world, brick)]);
        assert_eq!(world.brick_of_field(fields[0]), Some(brick));
    }

    #[test]
    fn colliding_flag_propagates_from_parts() {
        let mut world = BrickWorld::default();
        let brick = plate(&mut world, 1, 1, Vec3::ZERO);
        assert!(!world.is_brick_colliding(brick));
        world.set_brick_colliding(brick, true);
        assert!(world.is_brick_colliding(brick));
    }

    #[test]
    fn world_to_slot_outside_grid_is_none() {
        let mut world = BrickWorld::default();
        let brick = plate(&mut world, 2, 2, Vec3::ZERO);
        let top = top_field(&world, brick);
        let inside = world.slot_position(SlotRef::new(top, 3)).unwrap();
        assert_eq!(world.world_to_slot(top, inside), Some(SlotRef::new(top, 3)));
        assert_eq!(world.world_to_slot(top, Vec3::new(50.0, 0.0, 0.0)), None);
    }

    #[test]
    fn remove_brick_clears_arenas() {
        let mut world = BrickWorld::default();
        let brick = plate(&mut world, 2, 2, Vec3::ZERO);
        let top = top_field(&world, brick);
        assert!(world.remove_brick(brick));
        assert!(world.field(top).is_none());
        assert_eq!(world.brick_count(), 0);
        assert!(!world.remove_brick(brick));
    }
}
