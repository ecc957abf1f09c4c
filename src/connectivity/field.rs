use std::collections::{BTreeSet, HashSet};

use glam::{IVec2, Vec3};

use super::compat::CompatibilityTable;
use super::connection::{AuxPart, Connection, ConnectionType, FieldKind, SlotRef};
use crate::geometry::grid::{self, GridSize};
use crate::geometry::pose::Pose;
use crate::model::physics::PhysicsLayer;
use crate::model::world::PartId;

/// Everything the import pipeline hands over to create a field.
#[derive(Clone, Debug)]
pub struct FieldDesc {
    pub kind: FieldKind,
    /// Physics layer tag; defaults from `kind`.
    pub layer: u32,
    /// Pose of the grid origin (slot 0) relative to the owning part.
    pub local: Pose,
    pub grid: GridSize,
    /// One entry per slot, `(width + 1) * (height + 1)` long.
    pub slots: Vec<ConnectionType>,
    pub aux: Vec<(usize, AuxPart)>,
}

impl FieldDesc {
    pub fn new(kind: FieldKind, grid: GridSize, local: Pose, slots: Vec<ConnectionType>) -> Self {
        Self {
            kind,
            layer: PhysicsLayer::for_kind(kind),
            local,
            grid,
            slots,
            aux: Vec::new(),
        }
    }

    /// Every slot of the grid gets the same type.
    pub fn uniform(kind: FieldKind, grid: GridSize, local: Pose, slot: ConnectionType) -> Self {
        Self::new(kind, grid, local, vec![slot; grid.slot_count()])
    }

    pub fn with_aux(mut self, index: usize, aux: AuxPart) -> Self {
        self.aux.push((index, aux));
        self
    }
}

/// A surface's grid of attachment slots plus its live link table.
///
/// `links[i]` is the partner of slot `i`; `linked` always holds exactly the
/// indices whose entry is `Some`. Geometry is fixed after creation.
#[derive(Clone, Debug)]
pub struct ConnectionField {
    part: PartId,
    kind: FieldKind,
    layer: u32,
    local: Pose,
    grid: GridSize,
    slots: Vec<Connection>,
    links: Vec<Option<SlotRef>>,
    linked: BTreeSet<usize>,
    connectable: usize,
}

impl ConnectionField {
    /// `None` when the slot array doesn't match the grid or an aux part
    /// points past the end of it.
    pub(crate) fn new(part: PartId, desc: FieldDesc) -> Option<Self> {
        if desc.slots.len() != desc.grid.slot_count() {
            return None;
        }
        let mut slots: Vec<Connection> = desc
            .slots
            .iter()
            .enumerate()
            .map(|(i, &kind)| Connection::new(i, kind))
            .collect();
        for (index, aux) in desc.aux {
            slots.get_mut(index)?.aux.push(aux);
        }
        let connectable = slots.iter().filter(|c| c.is_connectable()).count();
        let links = vec![None; slots.len()];
        Some(Self {
            part,
            kind: desc.kind,
            layer: desc.layer,
            local: desc.local,
            grid: desc.grid,
            slots,
            links,
            linked: BTreeSet::new(),
            connectable,
        })
    }

    pub fn part(&self) -> PartId {
        self.part
    }

    pub fn kind(&self) -> FieldKind {
        self.kind
    }

    pub fn layer(&self) -> u32 {
        self.layer
    }

    pub fn local(&self) -> &Pose {
        &self.local
    }

    pub fn grid(&self) -> GridSize {
        self.grid
    }

    pub fn connectable(&self) -> usize {
        self.connectable
    }

    pub fn slots(&self) -> &[Connection] {
        &self.slots
    }

    pub fn connection(&self, index: usize) -> Option<&Connection> {
        self.slots.get(index)
    }

    /// Slot at a grid cell; `None` outside the grid.
    pub fn connection_at(&self, cell: IVec2) -> Option<&Connection> {
        self.grid.index(cell).and_then(|i| self.slots.get(i))
    }

    /// True if slot `index` is currently linked.
    pub fn has_connection(&self, index: usize) -> bool {
        self.linked.contains(&index)
    }

    /// Partner of slot `index`, if linked.
    pub fn partner(&self, index: usize) -> Option<SlotRef> {
        self.links.get(index).copied().flatten()
    }

    pub fn has_available_connections(&self) -> bool {
        self.linked.len() < self.connectable
    }

    pub fn linked_count(&self) -> usize {
        self.linked.len()
    }

    /// Indices of linked slots, ascending.
    pub fn linked_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.linked.iter().copied()
    }

    /// `(own index, partner)` for every linked slot.
    pub fn links(&self) -> impl Iterator<Item = (usize, SlotRef)> + '_ {
        self.linked
            .iter()
            .filter_map(|&i| self.links[i].map(|partner| (i, partner)))
    }

    pub fn slot_types(&self) -> HashSet<ConnectionType> {
        self.slots
            .iter()
            .map(|c| c.kind)
            .filter(|k| k.is_slot())
            .collect()
    }

    /// Cheap pre-filter: could any slot of `self` ever link to any slot of `other`?
    pub fn match_types(&self, other: &ConnectionField, table: &CompatibilityTable) -> bool {
        table.any_connect(&self.slot_types(), &other.slot_types())
    }

    /// World position of a cell given this field's world pose. `None` outside the grid.
    pub fn grid_to_world(&self, world_pose: &Pose, cell: IVec2) -> Option<Vec3> {
        if !self.grid.contains(cell) {
            return None;
        }
        Some(world_pose.transform_point(grid::grid_to_local(cell)))
    }

    /// Nearest cell to a world position. Not range checked; see [`GridSize::index`].
    pub fn world_to_grid(&self, world_pose: &Pose, position: Vec3) -> IVec2 {
        grid::local_to_grid(world_pose.inverse().transform_point(position))
    }

    pub(crate) fn set_link(&mut self, index: usize, partner: Option<SlotRef>) {
        let Some(entry) = self.links.get_mut(index) else {
            return;
        };
        *entry = partner;
        if partner.is_some() {
            self.linked.insert(index);
        } else {
            self.linked.remove(&index);
        }
    }

    pub(crate) fn connection_mut(&mut self, index: usize) -> Option<&mut Connection> {
        self.slots.get_mut(index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connectivity::connection::AuxRole;
    use slotmap::SlotMap;

    fn ids() -> (PartId, crate::model::world::FieldId) {
        let mut parts: SlotMap<PartId, ()> = SlotMap::with_key();
        let mut fields: SlotMap<crate::model::world::FieldId, ()> = SlotMap::with_key();
        (parts.insert(()), fields.insert(()))
    }

    fn knob_field(width: u32, height: u32) -> ConnectionField {
        let (part, _) = ids();
        let grid = GridSize::new(width, height);
        ConnectionField::new(
            part,
            FieldDesc::uniform(FieldKind::Connector, grid, Pose::IDENTITY, ConnectionType::Knob),
        )
        .unwrap()
    }

    #[test]
    fn rejects_wrong_slot_count() {
        let (part, _) = ids();
        let desc = FieldDesc::new(
            FieldKind::Connector,
            GridSize::new(1, 1),
            Pose::IDENTITY,
            vec![ConnectionType::Knob; 3],
        );
        assert!(ConnectionField::new(part, desc).is_none());
    }

    #[test]
    fn rejects_aux_out_of_range() {
        let (part, _) = ids();
        let desc = FieldDesc::uniform(
            FieldKind::Connector,
            GridSize::new(0, 0),
            Pose::IDENTITY,
            ConnectionType::Knob,
        )
        .with_aux(4, AuxPart::new(1, AuxRole::Knob));
        assert!(ConnectionField::new(part, desc).is_none());
    }

    #[test]
    fn connectable_skips_empty_slots() {
        let (part, _) = ids();
        let desc = FieldDesc::new(
            FieldKind::Receptor,
            GridSize::new(1, 0),
            Pose::IDENTITY,
            vec![ConnectionType::Tube, ConnectionType::Empty],
        );
        let field = ConnectionField::new(part, desc).unwrap();
        assert_eq!(field.connectable(), 1);
        assert_eq!(field.layer(), PhysicsLayer::RECEPTOR);
    }

    #[test]
    fn set_link_keeps_linked_set_in_step() {
        let (_, other) = ids();
        let mut field = knob_field(1, 1);
        assert!(field.has_available_connections());

        field.set_link(2, Some(SlotRef::new(other, 0)));
        assert!(field.has_connection(2));
        assert_eq!(field.partner(2), Some(SlotRef::new(other, 0)));
        assert_eq!(field.linked_slots().collect::<Vec<_>>(), vec![2]);

        field.set_link(2, None);
        assert!(!field.has_connection(2));
        assert_eq!(field.linked_count(), 0);

        // Out of range is ignored.
        field.set_link(99, Some(SlotRef::new(other, 0)));
        assert_eq!(field.linked_count(), 0);
    }

    #[test]
    fn availability_tracks_connectable() {
        let (_, other) = ids();
        let mut field = knob_field(0, 0);
        field.set_link(0, Some(SlotRef::new(other, 0)));
        assert!(!field.has_available_connections());
    }

    #[test]
    fn connection_at_bounds() {
        let field = knob_field(2, 1);
        assert_eq!(field.connection_at(IVec2::new(2, 1)).map(|c| c.index), Some(5));
        assert!(field.connection_at(IVec2::new(3, 0)).is_none());
        assert!(field.connection_at(IVec2::new(0, -1)).is_none());
    }

    #[test]
    fn grid_world_round_trip() {
        let field = knob_field(3, 3);
        let pose = Pose::new(
            Vec3::new(1.0, 2.0, 3.0),
            glam::Quat::from_rotation_y(0.4),
        );
        for index in 0..field.grid().slot_count() {
            let cell = field.grid().cell(index).unwrap();
            let world = field.grid_to_world(&pose, cell).unwrap();
            assert_eq!(field.world_to_grid(&pose, world), cell);
        }
        assert!(field.grid_to_world(&pose, IVec2::new(4, 0)).is_none());
    }

    #[test]
    fn match_types_uses_table() {
        let (part, _) = ids();
        let knobs = knob_field(0, 0);
        let tubes = ConnectionField::new(
            part,
            FieldDesc::uniform(FieldKind::Receptor, GridSize::new(0, 0), Pose::IDENTITY, ConnectionType::Tube),
        )
        .unwrap();
        let axles = ConnectionField::new(
            part,
            FieldDesc::uniform(FieldKind::Receptor, GridSize::new(0, 0), Pose::IDENTITY, ConnectionType::AxleHole),
        )
        .unwrap();
        let table = CompatibilityTable::default();
        assert!(knobs.match_types(&tubes, &table));
        assert!(!knobs.match_types(&axles, &table));
    }
}
