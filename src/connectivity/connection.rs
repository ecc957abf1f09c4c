use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::model::world::FieldId;

/// What sits at one grid position of a connection field.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionType {
    /// Grid position with no attachment point. Never links.
    #[default]
    Empty,
    Knob,
    HollowKnob,
    Tube,
    HollowTube,
    Pin,
    PinHole,
    Axle,
    AxleHole,
    Bar,
    Clip,
}

impl ConnectionType {
    pub fn all() -> &'static [ConnectionType] {
        use ConnectionType::*;
        &[
            Empty, Knob, HollowKnob, Tube, HollowTube, Pin, PinHole, Axle, AxleHole, Bar, Clip,
        ]
    }

    pub fn is_slot(self) -> bool {
        self != Self::Empty
    }
}

/// The two complementary field kinds. Connectors only link to receptors.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldKind {
    Connector,
    Receptor,
}

impl FieldKind {
    pub fn opposite(self) -> Self {
        match self {
            Self::Connector => Self::Receptor,
            Self::Receptor => Self::Connector,
        }
    }
}

/// Address of one slot: which field, which index in that field's slot array.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotRef {
    pub field: FieldId,
    pub index: usize,
}

impl SlotRef {
    pub fn new(field: FieldId, index: usize) -> Self {
        Self { field, index }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxRole {
    /// Stud geometry on top of a connector slot.
    Knob,
    /// Tube geometry under a receptor slot.
    Tube,
}

/// Decorative geometry owned by the host; the engine only tracks whether
/// it should currently be drawn.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxPart {
    pub handle: u32,
    pub role: AuxRole,
    pub visible: bool,
}

impl AuxPart {
    pub fn new(handle: u32, role: AuxRole) -> Self {
        Self {
            handle,
            role,
            visible: true,
        }
    }
}

/// Surface coverage of a slot, recomputed on every link change.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Coverage {
    /// The slot is linked to a partner.
    pub connected: bool,
    /// The partner brings knob geometry of its own, so this slot's tube is filled.
    pub sandwiched: bool,
}

/// One attachment point of a field.
#[derive(Clone, Debug, PartialEq)]
pub struct Connection {
    pub index: usize,
    pub kind: ConnectionType,
    pub aux: SmallVec<[AuxPart; 2]>,
    /// Handles of the partner's aux parts this slot is currently covering.
    pub linked_aux: SmallVec<[u32; 2]>,
    pub coverage: Coverage,
}

impl Connection {
    pub fn new(index: usize, kind: ConnectionType) -> Self {
        Self {
            index,
            kind,
            aux: SmallVec::new(),
            linked_aux: SmallVec::new(),
            coverage: Coverage::default(),
        }
    }

    pub fn is_connectable(&self) -> bool {
        self.kind.is_slot()
    }

    /// Recompute coverage and aux visibility. Knobs hide while linked (they sit
    /// inside the partner); tubes hide only when the partner also fills them.
    pub(crate) fn refresh_visibility(&mut self, connected: bool, partner_aux: &[AuxPart]) {
        self.coverage = Coverage {
            connected,
            sandwiched: connected && partner_aux.iter().any(|a| a.role == AuxRole::Knob),
        };
        for aux in &mut self.aux {
            aux.visible = match aux.role {
                AuxRole::Knob => !self.coverage.connected,
                AuxRole::Tube => !self.coverage.sandwiched,
            };
        }
        self.linked_aux.clear();
        if connected {
            self.linked_aux.extend(partner_aux.iter().map(|a| a.handle));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_is_not_a_slot() {
        assert!(!ConnectionType::Empty.is_slot());
        assert!(ConnectionType::Knob.is_slot());
        assert!(!Connection::new(0, ConnectionType::Empty).is_connectable());
    }

    #[test]
    fn field_kind_opposite() {
        assert_eq!(FieldKind::Connector.opposite(), FieldKind::Receptor);
        assert_eq!(FieldKind::Receptor.opposite(), FieldKind::Connector);
    }

    #[test]
    fn knob_hides_while_linked() {
        let mut conn = Connection::new(0, ConnectionType::Knob);
        conn.aux.push(AuxPart::new(7, AuxRole::Knob));
        let partner = [AuxPart::new(9, AuxRole::Tube)];

        conn.refresh_visibility(true, &partner);
        assert!(!conn.aux[0].visible);
        assert_eq!(conn.linked_aux.as_slice(), &[9]);
        assert!(conn.coverage.connected);
        assert!(!conn.coverage.sandwiched);

        conn.refresh_visibility(false, &[]);
        assert!(conn.aux[0].visible);
        assert!(conn.linked_aux.is_empty());
    }

    #[test]
    fn tube_hides_only_when_filled() {
        let mut conn = Connection::new(0, ConnectionType::Tube);
        conn.aux.push(AuxPart::new(1, AuxRole::Tube));

        conn.refresh_visibility(true, &[]);
        assert!(conn.aux[0].visible);

        conn.refresh_visibility(true, &[AuxPart::new(2, AuxRole::Knob)]);
        assert!(!conn.aux[0].visible);
        assert!(conn.coverage.sandwiched);
    }

    #[test]
    fn all_types_listed() {
        assert_eq!(ConnectionType::all().len(), 11);
    }
}
