use super::connection::{AuxPart, SlotRef};
use crate::model::world::FieldId;

/// Raised by the world around every link mutation, so a host can snapshot
/// state for undo or redraw decorative geometry. The engine records nothing.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConnectivityEvent<'a> {
    /// About to change links on these fields.
    WillMutate(&'a [FieldId]),
    /// Finished changing links; these fields were touched.
    DidMutate(&'a [FieldId]),
    /// A slot's aux parts were re-evaluated after its link changed.
    AuxVisibility { slot: SlotRef, aux: &'a [AuxPart] },
}

pub type MutationHook = Box<dyn FnMut(&ConnectivityEvent<'_>)>;
