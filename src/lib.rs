//! Snap-fitting connectivity for modular bricks: slot grids, type
//! compatibility, overlap queries, collision-checked linking and the brick
//! graph built from those links.

pub mod connectivity;
pub mod geometry;
pub mod model;

#[cfg(test)]
pub(crate) mod testutil;

pub use connectivity::compat::{Classification, CompatibilityTable};
pub use connectivity::connection::{ConnectionType, FieldKind, SlotRef};
pub use model::config::EngineConfig;
pub use model::scene::Scene;
pub use model::world::{BrickId, BrickWorld, FieldId, PartId};
