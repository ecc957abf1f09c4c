//! TOML scene descriptions: part presets (colliders and connection fields)
//! and brick instances built from them.
//!
//! ```toml
//! [[preset]]
//! name = "plate_1x1"
//! [[preset.collider]]
//! half_extents = [0.4, 0.16, 0.4]
//! [[preset.field]]
//! kind = "connector"
//! position = [0.0, 0.16, 0.0]
//! grid = [0, 0]
//! slot = "knob"
//!
//! [[brick]]
//! name = "a"
//! position = [0.0, 0.0, 0.0]
//! parts = ["plate_1x1"]
//! ```

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

use glam::Vec3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::world::{BoxCollider, BrickId, BrickWorld};
use crate::connectivity::connection::{AuxPart, AuxRole, ConnectionType, FieldKind};
use crate::connectivity::field::FieldDesc;
use crate::geometry::grid::GridSize;
use crate::geometry::pose::Pose;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error("failed to read scene {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse scene: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("preset {0:?} is defined twice")]
    DuplicatePreset(String),
    #[error("brick {brick:?} uses unknown preset {preset:?}")]
    UnknownPreset { brick: String, preset: String },
    #[error("field {field} of preset {preset:?} has {got} slots, its grid needs {expected}")]
    SlotCount {
        preset: String,
        field: usize,
        expected: usize,
        got: usize,
    },
    #[error("field {field} of preset {preset:?} puts an aux part on missing slot {slot}")]
    AuxSlot { preset: String, field: usize, slot: usize },
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Scene {
    #[serde(default, rename = "preset")]
    pub presets: Vec<PartPreset>,
    #[serde(default, rename = "brick")]
    pub bricks: Vec<BrickInstance>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PartPreset {
    pub name: String,
    #[serde(default, rename = "collider")]
    pub colliders: Vec<ColliderPreset>,
    #[serde(default, rename = "field")]
    pub fields: Vec<FieldPreset>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColliderPreset {
    #[serde(default)]
    pub center: [f32; 3],
    pub half_extents: [f32; 3],
    #[serde(default)]
    pub rotation_deg: [f32; 3],
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FieldPreset {
    pub kind: FieldKind,
    /// Physics layer bits; the kind's layer when absent.
    #[serde(default)]
    pub layer: Option<u32>,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation_deg: [f32; 3],
    /// Grid extent in units, `[width, height]`.
    pub grid: [u32; 2],
    /// Fills every slot with one type. Takes precedence over `slots`.
    #[serde(default)]
    pub slot: Option<ConnectionType>,
    #[serde(default)]
    pub slots: Vec<ConnectionType>,
    /// Gives every non-empty slot one aux part of this role.
    #[serde(default)]
    pub aux_role: Option<AuxRole>,
    #[serde(default)]
    pub aux: Vec<AuxPreset>,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuxPreset {
    pub slot: usize,
    pub handle: u32,
    pub role: AuxRole,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BrickInstance {
    pub name: String,
    #[serde(default)]
    pub position: [f32; 3],
    #[serde(default)]
    pub rotation_deg: [f32; 3],
    pub parts: Vec<String>,
}

impl FieldPreset {
    fn grid_size(&self) -> GridSize {
        GridSize::new(self.grid[0], self.grid[1])
    }

    fn slot_types(&self) -> Vec<ConnectionType> {
        match self.slot {
            Some(kind) => vec![kind; self.grid_size().slot_count()],
            None => self.slots.clone(),
        }
    }

    /// `next_handle` hands out handles for generated aux parts.
    fn desc(&self, next_handle: &mut u32) -> FieldDesc {
        let slots = self.slot_types();
        let mut desc = FieldDesc::new(
            self.kind,
            self.grid_size(),
            Pose::from_degrees(self.position, self.rotation_deg),
            slots.clone(),
        );
        if let Some(layer) = self.layer {
            desc.layer = layer;
        }
        if let Some(role) = self.aux_role {
            for (index, kind) in slots.iter().enumerate() {
                if kind.is_slot() {
                    desc = desc.with_aux(index, AuxPart::new(*next_handle, role));
                    *next_handle += 1;
                }
            }
        }
        for aux in &self.aux {
            desc = desc.with_aux(aux.slot, AuxPart::new(aux.handle, aux.role));
        }
        desc
    }
}

impl Scene {
    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let text = std::fs::read_to_string(path).map_err(|source| SceneError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn from_toml(text: &str) -> Result<Self, SceneError> {
        Ok(toml::from_str(text)?)
    }

    /// Check every preset and brick reference without touching a world.
    pub fn validate(&self) -> Result<(), SceneError> {
        let mut seen = HashSet::new();
        for preset in &self.presets {
            if !seen.insert(preset.name.as_str()) {
                return Err(SceneError::DuplicatePreset(preset.name.clone()));
            }
            for (i, field) in preset.fields.iter().enumerate() {
                let expected = field.grid_size().slot_count();
                let got = field.slot_types().len();
                if got != expected {
                    return Err(SceneError::SlotCount {
                        preset: preset.name.clone(),
                        field: i,
                        expected,
                        got,
                    });
                }
                if let Some(aux) = field.aux.iter().find(|a| a.slot >= expected) {
                    return Err(SceneError::AuxSlot {
                        preset: preset.name.clone(),
                        field: i,
                        slot: aux.slot,
                    });
                }
            }
        }
        for brick in &self.bricks {
            if let Some(missing) = brick.parts.iter().find(|p| !seen.contains(p.as_str())) {
                return Err(SceneError::UnknownPreset {
                    brick: brick.name.clone(),
                    preset: missing.clone(),
                });
            }
        }
        Ok(())
    }

    /// Add every brick of the scene to `world`, in file order. Nothing is
    /// added if the scene is invalid.
    pub fn build(&self, world: &mut BrickWorld) -> Result<Vec<BrickId>, SceneError> {
        self.validate()?;
        let presets: HashMap<&str, &PartPreset> = self.presets.iter().map(|p| (p.name.as_str(), p)).collect();

        let mut next_handle = 0;
        let mut created = Vec::with_capacity(self.bricks.len());
        for instance in &self.bricks {
            let brick = world.add_brick(instance.name.clone(), Pose::from_degrees(instance.position, instance.rotation_deg));
            for name in &instance.parts {
                let Some(preset) = presets.get(name.as_str()) else {
                    continue;
                };
                let colliders = preset
                    .colliders
                    .iter()
                    .map(|c| BoxCollider {
                        center: Vec3::from(c.center),
                        half_extents: Vec3::from(c.half_extents),
                        rotation: Pose::from_degrees([0.0; 3], c.rotation_deg).rotation,
                    })
                    .collect();
                let Some(part) = world.add_part(brick, Pose::IDENTITY, colliders) else {
                    continue;
                };
                for field in &preset.fields {
                    world.add_field(part, field.desc(&mut next_handle));
                }
            }
            created.push(brick);
        }
        log::debug!("built {} bricks from {} presets", created.len(), presets.len());
        Ok(created)
    }
}
