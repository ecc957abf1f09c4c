//! R-tree broad phase over every field bound and brick collider.
//!
//! Entries are grouped per brick and replaced wholesale whenever that brick
//! moves or gains or loses parts and fields. Candidates come back by AABB;
//! callers run the oriented-box test on them.

use std::collections::HashMap;

use rstar::{RTree, RTreeObject, AABB};

use super::world::{BrickId, FieldId, PartId};
use crate::geometry::obb::Obb;

/// What an index entry stands for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum VolumeKey {
    Field(FieldId),
    /// Collider `n` of a part.
    Collider(PartId, usize),
}

#[derive(Clone, Debug, PartialEq)]
pub struct SceneVolume {
    pub key: VolumeKey,
    pub brick: BrickId,
    pub layer: u32,
    pub obb: Obb,
    bounds: AABB<[f32; 3]>,
}

impl SceneVolume {
    pub fn new(key: VolumeKey, brick: BrickId, layer: u32, obb: Obb) -> Self {
        Self {
            key,
            brick,
            layer,
            obb,
            bounds: envelope_of(&obb),
        }
    }
}

impl RTreeObject for SceneVolume {
    type Envelope = AABB<[f32; 3]>;
    fn envelope(&self) -> Self::Envelope {
        self.bounds
    }
}

fn envelope_of(obb: &Obb) -> AABB<[f32; 3]> {
    let (min, max) = obb.aabb();
    AABB::from_corners(min.to_array(), max.to_array())
}

pub struct SceneIndex {
    tree: RTree<SceneVolume>,
    by_brick: HashMap<BrickId, Vec<SceneVolume>>,
}

impl Default for SceneIndex {
    fn default() -> Self {
        Self {
            tree: RTree::new(),
            by_brick: HashMap::new(),
        }
    }
}

impl SceneIndex {
    /// Drop the brick's old entries and insert `volumes` in their place.
    pub fn replace_brick(&mut self, brick: BrickId, volumes: Vec<SceneVolume>) {
        self.remove_brick(brick);
        if volumes.is_empty() {
            return;
        }
        for volume in &volumes {
            self.tree.insert(volume.clone());
        }
        self.by_brick.insert(brick, volumes);
    }

    pub fn remove_brick(&mut self, brick: BrickId) {
        let Some(old) = self.by_brick.remove(&brick) else {
            return;
        };
        for volume in &old {
            if self.tree.remove(volume).is_none() {
                log::warn!("spatial index lost track of {:?}", volume.key);
            }
        }
    }

    /// Entries on layers in `mask` whose AABB touches the AABB of `obb`.
    pub fn candidates(&self, obb: &Obb, mask: u32) -> Vec<&SceneVolume> {
        let envelope = envelope_of(obb);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .filter(|v| v.layer & mask != 0)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}
