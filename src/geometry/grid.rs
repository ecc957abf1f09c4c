use glam::{IVec2, Vec3};
use serde::{Deserialize, Serialize};

/// Distance between neighbouring slots on every connection field.
pub const GRID_UNIT: f32 = 0.8;

/// Field grid dimensions in cells. A `width × height` grid has
/// `(width + 1) × (height + 1)` slot positions, one per grid vertex.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GridSize {
    pub width: u32,
    pub height: u32,
}

impl GridSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn slot_count(&self) -> usize {
        (self.width as usize + 1) * (self.height as usize + 1)
    }

    pub fn contains(&self, cell: IVec2) -> bool {
        cell.x >= 0 && cell.y >= 0 && cell.x <= self.width as i32 && cell.y <= self.height as i32
    }

    /// Slot index for a cell: `x + (width + 1) * z`. `None` outside `[0, width] × [0, height]`.
    pub fn index(&self, cell: IVec2) -> Option<usize> {
        if !self.contains(cell) {
            return None;
        }
        Some(cell.x as usize + (self.width as usize + 1) * cell.y as usize)
    }

    pub fn cell(&self, index: usize) -> Option<IVec2> {
        if index >= self.slot_count() {
            return None;
        }
        let row = self.width as usize + 1;
        Some(IVec2::new((index % row) as i32, (index / row) as i32))
    }

    /// Field-local corners of the slot lattice on the field plane (y = 0).
    /// Grid x runs along local -X, grid z along local +Z.
    pub fn local_corners(&self) -> [Vec3; 4] {
        let w = self.width as f32 * GRID_UNIT;
        let h = self.height as f32 * GRID_UNIT;
        [
            Vec3::ZERO,
            Vec3::new(-w, 0.0, 0.0),
            Vec3::new(-w, 0.0, h),
            Vec3::new(0.0, 0.0, h),
        ]
    }
}

/// Field-local position to the nearest grid cell. Not range checked.
pub fn local_to_grid(local: Vec3) -> IVec2 {
    IVec2::new(
        (-local.x / GRID_UNIT).round() as i32,
        (local.z / GRID_UNIT).round() as i32,
    )
}

/// Inverse of [`local_to_grid`] for exact lattice positions.
pub fn grid_to_local(cell: IVec2) -> Vec3 {
    Vec3::new(-(cell.x as f32) * GRID_UNIT, 0.0, cell.y as f32 * GRID_UNIT)
}
