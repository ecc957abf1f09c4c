//! Oriented bounding boxes and their overlap test.
//!
//! Uses the Separating Axis Theorem: two convex boxes are disjoint iff
//! their projections separate on one of the 15 candidate axes (three face
//! normals of each box plus the nine edge cross products).

use glam::{Quat, Vec3};

use super::pose::Pose;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Obb {
    pub center: Vec3,
    pub half_extents: Vec3,
    pub rotation: Quat,
}

impl Obb {
    pub fn new(center: Vec3, half_extents: Vec3, rotation: Quat) -> Self {
        Self {
            center,
            half_extents,
            rotation,
        }
    }

    /// Place a box given in some local frame into the frame's parent space.
    pub fn in_frame(frame: &Pose, local_center: Vec3, half_extents: Vec3, local_rotation: Quat) -> Self {
        Self {
            center: frame.transform_point(local_center),
            half_extents,
            rotation: (frame.rotation * local_rotation).normalize(),
        }
    }

    pub fn axes(&self) -> [Vec3; 3] {
        [
            self.rotation * Vec3::X,
            self.rotation * Vec3::Y,
            self.rotation * Vec3::Z,
        ]
    }

    /// World-axis-aligned box enclosing this one, as `(min, max)` corners.
    pub fn aabb(&self) -> (Vec3, Vec3) {
        let [ax, ay, az] = self.axes();
        let reach = ax.abs() * self.half_extents.x + ay.abs() * self.half_extents.y + az.abs() * self.half_extents.z;
        (self.center - reach, self.center + reach)
    }

    /// Same box with every half extent reduced by `epsilon` (clamped at zero).
    pub fn shrunk(&self, epsilon: f32) -> Self {
        Self {
            half_extents: (self.half_extents - Vec3::splat(epsilon)).max(Vec3::ZERO),
            ..*self
        }
    }

    fn project(&self, axis: Vec3) -> (f32, f32) {
        let [ax, ay, az] = self.axes();
        let center = self.center.dot(axis);
        let radius = self.half_extents.x * ax.dot(axis).abs()
            + self.half_extents.y * ay.dot(axis).abs()
            + self.half_extents.z * az.dot(axis).abs();
        (center - radius, center + radius)
    }

    /// True if the interiors of two boxes overlap.
    /// Touching (shared face, edge or corner) is NOT counted as overlap.
    pub fn intersects(&self, other: &Obb) -> bool {
        let a = self.axes();
        let b = other.axes();
        let mut axes = [Vec3::ZERO; 15];
        axes[..3].copy_from_slice(&a);
        axes[3..6].copy_from_slice(&b);
        for i in 0..3 {
            for j in 0..3 {
                axes[6 + i * 3 + j] = a[i].cross(b[j]);
            }
        }

        for axis in axes {
            // Parallel edges give a degenerate cross product; the face axes cover that case.
            if axis.length_squared() < 1e-8 {
                continue;
            }
            let axis = axis.normalize();
            let (min_a, max_a) = self.project(axis);
            let (min_b, max_b) = other.project(axis);
            if max_a <= min_b || max_b <= min_a {
                return false;
            }
        }
        true
    }
}
