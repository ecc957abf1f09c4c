use glam::{EulerRot, Quat, Vec3};

/// Rigid transform: rotate, then translate. Bricks, parts and fields each
/// carry one; a field's world pose is `brick * part * field`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Pose {
    pub translation: Vec3,
    pub rotation: Quat,
}

impl Default for Pose {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Pose {
    pub const IDENTITY: Self = Self {
        translation: Vec3::ZERO,
        rotation: Quat::IDENTITY,
    };

    pub fn new(translation: Vec3, rotation: Quat) -> Self {
        Self { translation, rotation }
    }

    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            rotation: Quat::IDENTITY,
        }
    }

    /// Build from a position and XYZ euler angles in degrees (scene files use this form).
    pub fn from_degrees(position: [f32; 3], rotation_deg: [f32; 3]) -> Self {
        let [rx, ry, rz] = rotation_deg;
        Self {
            translation: Vec3::from(position),
            rotation: Quat::from_euler(
                EulerRot::XYZ,
                rx.to_radians(),
                ry.to_radians(),
                rz.to_radians(),
            ),
        }
    }

    pub fn transform_point(&self, point: Vec3) -> Vec3 {
        self.rotation * point + self.translation
    }

    pub fn transform_vector(&self, vector: Vec3) -> Vec3 {
        self.rotation * vector
    }

    pub fn inverse(&self) -> Self {
        let rotation = self.rotation.inverse();
        Self {
            translation: -(rotation * self.translation),
            rotation,
        }
    }

    /// `self * child`: express a child pose (relative to `self`) in `self`'s parent space.
    pub fn compose(&self, child: &Pose) -> Pose {
        Pose {
            translation: self.transform_point(child.translation),
            rotation: (self.rotation * child.rotation).normalize(),
        }
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }

    pub fn right(&self) -> Vec3 {
        self.rotation * Vec3::X
    }

    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::Z
    }

    /// Rotate the whole pose about a world-space pivot, then shift it by `offset`.
    pub fn rotated_about(&self, pivot: Vec3, rotation: Quat, offset: Vec3) -> Pose {
        Pose {
            translation: pivot + rotation * (self.translation - pivot) + offset,
            rotation: (rotation * self.rotation).normalize(),
        }
    }
}

impl std::ops::Mul for Pose {
    type Output = Pose;

    fn mul(self, rhs: Pose) -> Pose {
        self.compose(&rhs)
    }
}
