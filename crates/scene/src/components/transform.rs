use foundation::math::Vec3;

/// Translation, uniform scale and a rotation about +Y.
///
/// The globe parent only ever spins about its polar axis, so a full rotation
/// is not needed.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Transform {
    pub position: Vec3,
    pub rotation_y_rad: f64,
    pub scale: f64,
}

impl Transform {
    pub fn identity() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation_y_rad: 0.0,
            scale: 1.0,
        }
    }

    pub fn translate(position: Vec3) -> Self {
        Self {
            position,
            ..Self::identity()
        }
    }

    pub fn with_rotation_y(mut self, angle_rad: f64) -> Self {
        self.rotation_y_rad = angle_rad;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Maps a point from this node's local frame into its parent frame.
    pub fn to_parent(&self, local: Vec3) -> Vec3 {
        self.position + local.scale(self.scale).rotate_y(self.rotation_y_rad)
    }

    /// Inverse of [`Transform::to_parent`]. `None` for a degenerate scale.
    pub fn to_local(&self, parent: Vec3) -> Option<Vec3> {
        if self.scale == 0.0 || !self.scale.is_finite() {
            return None;
        }
        Some(
            (parent - self.position)
                .rotate_y(-self.rotation_y_rad)
                .scale(1.0 / self.scale),
        )
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self::identity()
    }
}
