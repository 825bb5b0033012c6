//! Orbit camera around the globe centre.
//!
//! Angles follow the usual arc-rotate convention: `alpha` is the azimuth in
//! the XZ plane and `beta` the polar angle from +Y. Input handlers report
//! whether the view changed so the owner can pause the globe spin.

use foundation::math::{Vec2, Vec3};

use crate::picking::Ray;

const BETA_EPSILON: f64 = 0.01;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct OrbitCamera {
    pub alpha: f64,
    pub beta: f64,
    pub radius: f64,
    pub target: Vec3,
    pub lower_radius_limit: f64,
    pub upper_radius_limit: f64,
    pub fov_y_rad: f64,
    /// Near clip distance.
    pub min_z: f64,
    /// Pixels of drag per radian of rotation.
    pub angular_sensitivity: f64,
    /// Wheel units per world unit of zoom.
    pub wheel_precision: f64,
    viewport: Vec2,
}

impl Default for OrbitCamera {
    fn default() -> Self {
        Self {
            alpha: -std::f64::consts::FRAC_PI_2,
            beta: std::f64::consts::FRAC_PI_4,
            radius: 5.0,
            target: Vec3::ZERO,
            lower_radius_limit: 1.1,
            upper_radius_limit: 5.0,
            fov_y_rad: 0.8,
            min_z: 0.01,
            angular_sensitivity: 1000.0,
            wheel_precision: 50.0,
            viewport: Vec2::new(1280.0, 720.0),
        }
    }
}

impl OrbitCamera {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_viewport(&mut self, width_px: f64, height_px: f64) {
        self.viewport = Vec2::new(width_px.max(1.0), height_px.max(1.0));
    }

    pub fn viewport(&self) -> Vec2 {
        self.viewport
    }

    pub fn aspect(&self) -> f64 {
        self.viewport.x / self.viewport.y
    }

    pub fn eye_position(&self) -> Vec3 {
        let (sa, ca) = self.alpha.sin_cos();
        let (sb, cb) = self.beta.sin_cos();
        self.target + Vec3::new(ca * sb, cb, sa * sb).scale(self.radius)
    }

    pub fn forward(&self) -> Vec3 {
        (self.target - self.eye_position())
            .normalize()
            .unwrap_or(Vec3::new(0.0, 0.0, 1.0))
    }

    /// Rotates the camera by a pointer drag of `delta_px`.
    pub fn orbit(&mut self, delta_px: Vec2) -> bool {
        if delta_px == Vec2::default() || !(self.angular_sensitivity > 0.0) {
            return false;
        }
        self.alpha -= delta_px.x / self.angular_sensitivity;
        self.beta = (self.beta - delta_px.y / self.angular_sensitivity)
            .clamp(BETA_EPSILON, std::f64::consts::PI - BETA_EPSILON);
        true
    }

    /// Positive `wheel_delta` zooms in. The radius stays within its limits.
    pub fn zoom(&mut self, wheel_delta: f64) -> bool {
        if !wheel_delta.is_finite() || !(self.wheel_precision > 0.0) {
            return false;
        }
        let before = self.radius;
        self.radius = (self.radius - wheel_delta / self.wheel_precision)
            .clamp(self.lower_radius_limit, self.upper_radius_limit);
        self.radius != before
    }

    /// Camera basis `(forward, right, up)`.
    fn basis(&self) -> Option<(Vec3, Vec3, Vec3)> {
        let forward = (self.target - self.eye_position()).normalize()?;
        let right = forward.cross(Vec3::UNIT_Y).normalize()?;
        let up = right.cross(forward);
        Some((forward, right, up))
    }

    /// World-space ray through the pixel `screen_px` (origin top-left).
    pub fn ray_from_screen(&self, screen_px: Vec2) -> Option<Ray> {
        let (forward, right, up) = self.basis()?;
        let ndc_x = 2.0 * screen_px.x / self.viewport.x - 1.0;
        let ndc_y = 1.0 - 2.0 * screen_px.y / self.viewport.y;
        let tan_half = (self.fov_y_rad * 0.5).tan();

        let dir = forward
            + right.scale(ndc_x * tan_half * self.aspect())
            + up.scale(ndc_y * tan_half);
        Some(Ray::new(self.eye_position(), dir.normalize()?))
    }

    /// Pixel position of a world-space point, `None` behind the near plane.
    pub fn project_to_screen(&self, world: Vec3) -> Option<Vec2> {
        let (forward, right, up) = self.basis()?;
        let d = world - self.eye_position();
        let depth = d.dot(forward);
        if depth <= self.min_z {
            return None;
        }
        let tan_half = (self.fov_y_rad * 0.5).tan();
        let ndc_x = d.dot(right) / (depth * tan_half * self.aspect());
        let ndc_y = d.dot(up) / (depth * tan_half);
        Some(Vec2::new(
            (ndc_x + 1.0) * 0.5 * self.viewport.x,
            (1.0 - ndc_y) * 0.5 * self.viewport.y,
        ))
    }
}
