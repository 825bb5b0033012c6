//! Latitude/longitude to sphere-surface projection.
//!
//! Coordinates are Y-up: `+Y` is the north pole, the equator lies in the XZ
//! plane. Longitude is rotated by an orientation offset before projection so
//! that longitude 0 lines up with the texture seam of the globe model in use.

use super::Vec3;

/// Longitude offset matching the bundled earth model.
pub const DEFAULT_ORIENTATION_OFFSET_DEG: f64 = 180.0;

/// Geographic coordinates in degrees.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct GeoPoint {
    pub lat_deg: f64,
    pub lon_deg: f64,
}

impl GeoPoint {
    pub fn new(lat_deg: f64, lon_deg: f64) -> Self {
        Self { lat_deg, lon_deg }
    }

    pub fn is_finite(&self) -> bool {
        self.lat_deg.is_finite() && self.lon_deg.is_finite()
    }
}

/// Projects `(lat, lon)` onto a sphere of `radius`.
///
/// `phi` is the polar angle measured from the north pole and `theta` the
/// azimuth in the XZ plane. Non-finite input yields a non-finite position;
/// callers filter those before creating anything visible.
pub fn project(lat_deg: f64, lon_deg: f64, radius: f64, orientation_offset_deg: f64) -> Vec3 {
    let phi = (90.0 - lat_deg).to_radians();
    let theta = (lon_deg + orientation_offset_deg).to_radians();

    let (sin_phi, cos_phi) = phi.sin_cos();
    let (sin_theta, cos_theta) = theta.sin_cos();

    Vec3::new(
        radius * sin_phi * cos_theta,
        radius * cos_phi,
        radius * sin_phi * sin_theta,
    )
}

/// Inverse of [`project`]: recovers the geographic point for a position,
/// regardless of its distance from the origin.
pub fn unproject(position: Vec3, orientation_offset_deg: f64) -> Option<GeoPoint> {
    let unit = position.normalize()?;
    let lat_deg = 90.0 - unit.y.clamp(-1.0, 1.0).acos().to_degrees();
    let lon_deg = wrap_longitude(unit.z.atan2(unit.x).to_degrees() - orientation_offset_deg);
    Some(GeoPoint::new(lat_deg, lon_deg))
}

/// Wraps a longitude into `[-180, 180)`.
pub fn wrap_longitude(lon_deg: f64) -> f64 {
    (lon_deg + 180.0).rem_euclid(360.0) - 180.0
}

/// Sphere radius and calibration offset bundled together.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct SphereProjection {
    pub radius: f64,
    pub orientation_offset_deg: f64,
}

impl SphereProjection {
    pub fn new(radius: f64, orientation_offset_deg: f64) -> Self {
        Self {
            radius,
            orientation_offset_deg,
        }
    }

    pub fn project(&self, geo: GeoPoint) -> Vec3 {
        project(geo.lat_deg, geo.lon_deg, self.radius, self.orientation_offset_deg)
    }

    pub fn unproject(&self, position: Vec3) -> Option<GeoPoint> {
        unproject(position, self.orientation_offset_deg)
    }
}

impl Default for SphereProjection {
    fn default() -> Self {
        Self::new(1.0, DEFAULT_ORIENTATION_OFFSET_DEG)
    }
}
