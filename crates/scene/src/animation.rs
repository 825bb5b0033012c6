use std::f64::consts::TAU;

use foundation::time::Time;

pub const DEFAULT_ROTATION_PERIOD_S: f64 = 60.0;
pub const DEFAULT_RESUME_AFTER_S: f64 = 5.0;

/// Constant spin of the globe parent about +Y that pauses while the user
/// moves the camera and resumes a fixed delay after the last interaction.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct RotationAnimation {
    period_s: f64,
    resume_after_s: f64,
    angle_rad: f64,
    resume_at: Option<Time>,
}

impl Default for RotationAnimation {
    fn default() -> Self {
        Self::new(DEFAULT_ROTATION_PERIOD_S, DEFAULT_RESUME_AFTER_S)
    }
}

impl RotationAnimation {
    /// A non-positive period disables the spin.
    pub fn new(period_s: f64, resume_after_s: f64) -> Self {
        Self {
            period_s,
            resume_after_s: resume_after_s.max(0.0),
            angle_rad: 0.0,
            resume_at: None,
        }
    }

    pub fn angle_rad(&self) -> f64 {
        self.angle_rad
    }

    pub fn is_paused(&self) -> bool {
        self.resume_at.is_some()
    }

    /// Pauses the spin; each call pushes the resume time back.
    pub fn interrupt(&mut self, now: Time) {
        self.resume_at = Some(now.after(self.resume_after_s));
    }

    /// Advances to `now`, `dt_s` seconds after the previous frame, and
    /// returns the new angle in `[0, 2pi)`.
    pub fn advance(&mut self, now: Time, dt_s: f64) -> f64 {
        let mut spin_s = dt_s.max(0.0);
        if let Some(resume_at) = self.resume_at {
            if now < resume_at {
                return self.angle_rad;
            }
            // Only the part of the frame after the resume point counts.
            spin_s = spin_s.min(now.since(resume_at));
            self.resume_at = None;
        }
        if self.period_s > 0.0 && spin_s.is_finite() {
            self.angle_rad = (self.angle_rad + TAU * spin_s / self.period_s).rem_euclid(TAU);
        }
        self.angle_rad
    }
}
