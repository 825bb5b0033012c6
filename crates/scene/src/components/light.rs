use foundation::math::Vec3;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct HemisphericLight {
    /// Direction towards the "sky" half.
    pub direction: Vec3,
    pub intensity: f64,
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DirectionalLight {
    pub direction: Vec3,
    pub intensity: f64,
}

impl DirectionalLight {
    /// Points the light from `eye` towards `target`. A degenerate pair leaves
    /// the direction unchanged.
    pub fn follow(&mut self, eye: Vec3, target: Vec3) {
        if let Some(dir) = (target - eye).normalize() {
            self.direction = dir;
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Lights {
    pub hemispheric: HemisphericLight,
    pub directional: DirectionalLight,
}

impl Default for Lights {
    fn default() -> Self {
        Self {
            hemispheric: HemisphericLight {
                direction: Vec3::new(5.0, 0.0, -5.0),
                intensity: 2.0,
            },
            directional: DirectionalLight {
                direction: Vec3::new(-1.0, -2.0, -1.0),
                intensity: 5.0,
            },
        }
    }
}
