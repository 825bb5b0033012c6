use foundation::math::precision::stable_total_cmp_f64;
use foundation::math::{Vec2, Vec3};

use crate::positions::PositionCache;

/// Default pick radius around a marker, in world units at unit-sphere scale.
pub const DEFAULT_PICK_THRESHOLD: f64 = 0.3;

/// Pointer travel (pixels) beyond which a press becomes a drag.
pub const DEFAULT_DRAG_THRESHOLD_PX: f64 = 5.0;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub dir: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, dir: Vec3) -> Self {
        Self { origin, dir }
    }

    pub fn at(&self, t: f64) -> Vec3 {
        self.origin + self.dir.scale(t)
    }
}

/// Distance along `ray` to the first intersection with the sphere, if any.
///
/// A ray starting inside the sphere reports the exit point. `ray.dir` need
/// not be normalized; `t` is in units of `ray.dir`.
pub fn ray_sphere_hit(ray: Ray, centre: Vec3, radius: f64) -> Option<f64> {
    let a = ray.dir.length_squared();
    if !(a > 0.0) || !(radius > 0.0) {
        return None;
    }
    let oc = ray.origin - centre;
    let half_b = oc.dot(ray.dir);
    let c = oc.length_squared() - radius * radius;
    let disc = half_b * half_b - a * c;
    if !(disc >= 0.0) {
        return None;
    }
    let sqrt_d = disc.sqrt();
    let near = (-half_b - sqrt_d) / a;
    if near >= 0.0 {
        return Some(near);
    }
    let far = (-half_b + sqrt_d) / a;
    (far >= 0.0).then_some(far)
}

#[derive(Debug, Clone, PartialEq)]
pub struct NearestHit {
    pub id: String,
    pub position: Vec3,
    pub distance: f64,
}

/// Closest cached candidate to `point`, if it is strictly within `threshold`.
///
/// Ordering contract:
/// - The smallest Euclidean distance wins.
/// - On equal distances the candidate listed first wins.
/// - Candidates missing from the cache are ignored.
pub fn select_nearest<'a, I>(
    point: Vec3,
    candidates: I,
    cache: &PositionCache,
    threshold: f64,
) -> Option<NearestHit>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best: Option<(f64, &'a str, Vec3)> = None;
    for id in candidates {
        let Some(position) = cache.get(id) else {
            continue;
        };
        let d = point.distance(position);
        let closer = match best {
            None => true,
            Some((bd, _, _)) => stable_total_cmp_f64(d, bd).is_lt(),
        };
        if closer {
            best = Some((d, id, position));
        }
    }

    let (distance, id, position) = best?;
    (distance < threshold).then(|| NearestHit {
        id: id.to_string(),
        position,
        distance,
    })
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum PointerPhase {
    Idle,
    PointerDown { at: Vec2 },
    Dragging,
}

/// Tells a click from a drag.
///
/// `Idle -> PointerDown -> {Dragging | click on release} -> Idle`. A press
/// turns into a drag once the pointer is more than `threshold_px` away from
/// where it went down; a drag never produces a click.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ClickTracker {
    threshold_px: f64,
    phase: PointerPhase,
    last: Vec2,
}

impl Default for ClickTracker {
    fn default() -> Self {
        Self::new(DEFAULT_DRAG_THRESHOLD_PX)
    }
}

impl ClickTracker {
    pub fn new(threshold_px: f64) -> Self {
        Self {
            threshold_px,
            phase: PointerPhase::Idle,
            last: Vec2::default(),
        }
    }

    pub fn phase(&self) -> PointerPhase {
        self.phase
    }

    pub fn pointer_down(&mut self, at: Vec2) {
        self.phase = PointerPhase::PointerDown { at };
        self.last = at;
    }

    /// Returns the movement since the previous pointer position while a
    /// button is held, `None` otherwise.
    pub fn pointer_move(&mut self, at: Vec2) -> Option<Vec2> {
        match self.phase {
            PointerPhase::Idle => None,
            PointerPhase::PointerDown { at: down } => {
                if (at - down).length() > self.threshold_px {
                    self.phase = PointerPhase::Dragging;
                }
                Some(self.advance(at))
            }
            PointerPhase::Dragging => Some(self.advance(at)),
        }
    }

    /// Returns the click position when the press never became a drag.
    pub fn pointer_up(&mut self, at: Vec2) -> Option<Vec2> {
        let phase = std::mem::replace(&mut self.phase, PointerPhase::Idle);
        match phase {
            PointerPhase::PointerDown { at: down } if (at - down).length() <= self.threshold_px => {
                Some(at)
            }
            _ => None,
        }
    }

    fn advance(&mut self, at: Vec2) -> Vec2 {
        let delta = at - self.last;
        self.last = at;
        delta
    }
}
