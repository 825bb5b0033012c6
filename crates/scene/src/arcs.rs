//! Connection arcs between cached entity positions.
//!
//! Every path starts and ends exactly on its endpoints and never dips below
//! the shell interpolated between their radii, so an arc between two surface
//! points stays outside the globe.

use std::f64::consts::PI;
use std::marker::PhantomData;
use std::rc::Rc;

use foundation::color::Rgb;
use foundation::math::Vec3;
use runtime::cancel::CancelToken;
use runtime::progressive::{ItemOutcome, ProgressiveBuild, SliceWork};
use tracing::warn;

use crate::positions::PositionCache;
use crate::primitives::{
    BuildHandle, GroupId, NodeId, PrimitiveId, PrimitiveShape, PrimitiveSpec, SceneHandle,
};

pub const DEFAULT_ARC_COLOR: Rgb = Rgb::CYAN;
pub const DEFAULT_CONNECTION_BATCH: usize = 50;
pub const DEFAULT_ARC_SEGMENTS: usize = 30;

const LINE_ALPHA_MIN: f64 = 0.3;
const LINE_ALPHA_SPAN: f64 = 0.6;

#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionEdge {
    pub flow_id: String,
    pub from_id: String,
    pub to_id: String,
    pub step_type: String,
    pub color: Rgb,
    pub amount: f64,
}

impl ConnectionEdge {
    pub fn new(
        flow_id: impl Into<String>,
        from_id: impl Into<String>,
        to_id: impl Into<String>,
    ) -> Self {
        Self {
            flow_id: flow_id.into(),
            from_id: from_id.into(),
            to_id: to_id.into(),
            step_type: String::new(),
            color: DEFAULT_ARC_COLOR,
            amount: 1.0,
        }
    }

    pub fn with_amount(mut self, amount: f64) -> Self {
        self.amount = amount;
        self
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn with_step_type(mut self, step_type: impl Into<String>) -> Self {
        self.step_type = step_type.into();
        self
    }

    pub fn weight(&self, max_amount: f64) -> f64 {
        normalized_weight(self.amount, max_amount)
    }
}

/// `amount / max_amount` clamped to `[0, 1]`.
///
/// A non-positive or non-finite `max_amount` gives every connection full
/// weight; a NaN amount gives none.
pub fn normalized_weight(amount: f64, max_amount: f64) -> f64 {
    if !(max_amount > 0.0) || !max_amount.is_finite() {
        return 1.0;
    }
    if amount.is_nan() {
        return 0.0;
    }
    (amount / max_amount).clamp(0.0, 1.0)
}

/// Largest finite amount, or `0.0` when there is none.
pub fn max_amount(edges: &[ConnectionEdge]) -> f64 {
    edges
        .iter()
        .map(|e| e.amount)
        .filter(|a| a.is_finite())
        .fold(0.0, f64::max)
}

#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub enum ArcStyle {
    /// Thin lines; weight drives opacity.
    #[default]
    Lines,
    /// Tubes; weight drives radius.
    Tubes { min_radius: f64, max_radius: f64 },
}

impl ArcStyle {
    pub fn alpha(&self, weight: f64) -> f32 {
        match self {
            ArcStyle::Lines => (LINE_ALPHA_MIN + weight * LINE_ALPHA_SPAN) as f32,
            ArcStyle::Tubes { .. } => 1.0,
        }
    }

    fn shape(&self, points: Vec<Vec3>, weight: f64) -> PrimitiveShape {
        match *self {
            ArcStyle::Lines => PrimitiveShape::Polyline { points },
            ArcStyle::Tubes {
                min_radius,
                max_radius,
            } => PrimitiveShape::Tube {
                points,
                radius: min_radius + weight * (max_radius - min_radius),
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum CurveStrategy {
    /// Great-circle interpolation lifted by `height_ratio * chord * sin(pi t)`.
    Slerp { segments: usize, height_ratio: f64 },
    /// Quadratic Bezier whose control point sits `lift_ratio * chord` above
    /// the great-circle midpoint.
    Bezier { segments: usize, lift_ratio: f64 },
}

impl Default for CurveStrategy {
    fn default() -> Self {
        CurveStrategy::Slerp {
            segments: DEFAULT_ARC_SEGMENTS,
            height_ratio: 0.08,
        }
    }
}

/// Great-circle frame between two non-zero vectors.
struct ArcFrame {
    from_dir: Vec3,
    /// `axis x from_dir`, the in-plane direction towards `to`.
    toward: Vec3,
    angle: f64,
    from_radius: f64,
    to_radius: f64,
}

impl ArcFrame {
    fn new(from: Vec3, to: Vec3) -> Option<Self> {
        let from_dir = from.normalize()?;
        let to_dir = to.normalize()?;
        let angle = from_dir.dot(to_dir).clamp(-1.0, 1.0).acos();
        // Parallel or antipodal endpoints leave the plane open; pick a fixed one.
        let axis = match from_dir.cross(to_dir).normalize() {
            Some(axis) => axis,
            None => perpendicular(from_dir)?,
        };
        Some(Self {
            from_dir,
            toward: axis.cross(from_dir),
            angle,
            from_radius: from.length(),
            to_radius: to.length(),
        })
    }

    fn direction(&self, t: f64) -> Vec3 {
        let (s, c) = (self.angle * t).sin_cos();
        self.from_dir.scale(c) + self.toward.scale(s)
    }

    fn shell_radius(&self, t: f64) -> f64 {
        self.from_radius + (self.to_radius - self.from_radius) * t
    }
}

fn perpendicular(unit: Vec3) -> Option<Vec3> {
    unit.cross(Vec3::UNIT_Y)
        .normalize()
        .or_else(|| unit.cross(Vec3::UNIT_X).normalize())
}

/// Sample points of the arc from `from` to `to`, endpoints included.
///
/// `None` if either endpoint is non-finite or at the origin.
pub fn arc_path(from: Vec3, to: Vec3, curve: CurveStrategy) -> Option<Vec<Vec3>> {
    if !from.is_finite() || !to.is_finite() {
        return None;
    }
    let frame = ArcFrame::new(from, to)?;
    let chord = from.distance(to);

    let (segments, mut point_at): (usize, Box<dyn FnMut(f64) -> Vec3>) = match curve {
        CurveStrategy::Slerp {
            segments,
            height_ratio,
        } => {
            let boost = chord * height_ratio;
            (
                segments,
                Box::new(move |t| {
                    frame
                        .direction(t)
                        .scale(frame.shell_radius(t) + boost * (t * PI).sin())
                }),
            )
        }
        CurveStrategy::Bezier {
            segments,
            lift_ratio,
        } => {
            let mid_radius = frame.shell_radius(0.5) + chord * lift_ratio;
            let control = frame.direction(0.5).scale(mid_radius);
            (
                segments,
                Box::new(move |t| {
                    let u = 1.0 - t;
                    let p = from.scale(u * u) + control.scale(2.0 * u * t) + to.scale(t * t);
                    let shell = frame.shell_radius(t);
                    if p.length() >= shell {
                        p
                    } else {
                        let dir = p.normalize().unwrap_or_else(|| frame.direction(t));
                        dir.scale(shell)
                    }
                }),
            )
        }
    };

    let segments = segments.max(1);
    let mut points: Vec<Vec3> = (0..=segments)
        .map(|i| point_at(i as f64 / segments as f64))
        .collect();
    points[0] = from;
    points[segments] = to;
    Some(points)
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ArcOptions {
    pub style: ArcStyle,
    pub curve: CurveStrategy,
    pub batch_size: usize,
    pub parent: Option<NodeId>,
}

impl Default for ArcOptions {
    fn default() -> Self {
        Self {
            style: ArcStyle::default(),
            curve: CurveStrategy::default(),
            batch_size: DEFAULT_CONNECTION_BATCH,
            parent: None,
        }
    }
}

pub struct ConnectionWork<S> {
    edges: Vec<ConnectionEdge>,
    cache: Rc<PositionCache>,
    max_amount: f64,
    options: ArcOptions,
    group: GroupId,
    created: Vec<PrimitiveId>,
    _scene: PhantomData<fn(&mut S)>,
}

impl<S> ConnectionWork<S> {
    pub fn created(&self) -> &[PrimitiveId] {
        &self.created
    }

    pub fn cache(&self) -> &Rc<PositionCache> {
        &self.cache
    }
}

impl<S: SceneHandle> SliceWork for ConnectionWork<S> {
    type Context = S;

    fn len(&self) -> usize {
        self.edges.len()
    }

    fn process(&mut self, index: usize, scene: &mut S) -> ItemOutcome {
        let edge = &self.edges[index];
        let (Some(from), Some(to)) = (self.cache.get(&edge.from_id), self.cache.get(&edge.to_id))
        else {
            warn!(
                flow = %edge.flow_id,
                from = %edge.from_id,
                to = %edge.to_id,
                "connection endpoint not in position cache; skipping"
            );
            return ItemOutcome::Skipped;
        };
        let Some(points) = arc_path(from, to, self.options.curve) else {
            warn!(flow = %edge.flow_id, "degenerate connection endpoints; skipping");
            return ItemOutcome::Skipped;
        };

        let weight = edge.weight(self.max_amount);
        let id = scene.create_primitive(PrimitiveSpec {
            name: format!("connection-{}", edge.flow_id),
            group: self.group,
            position: Vec3::ZERO,
            shape: self.options.style.shape(points, weight),
            color: edge.color,
            alpha: self.options.style.alpha(weight),
        });
        if let Some(parent) = self.options.parent {
            scene.attach(id, parent);
        }
        self.created.push(id);
        ItemOutcome::Built
    }
}

pub struct ConnectionBuild<S> {
    pub task: ProgressiveBuild<ConnectionWork<S>>,
    pub handle: BuildHandle,
}

/// Prepares the arc build for `edges` against a finished cache snapshot.
pub fn build_connections<S: SceneHandle>(
    edges: &[ConnectionEdge],
    cache: Rc<PositionCache>,
    max_amount: f64,
    scene: &mut S,
    options: &ArcOptions,
) -> ConnectionBuild<S> {
    let group = scene.new_group();
    let cancel = CancelToken::new();
    let work = ConnectionWork {
        edges: edges.to_vec(),
        cache,
        max_amount,
        options: *options,
        group,
        created: Vec::new(),
        _scene: PhantomData,
    };
    let task = ProgressiveBuild::with_cancel_token(
        "connections",
        work,
        options.batch_size,
        cancel.clone(),
    );
    ConnectionBuild {
        task,
        handle: BuildHandle::new(group, cancel),
    }
}
