//! Render primitives owned by the scene and the capability the builders use
//! to create and release them.

use foundation::color::Rgb;
use foundation::handles::Handle;
use foundation::math::{Vec2, Vec3};
use runtime::cancel::CancelToken;

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PrimitiveId(pub Handle);

impl PrimitiveId {
    pub fn index(&self) -> u32 {
        self.0.index()
    }
}

/// Tags every primitive produced by one build so it can be released at once.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GroupId(pub u32);

/// Transform node that primitives may be parented to.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone, PartialEq)]
pub enum PrimitiveShape {
    /// Constant screen-size point.
    Point { size_px: f32 },
    /// World-space sphere.
    Sphere { diameter: f64 },
    /// Points are relative to the primitive position.
    Polyline { points: Vec<Vec3> },
    /// Polyline swept with a circular cross-section.
    Tube { points: Vec<Vec3>, radius: f64 },
}

impl PrimitiveShape {
    pub fn is_marker(&self) -> bool {
        matches!(self, PrimitiveShape::Point { .. } | PrimitiveShape::Sphere { .. })
    }
}

/// Everything needed to create one primitive.
#[derive(Debug, Clone, PartialEq)]
pub struct PrimitiveSpec {
    pub name: String,
    pub group: GroupId,
    pub position: Vec3,
    pub shape: PrimitiveShape,
    pub color: Rgb,
    pub alpha: f32,
}

/// Scene capability required by the marker and arc builders.
///
/// `pick_point` returns the picked surface point in the frame of the globe's
/// parent node, which is the frame cached marker positions live in.
pub trait SceneHandle {
    fn new_group(&mut self) -> GroupId;
    fn create_primitive(&mut self, spec: PrimitiveSpec) -> PrimitiveId;
    fn attach(&mut self, id: PrimitiveId, parent: NodeId) -> bool;
    fn dispose(&mut self, id: PrimitiveId) -> bool;
    /// Releases every primitive of `group`, returning how many were live.
    fn dispose_group(&mut self, group: GroupId) -> usize;
    fn pick_point(&self, screen_px: Vec2) -> Option<Vec3>;
}

/// Owner's view of a running build: its primitive group and cancel flag.
#[derive(Debug, Clone)]
pub struct BuildHandle {
    pub group: GroupId,
    cancel: CancelToken,
}

impl BuildHandle {
    pub fn new(group: GroupId, cancel: CancelToken) -> Self {
        Self { group, cancel }
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancels the build and releases what it already created.
    pub fn dispose<S: SceneHandle + ?Sized>(&self, scene: &mut S) -> usize {
        self.cancel();
        scene.dispose_group(self.group)
    }
}
