use foundation::color::Rgb;
use foundation::handles::Handle;
use foundation::math::{Vec2, Vec3};

use crate::camera::OrbitCamera;
use crate::components::{Lights, Transform};
use crate::picking::ray_sphere_hit;
use crate::prefabs::globe::GlobeModel;
use crate::primitives::{GroupId, NodeId, PrimitiveId, PrimitiveShape, PrimitiveSpec, SceneHandle};

#[derive(Debug, Clone, PartialEq)]
pub struct Primitive {
    pub name: String,
    pub group: GroupId,
    pub parent: Option<NodeId>,
    /// Local to `parent` when set, world space otherwise.
    pub position: Vec3,
    pub shape: PrimitiveShape,
    pub color: Rgb,
    pub alpha: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub name: String,
    pub transform: Transform,
}

#[derive(Debug, Clone)]
pub struct GlobeSlot {
    pub model: GlobeModel,
    pub parent: NodeId,
    pub scale: f64,
}

/// Pick target: a sphere centred on a node's origin.
#[derive(Debug, Copy, Clone, PartialEq)]
struct PickSphere {
    node: NodeId,
    radius: f64,
}

/// In-memory scene: primitives in generational slots, a flat list of
/// transform nodes, the camera, lights and the optional globe mesh.
#[derive(Debug, Default)]
pub struct World {
    generations: Vec<u32>,
    primitives: Vec<Option<Primitive>>,
    free: Vec<u32>,
    live: usize,
    next_group: u32,
    nodes: Vec<Node>,
    pub camera: OrbitCamera,
    pub lights: Lights,
    globe: Option<GlobeSlot>,
    pick_sphere: Option<PickSphere>,
}

impl World {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_node(&mut self, name: impl Into<String>, transform: Transform) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            name: name.into(),
            transform,
        });
        id
    }

    pub fn node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(id.0 as usize)
    }

    pub fn node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(id.0 as usize)
    }

    /// Makes `pick_point` intersect a sphere of `radius` around `node`.
    pub fn set_pick_sphere(&mut self, node: NodeId, radius: f64) {
        self.pick_sphere = Some(PickSphere { node, radius });
    }

    pub fn set_globe(&mut self, model: GlobeModel, parent: NodeId, scale: f64) {
        self.globe = Some(GlobeSlot {
            model,
            parent,
            scale,
        });
    }

    pub fn globe(&self) -> Option<&GlobeSlot> {
        self.globe.as_ref()
    }

    pub fn clear_globe(&mut self) -> bool {
        self.globe.take().is_some()
    }

    pub fn primitive(&self, id: PrimitiveId) -> Option<&Primitive> {
        let idx = id.index() as usize;
        if self.generations.get(idx) != Some(&id.0.generation()) {
            return None;
        }
        self.primitives.get(idx).and_then(|p| p.as_ref())
    }

    /// Live primitives in slot order.
    pub fn primitives(&self) -> impl Iterator<Item = (PrimitiveId, &Primitive)> + '_ {
        self.primitives.iter().enumerate().filter_map(|(idx, p)| {
            let p = p.as_ref()?;
            let id = PrimitiveId(Handle::new(idx as u32, self.generations[idx]));
            Some((id, p))
        })
    }

    pub fn primitive_count(&self) -> usize {
        self.live
    }

    pub fn group_len(&self, group: GroupId) -> usize {
        self.primitives().filter(|(_, p)| p.group == group).count()
    }

    /// Position of `primitive` in world space, following its parent node.
    pub fn world_position(&self, primitive: &Primitive) -> Vec3 {
        match primitive.parent.and_then(|n| self.node(n)) {
            Some(node) => node.transform.to_parent(primitive.position),
            None => primitive.position,
        }
    }

    /// Releases every primitive.
    pub fn clear(&mut self) -> usize {
        let ids: Vec<PrimitiveId> = self.primitives().map(|(id, _)| id).collect();
        ids.into_iter().filter(|id| self.dispose(*id)).count()
    }

    fn alloc_slot(&mut self) -> u32 {
        if let Some(idx) = self.free.pop() {
            return idx;
        }
        let idx = self.primitives.len() as u32;
        self.primitives.push(None);
        self.generations.push(0);
        idx
    }
}

impl SceneHandle for World {
    fn new_group(&mut self) -> GroupId {
        let g = GroupId(self.next_group);
        self.next_group = self.next_group.wrapping_add(1);
        g
    }

    fn create_primitive(&mut self, spec: PrimitiveSpec) -> PrimitiveId {
        let idx = self.alloc_slot();
        self.primitives[idx as usize] = Some(Primitive {
            name: spec.name,
            group: spec.group,
            parent: None,
            position: spec.position,
            shape: spec.shape,
            color: spec.color,
            alpha: spec.alpha,
        });
        self.live += 1;
        PrimitiveId(Handle::new(idx, self.generations[idx as usize]))
    }

    fn attach(&mut self, id: PrimitiveId, parent: NodeId) -> bool {
        if self.node(parent).is_none() || self.primitive(id).is_none() {
            return false;
        }
        match self.primitives[id.index() as usize].as_mut() {
            Some(p) => {
                p.parent = Some(parent);
                true
            }
            None => false,
        }
    }

    fn dispose(&mut self, id: PrimitiveId) -> bool {
        if self.primitive(id).is_none() {
            return false;
        }
        let idx = id.index() as usize;
        self.primitives[idx] = None;
        self.generations[idx] = self.generations[idx].wrapping_add(1);
        self.free.push(idx as u32);
        self.live -= 1;
        true
    }

    fn dispose_group(&mut self, group: GroupId) -> usize {
        let ids: Vec<PrimitiveId> = self
            .primitives()
            .filter(|(_, p)| p.group == group)
            .map(|(id, _)| id)
            .collect();
        ids.into_iter().filter(|id| self.dispose(*id)).count()
    }

    fn pick_point(&self, screen_px: Vec2) -> Option<Vec3> {
        let sphere = self.pick_sphere?;
        let node = self.node(sphere.node)?;
        let ray = self.camera.ray_from_screen(screen_px)?;
        let radius = sphere.radius * node.transform.scale;
        let t = ray_sphere_hit(ray, node.transform.position, radius)?;
        node.transform.to_local(ray.at(t))
    }
}

#[cfg(test)]
mod tests {
    use super::World;
    use crate::components::Transform;
    use crate::primitives::{GroupId, PrimitiveShape, PrimitiveSpec, SceneHandle};
    use foundation::color::Rgb;
    use foundation::math::{Vec2, Vec3};

    fn point(group: GroupId, x: f64) -> PrimitiveSpec {
        PrimitiveSpec {
            name: format!("p{x}"),
            group,
            position: Vec3::new(x, 0.0, 0.0),
            shape: PrimitiveShape::Point { size_px: 3.0 },
            color: Rgb::WHITE,
            alpha: 1.0,
        }
    }

    #[test]
    fn disposed_handles_do_not_alias_recycled_slots() {
        let mut world = World::new();
        let g = world.new_group();
        let a = world.create_primitive(point(g, 1.0));
        assert!(world.dispose(a));
        assert!(!world.dispose(a));

        let b = world.create_primitive(point(g, 2.0));
        assert_eq!(a.index(), b.index());
        assert_ne!(a, b);
        assert!(world.primitive(a).is_none());
        assert_eq!(world.primitive(b).map(|p| p.position.x), Some(2.0));
        assert_eq!(world.primitive_count(), 1);
    }

    #[test]
    fn dispose_group_only_touches_that_group() {
        let mut world = World::new();
        let g1 = world.new_group();
        let g2 = world.new_group();
        for i in 0..3 {
            world.create_primitive(point(g1, i as f64));
        }
        let keep = world.create_primitive(point(g2, 9.0));

        assert_eq!(world.dispose_group(g1), 3);
        assert_eq!(world.primitive_count(), 1);
        assert!(world.primitive(keep).is_some());
        assert_eq!(world.dispose_group(g1), 0);
        assert_eq!(world.clear(), 1);
    }

    #[test]
    fn attached_primitives_follow_their_parent() {
        let mut world = World::new();
        let parent = world.add_node(
            "globe",
            Transform::identity().with_rotation_y(std::f64::consts::PI),
        );
        let g = world.new_group();
        let id = world.create_primitive(point(g, 1.0));
        assert!(world.attach(id, parent));

        let p = world.primitive(id).expect("live").clone();
        let wp = world.world_position(&p);
        assert!((wp.x + 1.0).abs() < 1e-12);
    }

    #[test]
    fn pick_point_is_reported_in_parent_frame() {
        let mut world = World::new();
        world.camera.set_viewport(800.0, 600.0);
        let parent = world.add_node("globe", Transform::identity());
        world.set_pick_sphere(parent, 1.0);

        let centre = Vec2::new(400.0, 300.0);
        let still = world.pick_point(centre).expect("hit");
        assert!((still.length() - 1.0).abs() < 1e-9);

        let angle = 0.7;
        world
            .node_mut(parent)
            .expect("node")
            .transform
            .rotation_y_rad = angle;
        let spun = world.pick_point(centre).expect("hit");
        // Same screen pixel, so the local point is the world point un-rotated.
        let expected = still.rotate_y(-angle);
        assert!(spun.distance(expected) < 1e-9);

        assert!(world.pick_point(Vec2::new(0.0, 0.0)).is_none());
    }
}
