use foundation::color::Rgb;
use foundation::math::Vec3;
use scene::camera::OrbitCamera;
use scene::components::{Lights, Transform};
use scene::primitives::{PrimitiveId, PrimitiveShape};
use scene::world::World;

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Camera3D {
    pub position: Vec3,
    pub target: Vec3,
    pub fov_y_rad: f64,
    pub near: f64,
    pub aspect: f64,
}

impl Camera3D {
    pub fn from_orbit(camera: &OrbitCamera) -> Self {
        Self {
            position: camera.eye_position(),
            target: camera.target,
            fov_y_rad: camera.fov_y_rad,
            near: camera.min_z,
            aspect: camera.aspect(),
        }
    }
}

/// One draw call, with every position already in world space.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCommand {
    Globe {
        transform: Transform,
        vertex_count: usize,
        triangle_count: usize,
    },
    Point {
        id: PrimitiveId,
        position: Vec3,
        size_px: f32,
        color: Rgb,
        alpha: f32,
    },
    Sphere {
        id: PrimitiveId,
        center: Vec3,
        diameter: f64,
        color: Rgb,
        alpha: f32,
    },
    Polyline {
        id: PrimitiveId,
        points: Vec<Vec3>,
        color: Rgb,
        alpha: f32,
    },
    Tube {
        id: PrimitiveId,
        points: Vec<Vec3>,
        radius: f64,
        color: Rgb,
        alpha: f32,
    },
}

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct FrameStats {
    pub globes: usize,
    pub markers: usize,
    pub arcs: usize,
}

#[derive(Debug)]
pub struct RenderFrame {
    pub camera: Camera3D,
    pub lights: Lights,
    pub commands: Vec<RenderCommand>,
}

impl RenderFrame {
    pub fn stats(&self) -> FrameStats {
        let mut stats = FrameStats::default();
        for cmd in &self.commands {
            match cmd {
                RenderCommand::Globe { .. } => stats.globes += 1,
                RenderCommand::Point { .. } | RenderCommand::Sphere { .. } => stats.markers += 1,
                RenderCommand::Polyline { .. } | RenderCommand::Tube { .. } => stats.arcs += 1,
            }
        }
        stats
    }
}

pub struct Renderer;

impl Renderer {
    /// Snapshot of the world for one frame: the globe first, then primitives
    /// in slot order.
    pub fn collect(world: &World) -> RenderFrame {
        let mut commands = Vec::with_capacity(world.primitive_count() + 1);

        if let Some(globe) = world.globe() {
            let node = world
                .node(globe.parent)
                .map(|n| n.transform)
                .unwrap_or_else(Transform::identity);
            commands.push(RenderCommand::Globe {
                transform: node.with_scale(node.scale * globe.scale),
                vertex_count: globe.model.vertices.len(),
                triangle_count: globe.model.triangles.len(),
            });
        }

        for (id, primitive) in world.primitives() {
            let to_world = |p: Vec3| match primitive.parent.and_then(|n| world.node(n)) {
                Some(node) => node.transform.to_parent(p),
                None => p,
            };
            let (color, alpha) = (primitive.color, primitive.alpha);
            let cmd = match &primitive.shape {
                PrimitiveShape::Point { size_px } => RenderCommand::Point {
                    id,
                    position: world.world_position(primitive),
                    size_px: *size_px,
                    color,
                    alpha,
                },
                PrimitiveShape::Sphere { diameter } => RenderCommand::Sphere {
                    id,
                    center: world.world_position(primitive),
                    diameter: *diameter,
                    color,
                    alpha,
                },
                PrimitiveShape::Polyline { points } => RenderCommand::Polyline {
                    id,
                    points: points.iter().map(|p| to_world(*p)).collect(),
                    color,
                    alpha,
                },
                PrimitiveShape::Tube { points, radius } => RenderCommand::Tube {
                    id,
                    points: points.iter().map(|p| to_world(*p)).collect(),
                    radius: *radius,
                    color,
                    alpha,
                },
            };
            commands.push(cmd);
        }

        RenderFrame {
            camera: Camera3D::from_orbit(&world.camera),
            lights: world.lights,
            commands,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{RenderCommand, Renderer};
    use foundation::color::Rgb;
    use foundation::math::Vec3;
    use scene::components::Transform;
    use scene::prefabs::globe::GlobeModel;
    use scene::primitives::{PrimitiveShape, PrimitiveSpec, SceneHandle};
    use scene::world::World;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-9, "expected {a} ~= {b}");
    }

    #[test]
    fn primitives_follow_their_parent() {
        let mut world = World::new();
        let parent = world.add_node(
            "earthParent",
            Transform::identity().with_rotation_y(std::f64::consts::PI),
        );
        let group = world.new_group();
        let id = world.create_primitive(PrimitiveSpec {
            name: "entity-a".into(),
            group,
            position: Vec3::new(1.0, 0.0, 0.0),
            shape: PrimitiveShape::Point { size_px: 4.0 },
            color: Rgb::WHITE,
            alpha: 1.0,
        });
        assert!(world.attach(id, parent));
        world.create_primitive(PrimitiveSpec {
            name: "connection-f".into(),
            group,
            position: Vec3::ZERO,
            shape: PrimitiveShape::Polyline {
                points: vec![Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 1.0, 0.0)],
            },
            color: Rgb::CYAN,
            alpha: 0.6,
        });

        let frame = Renderer::collect(&world);
        let stats = frame.stats();
        assert_eq!((stats.globes, stats.markers, stats.arcs), (0, 1, 1));
        let RenderCommand::Point { position, .. } = &frame.commands[0] else {
            panic!("expected a point first");
        };
        assert_close(position.x, -1.0);
        // Unparented polyline stays where it was built.
        let RenderCommand::Polyline { points, alpha, .. } = &frame.commands[1] else {
            panic!("expected a polyline");
        };
        assert_eq!(points[1], Vec3::new(0.0, 1.0, 0.0));
        assert_eq!(*alpha, 0.6);
    }

    #[test]
    fn globe_comes_first_with_combined_scale() {
        let mut world = World::new();
        let parent = world.add_node("earthParent", Transform::identity().with_scale(2.0));
        let model =
            GlobeModel::from_obj_str("earth", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n").expect("obj");
        world.set_globe(model, parent, 0.5);

        let frame = Renderer::collect(&world);
        let RenderCommand::Globe {
            transform,
            triangle_count,
            ..
        } = &frame.commands[0]
        else {
            panic!("expected the globe");
        };
        assert_close(transform.scale, 1.0);
        assert_eq!(*triangle_count, 1);
        assert_eq!(frame.stats().globes, 1);
    }
}
