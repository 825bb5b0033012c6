//! Scene session: the single owner of the world, camera, globe parent node and
//! the builds that populate them.
//!
//! Lifecycle is an explicit `create()` / `dispose()` pair. Entity and
//! connection sets are replaced wholesale; each replacement cancels the
//! in-flight build for that slot and releases its primitives before the new
//! build is queued.

use std::rc::Rc;

use foundation::math::{SphereProjection, Vec2};
use runtime::budget::FrameBudget;
use runtime::event_bus::{BuildEvent, EventBus};
use runtime::frame::Frame;
use runtime::pump::{FramePump, PumpSummary};
use tracing::{debug, error, info};

use crate::World;
use crate::animation::{DEFAULT_RESUME_AFTER_S, DEFAULT_ROTATION_PERIOD_S, RotationAnimation};
use crate::arcs::{ArcOptions, ConnectionEdge, build_connections, max_amount};
use crate::camera::OrbitCamera;
use crate::components::Transform;
use crate::markers::{MarkerEntity, MarkerOptions, build_markers};
use crate::picking::{
    ClickTracker, DEFAULT_DRAG_THRESHOLD_PX, DEFAULT_PICK_THRESHOLD, NearestHit, select_nearest,
};
use crate::positions::PositionCache;
use crate::prefabs::globe::{GlobeLoadError, GlobeModel};
use crate::primitives::{BuildHandle, NodeId, SceneHandle};

pub const MARKER_SLOT: &str = "markers";
pub const CONNECTION_SLOT: &str = "connections";

const MARKER_PRIORITY: i32 = 0;
const CONNECTION_PRIORITY: i32 = 1;

#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub projection: SphereProjection,
    /// Uniform scale applied to the loaded globe mesh.
    pub apply_scale: f64,
    pub markers: MarkerOptions,
    pub arcs: ArcOptions,
    /// Normalization reference for arc weights; the largest amount when unset.
    pub max_connection_amount: Option<f64>,
    pub pick_threshold: f64,
    pub drag_threshold_px: f64,
    pub rotation_period_s: f64,
    pub resume_after_s: f64,
    pub viewport_px: Vec2,
    /// Caps build slices per frame across all slots.
    pub slices_per_frame: Option<u32>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            projection: SphereProjection::default(),
            apply_scale: 1.0,
            markers: MarkerOptions::default(),
            arcs: ArcOptions::default(),
            max_connection_amount: None,
            pick_threshold: DEFAULT_PICK_THRESHOLD,
            drag_threshold_px: DEFAULT_DRAG_THRESHOLD_PX,
            rotation_period_s: DEFAULT_ROTATION_PERIOD_S,
            resume_after_s: DEFAULT_RESUME_AFTER_S,
            viewport_px: Vec2::new(1280.0, 720.0),
            slices_per_frame: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SessionError {
    InvalidValue { field: &'static str, value: f64 },
    ZeroBatchSize { field: &'static str },
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidValue { field, value } => {
                write!(f, "invalid scene setting {field}: {value}")
            }
            SessionError::ZeroBatchSize { field } => {
                write!(f, "scene setting {field} must be at least 1")
            }
        }
    }
}

impl std::error::Error for SessionError {}

impl SessionConfig {
    pub fn validate(&self) -> Result<(), SessionError> {
        let positive = |field: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(SessionError::InvalidValue { field, value })
            }
        };
        positive("radius", self.projection.radius)?;
        positive("apply_scale", self.apply_scale)?;
        positive("pick_threshold", self.pick_threshold)?;
        if let Some(max) = self.max_connection_amount {
            positive("max_connection_amount", max)?;
        }
        let offset = self.projection.orientation_offset_deg;
        if !offset.is_finite() {
            return Err(SessionError::InvalidValue {
                field: "orientation_offset_deg",
                value: offset,
            });
        }
        if !(self.drag_threshold_px >= 0.0) || !self.drag_threshold_px.is_finite() {
            return Err(SessionError::InvalidValue {
                field: "drag_threshold_px",
                value: self.drag_threshold_px,
            });
        }
        if self.markers.batch_size == 0 {
            return Err(SessionError::ZeroBatchSize {
                field: "marker_batch_size",
            });
        }
        if self.arcs.batch_size == 0 {
            return Err(SessionError::ZeroBatchSize {
                field: "connection_batch_size",
            });
        }
        Ok(())
    }
}

/// Outcome of a confirmed click that hit the globe.
#[derive(Debug, Clone, PartialEq)]
pub enum SelectionChange {
    Selected(NearestHit),
    Cleared,
}

pub struct SceneSession {
    config: SessionConfig,
    world: World,
    parent: NodeId,
    pump: FramePump<World>,
    bus: EventBus,
    frame: Frame,
    cache: Rc<PositionCache>,
    cache_version: u64,
    entities: Vec<MarkerEntity>,
    connections: Vec<ConnectionEdge>,
    markers: Option<BuildHandle>,
    arcs: Option<BuildHandle>,
    rotation: RotationAnimation,
    clicks: ClickTracker,
    selected: Option<NearestHit>,
}

impl SceneSession {
    pub fn create(config: SessionConfig) -> Result<Self, SessionError> {
        config.validate()?;

        let mut world = World::new();
        world
            .camera
            .set_viewport(config.viewport_px.x, config.viewport_px.y);
        let parent = world.add_node("earthParent", Transform::identity());
        world.set_pick_sphere(parent, config.projection.radius);
        let eye = world.camera.eye_position();
        let target = world.camera.target;
        world.lights.directional.follow(eye, target);

        info!(
            radius = config.projection.radius,
            offset_deg = config.projection.orientation_offset_deg,
            "scene session created"
        );

        Ok(Self {
            rotation: RotationAnimation::new(config.rotation_period_s, config.resume_after_s),
            clicks: ClickTracker::new(config.drag_threshold_px),
            config,
            world,
            parent,
            pump: FramePump::new(),
            bus: EventBus::new(),
            frame: Frame::first(),
            cache: Rc::new(PositionCache::empty()),
            cache_version: 0,
            entities: Vec::new(),
            connections: Vec::new(),
            markers: None,
            arcs: None,
            selected: None,
        })
    }

    /// Attaches the loaded globe mesh. A failed load is reported and the
    /// session carries on without a globe.
    pub fn attach_globe(&mut self, model: Result<GlobeModel, GlobeLoadError>) -> bool {
        match model {
            Ok(model) => {
                info!(
                    name = %model.name,
                    triangles = model.triangles.len(),
                    "globe model attached"
                );
                self.world
                    .set_globe(model, self.parent, self.config.apply_scale);
                true
            }
            Err(e) => {
                error!(error = %e, "failed to load globe model; continuing without it");
                false
            }
        }
    }

    /// Replaces the visible entity set and rebuilds markers, the position
    /// cache, and then the current connections against the new cache.
    pub fn set_entities(&mut self, entities: Vec<MarkerEntity>) {
        if let Some(old) = self.markers.take() {
            let released = old.dispose(&mut self.world);
            debug!(released, "released previous markers");
        }

        self.cache_version += 1;
        let options = MarkerOptions {
            parent: Some(self.parent),
            ..self.config.markers
        };
        let build = build_markers(
            &entities,
            self.config.projection,
            self.cache_version,
            &mut self.world,
            &options,
        );
        self.cache = build.cache;
        self.pump
            .submit(MARKER_SLOT, MARKER_PRIORITY, Box::new(build.task));
        self.markers = Some(build.handle);
        self.entities = entities;

        if let Some(sel) = &self.selected
            && !self.cache.contains(&sel.id)
        {
            debug!(id = %sel.id, "selected entity left the visible set");
            self.selected = None;
        }

        info!(
            entities = self.entities.len(),
            cached = self.cache.len(),
            version = self.cache_version,
            "entity set replaced"
        );
        self.rebuild_connections();
    }

    pub fn set_connections(&mut self, connections: Vec<ConnectionEdge>) {
        self.connections = connections;
        self.rebuild_connections();
    }

    fn rebuild_connections(&mut self) {
        if let Some(old) = self.arcs.take() {
            let released = old.dispose(&mut self.world);
            debug!(released, "released previous connections");
        }
        if self.connections.is_empty() {
            self.pump.cancel_slot(CONNECTION_SLOT);
            return;
        }

        let max = self
            .config
            .max_connection_amount
            .unwrap_or_else(|| max_amount(&self.connections));
        let options = ArcOptions {
            parent: Some(self.parent),
            ..self.config.arcs
        };
        let build = build_connections(
            &self.connections,
            Rc::clone(&self.cache),
            max,
            &mut self.world,
            &options,
        );
        self.pump
            .submit(CONNECTION_SLOT, CONNECTION_PRIORITY, Box::new(build.task));
        self.arcs = Some(build.handle);
        debug!(
            connections = self.connections.len(),
            max_amount = max,
            cache_version = self.cache.version(),
            "connection build queued"
        );
    }

    /// Advances animation by `dt_s` and runs one frame of pending builds.
    pub fn advance_frame(&mut self, dt_s: f64) -> PumpSummary {
        self.frame = self.frame.next(dt_s);
        let angle = self.rotation.advance(self.frame.time, self.frame.dt_s);
        if let Some(node) = self.world.node_mut(self.parent) {
            node.transform.rotation_y_rad = angle;
        }
        let eye = self.world.camera.eye_position();
        let target = self.world.camera.target;
        self.world.lights.directional.follow(eye, target);

        let mut budget = match self.config.slices_per_frame {
            Some(n) => FrameBudget::slices(n),
            None => FrameBudget::unlimited(),
        };
        self.pump
            .pump_frame_with_budget(&mut self.world, self.frame, &mut self.bus, &mut budget)
    }

    pub fn pointer_down(&mut self, at: Vec2) {
        self.clicks.pointer_down(at);
    }

    /// Held-button movement orbits the camera and pauses the globe spin.
    pub fn pointer_move(&mut self, at: Vec2) {
        if let Some(delta) = self.clicks.pointer_move(at)
            && self.world.camera.orbit(delta)
        {
            self.rotation.interrupt(self.frame.time);
        }
    }

    /// Returns a selection change for a confirmed click that hit the globe.
    pub fn pointer_up(&mut self, at: Vec2) -> Option<SelectionChange> {
        let click = self.clicks.pointer_up(at)?;
        self.pick(click)
    }

    pub fn wheel(&mut self, delta: f64) {
        if self.world.camera.zoom(delta) {
            self.rotation.interrupt(self.frame.time);
        }
    }

    /// Picks at `screen_px`. A miss of the globe changes nothing; a hit
    /// selects the nearest entity or clears the selection.
    pub fn pick(&mut self, screen_px: Vec2) -> Option<SelectionChange> {
        let point = self.world.pick_point(screen_px)?;
        let hit = select_nearest(
            point,
            self.entities.iter().map(|e| e.id.as_str()),
            &self.cache,
            self.config.pick_threshold,
        );
        self.selected = hit.clone();
        Some(match hit {
            Some(hit) => {
                info!(id = %hit.id, distance = hit.distance, "entity selected");
                SelectionChange::Selected(hit)
            }
            None => SelectionChange::Cleared,
        })
    }

    pub fn selected(&self) -> Option<&NearestHit> {
        self.selected.as_ref()
    }

    pub fn position_cache(&self) -> Rc<PositionCache> {
        Rc::clone(&self.cache)
    }

    pub fn entity(&self, id: &str) -> Option<&MarkerEntity> {
        self.entities.iter().rev().find(|e| e.id == id)
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    pub fn camera_mut(&mut self) -> &mut OrbitCamera {
        &mut self.world.camera
    }

    pub fn parent(&self) -> NodeId {
        self.parent
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn rotation(&self) -> &RotationAnimation {
        &self.rotation
    }

    pub fn marker_build(&self) -> Option<&BuildHandle> {
        self.markers.as_ref()
    }

    pub fn connection_build(&self) -> Option<&BuildHandle> {
        self.arcs.as_ref()
    }

    pub fn is_idle(&self) -> bool {
        self.pump.is_idle()
    }

    pub fn events(&self) -> &[BuildEvent] {
        self.bus.events()
    }

    pub fn drain_events(&mut self) -> Vec<BuildEvent> {
        self.bus.drain()
    }

    /// Cancels every build and releases all primitives and the globe.
    pub fn dispose(&mut self) -> usize {
        self.pump.cancel_all();
        self.markers = None;
        self.arcs = None;
        let released = self.world.clear();
        self.world.clear_globe();
        self.cache = Rc::new(PositionCache::empty());
        self.entities.clear();
        self.connections.clear();
        self.selected = None;
        info!(released, "scene session disposed");
        released
    }
}

#[cfg(test)]
mod tests {
    use super::{MARKER_SLOT, SceneSession, SelectionChange, SessionConfig, SessionError};
    use crate::arcs::ConnectionEdge;
    use crate::markers::MarkerEntity;
    use crate::prefabs::globe::{GlobeLoadError, GlobeModel};
    use crate::primitives::PrimitiveShape;
    use foundation::math::{GeoPoint, Vec2};
    use runtime::event_bus::{BuildEventKind, DEFAULT_EVENT_CAPACITY};

    fn nyc_lon() -> Vec<MarkerEntity> {
        vec![
            MarkerEntity::new("NYC", GeoPoint::new(40.7, -74.0)),
            MarkerEntity::new("LON", GeoPoint::new(51.5, -0.13)),
        ]
    }

    fn run_until_idle(session: &mut SceneSession) -> usize {
        let mut frames = 0;
        while !session.is_idle() {
            session.advance_frame(1.0 / 60.0);
            frames += 1;
            assert!(frames < 1000, "builds never finished");
        }
        frames
    }

    fn arc_alphas(session: &SceneSession) -> Vec<f32> {
        session
            .world()
            .primitives()
            .filter(|(_, p)| matches!(p.shape, PrimitiveShape::Polyline { .. }))
            .map(|(_, p)| p.alpha)
            .collect()
    }

    fn screen_of(session: &SceneSession, id: &str) -> Vec2 {
        let local = session.position_cache().get(id).expect("cached");
        let node = session.world().node(session.parent()).expect("parent");
        let world = node.transform.to_parent(local);
        session
            .world()
            .camera
            .project_to_screen(world)
            .expect("on screen")
    }

    #[test]
    fn rejects_invalid_config() {
        let mut cfg = SessionConfig::default();
        cfg.projection.radius = 0.0;
        assert!(matches!(
            SceneSession::create(cfg),
            Err(SessionError::InvalidValue { field: "radius", .. })
        ));

        let mut cfg = SessionConfig::default();
        cfg.arcs.batch_size = 0;
        assert!(matches!(
            SceneSession::create(cfg),
            Err(SessionError::ZeroBatchSize { .. })
        ));

        let mut cfg = SessionConfig::default();
        cfg.projection.orientation_offset_deg = f64::NAN;
        assert!(SceneSession::create(cfg).is_err());
    }

    #[test]
    fn end_to_end_nyc_to_london() {
        let cfg = SessionConfig {
            max_connection_amount: Some(100.0),
            ..SessionConfig::default()
        };
        let mut session = SceneSession::create(cfg).expect("session");
        session.set_entities(nyc_lon());
        session.set_connections(vec![
            ConnectionEdge::new("f1", "NYC", "LON").with_amount(50.0),
        ]);
        run_until_idle(&mut session);

        assert_eq!(session.position_cache().len(), 2);
        let alphas = arc_alphas(&session);
        assert_eq!(alphas.len(), 1);
        assert!((alphas[0] - 0.6).abs() < 1e-6);
        assert_eq!(session.world().primitive_count(), 3);
        assert!(
            session
                .world()
                .primitives()
                .all(|(_, p)| p.parent == Some(session.parent()))
        );
    }

    #[test]
    fn replacing_connections_releases_the_previous_arcs() {
        let mut session = SceneSession::create(SessionConfig::default()).expect("session");
        session.set_entities(nyc_lon());
        let many: Vec<ConnectionEdge> = (0..120)
            .map(|i| ConnectionEdge::new(format!("f{i}"), "NYC", "LON"))
            .collect();
        session.set_connections(many);
        session.advance_frame(0.016);
        assert_eq!(arc_alphas(&session).len(), 50);

        session.set_connections(vec![ConnectionEdge::new("g", "LON", "NYC")]);
        run_until_idle(&mut session);
        assert_eq!(arc_alphas(&session).len(), 1);
        assert!(
            session
                .events()
                .iter()
                .any(|e| e.slot == "connections" && matches!(e.kind, BuildEventKind::Cancelled(_)))
        );
    }

    #[test]
    fn new_entity_set_rebuilds_arcs_against_the_new_cache() {
        let mut session = SceneSession::create(SessionConfig::default()).expect("session");
        session.set_entities(nyc_lon());
        session.set_connections(vec![ConnectionEdge::new("f1", "NYC", "LON")]);
        run_until_idle(&mut session);
        assert_eq!(arc_alphas(&session).len(), 1);
        let first_version = session.position_cache().version();

        // LON filtered out: its marker and the arc must both disappear.
        session.set_entities(vec![MarkerEntity::new("NYC", GeoPoint::new(40.7, -74.0))]);
        run_until_idle(&mut session);
        assert!(session.position_cache().version() > first_version);
        assert_eq!(session.world().primitive_count(), 1);
        assert!(arc_alphas(&session).is_empty());
    }

    #[test]
    fn click_selects_nearest_marker_in_the_spinning_frame() {
        let mut session = SceneSession::create(SessionConfig::default()).expect("session");
        session.camera_mut().alpha = std::f64::consts::FRAC_PI_2;
        session.set_entities(nyc_lon());
        run_until_idle(&mut session);
        for _ in 0..90 {
            session.advance_frame(1.0 / 30.0);
        }
        assert!(session.rotation().angle_rad() > 0.0);

        let at = screen_of(&session, "NYC");
        session.pointer_down(at);
        let change = session.pointer_up(at).expect("globe hit");
        let SelectionChange::Selected(hit) = change else {
            panic!("expected a selection, got {change:?}");
        };
        assert_eq!(hit.id, "NYC");
        assert!(hit.distance < 1e-6);
        assert_eq!(session.selected().map(|h| h.id.as_str()), Some("NYC"));
    }

    #[test]
    fn drag_orbits_camera_and_never_selects() {
        let mut session = SceneSession::create(SessionConfig::default()).expect("session");
        session.camera_mut().alpha = std::f64::consts::FRAC_PI_2;
        session.set_entities(nyc_lon());
        run_until_idle(&mut session);

        let at = screen_of(&session, "NYC");
        let alpha = session.world().camera.alpha;
        session.pointer_down(at);
        session.pointer_move(Vec2::new(at.x + 40.0, at.y));
        // Releasing back on the marker is still the end of a drag.
        assert_eq!(session.pointer_up(at), None);
        assert!(session.world().camera.alpha != alpha);
        assert!(session.rotation().is_paused());
        assert!(session.selected().is_none());
    }

    #[test]
    fn click_on_bare_globe_clears_and_miss_changes_nothing() {
        let mut session = SceneSession::create(SessionConfig::default()).expect("session");
        session.camera_mut().alpha = std::f64::consts::FRAC_PI_2;
        session.set_entities(nyc_lon());
        run_until_idle(&mut session);

        let nyc = screen_of(&session, "NYC");
        assert!(matches!(session.pick(nyc), Some(SelectionChange::Selected(_))));

        // From the default camera side the facing point is far from both
        // markers.
        session.camera_mut().alpha = -std::f64::consts::FRAC_PI_2;
        let centre = session
            .world()
            .camera
            .project_to_screen(session.world().camera.target)
            .expect("centre");
        assert_eq!(session.pick(centre), Some(SelectionChange::Cleared));
        assert!(session.selected().is_none());

        assert_eq!(session.pick(Vec2::new(0.0, 0.0)), None);
    }

    #[test]
    fn globe_load_failure_is_not_fatal() {
        let mut session = SceneSession::create(SessionConfig::default()).expect("session");
        let err = GlobeModel::from_obj_str("earth", "");
        assert!(matches!(err, Err(GlobeLoadError::Empty { .. })));
        assert!(!session.attach_globe(err));
        assert!(session.world().globe().is_none());

        let ok = GlobeModel::from_obj_str("earth", "v 0 0 0\nv 1 0 0\nv 0 1 0\nf 1 2 3\n");
        assert!(session.attach_globe(ok));
        assert_eq!(session.world().globe().map(|g| g.parent), Some(session.parent()));

        session.set_entities(nyc_lon());
        run_until_idle(&mut session);
        assert_eq!(session.world().primitive_count(), 2);
    }

    #[test]
    fn dispose_releases_everything() {
        let mut session = SceneSession::create(SessionConfig::default()).expect("session");
        session.set_entities(nyc_lon());
        session.set_connections(vec![ConnectionEdge::new("f1", "NYC", "LON")]);
        session.advance_frame(0.016);
        assert!(session.world().primitive_count() > 0);

        session.dispose();
        assert_eq!(session.world().primitive_count(), 0);
        assert!(session.is_idle());
        assert!(session.position_cache().is_empty());
    }

    fn ring(n: usize) -> Vec<MarkerEntity> {
        (0..n)
            .map(|i| {
                let lon = -180.0 + 360.0 * i as f64 / n as f64;
                MarkerEntity::new(format!("E{i}"), GeoPoint::new(10.0, lon))
            })
            .collect()
    }

    #[test]
    fn replacing_entities_mid_build_keeps_only_the_new_markers() {
        let mut session = SceneSession::create(SessionConfig::default()).expect("session");
        session.set_entities(ring(120));
        session.advance_frame(0.016);
        assert_eq!(session.world().primitive_count(), 50);

        session.set_entities(nyc_lon());
        run_until_idle(&mut session);
        assert_eq!(session.world().primitive_count(), 2);
        assert_eq!(session.position_cache().len(), 2);
        assert!(session.events().iter().any(|e| {
            e.slot == MARKER_SLOT && matches!(e.kind, BuildEventKind::Cancelled(s) if s.built == 50)
        }));
        assert!(matches!(
            session.events().last().map(|e| e.kind),
            Some(BuildEventKind::Finished(s)) if s.built == 2
        ));
    }

    #[test]
    fn event_log_stays_bounded_across_rebuilds() {
        let mut session = SceneSession::create(SessionConfig::default()).expect("session");
        session.set_entities(nyc_lon());
        run_until_idle(&mut session);

        let edges: Vec<ConnectionEdge> = (0..500)
            .map(|i| ConnectionEdge::new(format!("f{i}"), "NYC", "LON"))
            .collect();
        for _ in 0..200 {
            session.set_connections(edges.clone());
            for _ in 0..12 {
                session.advance_frame(1.0 / 60.0);
            }
            assert!(session.events().len() <= DEFAULT_EVENT_CAPACITY);
        }
        assert_eq!(session.events().len(), DEFAULT_EVENT_CAPACITY);
        assert_eq!(arc_alphas(&session).len(), 500);
    }
}

