//! Entity markers: one point or sphere per entity, placed from the position
//! cache and created a slice at a time.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::rc::Rc;

use foundation::color::Rgb;
use foundation::math::{GeoPoint, SphereProjection};
use runtime::cancel::CancelToken;
use runtime::progressive::{ItemOutcome, ProgressiveBuild, SliceWork};
use tracing::{debug, warn};

use crate::positions::{PositionCache, build_positions};
use crate::primitives::{
    BuildHandle, GroupId, NodeId, PrimitiveId, PrimitiveShape, PrimitiveSpec, SceneHandle,
};

pub const DEFAULT_MARKER_COLOR: Rgb = Rgb::new(0.1, 0.1, 0.1);
pub const DEFAULT_MARKER_BATCH: usize = 50;

#[derive(Debug, Clone, PartialEq)]
pub struct MarkerEntity {
    pub id: String,
    pub kind: Option<String>,
    pub name: Option<String>,
    pub country: Option<String>,
    pub geo: GeoPoint,
    pub color: Rgb,
    /// Relative size; multiplies the style's base size.
    pub size: f64,
}

impl MarkerEntity {
    pub fn new(id: impl Into<String>, geo: GeoPoint) -> Self {
        Self {
            id: id.into(),
            kind: None,
            name: None,
            country: None,
            geo,
            color: DEFAULT_MARKER_COLOR,
            size: 1.0,
        }
    }

    pub fn with_color(mut self, color: Rgb) -> Self {
        self.color = color;
        self
    }

    pub fn with_size(mut self, size: f64) -> Self {
        self.size = size;
        self
    }

    pub fn with_kind(mut self, kind: impl Into<String>) -> Self {
        self.kind = Some(kind.into());
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    fn size_factor(&self) -> f64 {
        if self.size.is_finite() && self.size > 0.0 {
            self.size
        } else {
            1.0
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum MarkerStyle {
    /// Constant pixel size regardless of zoom.
    Points { size_px: f32 },
    /// World-space spheres that scale with the globe.
    Spheres { diameter: f64 },
}

impl Default for MarkerStyle {
    fn default() -> Self {
        MarkerStyle::Points { size_px: 4.0 }
    }
}

impl MarkerStyle {
    fn shape_for(&self, entity: &MarkerEntity) -> PrimitiveShape {
        match *self {
            MarkerStyle::Points { size_px } => PrimitiveShape::Point {
                size_px: size_px * entity.size_factor() as f32,
            },
            MarkerStyle::Spheres { diameter } => PrimitiveShape::Sphere {
                diameter: diameter * entity.size_factor(),
            },
        }
    }
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MarkerOptions {
    pub style: MarkerStyle,
    pub batch_size: usize,
    pub parent: Option<NodeId>,
}

impl Default for MarkerOptions {
    fn default() -> Self {
        Self {
            style: MarkerStyle::default(),
            batch_size: DEFAULT_MARKER_BATCH,
            parent: None,
        }
    }
}

/// Per-item marker creation driven by a [`ProgressiveBuild`].
pub struct MarkerWork<S> {
    items: Vec<MarkerEntity>,
    cache: Rc<PositionCache>,
    style: MarkerStyle,
    group: GroupId,
    parent: Option<NodeId>,
    created: Vec<PrimitiveId>,
    _scene: PhantomData<fn(&mut S)>,
}

impl<S> MarkerWork<S> {
    pub fn created(&self) -> &[PrimitiveId] {
        &self.created
    }

    pub fn items(&self) -> &[MarkerEntity] {
        &self.items
    }
}

impl<S: SceneHandle> SliceWork for MarkerWork<S> {
    type Context = S;

    fn len(&self) -> usize {
        self.items.len()
    }

    fn process(&mut self, index: usize, scene: &mut S) -> ItemOutcome {
        let entity = &self.items[index];
        let Some(position) = self.cache.get(&entity.id) else {
            warn!(id = %entity.id, "no cached position for entity; skipping marker");
            return ItemOutcome::Skipped;
        };

        let id = scene.create_primitive(PrimitiveSpec {
            name: format!("entity-{}", entity.id),
            group: self.group,
            position,
            shape: self.style.shape_for(entity),
            color: entity.color,
            alpha: 1.0,
        });
        if let Some(parent) = self.parent {
            scene.attach(id, parent);
        }
        self.created.push(id);
        ItemOutcome::Built
    }
}

pub struct MarkerBuild<S> {
    /// Complete before the first marker slice runs.
    pub cache: Rc<PositionCache>,
    pub task: ProgressiveBuild<MarkerWork<S>>,
    pub handle: BuildHandle,
}

/// Builds the position cache for `entities` and prepares the marker build.
///
/// Nothing is created in `scene` until the returned task is stepped; only a
/// fresh primitive group is reserved. Entities sharing an id collapse to the
/// last one, matching the cache.
pub fn build_markers<S: SceneHandle>(
    entities: &[MarkerEntity],
    projection: SphereProjection,
    cache_version: u64,
    scene: &mut S,
    options: &MarkerOptions,
) -> MarkerBuild<S> {
    let cache = Rc::new(build_positions(entities, projection, cache_version));
    let items = dedupe_last(entities);
    if items.len() != entities.len() {
        debug!(
            dropped = entities.len() - items.len(),
            "collapsed duplicate entity ids"
        );
    }

    let group = scene.new_group();
    let cancel = CancelToken::new();
    let work = MarkerWork {
        items,
        cache: Rc::clone(&cache),
        style: options.style,
        group,
        parent: options.parent,
        created: Vec::new(),
        _scene: PhantomData,
    };
    let task =
        ProgressiveBuild::with_cancel_token("markers", work, options.batch_size, cancel.clone());

    MarkerBuild {
        cache,
        task,
        handle: BuildHandle::new(group, cancel),
    }
}

/// Keeps, in input order, only the last entity for each id.
fn dedupe_last(entities: &[MarkerEntity]) -> Vec<MarkerEntity> {
    let mut last: HashMap<&str, usize> = HashMap::with_capacity(entities.len());
    for (i, e) in entities.iter().enumerate() {
        last.insert(e.id.as_str(), i);
    }
    entities
        .iter()
        .enumerate()
        .filter(|(i, e)| last.get(e.id.as_str()) == Some(i))
        .map(|(_, e)| e.clone())
        .collect()
}
