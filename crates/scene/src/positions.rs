//! Entity id to projected position lookup shared by markers, arcs and picking.
//!
//! A cache is built completely and then published behind an `Rc`; a new
//! entity set produces a new cache instead of editing the old one, so an arc
//! build holding the previous snapshot never sees a half-written map.

use std::collections::BTreeMap;

use foundation::math::{SphereProjection, Vec3};
use tracing::{debug, warn};

use crate::markers::MarkerEntity;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct PositionCache {
    version: u64,
    positions: BTreeMap<String, Vec3>,
}

impl PositionCache {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_entries(version: u64, entries: impl IntoIterator<Item = (String, Vec3)>) -> Self {
        Self {
            version,
            positions: entries.into_iter().collect(),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: &str) -> Option<Vec3> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Entries in id order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, Vec3)> {
        self.positions.iter().map(|(id, p)| (id.as_str(), *p))
    }
}

/// Projects every entity onto the sphere described by `projection`.
///
/// Duplicate ids keep the last entity. Entities whose projection is not
/// finite get no entry, which also hides any earlier duplicate of them.
pub fn build_positions(
    entities: &[MarkerEntity],
    projection: SphereProjection,
    version: u64,
) -> PositionCache {
    let mut positions = BTreeMap::new();
    for entity in entities {
        let p = projection.project(entity.geo);
        if !p.is_finite() {
            warn!(
                id = %entity.id,
                lat = entity.geo.lat_deg,
                lon = entity.geo.lon_deg,
                "dropping entity with non-finite position"
            );
            positions.remove(&entity.id);
            continue;
        }
        if positions.insert(entity.id.clone(), p).is_some() {
            debug!(id = %entity.id, "duplicate entity id; keeping the last one");
        }
    }
    PositionCache { version, positions }
}
