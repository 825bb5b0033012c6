//! Viewer configuration file (`viewer.json`).
//!
//! Every field has a default, so an empty object `{}` is a valid config.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use foundation::math::{DEFAULT_ORIENTATION_OFFSET_DEG, SphereProjection, Vec2};
use scene::SessionConfig;
use scene::arcs::{
    ArcOptions, ArcStyle, CurveStrategy, DEFAULT_ARC_SEGMENTS, DEFAULT_CONNECTION_BATCH,
};
use scene::markers::{DEFAULT_MARKER_BATCH, MarkerOptions, MarkerStyle};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MarkerStyleConfig {
    Points { size_px: f32 },
    Spheres { diameter: f64 },
}

impl Default for MarkerStyleConfig {
    fn default() -> Self {
        MarkerStyleConfig::Spheres { diameter: 0.05 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArcStyleConfig {
    #[default]
    Lines,
    Tubes {
        min_radius: f64,
        max_radius: f64,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CurveConfig {
    Slerp { segments: usize, height_ratio: f64 },
    Bezier { segments: usize, lift_ratio: f64 },
}

impl Default for CurveConfig {
    fn default() -> Self {
        CurveConfig::Slerp {
            segments: DEFAULT_ARC_SEGMENTS,
            height_ratio: 0.08,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewerConfig {
    pub model_path: PathBuf,
    pub radius: f64,
    pub apply_scale: f64,
    /// Reverses the winding of the loaded globe mesh.
    pub flip_faces: bool,
    pub orientation_offset_deg: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_connection_amount: Option<f64>,
    pub marker_batch_size: usize,
    pub connection_batch_size: usize,
    pub marker_style: MarkerStyleConfig,
    pub arc_style: ArcStyleConfig,
    pub curve: CurveConfig,
    pub pick_threshold: f64,
    pub drag_threshold_px: f64,
    pub rotation_period_s: f64,
    pub resume_after_s: f64,
    pub viewport_width: f64,
    pub viewport_height: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub slices_per_frame: Option<u32>,
    /// Hex colors by entity type, overriding the generated legend.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity_type_colors: Option<BTreeMap<String, String>>,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        let session = SessionConfig::default();
        Self {
            model_path: PathBuf::from("assets/earth.obj"),
            radius: 1.0,
            apply_scale: 1.0,
            flip_faces: true,
            orientation_offset_deg: DEFAULT_ORIENTATION_OFFSET_DEG,
            max_connection_amount: None,
            marker_batch_size: DEFAULT_MARKER_BATCH,
            connection_batch_size: DEFAULT_CONNECTION_BATCH,
            marker_style: MarkerStyleConfig::default(),
            arc_style: ArcStyleConfig::default(),
            curve: CurveConfig::default(),
            pick_threshold: session.pick_threshold,
            drag_threshold_px: session.drag_threshold_px,
            rotation_period_s: session.rotation_period_s,
            resume_after_s: session.resume_after_s,
            viewport_width: session.viewport_px.x,
            viewport_height: session.viewport_px.y,
            slices_per_frame: None,
            entity_type_colors: None,
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    Parse(serde_json::Error),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io { path, source } => {
                write!(f, "failed to read config {}: {source}", path.display())
            }
            ConfigError::Parse(e) => write!(f, "config parse error: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::Io { source, .. } => Some(source),
            ConfigError::Parse(e) => Some(e),
        }
    }
}

impl ViewerConfig {
    pub fn from_json_str(payload: &str) -> Result<Self, ConfigError> {
        serde_json::from_str(payload).map_err(ConfigError::Parse)
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let payload = fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json_str(&payload)
    }

    pub fn projection(&self) -> SphereProjection {
        SphereProjection::new(self.radius, self.orientation_offset_deg)
    }

    /// Session settings; range checks happen in `SceneSession::create`.
    pub fn session_config(&self) -> SessionConfig {
        let style = match self.marker_style {
            MarkerStyleConfig::Points { size_px } => MarkerStyle::Points { size_px },
            MarkerStyleConfig::Spheres { diameter } => MarkerStyle::Spheres { diameter },
        };
        let arc_style = match self.arc_style {
            ArcStyleConfig::Lines => ArcStyle::Lines,
            ArcStyleConfig::Tubes {
                min_radius,
                max_radius,
            } => ArcStyle::Tubes {
                min_radius,
                max_radius,
            },
        };
        let curve = match self.curve {
            CurveConfig::Slerp {
                segments,
                height_ratio,
            } => CurveStrategy::Slerp {
                segments,
                height_ratio,
            },
            CurveConfig::Bezier {
                segments,
                lift_ratio,
            } => CurveStrategy::Bezier {
                segments,
                lift_ratio,
            },
        };

        SessionConfig {
            projection: self.projection(),
            apply_scale: self.apply_scale,
            markers: MarkerOptions {
                style,
                batch_size: self.marker_batch_size,
                parent: None,
            },
            arcs: ArcOptions {
                style: arc_style,
                curve,
                batch_size: self.connection_batch_size,
                parent: None,
            },
            max_connection_amount: self.max_connection_amount,
            pick_threshold: self.pick_threshold,
            drag_threshold_px: self.drag_threshold_px,
            rotation_period_s: self.rotation_period_s,
            resume_after_s: self.resume_after_s,
            viewport_px: Vec2::new(self.viewport_width, self.viewport_height),
            slices_per_frame: self.slices_per_frame,
        }
    }
}
