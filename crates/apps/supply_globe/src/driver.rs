//! Loads data and config, drives a `SceneSession` frame by frame, then
//! replays clicks against the finished scene.

use std::path::{Path, PathBuf};

use compute::{
    FilterField, FilterState, SupplyData, compute_filtered, flow_amounts, transaction_stats,
};
use formats::convert::{connection_edges, marker_entities};
use formats::palette::TypeLegend;
use formats::{ViewerConfig, load_connections, load_entities, load_transactions};
use foundation::math::Vec2;
use gpu::Renderer;
use runtime::event_bus::BuildEventKind;
use scene::prefabs::globe::{GlobeLoadError, GlobeModel};
use scene::{SceneSession, SelectionChange};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

#[derive(Debug, Clone)]
pub struct RunOptions {
    pub config: Option<PathBuf>,
    pub entities: PathBuf,
    pub connections: PathBuf,
    pub transactions: Option<PathBuf>,
    pub model: Option<PathBuf>,
    pub only_type: Option<String>,
    pub clicks: Vec<Vec2>,
    pub max_frames: u32,
    pub dt: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub frames: u32,
    pub markers: usize,
    pub arcs: usize,
    pub globe_attached: bool,
    /// One entry per click; `None` when the click missed the globe.
    pub selections: Vec<Option<SelectionChange>>,
}

async fn load_globe(path: PathBuf, flip_faces: bool) -> Result<GlobeModel, GlobeLoadError> {
    let source = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| GlobeLoadError::Io {
            path: path.clone(),
            source: e,
        })?;
    let name = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "globe".to_string());
    let mut model = GlobeModel::from_obj_str(name, &source)?;
    if flip_faces {
        model.flip_faces();
    }
    Ok(model)
}

async fn attach_when_loaded(
    session: &mut SceneSession,
    handle: JoinHandle<Result<GlobeModel, GlobeLoadError>>,
) -> bool {
    match handle.await {
        Ok(result) => session.attach_globe(result),
        Err(e) => {
            error!(error = %e, "globe load task failed");
            false
        }
    }
}

fn load_data(options: &RunOptions) -> Result<SupplyData, formats::LoadError> {
    let transactions = match &options.transactions {
        Some(path) => load_transactions(path)?,
        None => Vec::new(),
    };
    Ok(SupplyData {
        entities: load_entities(&options.entities)?,
        connections: load_connections(&options.connections)?,
        transactions,
    })
}

fn resolve(base: Option<&Path>, path: &Path) -> PathBuf {
    match base.and_then(Path::parent) {
        Some(dir) if path.is_relative() => dir.join(path),
        _ => path.to_path_buf(),
    }
}

pub async fn run(options: RunOptions) -> Result<RunReport, Box<dyn std::error::Error>> {
    let config = match &options.config {
        Some(path) => ViewerConfig::load(path)?,
        None => ViewerConfig::default(),
    };
    let model_path = match &options.model {
        Some(path) => path.clone(),
        None => resolve(options.config.as_deref(), &config.model_path),
    };

    // The model streams in while the scene builds.
    let mut model_load = Some(tokio::spawn(load_globe(model_path, config.flip_faces)));

    let data = load_data(&options)?;
    let mut state = FilterState::from_data(&data);
    if let Some(kind) = &options.only_type {
        if !state.entity_types.iter().any(|(t, _)| t == kind.as_str()) {
            warn!(entity_type = %kind, "no entities of this type");
        }
        state = state.toggle(FilterField::EntityType, kind);
    }
    let filtered = compute_filtered(&data, &state);

    let stats = transaction_stats(&filtered.transactions);
    info!(
        transactions = stats.total_transactions,
        actual_qty = stats.total_actual_qty,
        actual_value = stats.total_actual_value,
        categories = stats.categories.len(),
        companies = stats.company_ids.len(),
        "transaction summary"
    );

    let legend = TypeLegend::build(
        data.entities.iter().map(|e| e.kind.as_str()),
        config.entity_type_colors.as_ref(),
    );
    let entities = marker_entities(&filtered.entities, &legend);
    let amounts = flow_amounts(&filtered.transactions);
    let edges = connection_edges(
        &filtered.connections,
        (!amounts.is_empty()).then_some(&amounts),
    );

    let mut session = SceneSession::create(config.session_config())?;
    session.set_entities(entities);
    session.set_connections(edges);

    let mut globe_attached = false;
    let mut frames = 0;
    while frames < options.max_frames {
        let summary = session.advance_frame(options.dt);
        frames += 1;
        debug!(
            frame = frames,
            slices = summary.ran_slices,
            deferred = summary.deferred,
            "frame"
        );

        tokio::task::yield_now().await;
        if let Some(handle) = model_load.take_if(|h| h.is_finished()) {
            globe_attached = attach_when_loaded(&mut session, handle).await;
        }

        if session.is_idle() {
            if let Some(handle) = model_load.take() {
                globe_attached = attach_when_loaded(&mut session, handle).await;
            }
            break;
        }
    }
    if !session.is_idle() {
        warn!(frames, "frame limit reached before builds finished");
    }

    for event in session.drain_events() {
        if let BuildEventKind::Finished(s) | BuildEventKind::Cancelled(s) = event.kind {
            info!(
                slot = event.slot,
                frame = event.frame_index,
                built = s.built,
                skipped = s.skipped,
                slices = s.slices,
                "build settled"
            );
        }
    }

    let mut selections = Vec::with_capacity(options.clicks.len());
    for &at in &options.clicks {
        session.pointer_down(at);
        let change = session.pointer_up(at);
        match &change {
            Some(SelectionChange::Selected(hit)) => {
                let name = session
                    .entity(&hit.id)
                    .and_then(|e| e.name.clone())
                    .unwrap_or_default();
                let geo = config.projection().unproject(hit.position);
                info!(
                    id = %hit.id,
                    name = %name,
                    distance = hit.distance,
                    lat = geo.map(|g| g.lat_deg),
                    lon = geo.map(|g| g.lon_deg),
                    "selected"
                );
            }
            Some(SelectionChange::Cleared) => info!(x = at.x, y = at.y, "selection cleared"),
            None => debug!(x = at.x, y = at.y, "click missed the globe"),
        }
        selections.push(change);
    }

    let frame = Renderer::collect(session.world());
    let counts = frame.stats();
    info!(
        globes = counts.globes,
        markers = counts.markers,
        arcs = counts.arcs,
        "render frame"
    );

    session.dispose();

    Ok(RunReport {
        frames,
        markers: counts.markers,
        arcs: counts.arcs,
        globe_attached,
        selections,
    })
}
