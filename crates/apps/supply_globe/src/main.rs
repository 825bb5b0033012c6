use std::path::PathBuf;

use clap::Parser;
use foundation::math::Vec2;
use tracing::info;
use tracing_subscriber::EnvFilter;

mod driver;

#[derive(Parser, Debug)]
#[command(author, version, about = "Headless supply-chain globe: loads data, builds the scene frame by frame, replays clicks")]
struct Args {
    /// Viewer config (JSON). Defaults apply when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Entity CSV (id,type,name,country,lat,lon)
    #[arg(long, default_value = "assets/entities.csv")]
    entities: PathBuf,

    /// Connection CSV (Flow_Id,Id_From,Id_To,step_type)
    #[arg(long, default_value = "assets/connections.csv")]
    connections: PathBuf,

    /// Transaction CSV; drives filtering and arc weights
    #[arg(long)]
    transactions: Option<PathBuf>,

    /// Globe model (OBJ); overrides `model_path` from the config
    #[arg(long)]
    model: Option<PathBuf>,

    /// Show only entities of this type
    #[arg(long)]
    only_type: Option<String>,

    /// Screen position to click once the scene is built: x,y in pixels
    #[arg(long = "click", value_parser = parse_point)]
    clicks: Vec<Vec2>,

    /// Frame limit for the build loop
    #[arg(long, default_value_t = 600)]
    max_frames: u32,

    /// Seconds per simulated frame
    #[arg(long, default_value_t = 1.0 / 60.0)]
    dt: f64,
}

fn parse_point(raw: &str) -> Result<Vec2, String> {
    let (x, y) = raw
        .split_once(',')
        .ok_or_else(|| format!("expected x,y but got {raw:?}"))?;
    let x: f64 = x.trim().parse().map_err(|e| format!("bad x in {raw:?}: {e}"))?;
    let y: f64 = y.trim().parse().map_err(|e| format!("bad y in {raw:?}: {e}"))?;
    Ok(Vec2::new(x, y))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let options = driver::RunOptions {
        config: args.config,
        entities: args.entities,
        connections: args.connections,
        transactions: args.transactions,
        model: args.model,
        only_type: args.only_type,
        clicks: args.clicks,
        max_frames: args.max_frames,
        dt: args.dt,
    };

    let report = driver::run(options).await?;
    info!(
        frames = report.frames,
        markers = report.markers,
        arcs = report.arcs,
        globe = report.globe_attached,
        "done"
    );
    Ok(())
}
