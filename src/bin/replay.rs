use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use clap::Parser;
use flate2::read::GzDecoder;
use serde::Deserialize;
use serde_json::json;
use walk_tracker_rs::session::{StepTick, WalkSession};
use walk_tracker_rs::types::GeoFix;
use walk_tracker_rs::TrackerConfig;

#[derive(Parser, Debug)]
struct Args {
    /// Path to a recorded walk (*.json or *.json.gz)
    #[arg(long)]
    log: PathBuf,

    /// Tracker configuration JSON; defaults are used when omitted
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the route simplification tolerance (meters)
    #[arg(long)]
    tolerance: Option<f64>,

    /// Override the spline segments per simplified interval
    #[arg(long)]
    segments: Option<usize>,

    /// Include the smoothed route in the output
    #[arg(long, default_value_t = false)]
    route: bool,
}

#[derive(Deserialize)]
struct WalkLog {
    #[serde(default)]
    initial_step_count: i32,
    #[serde(default)]
    fixes: Vec<GeoFix>,
    #[serde(default)]
    step_ticks: Vec<StepTick>,
}

enum Event<'a> {
    Fix(&'a GeoFix),
    Tick(&'a StepTick),
}

impl Event<'_> {
    fn timestamp(&self) -> i64 {
        match self {
            Event::Fix(fix) => fix.timestamp,
            Event::Tick(tick) => tick.timestamp,
        }
    }
}

fn load_log(path: &Path) -> anyhow::Result<WalkLog> {
    let file = File::open(path)?;
    if path.extension().map(|e| e == "gz").unwrap_or(false) {
        let gz = GzDecoder::new(file);
        let reader = BufReader::new(gz);
        Ok(serde_json::from_reader(reader)?)
    } else {
        let reader = BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}

fn load_config(args: &Args) -> anyhow::Result<TrackerConfig> {
    let mut config = match args.config.as_ref() {
        Some(path) => TrackerConfig::load(path)?,
        None => TrackerConfig::default(),
    };
    if let Some(tolerance) = args.tolerance {
        config.smoothing.simplify_tolerance_m = tolerance;
    }
    if let Some(segments) = args.segments {
        config.smoothing.segments_per_interval = segments;
    }
    config.validate()?;
    Ok(config)
}

fn run(args: &Args) -> anyhow::Result<serde_json::Value> {
    let config = load_config(args)?;
    let log = load_log(&args.log)?;

    // fixes before ticks at equal timestamps, so a tick sees the fix it was sampled with
    let mut events: Vec<Event> = log
        .fixes
        .iter()
        .map(Event::Fix)
        .chain(log.step_ticks.iter().map(Event::Tick))
        .collect();
    events.sort_by_key(|e| (e.timestamp(), matches!(e, Event::Tick(_))));

    let mut session = WalkSession::new(config);
    session.start(log.initial_step_count)?;

    let mut peak_speed = 0.0f32;
    for event in &events {
        match event {
            Event::Fix(fix) => {
                if session.on_location(fix).is_some() {
                    peak_speed = peak_speed.max(session.speed());
                }
            }
            Event::Tick(tick) => {
                session.on_step_tick(tick);
            }
        }
    }

    let summary = session.finish()?;
    log::info!(
        "{}: {} fixes, {} ticks replayed",
        args.log.display(),
        log.fixes.len(),
        log.step_ticks.len()
    );

    let mut result = json!({
        "log": args.log.display().to_string(),
        "distance_m": summary.distance_m,
        "steps": summary.steps,
        "average_step_length": summary.average_step_length,
        "peak_speed_ms": peak_speed,
        "raw_points": summary.raw_point_count,
        "smoothed_points": summary.route.len(),
        "stats": summary.stats,
    });
    if args.route {
        result["route"] = serde_json::to_value(&summary.route)?;
    }
    Ok(result)
}

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    let result = run(&args)?;
    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
