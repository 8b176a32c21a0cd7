use std::env;
use std::fs;
use std::path::PathBuf;

use engine::{EngineConfig, builtin_properties};
use foundation::geo::LatLng;
use scene::entity::Building;
use scene::procgen::{WindowLayout, generate_windows};
use serde::Serialize;
use tools::script::{kind_histogram, parse_script, replay};
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = real_main() {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn real_main() -> Result<(), String> {
    let mut args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        return Err(usage());
    }

    let cmd = args[1].clone();
    args.drain(0..2);

    match cmd.as_str() {
        "run" => cmd_run(args),
        "windows" => cmd_windows(args),
        "properties" => cmd_properties(),
        _ => Err(usage()),
    }
}

fn cmd_run(args: Vec<String>) -> Result<(), String> {
    // geoview run <script.json> [--config engine.json]
    let mut script_path: Option<PathBuf> = None;
    let mut config_path: Option<PathBuf> = None;

    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--config" => {
                i += 1;
                if i >= args.len() {
                    return Err("--config requires a value".to_string());
                }
                config_path = Some(PathBuf::from(&args[i]));
            }
            s if s.starts_with('-') => {
                return Err(format!("unknown arg: {s}\n\n{}", usage()));
            }
            _ if script_path.is_none() => script_path = Some(PathBuf::from(&args[i])),
            s => return Err(format!("unexpected arg: {s}\n\n{}", usage())),
        }
        i += 1;
    }

    let script_path = script_path.ok_or_else(usage)?;
    let config = match config_path {
        Some(p) => EngineConfig::load(&p).map_err(|e| e.to_string())?,
        None => EngineConfig::default(),
    };

    let text = fs::read_to_string(&script_path).map_err(|e| format!("read {script_path:?}: {e}"))?;
    let script = parse_script(&text).map_err(|e| format!("parse {script_path:?}: {e}"))?;
    let report = replay(&script, config)?;
    print_json(&report)
}

#[derive(Serialize)]
struct WindowSummary {
    building: String,
    count: usize,
    floors: u32,
    kinds: std::collections::BTreeMap<&'static str, usize>,
    min_confidence: f64,
    max_confidence: f64,
}

fn cmd_windows(args: Vec<String>) -> Result<(), String> {
    // geoview windows <floors> <per_floor> [--id ID] [--at LAT,LNG]
    if args.len() < 2 {
        return Err(usage());
    }
    let floors: u32 = args[0]
        .parse()
        .map_err(|e| format!("invalid floors {:?}: {e}", args[0]))?;
    let per_floor: u32 = args[1]
        .parse()
        .map_err(|e| format!("invalid per_floor {:?}: {e}", args[1]))?;

    let mut id = "preview".to_string();
    let mut at = LatLng::new(42.33361, -83.06028);
    let mut i = 2;
    while i < args.len() {
        match args[i].as_str() {
            "--id" => {
                i += 1;
                id = args.get(i).ok_or("--id requires a value")?.clone();
            }
            "--at" => {
                i += 1;
                at = parse_lat_lng(args.get(i).ok_or("--at requires LAT,LNG")?)?;
            }
            s => return Err(format!("unknown arg: {s}\n\n{}", usage())),
        }
        i += 1;
    }

    let layout = WindowLayout {
        floors,
        windows_per_floor: per_floor,
        ..WindowLayout::default()
    }
    .validated();
    let building = Building::new(id.as_str(), "Preview", at);
    let windows = generate_windows(&building, &layout);

    let confidences = windows.iter().map(|w| w.confidence);
    let summary = WindowSummary {
        building: id,
        count: windows.len(),
        floors: layout.floors,
        kinds: kind_histogram(windows.iter().map(|w| w.kind)),
        min_confidence: confidences.clone().fold(f64::INFINITY, f64::min),
        max_confidence: confidences.fold(f64::NEG_INFINITY, f64::max),
    };
    print_json(&summary)
}

fn cmd_properties() -> Result<(), String> {
    print_json(&builtin_properties())
}

fn parse_lat_lng(s: &str) -> Result<LatLng, String> {
    let (lat, lng) = s
        .split_once(',')
        .ok_or_else(|| format!("expected LAT,LNG, got {s:?}"))?;
    let lat: f64 = lat.trim().parse().map_err(|e| format!("invalid lat {lat:?}: {e}"))?;
    let lng: f64 = lng.trim().parse().map_err(|e| format!("invalid lng {lng:?}: {e}"))?;
    Ok(LatLng::new(lat, lng))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let text = serde_json::to_string_pretty(value).map_err(|e| format!("serialize: {e}"))?;
    println!("{text}");
    Ok(())
}

fn usage() -> String {
    let exe = env::args().next().unwrap_or_else(|| "geoview".to_string());
    format!(
        "Usage:\n  {exe} run <script.json> [--config engine.json]\n  {exe} windows <floors> <per_floor> [--id ID] [--at LAT,LNG]\n  {exe} properties\n\nNotes:\n- `run` replays a JSON step script against the recording surface and prints a JSON report.\n- Set RUST_LOG=debug to trace engine decisions on stderr.\n"
    )
}
