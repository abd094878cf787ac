//! spotnav CLI - Debug tool for navigation and presence placement
//!
//! Usage:
//!   spotnav-cli decode <polyline> [--precision <n>]
//!   spotnav-cli replay <file.gpx> [--speed <m/s>] [--noise <m>]
//!   spotnav-cli presence [--count <n>] [--radius <m>]
//!
//! Replays a drive through the same session logic the app uses and shows
//! how progress, bearing and instructions evolve fix by fix.

use clap::{Parser, Subcommand};
use gpx::{read, Gpx};
use log::{error, info};
use std::fs::File;
use std::io::{BufReader, Write};
use std::path::{Path, PathBuf};
use spotnav::{
    geo_utils::haversine_distance,
    polyline,
    synthetic::{CrowdScenario, DriveScenario},
    voice::Utterance,
    GpsPoint, NavigationConfig, NavigationSession, PresenceEngine, RenderUpdate, Route,
    SpeechSynthesizer, Voice, VoiceAnnouncer,
};

#[derive(Parser)]
#[command(name = "spotnav-cli")]
#[command(about = "Debug tool for spot navigation and presence placement", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON file overriding the default configuration
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose debug output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Decode an encoded polyline and print its points
    Decode {
        polyline: String,

        /// Coordinate precision (5 for Google, 6 for Mapbox)
        #[arg(short, long, default_value = "6")]
        precision: u32,
    },

    /// Drive a GPX track as a route and print the guidance
    Replay {
        /// GPX file whose first track becomes the route
        file: PathBuf,

        /// Simulated driving speed in m/s
        #[arg(long, default_value = "12")]
        speed: f64,

        /// GPS noise in meters
        #[arg(long, default_value = "4")]
        noise: f64,

        /// Instruction every N meters of route
        #[arg(long, default_value = "300")]
        step_every: f64,
    },

    /// Place a synthetic crowd and report marker separation
    Presence {
        #[arg(long, default_value = "50")]
        count: usize,

        /// Scatter radius around the viewer in meters
        #[arg(long, default_value = "3000")]
        radius: f64,

        /// Fraction of users sharing a position with the previous one
        #[arg(long, default_value = "0.2")]
        duplicates: f64,

        #[arg(long, default_value = "42")]
        seed: u64,
    },
}

/// Prints what would be spoken.
struct ConsoleSpeech;

impl SpeechSynthesizer for ConsoleSpeech {
    fn voices(&self) -> Vec<Voice> {
        vec![Voice::new("console", "en-US")]
    }

    fn cancel(&mut self) {}

    fn speak(&mut self, utterance: Utterance) {
        println!("    [speech] {}", utterance.text);
    }
}

fn main() {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format(|buf, record| writeln!(buf, "[{:5}] {}", record.level(), record.args()))
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("Invalid configuration: {}", e);
            std::process::exit(2);
        }
    };

    let outcome = match cli.command {
        Commands::Decode {
            polyline,
            precision,
        } => {
            run_decode(&polyline, precision);
            Ok(())
        }
        Commands::Replay {
            file,
            speed,
            noise,
            step_every,
        } => run_replay(&file, &config, speed, noise, step_every),
        Commands::Presence {
            count,
            radius,
            duplicates,
            seed,
        } => {
            run_presence(&config, count, radius, duplicates, seed);
            Ok(())
        }
    };

    if let Err(e) = outcome {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn load_config(path: Option<&Path>) -> Result<NavigationConfig, String> {
    let config = match path {
        Some(path) => {
            let json = std::fs::read_to_string(path).map_err(|e| e.to_string())?;
            NavigationConfig::from_json_str(&json).map_err(|e| e.to_string())?
        }
        None => NavigationConfig::default(),
    };
    config.validate().map_err(|e| e.to_string())?;
    Ok(config)
}

fn run_decode(encoded: &str, precision: u32) {
    let points = polyline::decode(encoded, precision);
    println!("{} points (precision {})", points.len(), precision);
    for (i, p) in points.iter().enumerate() {
        println!("  {:4}  {:>11.6}  {:>11.6}", i, p.latitude, p.longitude);
    }
    if points.len() >= 2 {
        let total: f64 = points
            .windows(2)
            .map(|w| haversine_distance(&w[0], &w[1]))
            .sum();
        println!("Length: {:.0} m", total);
    }
}

/// Load the points of every track segment in a GPX file.
fn parse_gpx_file(path: &Path) -> Result<Vec<GpsPoint>, String> {
    let file = File::open(path).map_err(|e| e.to_string())?;
    let gpx: Gpx = read(BufReader::new(file)).map_err(|e| e.to_string())?;

    let points: Vec<GpsPoint> = gpx
        .tracks
        .iter()
        .flat_map(|track| &track.segments)
        .flat_map(|segment| &segment.points)
        .map(|pt| GpsPoint::new(pt.point().y(), pt.point().x()))
        .collect();

    if points.is_empty() {
        return Err("No track points found".to_string());
    }
    Ok(points)
}

fn run_replay(
    path: &Path,
    config: &NavigationConfig,
    speed: f64,
    noise: f64,
    step_every: f64,
) -> Result<(), String> {
    let geometry = parse_gpx_file(path)?;
    let length = spotnav::route::calculate_route_distance(&geometry);
    let step_count = ((length / step_every.max(1.0)).ceil() as usize).max(1);
    let steps = (0..step_count)
        .map(|i| format!("Step {} of {}", i + 1, step_count))
        .collect();
    let route = Route::new(geometry, steps).map_err(|e| e.to_string())?;

    info!(
        "Route from {}: {} points, {:.0} m, {} steps",
        path.display(),
        route.geometry().len(),
        route.total_distance_m(),
        route.step_count()
    );

    let destination = route
        .geometry()
        .last()
        .copied()
        .ok_or_else(|| "route has no points".to_string())?;
    let mut session = NavigationSession::new(
        "replay",
        destination,
        config.default_language.clone(),
        VoiceAnnouncer::new(ConsoleSpeech),
        config.bearing.clone(),
    );
    print_updates(&session.set_route(route.clone()));

    let drive = DriveScenario {
        speed_mps: speed,
        noise_sigma_m: noise,
        ..DriveScenario::default()
    };
    for fix in drive.fixes(&route) {
        print_updates(&session.on_fix(&fix));
    }

    let state = session.tracker_state();
    println!(
        "\nFinished at vertex {} of {}, step {}",
        state.last_matched_index,
        route.geometry().len() - 1,
        state.current_step_index
    );
    Ok(())
}

fn print_updates(updates: &[RenderUpdate]) {
    for update in updates {
        match update {
            RenderUpdate::Vehicle(pose) => println!(
                "  {:>10.6} {:>11.6}  bearing {:>5.1}",
                pose.position.latitude, pose.position.longitude, pose.bearing_deg
            ),
            RenderUpdate::Instruction {
                step_index,
                text,
                remaining_m,
            } => println!("  -> step {}: {} ({:.0} m left)", step_index, text, remaining_m),
            RenderUpdate::RouteLine(points) => println!("Route line: {} points", points.len()),
            RenderUpdate::FitBounds(bounds) => println!("Fit bounds: {:?}", bounds),
            other => println!("  {:?}", other),
        }
    }
}

fn run_presence(config: &NavigationConfig, count: usize, radius: f64, duplicates: f64, seed: u64) {
    let viewer = GpsPoint::new(52.52, 13.405);
    let crowd = CrowdScenario {
        center: viewer,
        count,
        radius_m: radius,
        duplicate_fraction: duplicates,
        seed,
    }
    .snapshot();

    let mut engine = PresenceEngine::with_config(config.presence.clone());
    let markers = engine.place(&crowd, &viewer);

    println!("\n{}", "=".repeat(60));
    println!(
        "{} users in snapshot, {} markers placed",
        crowd.len(),
        markers.len()
    );
    println!("{}", "=".repeat(60));

    for marker in &markers {
        println!(
            "  {:<10} {:>7.0} m  icon {}  ({:.6}, {:.6})",
            marker.uid,
            marker.distance_m,
            marker.icon_index,
            marker.position.latitude,
            marker.position.longitude
        );
    }

    let mut closest = f64::INFINITY;
    for (i, a) in markers.iter().enumerate() {
        for b in &markers[i + 1..] {
            closest = closest.min(haversine_distance(&a.position, &b.position));
        }
    }
    if closest.is_finite() {
        println!(
            "\nClosest pair: {:.1} m (minimum separation {:.1} m)",
            closest, config.presence.min_separation_m
        );
    }
}
