//! padctl - mode-stack runtime for grid-and-button MIDI controllers

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use padctl::app::App;
use padctl::config::{Settings, MAX_FRAME_RATE};
use padctl::controller::{Controller, MidiController};
use padctl::display::NullDisplay;
use padctl::midi_io::{MidiBackend, MidiRouter, MidirBackend};
use padctl::paths::AppPaths;
use padctl::project::Project;

/// padctl - Drive a MIDI instrument from a grid controller through composable modes
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the settings file (JSON or YAML)
    #[arg(short, long)]
    settings: Option<PathBuf>,

    /// Project file to load (JSON)
    #[arg(short, long)]
    project: Option<PathBuf>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(short, long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Override the target frame rate
    #[arg(long)]
    frame_rate: Option<u32>,

    /// Do not paint the display
    #[arg(long)]
    no_display: bool,

    /// List available MIDI ports
    #[arg(long)]
    list_ports: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let args = Args::parse();

    init_logging(&args.log_level)?;

    info!("Starting padctl v{}...", env!("CARGO_PKG_VERSION"));

    let paths = match &args.settings {
        Some(path) => AppPaths::with_settings(path),
        None => AppPaths::detect(),
    };
    if let Err(e) = paths.ensure_directories() {
        warn!("{:#}", e);
    }
    info!("Settings file: {}", paths.settings.display());

    let mut settings = Settings::load(&paths.settings);
    if let Some(rate) = args.frame_rate {
        settings.target_frame_rate = rate.clamp(1, MAX_FRAME_RATE);
    }
    if args.no_display {
        settings.use_display = false;
    }

    let backend: Arc<dyn MidiBackend> = Arc::new(MidirBackend);

    if args.list_ports {
        list_ports(backend.as_ref(), &settings.controller_port);
        return Ok(());
    }

    let project = match &args.project {
        Some(path) => Project::load(path)?,
        None => Project::default(),
    };
    info!("Project loaded with {} track(s)", project.tracks.len());

    let (event_tx, event_rx) = mpsc::channel(1000);
    let (midi_tx, midi_rx) = mpsc::channel(1000);

    let router = MidiRouter::new(
        backend.clone(),
        settings.controller_port.clone(),
        midi_tx,
        settings.midi_in_notify,
    );

    let controller = Arc::new(MidiController::new(
        backend,
        settings.controller_port.clone(),
        event_tx,
    ));
    if let Err(e) = controller.connect() {
        warn!("Controller not connected yet ({:#}), will keep retrying", e);
    }

    let app = App::new(
        settings,
        Some(paths.settings.clone()),
        project,
        router,
        controller as Arc<dyn Controller>,
        Box::new(NullDisplay::default()),
    );
    app.start();

    Arc::new(app)
        .run(event_rx, midi_rx, shutdown_signal())
        .await;

    info!("padctl shutdown complete");
    Ok(())
}

fn init_logging(level: &str) -> Result<()> {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_thread_ids(false)
                .with_thread_names(false),
        )
        .init();

    Ok(())
}

async fn shutdown_signal() {
    tokio::signal::ctrl_c()
        .await
        .expect("Failed to install CTRL+C signal handler");
    info!("Shutdown signal received");
}

fn list_ports(backend: &dyn MidiBackend, controller_port: &str) {
    use colored::*;

    println!("\n{}", "=== Available MIDI Ports ===".bold().cyan());

    let pattern = controller_port.to_lowercase();
    let print = |title: &str, names: Vec<String>| {
        println!("\n{}", title.bold());
        if names.is_empty() {
            println!("  {}", "(none)".dimmed());
        }
        for (i, name) in names.iter().enumerate() {
            let tag = if name.to_lowercase().contains(&pattern) {
                "[CONTROLLER]".yellow()
            } else {
                "[DEVICE]".green()
            };
            println!("  {}: {} {}", i, name, tag);
        }
    };

    match backend.input_names() {
        Ok(names) => print("Input Ports:", names),
        Err(e) => println!("{} {}", "Failed to list inputs:".red(), e),
    }
    match backend.output_names() {
        Ok(names) => print("Output Ports:", names),
        Err(e) => println!("{} {}", "Failed to list outputs:".red(), e),
    }
    println!();
}
