//! Screen Mirror
//!
//! Mirrors the X11 desktop (or a Linux framebuffer) onto a 3.5" ST7796 SPI panel and reports
//! FT6336 touch-down events on stderr.
//!
//! # Usage
//!
//! ```bash
//! # Mirror with the default wiring (landscape, touch enabled)
//! mirror-screen run
//!
//! # Use a config file and override the rotation
//! mirror-screen run --config /etc/mirror-screen.toml --orientation portrait
//!
//! # List supported orientations
//! mirror-screen orientations
//!
//! # Write the default configuration
//! mirror-screen config --output mirror-screen.toml
//! ```

mod capture;
mod config;
mod hardware;
mod signal;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::Colorize;
use std::io::IsTerminal;
use std::path::PathBuf;

use spi_mirror::{FrameDiff, Mirror, Orientation, TouchPoint};

use capture::Capture;
use config::Config;
use hardware::Hardware;

/// Screen Mirror
///
/// Mirror the desktop onto an SPI LCD with touch reporting
#[derive(Parser)]
#[command(name = "mirror-screen")]
#[command(author = "Prasanna Gautam")]
#[command(version = "0.1.0")]
#[command(about = "Mirror the desktop onto an ST7796 SPI panel")]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Start mirroring until interrupted
    Run {
        /// Configuration file (defaults apply when omitted)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Panel orientation (name or index 0-3), overrides the config file
        #[arg(short, long)]
        orientation: Option<Orientation>,

        /// Do not open the touch controller
        #[arg(long)]
        no_touch: bool,
    },

    /// List supported orientations
    Orientations,

    /// Print the default configuration
    Config {
        /// Output path (default: stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logger
    let default_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();

    match cli.command {
        Commands::Run {
            config,
            orientation,
            no_touch,
        } => handle_run(config, orientation, no_touch),
        Commands::Orientations => {
            print_orientations();
            Ok(())
        }
        Commands::Config { output } => handle_config(output),
    }
}

fn handle_run(config_path: Option<PathBuf>, orientation: Option<Orientation>, no_touch: bool) -> Result<()> {
    let mut config = match config_path {
        Some(path) => Config::load(&path)?,
        None => Config::default(),
    };
    if let Some(orientation) = orientation {
        config.orientation = orientation;
    }
    if no_touch {
        config.touch.enabled = false;
    }
    let orientation = config.orientation;
    let (width, height) = orientation.dimensions();
    log::info!("orientation {} ({}x{})", orientation, width, height);

    signal::install().context("installing signal handlers")?;

    let mut hw = Hardware::open(&config, orientation, config.touch.enabled)?;
    hw.init_panel()?;
    let capture = Capture::open(&config.capture).context("opening capture source")?;

    // Session stays alive until the end of this function
    let Hardware { panel, touch, session } = hw;

    let mut mirror = Mirror::new(capture, touch, panel, FrameDiff::new(orientation))
        .with_stats_interval(config.stats_interval);
    if config.full_refresh_on_start {
        mirror.invalidate();
    }

    let mode = orientation.index();
    let prefix = touch_prefix(std::io::stderr().is_terminal());
    let stats = mirror.run(signal::stop_flag(), |iteration| {
        if let Some(point) = iteration.touch {
            eprintln!("{}", touch_line(&prefix, point, mode));
        }
    });
    log::info!("stopped after {}", stats);

    let (_, touch, _) = mirror.into_parts();
    if let Some(errors) = touch.map(|t| t.bus_errors()).filter(|&n| n > 0) {
        log::warn!("{} touch controller reads failed", errors);
    }

    drop(session);
    Ok(())
}

/// `[TOUCH]`, coloured only when stderr is a terminal
fn touch_prefix(colour: bool) -> String {
    if colour {
        "[TOUCH]".green().bold().to_string()
    } else {
        String::from("[TOUCH]")
    }
}

/// One touch report: `[TOUCH] X: %3d | Y: %3d | Mode: <index>`
fn touch_line(prefix: &dyn std::fmt::Display, point: TouchPoint, mode: u8) -> String {
    format!("{} X: {:3} | Y: {:3} | Mode: {}", prefix, point.x, point.y, mode)
}

fn print_orientations() {
    println!("{}", "=".repeat(60));
    println!("{}", "Supported Orientations".cyan().bold());
    println!("{}", "=".repeat(60));

    for orientation in Orientation::ALL {
        let spec = orientation.spec();
        println!(
            "\n  {} {}",
            orientation.index().to_string().white().bold(),
            orientation.name().white().bold()
        );
        println!("    Resolution: {}x{}", spec.width, spec.height);
        println!("    MADCTL: {:#04x}", spec.madctl);
    }

    println!("\n{}", "=".repeat(60));
    println!(
        "Use {} to select one",
        "mirror-screen run --orientation <name>".cyan()
    );
}

fn handle_config(output: Option<PathBuf>) -> Result<()> {
    let config = Config::default();
    match output {
        Some(path) => {
            config.save(&path)?;
            println!(
                "{} Default configuration written to {}",
                "[OK]".green().bold(),
                path.display()
            );
        }
        None => print!("{}", config.to_toml()?),
    }
    Ok(())
}
