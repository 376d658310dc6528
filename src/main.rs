// src/main.rs

//! `rfb-replay`: replays a JSON draw script through the display core and
//! writes the presented frame as a PPM image.
//!
//! Usage: `rfb-replay <script.json> [out.ppm]`
//!
//! The display configuration is read from the file named by
//! `RFB_DISPLAY_CONFIG`, if set.

use anyhow::{anyhow, Context};
use log::{info, warn};
use rfb_display::config::DisplayConfig;
use rfb_display::display::{Display, HeadlessDisplayDriver};
use rfb_display::script::{load_script, run_script, write_ppm};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;

const CONFIG_ENV_VAR: &str = "RFB_DISPLAY_CONFIG";
const DEFAULT_OUTPUT: &str = "frame.ppm";

/// Main entry point for the `rfb-replay` application.
fn main() -> anyhow::Result<()> {
    // Initialize the logger. Default filter is "info" if RUST_LOG is not set.
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_micros()
        .init();

    let mut args = std::env::args_os().skip(1);
    let script_path = PathBuf::from(
        args.next()
            .ok_or_else(|| anyhow!("usage: rfb-replay <script.json> [out.ppm]"))?,
    );
    let output_path = args
        .next()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT));

    // --- Configuration ---
    let config = match std::env::var_os(CONFIG_ENV_VAR) {
        Some(path) => {
            let path = PathBuf::from(path);
            info!("Loading configuration from {}", path.display());
            DisplayConfig::load(&path)?
        }
        None => {
            info!("Configuration loaded (using default).");
            DisplayConfig::default()
        }
    };

    let commands = load_script(&script_path)?;
    let mut display = Display::new(HeadlessDisplayDriver::new(), &config)
        .context("Failed to create display")?;

    let base_dir = script_path.parent().unwrap_or_else(|| Path::new("."));
    run_script(&mut display, &commands, base_dir)?;

    // PNG decoding is synchronous, so every queued update has been applied
    // by now unless a decode failed to resolve.
    let drained = Rc::new(Cell::new(false));
    let flag = Rc::clone(&drained);
    display.flush(move || flag.set(true));
    display.handle_decode_completions();
    if !drained.get() {
        warn!(
            "{} update(s) still queued after replay",
            display.pending_updates()
        );
    }
    display.flip();

    let frame = display
        .surface()
        .presented()
        .ok_or_else(|| anyhow!("Nothing was presented"))?;
    let file = std::fs::File::create(&output_path)
        .with_context(|| format!("Failed to create {}", output_path.display()))?;
    write_ppm(frame, std::io::BufWriter::new(file))?;

    info!(
        "Wrote {}x{} frame (presented at {:?}) to {}",
        frame.width,
        frame.height,
        display.presented_size(),
        output_path.display()
    );
    Ok(())
}
