//! Command-line argument parsing for the Sable Engine.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Sable Engine command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug)]
#[command(name = "sable", about = "Sable Engine")]
pub struct CliArgs {
    /// Simulation speed multiplier.
    #[arg(long)]
    pub timescale: Option<f32>,

    /// Step with a fixed 1/60 s timestep.
    #[arg(long)]
    pub fixed_step: Option<bool>,

    /// Gravity y component in px/s² (y-down).
    #[arg(long)]
    pub gravity_y: Option<f32>,

    /// Enable physics debug drawing.
    #[arg(long)]
    pub debug_draw: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Number of frames the demo simulates.
    #[arg(long, default_value_t = 300)]
    pub frames: u32,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(ts) = args.timescale {
            self.physics.timescale = ts;
        }
        if let Some(fixed) = args.fixed_step {
            self.physics.fixed_step = fixed;
        }
        if let Some(gy) = args.gravity_y {
            self.physics.gravity.1 = gy;
        }
        if let Some(draw) = args.debug_draw {
            self.debug.debug_draw = draw;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
    }
}
