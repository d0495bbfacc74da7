use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::types::{BlockSize, RadialMode, SquareScan};

/// Resolution selector - curated video resolutions and radial attention sizing
#[derive(Parser)]
#[command(name = "resolution-selector")]
#[command(about = "Pick generation resolutions and make them radial-attention compatible")]
#[command(version)]
pub struct Cli {
    /// Configuration file (radial defaults and optional custom table)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable debug diagnostics
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

/// Radial attention flags shared by several commands.
///
/// Unset flags fall back to the configuration file, then to the defaults.
#[derive(clap::Args, Debug, Clone, Default)]
pub struct RadialArgs {
    /// Adjustment direction (upscale, downscale, closest)
    #[arg(long)]
    pub radial_mode: Option<RadialMode>,
    /// Attention block size (64 or 128)
    #[arg(long)]
    pub block_size: Option<BlockSize>,
    /// Square scan policy (nearest, first-match)
    #[arg(long)]
    pub square_scan: Option<SquareScan>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Select a resolution from the curated table
    Select {
        /// Model family (e.g., T2V14B, QWEN)
        #[arg(short, long)]
        family: String,
        /// Aspect ratio (e.g., Horizontal, Wide)
        #[arg(short, long)]
        aspect: String,
        /// Quality tier (HQ, MQ, LQ)
        #[arg(short, long, default_value = "HQ")]
        quality: String,
        /// Apply radial attention adjustment
        #[arg(long)]
        radial: bool,
        #[command(flatten)]
        radial_args: RadialArgs,
        /// Print JSON instead of WIDTHxHEIGHT
        #[arg(long)]
        json: bool,
    },
    /// Resolve a Wan2.2 preset string
    Preset {
        /// Preset mode label
        #[arg(short, long, default_value = "Wan2.2 - 14B Models (I2V/T2V)")]
        mode: String,
        /// Aspect ratio label
        #[arg(short, long, default_value = "16:9 Landscape")]
        aspect: String,
        /// Resolution string (e.g., 1280x720)
        resolution: String,
    },
    /// List the Wan2.2 preset catalog
    Presets {
        /// Preset mode label (all modes when omitted)
        #[arg(short, long)]
        mode: Option<String>,
        /// Restrict the listing to one aspect ratio
        #[arg(short, long)]
        aspect: Option<String>,
    },
    /// Make an arbitrary resolution radial-attention compatible
    Compat {
        width: u32,
        height: u32,
        #[command(flatten)]
        radial_args: RadialArgs,
    },
    /// Apply radial adjustment to the whole table and list the changes
    RadialTable {
        #[command(flatten)]
        radial_args: RadialArgs,
        /// Print the adjusted table as JSON
        #[arg(long)]
        json: bool,
    },
    /// Sweep block sizes and modes over the problematic table entries
    Report {
        /// Square scan policy; first-match reproduces the legacy sweep
        #[arg(long, default_value = "first-match")]
        square_scan: SquareScan,
    },
    /// Validate a configuration file
    Validate {
        /// Path to configuration file to validate
        config: PathBuf,
    },
    /// Write a default configuration file
    InitConfig {
        /// Destination path
        path: PathBuf,
        /// Embed the built-in table so it can be edited
        #[arg(long)]
        with_table: bool,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
