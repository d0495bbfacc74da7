//! Resolution selector - command-line entry point
//!
//! Exposes both node contracts (curated selector and Wan2.2 presets) plus
//! the radial attention tooling on the command line.

use anyhow::{Context, Result};
use tracing::{debug, error, info};
use tracing_subscriber::EnvFilter;

use resolution_selector::cli::{Cli, Commands, RadialArgs};
use resolution_selector::logic::radial::{update_resolutions_for_radial_attention, RadialSettings};
use resolution_selector::presets::{PresetCatalog, PresetMode, PresetsNode};
use resolution_selector::types::{BlockSize, Quality, RadialMode, Resolution, SquareScan};
use resolution_selector::{NoopObserver, ResolutionTable, SelectorConfig, TracingObserver};

/// Initialize the tracing subscriber with appropriate settings
fn init_logger(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    // RUST_LOG overrides the default level
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Main application entry point
fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_logger(cli.verbose);
    debug!("CLI arguments parsed");

    let config = match &cli.config {
        Some(path) => {
            info!("Loading configuration file: {:?}", path);
            let config = SelectorConfig::load_from_file(path)?;
            config.validate()?;
            config
        }
        None => SelectorConfig::new(),
    };

    match cli.command {
        Commands::Select {
            family,
            aspect,
            quality,
            radial,
            radial_args,
            json,
        } => {
            let selector = config.build_selector(Box::new(TracingObserver));
            let mut settings = merge_radial(&config.radial, &radial_args);
            settings.enabled |= radial;

            let resolution = selector.get_resolution(&family, &aspect, &quality, Some(&settings));
            if json {
                let (width, height): (u32, u32) = resolution.into();
                println!("{}", serde_json::json!({ "width": width, "height": height }));
            } else {
                println!("{}", resolution);
            }
        }
        Commands::Preset {
            mode,
            aspect,
            resolution,
        } => {
            let node = PresetsNode::default();
            println!("{}", node.get_resolution(&mode, &aspect, &resolution));
        }
        Commands::Presets { mode, aspect } => {
            let modes = match mode {
                Some(label) => vec![label
                    .parse::<PresetMode>()
                    .with_context(|| format!("Unknown preset mode '{}'", label))?],
                None => PresetCatalog::modes().collect(),
            };
            print_presets(&modes, aspect.as_deref());
        }
        Commands::Compat {
            width,
            height,
            radial_args,
        } => {
            let settings = merge_radial(&config.radial, &radial_args);
            let adjusted = settings.adjust(Resolution::new(width, height), &TracingObserver);
            println!("{}", adjusted);
            if !adjusted.is_radial_compatible(settings.block_size) {
                info!(
                    "{} is not block aligned for block_size={} (search window exhausted)",
                    adjusted, settings.block_size
                );
            }
        }
        Commands::RadialTable { radial_args, json } => {
            let settings = merge_radial(&config.radial, &radial_args);
            let table = config.table();
            let update = update_resolutions_for_radial_attention(&table, &settings, &NoopObserver);
            if json {
                println!("{}", update.table.to_json()?);
            } else {
                for change in &update.changes {
                    println!("{}: {} -> {}", change.path(), change.from, change.to);
                }
                let total = table.leaves().count();
                println!("{} of {} entries adjusted", update.changes.len(), total);
            }
        }
        Commands::Report { square_scan } => run_report(&config.table(), square_scan),
        Commands::Validate { config } => {
            info!("Validating configuration file: {:?}", config);
            match SelectorConfig::load_from_file(&config).and_then(|c| c.validate()) {
                Ok(()) => {
                    info!("Configuration validation successful");
                    println!("✓ Configuration file is valid: {:?}", config);
                }
                Err(e) => {
                    error!("Configuration validation failed: {:#}", e);
                    eprintln!("✗ Configuration validation failed: {:#}", e);
                    std::process::exit(1);
                }
            }
        }
        Commands::InitConfig { path, with_table } => {
            let mut fresh = SelectorConfig::new();
            if with_table {
                fresh.table = Some(ResolutionTable::builtin());
            }
            fresh.save_to_file(&path)?;
            println!("Configuration written to {:?}", path);
        }
    }

    Ok(())
}

/// Command-line flags override the configured radial settings
fn merge_radial(base: &RadialSettings, args: &RadialArgs) -> RadialSettings {
    RadialSettings {
        enabled: base.enabled,
        mode: args.radial_mode.unwrap_or(base.mode),
        block_size: args.block_size.unwrap_or(base.block_size),
        square_scan: args.square_scan.unwrap_or(base.square_scan),
    }
}

fn print_presets(modes: &[PresetMode], aspect: Option<&str>) {
    let catalog = PresetCatalog::default();
    for mode in modes {
        println!("{} (divisible by {})", mode, mode.divisor());
        println!("  {}", mode.vae_hint());

        let aspects = match aspect {
            Some(a) => vec![a],
            None => catalog.aspect_ratios(*mode),
        };
        for aspect in aspects {
            let list: Vec<String> = catalog
                .resolutions(*mode, aspect)
                .iter()
                .map(ToString::to_string)
                .collect();
            let default = catalog
                .default_resolution(*mode, aspect)
                .map(|res| res.to_string())
                .unwrap_or_else(|| "-".to_string());
            println!("  {:<16} default {:<10} [{}]", aspect, default, list.join(", "));
        }
    }
}

/// Sweep every block size and mode over the entries radial attention trips on
fn run_report(table: &ResolutionTable, square_scan: SquareScan) {
    const MODES: [RadialMode; 3] =
        [RadialMode::Upscale, RadialMode::Downscale, RadialMode::Closest];
    const PROBLEMATIC: [(&str, &str, Quality); 2] = [
        ("T2V14B", "Horizontal", Quality::MQ),
        ("IMG", "Cinematic", Quality::LQ),
    ];

    for block_size in [BlockSize::B64, BlockSize::B128] {
        println!("\n=== BLOCK SIZE {} ===", block_size);
        println!("Original problematic size: 624x624");
        for mode in MODES {
            let settings = RadialSettings::enabled(mode, block_size).with_square_scan(square_scan);
            let adjusted = settings.adjust(Resolution::new(624, 624), &NoopObserver);
            println!("{} mode: {}", mode, adjusted);
        }

        for mode in MODES {
            let settings = RadialSettings::enabled(mode, block_size).with_square_scan(square_scan);
            let update = update_resolutions_for_radial_attention(table, &settings, &NoopObserver);
            println!("\n{} MODE:", mode.to_string().to_uppercase());

            println!("Squarish resolutions:");
            for leaf in update.table.leaves().filter(|leaf| leaf.aspect_ratio == "Squarish") {
                print_leaf(
                    table,
                    leaf.model_family,
                    leaf.aspect_ratio,
                    leaf.quality,
                    leaf.resolution,
                    false,
                );
            }

            println!("Other potentially problematic:");
            for (family, aspect, quality) in PROBLEMATIC {
                if let Ok(res) = update.table.lookup(family, aspect, quality) {
                    print_leaf(table, family, aspect, quality, res, true);
                }
            }
        }
    }
}

fn print_leaf(
    original: &ResolutionTable,
    family: &str,
    aspect: &str,
    quality: Quality,
    adjusted: Resolution,
    with_aspect: bool,
) {
    let changed = match original.lookup(family, aspect, quality) {
        Ok(res) if res != adjusted => "✓",
        _ => " ",
    };
    if with_aspect {
        println!("  {}-{}-{}: {} {}", family, aspect, quality, adjusted, changed);
    } else {
        println!("  {}-{}: {} {}", family, quality, adjusted, changed);
    }
}
