//! Geoalign - temporal-spatial alignment of video detections.
//!
//! Pairs object detections produced on video frames with the GPS fixes
//! recorded alongside the video, then groups the geotagged detections into
//! spatial clusters for map display.

#![warn(missing_docs)]

pub mod align;
pub mod cli;
pub mod cluster;
pub mod config;
pub mod constants;
pub mod detection;
pub mod error;
pub mod location;
pub mod output;
pub mod pipeline;

use clap::{CommandFactory, Parser};
use cli::{Cli, Command, ProcessArgs};
use config::{
    Config, OutputFormat, config_file_path, load_default_config, save_default_config,
    validate_config,
};
use detection::{DetectionId, DetectionStatus};
use pipeline::{CancelFlag, ProcessOptions, collect_recordings, process_batch, recluster_report};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::{info, warn};

pub use error::{Error, Result};

/// Main entry point for the geoalign CLI.
pub fn run() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let (verbose, quiet) = match &cli.command {
        Some(Command::Recluster { verbose, quiet, .. }) => (*verbose, *quiet),
        _ => (cli.process.verbose, cli.process.quiet),
    };
    init_logging(verbose, quiet);

    // First Ctrl+C stops scheduling new recordings and interrupts running ones
    let cancel = CancelFlag::new();
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        handler_flag.cancel();
    }) {
        warn!("Failed to install Ctrl+C handler: {e}");
    }

    // Load configuration
    let config = load_default_config()?;
    validate_config(&config)?;

    // Handle subcommands
    if let Some(command) = cli.command {
        return handle_command(command);
    }

    // Show help if no inputs provided
    if cli.inputs.is_empty() {
        Cli::command().print_help()?;
        return Ok(());
    }

    process_recordings(&cli.inputs, &cli.process, &config, &cancel)
}

/// Process recordings with the given options.
fn process_recordings(
    inputs: &[PathBuf],
    args: &ProcessArgs,
    config: &Config,
    cancel: &CancelFlag,
) -> Result<()> {
    let total_start = Instant::now();

    let recordings = collect_recordings(inputs)?;
    if recordings.is_empty() {
        return Err(Error::NoRecordingsFound);
    }

    info!("Found {} recording(s) to process", recordings.len());

    let options = build_process_options(args, config)?;
    let fail_fast = options.fail_fast;
    info!(
        "Clustering with {} metric, {} job(s), formats: {}",
        options.clustering.metric,
        options.jobs,
        options
            .formats
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",")
    );

    let runtime = tokio::runtime::Runtime::new().map_err(|e| Error::Internal {
        message: format!("Failed to create async runtime: {e}"),
    })?;
    let mut summary = runtime.block_on(process_batch(recordings, Arc::new(options), cancel.clone()));

    // Summary
    let total_duration = total_start.elapsed().as_secs_f64();
    info!(
        "Complete: {} processed, {} skipped, {} errors, {} detections, {} unresolved, {} clusters in {:.2}s",
        summary.processed,
        summary.skipped,
        summary.failures.len(),
        summary.detections_created,
        summary.detections_unresolved,
        summary.clusters_created,
        total_duration
    );

    if fail_fast && !summary.failures.is_empty() {
        let (_, e) = summary.failures.swap_remove(0);
        return Err(e);
    }

    if cancel.is_cancelled() {
        warn!("{} recording(s) cancelled", summary.cancelled);
        return Err(Error::Cancelled);
    }

    if !summary.failures.is_empty() {
        warn!("{} recording(s) had errors", summary.failures.len());
    }

    Ok(())
}

/// Merge configuration and command line flags. Flags win.
fn build_process_options(args: &ProcessArgs, config: &Config) -> Result<ProcessOptions> {
    let mut options = ProcessOptions::from_config(config);

    options.output_dir.clone_from(&args.output_dir);
    if let Some(formats) = &args.format {
        options.formats.clone_from(formats);
    }
    options.force = args.force;
    options.fail_fast = args.fail_fast;
    options.progress = !args.quiet && !args.no_progress;
    if let Some(jobs) = args.jobs {
        options.jobs = usize::from(jobs);
    }

    options.fps = args.fps;
    options.location_interval_ms = args.interval_ms;
    if let Some(multiplier) = args.acceptance_multiplier {
        options.acceptance_multiplier = multiplier;
    }

    if let Some(metric) = args.metric {
        options.clustering.metric = metric;
    }
    if let Some(lat) = args.lat_threshold {
        options.clustering.lat_threshold = lat;
    }
    if let Some(lng) = args.lng_threshold {
        options.clustering.lng_threshold = lng;
    }
    if let Some(radius) = args.radius_meters {
        options.clustering.radius_meters = radius;
    }
    options.clustering.validate()?;

    if let Some(min_confidence) = args.min_confidence {
        options.min_confidence = min_confidence;
    }
    if let Some(gap) = args.min_frame_gap {
        options.min_frame_gap = gap;
    }

    Ok(options)
}

fn init_logging(verbose: u8, quiet: bool) {
    use tracing_subscriber::{EnvFilter, fmt};

    // Build filter string based on verbosity level.
    let filter_str = if quiet {
        "warn"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter_str));

    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn handle_command(command: Command) -> Result<()> {
    match command {
        Command::Config { action } => handle_config_command(action),
        Command::Recluster {
            report,
            cleaned,
            pending,
            format,
            ..
        } => handle_recluster(
            &report,
            &cleaned,
            &pending,
            &format.unwrap_or_else(|| vec![OutputFormat::Json]),
        ),
    }
}

fn handle_config_command(action: cli::ConfigAction) -> Result<()> {
    use cli::ConfigAction;

    match action {
        ConfigAction::Init => {
            let path = config_file_path()?;
            if path.exists() {
                println!("Configuration file already exists: {}", path.display());
            } else {
                let config = Config::default();
                let saved_path = save_default_config(&config)?;
                println!("Created configuration file: {}", saved_path.display());
            }
            Ok(())
        }
        ConfigAction::Show => {
            let config = load_default_config()?;
            let contents = toml::to_string_pretty(&config)
                .map_err(|e| Error::ConfigSerialize { source: e })?;
            print!("{contents}");
            Ok(())
        }
        ConfigAction::Path => {
            let path = config_file_path()?;
            println!("{}", path.display());
            Ok(())
        }
    }
}

/// Apply `--cleaned` then `--pending` edits; an id in both ends up pending.
fn handle_recluster(
    report_path: &Path,
    cleaned: &[DetectionId],
    pending: &[DetectionId],
    formats: &[OutputFormat],
) -> Result<()> {
    let updates: Vec<(DetectionId, DetectionStatus)> = cleaned
        .iter()
        .map(|id| (*id, DetectionStatus::Cleaned))
        .chain(pending.iter().map(|id| (*id, DetectionStatus::Pending)))
        .collect();

    let report = recluster_report(report_path, &updates, formats)?;

    println!(
        "{}: {} clusters, {} pending, {} cleaned",
        report.recording,
        report.clusters.len(),
        report.count_with_status(DetectionStatus::Pending),
        report.count_with_status(DetectionStatus::Cleaned)
    );

    Ok(())
}
