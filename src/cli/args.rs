//! CLI argument definitions.

use super::validators::{
    parse_acceptance_multiplier, parse_confidence, parse_degrees, parse_fps, parse_meters,
};
use crate::cluster::ProximityMetric;
use crate::config::OutputFormat;
use crate::detection::DetectionId;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Align object detections from video frames with GPS fixes and group them
/// into spatial clusters.
#[derive(Debug, Parser)]
#[command(name = "geoalign")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to run.
    #[command(subcommand)]
    pub command: Option<Command>,

    /// Recording metadata files or directories to process.
    ///
    /// Each `<stem>.json` is paired with `<stem>.detections.csv` next to it.
    pub inputs: Vec<PathBuf>,

    /// Options for processing.
    #[command(flatten)]
    pub process: ProcessArgs,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Manage configuration.
    Config {
        /// Configuration action to perform.
        #[command(subcommand)]
        action: ConfigAction,
    },
    /// Edit detection statuses in a report and recompute its clusters.
    Recluster {
        /// Report written by an earlier run (`<stem>.geoalign.json`).
        report: PathBuf,

        /// Detections to mark cleaned (`FRAME:INDEX`, comma-separated).
        #[arg(long, value_delimiter = ',')]
        cleaned: Vec<DetectionId>,

        /// Detections to mark pending again (`FRAME:INDEX`, comma-separated).
        #[arg(long, value_delimiter = ',')]
        pending: Vec<DetectionId>,

        /// Output formats to rewrite (default: json).
        #[arg(short, long, value_delimiter = ',')]
        format: Option<Vec<OutputFormat>>,

        /// Suppress informational output.
        #[arg(short, long)]
        quiet: bool,

        /// Increase verbosity.
        #[arg(short, long, action = clap::ArgAction::Count)]
        verbose: u8,
    },
}

/// Config subcommand actions.
#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigAction {
    /// Create default configuration file.
    Init,
    /// Display current configuration.
    Show,
    /// Print configuration file path.
    Path,
}

/// Arguments for processing recordings.
#[derive(Debug, Args)]
#[allow(clippy::struct_excessive_bools)]
pub struct ProcessArgs {
    /// Frame rate for every recording (overrides metadata).
    #[arg(long, value_parser = parse_fps, env = "GEOALIGN_FPS")]
    pub fps: Option<f64>,

    /// GPS sampling interval in milliseconds (overrides metadata).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..), env = "GEOALIGN_INTERVAL_MS")]
    pub interval_ms: Option<u64>,

    /// Match window as a multiple of the GPS interval.
    #[arg(long, value_parser = parse_acceptance_multiplier, env = "GEOALIGN_ACCEPTANCE_MULTIPLIER")]
    pub acceptance_multiplier: Option<f64>,

    /// Proximity metric for clustering (box, haversine).
    #[arg(long, env = "GEOALIGN_METRIC")]
    pub metric: Option<ProximityMetric>,

    /// Latitude threshold in degrees (box metric).
    #[arg(long, value_parser = parse_degrees, env = "GEOALIGN_LAT_THRESHOLD")]
    pub lat_threshold: Option<f64>,

    /// Longitude threshold in degrees (box metric).
    #[arg(long, value_parser = parse_degrees, env = "GEOALIGN_LNG_THRESHOLD")]
    pub lng_threshold: Option<f64>,

    /// Cluster radius in meters (haversine metric).
    #[arg(long, value_parser = parse_meters, env = "GEOALIGN_RADIUS_METERS")]
    pub radius_meters: Option<f64>,

    /// Minimum confidence threshold (0.0-1.0).
    #[arg(short = 'c', long, value_parser = parse_confidence, env = "GEOALIGN_MIN_CONFIDENCE")]
    pub min_confidence: Option<f32>,

    /// Minimum frames between kept detecting frames (0 disables).
    #[arg(long, env = "GEOALIGN_MIN_FRAME_GAP")]
    pub min_frame_gap: Option<u64>,

    /// Output formats (comma-separated: json,csv,geojson).
    #[arg(short, long, value_delimiter = ',', env = "GEOALIGN_FORMAT")]
    pub format: Option<Vec<OutputFormat>>,

    /// Output directory (default: same as input).
    #[arg(short, long, env = "GEOALIGN_OUTPUT_DIR")]
    pub output_dir: Option<PathBuf>,

    /// Recordings processed at the same time.
    #[arg(short, long, value_parser = clap::value_parser!(u16).range(1..), env = "GEOALIGN_JOBS")]
    pub jobs: Option<u16>,

    /// Reprocess recordings even if output exists.
    #[arg(long)]
    pub force: bool,

    /// Stop on first error.
    #[arg(long)]
    pub fail_fast: bool,

    /// Suppress progress output.
    #[arg(short, long)]
    pub quiet: bool,

    /// Increase verbosity (-v: debug, -vv: trace).
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable progress bars.
    #[arg(long)]
    pub no_progress: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic, clippy::float_cmp)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_process_flags() {
        let cli = Cli::try_parse_from([
            "geoalign",
            "walk.json",
            "--fps",
            "25",
            "--metric",
            "haversine",
            "--radius-meters",
            "30",
            "-f",
            "json,geojson",
            "-j",
            "2",
        ])
        .unwrap();

        assert_eq!(cli.inputs, vec![PathBuf::from("walk.json")]);
        assert_eq!(cli.process.fps, Some(25.0));
        assert_eq!(cli.process.metric, Some(ProximityMetric::Haversine));
        assert_eq!(cli.process.radius_meters, Some(30.0));
        assert_eq!(
            cli.process.format,
            Some(vec![OutputFormat::Json, OutputFormat::Geojson])
        );
        assert_eq!(cli.process.jobs, Some(2));
    }

    #[test]
    fn test_parse_recluster() {
        let cli = Cli::try_parse_from([
            "geoalign",
            "recluster",
            "walk.geoalign.json",
            "--cleaned",
            "30:0,60",
            "--pending",
            "90:1",
        ])
        .unwrap();

        match cli.command {
            Some(Command::Recluster {
                report,
                cleaned,
                pending,
                ..
            }) => {
                assert_eq!(report, PathBuf::from("walk.geoalign.json"));
                assert_eq!(cleaned, vec![DetectionId::new(30, 0), DetectionId::new(60, 0)]);
                assert_eq!(pending, vec![DetectionId::new(90, 1)]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn test_rejects_bad_values() {
        assert!(Cli::try_parse_from(["geoalign", "--fps", "0"]).is_err());
        assert!(Cli::try_parse_from(["geoalign", "--interval-ms", "0"]).is_err());
        assert!(Cli::try_parse_from(["geoalign", "--metric", "manhattan"]).is_err());
        assert!(Cli::try_parse_from(["geoalign", "-c", "1.5"]).is_err());
    }
}
