//! Command-line arguments.

use clap::Parser;
use std::path::PathBuf;

use calcifer_core::{Detail, FeatureSensitivity, OutputFormat, SampleOrdering};

/// Reconstruct a 3D model from a folder of photos.
#[derive(Debug, Parser)]
#[command(name = "calcifer", version)]
pub struct Args {
    /// Folder containing the input photos
    #[arg(short, long)]
    pub input: PathBuf,

    /// Output file (usdz) or directory (usda_obj).
    /// Defaults to a file named after the input folder, inside it.
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Output format: usdz or usda_obj
    #[arg(short, long)]
    pub format: Option<OutputFormat>,

    /// Model detail: preview, reduced, medium, full or raw
    #[arg(short, long)]
    pub detail: Option<Detail>,

    /// Sample ordering: unordered or sequential
    #[arg(long)]
    pub sample_ordering: Option<SampleOrdering>,

    /// Feature sensitivity: normal or high
    #[arg(long)]
    pub feature_sensitivity: Option<FeatureSensitivity>,

    /// Configuration file
    #[arg(short, long, env = "CALCIFER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Engine executable, overrides the configured one
    #[arg(long)]
    pub engine: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_args() {
        let args = Args::try_parse_from(["calcifer", "--input", "/scans/teapot"]).unwrap();
        assert_eq!(args.input, PathBuf::from("/scans/teapot"));
        assert!(args.output.is_none());
        assert!(args.detail.is_none());
        assert!(!args.json_logs);
    }

    #[test]
    fn test_all_options() {
        let args = Args::try_parse_from([
            "calcifer",
            "-i",
            "/scans/teapot",
            "-o",
            "/out/scene",
            "--format",
            "usda_obj",
            "--detail",
            "full",
            "--sample-ordering",
            "sequential",
            "--feature-sensitivity",
            "high",
            "--engine",
            "/opt/recon",
            "--json-logs",
        ])
        .unwrap();
        assert_eq!(args.format, Some(OutputFormat::UsdaAndObj));
        assert_eq!(args.detail, Some(Detail::Full));
        assert_eq!(args.sample_ordering, Some(SampleOrdering::Sequential));
        assert_eq!(args.feature_sensitivity, Some(FeatureSensitivity::High));
        assert_eq!(args.engine, Some(PathBuf::from("/opt/recon")));
        assert!(args.json_logs);
    }

    #[test]
    fn test_unknown_detail_is_rejected() {
        let result =
            Args::try_parse_from(["calcifer", "--input", "/scans", "--detail", "ultra"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_input_is_required() {
        assert!(Args::try_parse_from(["calcifer"]).is_err());
    }
}
