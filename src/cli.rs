use clap::Parser;
use std::path::PathBuf;

/// Capture calendar-page snapshots once and exit.
#[derive(Parser)]
#[command(name = "calshot")]
#[command(about = "Resilient snapshot capture for dynamic calendar pages")]
#[command(version)]
pub struct Cli {
    #[arg(long, help = "Configuration file path (JSON)")]
    pub config: Option<PathBuf>,

    #[arg(long, help = "Output directory for PNG artifacts")]
    pub output_dir: Option<PathBuf>,

    #[arg(long, help = "Chrome executable path")]
    pub chrome_path: Option<String>,

    #[arg(long, help = "Run only the named target (repeatable)")]
    pub target: Vec<String>,

    #[arg(long, help = "List registered targets and exit")]
    pub list_targets: bool,

    #[arg(long, help = "Enable verbose logging")]
    pub verbose: bool,
}
