//! idx-convert CLI - labeled image folders to MNIST IDX files

use std::path::PathBuf;

use clap::Parser;
use idx_convert::{ShapePolicy, SplitMode};

mod commands;

/// Convert a folder of labeled images into MNIST-style IDX files.
///
/// ROOT_FOLDER holds one subdirectory per label. Labels are numbered by the
/// sorted order of the subdirectory names.
#[derive(Parser)]
#[command(name = "idx-convert")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Directory containing one subdirectory per label
    root_folder: PathBuf,

    /// "train", "test", or the percentage of samples that go to test
    #[arg(value_parser = parse_mode)]
    mode: SplitMode,

    /// Files sampled per label (0 or omitted takes all)
    count: Option<usize>,

    /// Output directory
    #[arg(short, long, default_value = idx_convert::idx::DEFAULT_OUTPUT_DIR)]
    output: PathBuf,

    /// Seed for sampling and shuffling (random if omitted)
    #[arg(long, env = "IDX_CONVERT_SEED")]
    seed: Option<u64>,

    /// Accepted image file extension (repeatable)
    #[arg(long = "ext", default_value = "png")]
    extensions: Vec<String>,

    /// What to do with images whose size differs from the first (fail, skip)
    #[arg(long, default_value_t = ShapePolicy::Fail)]
    on_shape_mismatch: ShapePolicy,

    /// Write the run report as JSON
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Read the written files back and check them
    #[arg(long)]
    verify: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn parse_mode(s: &str) -> Result<SplitMode, idx_convert::Error> {
    s.parse()
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    commands::convert::run(cli)
}
