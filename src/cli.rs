use clap::Parser;
use std::path::PathBuf;

/// Archive fetched when no `--url` is given.
pub const DEFAULT_URL: &str = "http://adel.eurecom.fr/data/models-gazetteers-properties.zip";

#[derive(Parser, Debug)]
#[command(name = "fetchzip")]
#[command(version)]
#[command(about = "Download a ZIP archive and unpack it in place", long_about = None)]
#[command(after_help = "Examples:\n  \
  fetchzip                                  fetch the default models archive into .\n  \
  fetchzip -u https://example.com/a.zip     fetch and unpack another archive\n  \
  fetchzip -d models --strict-size          unpack into ./models, reject short downloads")]
pub struct Cli {
    /// URL of the ZIP archive to fetch
    #[arg(short = 'u', long, value_name = "URL", default_value = DEFAULT_URL)]
    pub url: String,

    /// Directory to download and extract into
    #[arg(short = 'd', long = "dir", value_name = "DIR", default_value = ".")]
    pub output_dir: PathBuf,

    /// Fail if the server sends fewer bytes than its Content-Length
    #[arg(long)]
    pub strict_size: bool,

    /// Refuse archive entries that would land outside the output directory
    #[arg(long)]
    pub confine_paths: bool,

    /// Give up connecting after this many seconds
    #[arg(long, value_name = "SECS")]
    pub connect_timeout: Option<u64>,

    /// Do not draw progress bars
    #[arg(short = 'q', long)]
    pub quiet: bool,

    /// Log more (-v info, -vv debug)
    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}
