//! Run configuration resolved from the command line.

use std::path::PathBuf;
use std::time::Duration;

use crate::cli::{Cli, DEFAULT_URL};

/// What to do when the body ends before `Content-Length` bytes arrived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SizePolicy {
    /// Keep whatever arrived and log a warning.
    #[default]
    Lenient,
    /// Fail the run with an I/O error.
    Strict,
}

/// How archive entry names are mapped onto the output directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PathPolicy {
    /// Join the stored name as is, `..` and absolute names included.
    #[default]
    Raw,
    /// Reject names that would resolve outside the output directory.
    Confined,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub url: String,
    pub output_dir: PathBuf,
    pub size_policy: SizePolicy,
    pub path_policy: PathPolicy,
    pub connect_timeout: Option<Duration>,
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            output_dir: PathBuf::from("."),
            size_policy: SizePolicy::default(),
            path_policy: PathPolicy::default(),
            connect_timeout: None,
            show_progress: true,
        }
    }
}

impl From<&Cli> for Config {
    fn from(cli: &Cli) -> Self {
        Self {
            url: cli.url.clone(),
            output_dir: cli.output_dir.clone(),
            size_policy: if cli.strict_size {
                SizePolicy::Strict
            } else {
                SizePolicy::Lenient
            },
            path_policy: if cli.confine_paths {
                PathPolicy::Confined
            } else {
                PathPolicy::Raw
            },
            connect_timeout: cli.connect_timeout.map(Duration::from_secs),
            show_progress: !cli.quiet,
        }
    }
}
