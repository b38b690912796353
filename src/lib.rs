//! # fetchzip
//!
//! Download a ZIP archive over HTTP and unpack it in place.
//!
//! A run has two strictly sequential phases:
//!
//! 1. **Download**: one GET, body streamed to `<dir>/<last URL segment>` in
//!    8192-byte chunks with a byte progress bar. `Content-Length` is required.
//! 2. **Extract**: the downloaded file is read as a ZIP archive and every entry
//!    is written under `<dir>` at its stored relative path, with a per-entry
//!    progress bar.
//!
//! ## Example
//!
//! ```no_run
//! use fetchzip::{Config, run};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config {
//!         url: "https://example.com/archive.zip".to_string(),
//!         output_dir: "data".into(),
//!         ..Config::default()
//!     };
//!
//!     let summary = run(&config).await?;
//!     for path in &summary.extracted {
//!         println!("{}", path.display());
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod app;
pub mod cli;
pub mod config;
pub mod download;
pub mod error;
pub mod io;
pub mod logging;
pub mod progress;
pub mod zip;

pub use crate::zip::{ZipExtractor, ZipFileEntry, extract_archive};
pub use app::{RunSummary, run};
pub use cli::Cli;
pub use config::{Config, PathPolicy, SizePolicy};
pub use download::{DownloadedArchive, download};
pub use error::{Error, Result};
pub use io::{HttpStream, LocalFileReader, ReadAt, ReadChunk};
