//! The two phases wired together: download, then extract.

use std::path::PathBuf;

use crate::config::Config;
use crate::download::{self, DownloadedArchive};
use crate::error::Result;
use crate::io::HttpStream;
use crate::progress;

/// Everything a completed run produced.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub archive: DownloadedArchive,
    pub extracted: Vec<PathBuf>,
}

/// Download `config.url` into `config.output_dir` and unpack it there.
///
/// The archive file is kept after extraction. On failure, anything written so
/// far stays on disk.
pub async fn run(config: &Config) -> Result<RunSummary> {
    tokio::fs::create_dir_all(&config.output_dir).await?;

    let client = HttpStream::client(config.connect_timeout)?;

    let download_bar = progress::download_bar(config.show_progress);
    let archive = download::download(
        &client,
        &config.url,
        &config.output_dir,
        config.size_policy,
        &download_bar,
    )
    .await?;

    let file_name = archive
        .path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    println!("Unzip {}", file_name);

    let extract_bar = progress::extract_bar(config.show_progress);
    let extracted = crate::zip::extract_archive(
        &archive.path,
        &config.output_dir,
        config.path_policy,
        &extract_bar,
    )
    .await?;

    Ok(RunSummary { archive, extracted })
}
