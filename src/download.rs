//! Download phase: stream a URL into a local file in fixed-size chunks.

use indicatif::ProgressBar;
use reqwest::{Client, Url};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::SizePolicy;
use crate::error::{Error, Result};
use crate::io::{HttpStream, ReadChunk};

/// Largest read issued against the response body.
pub const CHUNK_SIZE: usize = 8192;

/// Result of the download phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadedArchive {
    /// Where the body was written.
    pub path: PathBuf,
    /// Size announced by `Content-Length`.
    pub declared_len: u64,
    /// Bytes actually written to `path`.
    pub written: u64,
}

impl DownloadedArchive {
    pub fn is_complete(&self) -> bool {
        self.written == self.declared_len
    }
}

/// Local file name for a URL: its last path segment.
pub fn file_name_from_url(url: &str) -> Result<String> {
    let parsed =
        Url::parse(url).map_err(|e| Error::Network(format!("invalid URL {:?}: {}", url, e)))?;

    parsed
        .path_segments()
        .and_then(|segments| segments.last())
        .filter(|name| !name.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::Parsing(format!("URL {:?} has no file name segment", url)))
}

/// Fetch `url` into `output_dir`, advancing `bar` by bytes written.
///
/// The connection is opened before the output file is created, so a failed
/// connection leaves nothing behind.
pub async fn download(
    client: &Client,
    url: &str,
    output_dir: &Path,
    policy: SizePolicy,
    bar: &ProgressBar,
) -> Result<DownloadedArchive> {
    let mut stream = HttpStream::open(client, url).await?;
    let file_name = file_name_from_url(url)?;
    let declared_len = stream.content_length();

    println!("Downloading: {} Bytes: {}", file_name, declared_len);

    let path = output_dir.join(&file_name);
    let written = write_stream(&mut stream, declared_len, &path, policy, bar).await?;

    tracing::info!(path = %path.display(), written, declared_len, "download finished");

    Ok(DownloadedArchive {
        path,
        declared_len,
        written,
    })
}

/// Copy `source` into a freshly truncated file at `path`.
///
/// Reads at most [`CHUNK_SIZE`] bytes at a time and never asks for more than
/// `declared_len` in total. A zero-length read ends the copy early; `policy`
/// decides whether that is an error.
pub async fn write_stream<S>(
    source: &mut S,
    declared_len: u64,
    path: &Path,
    policy: SizePolicy,
    bar: &ProgressBar,
) -> Result<u64>
where
    S: ReadChunk + ?Sized,
{
    let mut file = fs::File::create(path).await?;
    bar.set_length(declared_len);

    let mut buf = vec![0u8; CHUNK_SIZE];
    let mut written = 0u64;

    while written < declared_len {
        let want = (declared_len - written).min(CHUNK_SIZE as u64) as usize;
        let n = source.read_chunk(&mut buf[..want]).await?;
        if n == 0 {
            break;
        }

        file.write_all(&buf[..n]).await?;
        written += n as u64;
        bar.inc(n as u64);
    }

    file.flush().await?;

    if written == declared_len {
        bar.finish();
        return Ok(written);
    }

    bar.abandon();
    match policy {
        SizePolicy::Lenient => {
            tracing::warn!(
                "{}: stream ended after {} of {} declared bytes",
                path.display(),
                written,
                declared_len
            );
            Ok(written)
        }
        SizePolicy::Strict => Err(Error::Io(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!(
                "{}: received {} of {} declared bytes",
                path.display(),
                written,
                declared_len
            ),
        ))),
    }
}
