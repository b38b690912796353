use flate2::write::DeflateDecoder;
use indicatif::ProgressBar;
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use crate::config::PathPolicy;
use crate::error::{Error, Result};
use crate::io::{LocalFileReader, ReadAt};

use super::parser::ZipParser;
use super::structures::{CompressionMethod, ZipFileEntry};

/// Compressed bytes read from the archive per step.
const READ_CHUNK: usize = 32 * 1024;

/// Turns an entry's stored bytes into its contents, one chunk at a time.
///
/// Decoded bytes collect in the inner buffer until the caller drains it.
enum EntryDecoder {
    Stored(Vec<u8>),
    Deflate(DeflateDecoder<Vec<u8>>),
}

impl EntryDecoder {
    fn for_entry(entry: &ZipFileEntry) -> Result<Self> {
        match entry.compression_method {
            CompressionMethod::Stored => Ok(Self::Stored(Vec::with_capacity(READ_CHUNK))),
            CompressionMethod::Deflate => Ok(Self::Deflate(DeflateDecoder::new(Vec::new()))),
            CompressionMethod::Unknown(method) => Err(Error::archive(format!(
                "{}: unsupported compression method {}",
                entry.file_name, method
            ))),
        }
    }

    fn feed(&mut self, input: &[u8]) -> io::Result<()> {
        match self {
            Self::Stored(out) => {
                out.extend_from_slice(input);
                Ok(())
            }
            Self::Deflate(decoder) => decoder.write_all(input),
        }
    }

    fn finish(&mut self) -> io::Result<()> {
        match self {
            Self::Stored(_) => Ok(()),
            Self::Deflate(decoder) => decoder.try_finish(),
        }
    }

    fn output(&mut self) -> &mut Vec<u8> {
        match self {
            Self::Stored(out) => out,
            Self::Deflate(decoder) => decoder.get_mut(),
        }
    }
}

/// Running state of one entry being written to disk.
struct EntrySink<'a> {
    entry: &'a ZipFileEntry,
    file: fs::File,
    crc: flate2::Crc,
    written: u64,
}

impl EntrySink<'_> {
    /// Move decoded bytes to the file, refusing to go past the recorded size.
    async fn drain(&mut self, out: &mut Vec<u8>) -> Result<()> {
        if out.is_empty() {
            return Ok(());
        }
        if self.written + out.len() as u64 > self.entry.uncompressed_size {
            return Err(Error::archive(format!(
                "{}: decodes to more than the recorded {} bytes",
                self.entry.file_name, self.entry.uncompressed_size
            )));
        }

        self.crc.update(out);
        self.file.write_all(out).await?;
        self.written += out.len() as u64;
        out.clear();
        Ok(())
    }

    async fn finish(mut self) -> Result<()> {
        self.file.flush().await?;

        if self.written != self.entry.uncompressed_size {
            return Err(Error::archive(format!(
                "{}: expected {} bytes, got {}",
                self.entry.file_name, self.entry.uncompressed_size, self.written
            )));
        }
        if self.crc.sum() != self.entry.crc32 {
            return Err(Error::archive(format!(
                "{}: CRC-32 mismatch (expected {:08x}, got {:08x})",
                self.entry.file_name,
                self.entry.crc32,
                self.crc.sum()
            )));
        }
        Ok(())
    }
}

/// ZIP file extractor
pub struct ZipExtractor<R: ReadAt> {
    parser: ZipParser<R>,
}

impl<R: ReadAt> ZipExtractor<R> {
    pub fn new(reader: Arc<R>) -> Self {
        Self {
            parser: ZipParser::new(reader),
        }
    }

    /// List all files in the archive
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        self.parser.list_files().await
    }

    /// Extract file to disk, replacing whatever is at `output_path`.
    ///
    /// The entry is streamed: at most one chunk of stored bytes and its decoded
    /// output are held at a time. Size and CRC-32 are checked once the whole
    /// entry has been written; on failure the partial file stays on disk.
    pub async fn extract_to_file(&self, entry: &ZipFileEntry, output_path: &Path) -> Result<()> {
        if entry.is_encrypted() {
            return Err(Error::archive(format!(
                "{}: encrypted entries are not supported",
                entry.file_name
            )));
        }
        let mut decoder = EntryDecoder::for_entry(entry)?;

        let data_offset = self.parser.get_data_offset(entry).await?;
        self.parser
            .check_region(data_offset, entry.compressed_size, &entry.file_name)?;

        if let Some(parent) = output_path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }

        let mut sink = EntrySink {
            entry,
            file: fs::File::create(output_path).await?,
            crc: flate2::Crc::new(),
            written: 0,
        };
        let corrupt = |e: io::Error| {
            Error::archive(format!("{}: corrupt deflate stream: {}", entry.file_name, e))
        };

        let end = data_offset + entry.compressed_size;
        let mut buf = vec![0u8; READ_CHUNK];
        let mut offset = data_offset;
        while offset < end {
            let n = (end - offset).min(READ_CHUNK as u64) as usize;
            self.parser
                .read_into(offset, &mut buf[..n], &entry.file_name)
                .await?;
            decoder.feed(&buf[..n]).map_err(corrupt)?;
            sink.drain(decoder.output()).await?;
            offset += n as u64;
        }

        decoder.finish().map_err(corrupt)?;
        sink.drain(decoder.output()).await?;
        sink.finish().await
    }

    /// Extract every entry under `output_dir`, in central directory order.
    ///
    /// `bar` is sized to the entry count and advanced once per entry. Returns
    /// the paths created, one per entry.
    pub async fn extract_all(
        &self,
        output_dir: &Path,
        policy: PathPolicy,
        bar: &ProgressBar,
    ) -> Result<Vec<PathBuf>> {
        let entries = self.list_files().await?;
        bar.set_length(entries.len() as u64);

        let mut extracted = Vec::with_capacity(entries.len());
        for entry in &entries {
            let output_path = entry_output_path(output_dir, &entry.file_name, policy)?;

            if entry.is_directory {
                fs::create_dir_all(&output_path).await?;
            } else {
                self.extract_to_file(entry, &output_path).await?;
            }
            tracing::debug!(entry = %entry.file_name, "extracted");

            extracted.push(output_path);
            bar.inc(1);
        }

        bar.finish();
        Ok(extracted)
    }
}

/// Open the ZIP at `archive_path` and extract all of it under `output_dir`.
pub async fn extract_archive(
    archive_path: &Path,
    output_dir: &Path,
    policy: PathPolicy,
    bar: &ProgressBar,
) -> Result<Vec<PathBuf>> {
    let reader = Arc::new(LocalFileReader::new(archive_path)?);
    let extracted = ZipExtractor::new(reader)
        .extract_all(output_dir, policy, bar)
        .await?;

    tracing::info!(
        archive = %archive_path.display(),
        entries = extracted.len(),
        "extraction finished"
    );
    Ok(extracted)
}

/// Where an entry named `name` lands under `root`.
///
/// Leading `/` and drive prefixes are always dropped, so the result starts
/// with `root`. `..` is kept as stored unless `policy` is
/// [`PathPolicy::Confined`], which rejects it.
pub fn entry_output_path(root: &Path, name: &str, policy: PathPolicy) -> Result<PathBuf> {
    let relative = Path::new(name);

    if policy == PathPolicy::Confined {
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
        if escapes {
            return Err(Error::Io(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("archive entry {:?} resolves outside the output directory", name),
            )));
        }
    }

    let mut path = root.to_path_buf();
    for component in relative.components() {
        match component {
            Component::Prefix(_) | Component::RootDir => {}
            other => path.push(other),
        }
    }
    Ok(path)
}
