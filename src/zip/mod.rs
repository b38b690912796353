//! ZIP archive reading and extraction.
//!
//! - [`structures`]: fixed-layout records (EOCD, ZIP64 EOCD, entry metadata)
//! - [`parser`]: locates the central directory and decodes the entry list
//! - [`extractor`]: turns entries into files on disk
//!
//! Archives are read from the end: the End of Central Directory record points
//! at the central directory, which lists every entry with its sizes, CRC-32 and
//! the offset of its local header. Entries are either STORED or DEFLATE
//! compressed; encrypted and multi-disk archives are rejected.

mod extractor;
mod parser;
mod structures;

pub use extractor::{ZipExtractor, entry_output_path, extract_archive};
pub use parser::ZipParser;
pub use structures::*;

/// Build an in-memory archive; `None` content marks a directory entry.
#[cfg(test)]
pub(crate) fn build_test_archive(
    entries: &[(&str, Option<&[u8]>)],
    method: ::zip::CompressionMethod,
) -> Vec<u8> {
    use ::zip::write::SimpleFileOptions;
    use std::io::Write;

    let mut writer = ::zip::ZipWriter::new(std::io::Cursor::new(Vec::new()));

    for (name, content) in entries {
        let options = SimpleFileOptions::default().compression_method(method);
        match content {
            Some(data) => {
                writer.start_file(*name, options).unwrap();
                writer.write_all(data).unwrap();
            }
            None => writer.add_directory(*name, options).unwrap(),
        }
    }

    writer.finish().unwrap().into_inner()
}

#[cfg(test)]
pub(crate) fn test_archive(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    build_test_archive(entries, ::zip::CompressionMethod::Deflated)
}

#[cfg(test)]
pub(crate) fn test_archive_stored(entries: &[(&str, Option<&[u8]>)]) -> Vec<u8> {
    build_test_archive(entries, ::zip::CompressionMethod::Stored)
}
