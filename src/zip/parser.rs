//! Central directory parser.
//!
//! The archive is read from its tail: locate the End of Central Directory,
//! follow it (through the ZIP64 record when fields are saturated) to the
//! central directory, then decode one header per entry. Local file headers are
//! only consulted to find where an entry's data begins.

use byteorder::{LittleEndian, ReadBytesExt};
use std::io::{self, Cursor, Read};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::io::ReadAt;

use super::structures::*;

/// Largest comment the EOCD length field can describe.
const MAX_COMMENT_SIZE: u64 = u16::MAX as u64;

/// ZIP64 extended information extra field.
const ZIP64_EXTRA_ID: u16 = 0x0001;

/// Reads archive structures from any [`ReadAt`] source.
pub struct ZipParser<R: ReadAt> {
    reader: Arc<R>,
    size: u64,
}

impl<R: ReadAt> ZipParser<R> {
    pub fn new(reader: Arc<R>) -> Self {
        let size = reader.size();
        Self { reader, size }
    }

    /// Read `len` bytes at `offset`, treating anything past the end of the
    /// file as a malformed archive rather than a disk failure.
    pub(crate) async fn read_region(&self, offset: u64, len: u64, what: &str) -> Result<Vec<u8>> {
        self.check_region(offset, len, what)?;
        let mut buf = vec![0u8; len as usize];
        self.read_into(offset, &mut buf, what).await?;
        Ok(buf)
    }

    /// Fail unless `offset..offset + len` lies inside the archive.
    pub(crate) fn check_region(&self, offset: u64, len: u64, what: &str) -> Result<()> {
        let in_bounds = offset
            .checked_add(len)
            .is_some_and(|end| end <= self.size);
        if !in_bounds {
            return Err(Error::archive(format!(
                "{} at offset {} (+{} bytes) lies outside the {}-byte archive",
                what, offset, len, self.size
            )));
        }
        Ok(())
    }

    /// Fill `buf` from `offset`, with the same bounds rules as [`Self::read_region`].
    pub(crate) async fn read_into(&self, offset: u64, buf: &mut [u8], what: &str) -> Result<()> {
        self.check_region(offset, buf.len() as u64, what)?;
        match self.reader.read_exact_at(offset, buf).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                Err(Error::archive(format!("{} is truncated", what)))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Locate and decode the End of Central Directory record.
    ///
    /// Returns the record and its offset in the file.
    pub async fn find_eocd(&self) -> Result<(EndOfCentralDirectory, u64)> {
        let eocd_size = EndOfCentralDirectory::SIZE as u64;
        if self.size < eocd_size {
            return Err(Error::archive("not a ZIP archive: file too small"));
        }

        // Common case: no archive comment, record sits at the very end.
        let offset = self.size - eocd_size;
        let tail = self.read_region(offset, eocd_size, "end of central directory").await?;
        if &tail[0..4] == EndOfCentralDirectory::SIGNATURE && tail[20..22] == [0u8, 0] {
            return Ok((EndOfCentralDirectory::from_bytes(&tail)?, offset));
        }

        // Otherwise scan backwards over the window a comment could occupy.
        let search_size = (MAX_COMMENT_SIZE + eocd_size).min(self.size);
        let search_start = self.size - search_size;
        let buf = self
            .read_region(search_start, search_size, "archive tail")
            .await?;

        for i in (0..buf.len() - EndOfCentralDirectory::SIZE).rev() {
            if &buf[i..i + 4] != EndOfCentralDirectory::SIGNATURE {
                continue;
            }
            // Accept only a record whose comment runs exactly to end of file.
            let comment_len = u16::from_le_bytes([buf[i + 20], buf[i + 21]]) as usize;
            if comment_len == buf.len() - i - EndOfCentralDirectory::SIZE {
                let eocd =
                    EndOfCentralDirectory::from_bytes(&buf[i..i + EndOfCentralDirectory::SIZE])?;
                return Ok((eocd, search_start + i as u64));
            }
        }

        Err(Error::archive("not a ZIP archive: no end of central directory record"))
    }

    /// Follow the locator in front of the EOCD to the ZIP64 record.
    pub async fn read_zip64_eocd(&self, eocd_offset: u64) -> Result<Zip64EOCD> {
        let locator_offset = eocd_offset
            .checked_sub(Zip64EOCDLocator::SIZE as u64)
            .ok_or_else(|| Error::archive("ZIP64 locator missing"))?;
        let locator_buf = self
            .read_region(locator_offset, Zip64EOCDLocator::SIZE as u64, "ZIP64 locator")
            .await?;
        let locator = Zip64EOCDLocator::from_bytes(&locator_buf)?;

        let eocd64_buf = self
            .read_region(
                locator.eocd64_offset,
                Zip64EOCD::MIN_SIZE as u64,
                "ZIP64 end of central directory",
            )
            .await?;
        Zip64EOCD::from_bytes(&eocd64_buf)
    }

    /// Read the whole entry list, in central directory order.
    pub async fn list_files(&self) -> Result<Vec<ZipFileEntry>> {
        let (eocd, eocd_offset) = self.find_eocd().await?;

        let (cd_offset, cd_size, total_entries) = if eocd.is_zip64() {
            let eocd64 = self.read_zip64_eocd(eocd_offset).await?;
            (eocd64.cd_offset, eocd64.cd_size, eocd64.total_entries)
        } else {
            (
                eocd.cd_offset as u64,
                eocd.cd_size as u64,
                eocd.total_entries as u64,
            )
        };

        let cd_data = self
            .read_region(cd_offset, cd_size, "central directory")
            .await?;
        tracing::debug!(total_entries, cd_offset, cd_size, "central directory read");

        // Every header is at least 46 bytes, so this bounds the allocation.
        let mut entries = Vec::with_capacity(total_entries.min(cd_size / 46) as usize);
        let mut cursor = Cursor::new(cd_data.as_slice());

        for index in 0..total_entries {
            let entry = parse_cdfh(&mut cursor).map_err(|e| match e {
                Error::Io(io) if io.kind() == io::ErrorKind::UnexpectedEof => Error::archive(
                    format!("central directory ends inside entry {}", index),
                ),
                other => other,
            })?;
            entries.push(entry);
        }

        Ok(entries)
    }

    /// Offset of the first data byte of `entry`, past its local header.
    pub async fn get_data_offset(&self, entry: &ZipFileEntry) -> Result<u64> {
        let lfh = self
            .read_region(entry.lfh_offset, LFH_SIZE as u64, "local file header")
            .await?;

        if &lfh[0..4] != LFH_SIGNATURE {
            return Err(Error::archive(format!(
                "invalid local file header for {}",
                entry.file_name
            )));
        }

        // Name and extra lengths may differ from the central directory copy.
        let file_name_length = u16::from_le_bytes([lfh[26], lfh[27]]) as u64;
        let extra_field_length = u16::from_le_bytes([lfh[28], lfh[29]]) as u64;

        Ok(entry.lfh_offset + LFH_SIZE as u64 + file_name_length + extra_field_length)
    }
}

/// Decode one central directory file header at the cursor.
fn parse_cdfh(cursor: &mut Cursor<&[u8]>) -> Result<ZipFileEntry> {
    let mut sig = [0u8; 4];
    cursor.read_exact(&mut sig)?;
    if sig != CDFH_SIGNATURE {
        return Err(Error::archive("invalid central directory file header"));
    }

    let _version_made_by = cursor.read_u16::<LittleEndian>()?;
    let _version_needed = cursor.read_u16::<LittleEndian>()?;
    let flags = cursor.read_u16::<LittleEndian>()?;
    let compression_method = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_time = cursor.read_u16::<LittleEndian>()?;
    let _last_mod_date = cursor.read_u16::<LittleEndian>()?;
    let crc32 = cursor.read_u32::<LittleEndian>()?;
    let mut compressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let mut uncompressed_size = cursor.read_u32::<LittleEndian>()? as u64;
    let file_name_length = cursor.read_u16::<LittleEndian>()?;
    let extra_field_length = cursor.read_u16::<LittleEndian>()?;
    let file_comment_length = cursor.read_u16::<LittleEndian>()?;
    let _disk_number_start = cursor.read_u16::<LittleEndian>()?;
    let _internal_attrs = cursor.read_u16::<LittleEndian>()?;
    let _external_attrs = cursor.read_u32::<LittleEndian>()?;
    let mut lfh_offset = cursor.read_u32::<LittleEndian>()? as u64;

    let mut file_name_bytes = vec![0u8; file_name_length as usize];
    cursor.read_exact(&mut file_name_bytes)?;
    let file_name = String::from_utf8_lossy(&file_name_bytes).into_owned();
    let is_directory = file_name.ends_with('/');

    let mut extra = vec![0u8; extra_field_length as usize];
    cursor.read_exact(&mut extra)?;
    apply_zip64_extra(
        &extra,
        &mut uncompressed_size,
        &mut compressed_size,
        &mut lfh_offset,
    )?;

    let comment_end = cursor.position() + file_comment_length as u64;
    if comment_end > cursor.get_ref().len() as u64 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof).into());
    }
    cursor.set_position(comment_end);

    Ok(ZipFileEntry {
        file_name,
        compression_method: CompressionMethod::from(compression_method),
        flags,
        compressed_size,
        uncompressed_size,
        crc32,
        lfh_offset,
        is_directory,
    })
}

/// Replace saturated 32-bit fields with their ZIP64 extra field values.
///
/// Values appear in the extra field only for fields that are saturated, in the
/// fixed order uncompressed size, compressed size, header offset.
fn apply_zip64_extra(
    extra: &[u8],
    uncompressed_size: &mut u64,
    compressed_size: &mut u64,
    lfh_offset: &mut u64,
) -> Result<()> {
    let mut cursor = Cursor::new(extra);

    while cursor.position() + 4 <= extra.len() as u64 {
        let header_id = cursor.read_u16::<LittleEndian>()?;
        let field_size = cursor.read_u16::<LittleEndian>()? as u64;
        let field_end = cursor.position() + field_size;

        if header_id == ZIP64_EXTRA_ID {
            for value in [uncompressed_size, compressed_size, lfh_offset] {
                if *value == u32::MAX as u64 && cursor.position() + 8 <= field_end {
                    *value = cursor.read_u64::<LittleEndian>()?;
                }
            }
            break;
        }

        cursor.set_position(field_end);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::LocalFileReader;
    use crate::zip::test_archive;

    fn parser_for(bytes: &[u8]) -> (tempfile::NamedTempFile, ZipParser<LocalFileReader>) {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        std::fs::write(tmp.path(), bytes).unwrap();
        let reader = Arc::new(LocalFileReader::new(tmp.path()).unwrap());
        (tmp, ZipParser::new(reader))
    }

    #[tokio::test]
    async fn lists_entries_in_order() {
        let bytes = test_archive(&[
            ("a.txt", Some(b"alpha".as_slice())),
            ("dir/", None),
            ("dir/b.txt", Some(b"bravo".as_slice())),
        ]);
        let (_tmp, parser) = parser_for(&bytes);

        let entries = parser.list_files().await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, ["a.txt", "dir/", "dir/b.txt"]);
        assert!(entries[1].is_directory);
        assert_eq!(entries[2].uncompressed_size, 5);
    }

    #[tokio::test]
    async fn empty_archive_has_no_entries() {
        let (_tmp, parser) = parser_for(&test_archive(&[]));
        assert!(parser.list_files().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn archive_comment_is_skipped() {
        let mut bytes = test_archive(&[("a.txt", Some(b"alpha".as_slice()))]);
        // Patch the comment length and append the comment.
        let len = bytes.len();
        bytes[len - 2..].copy_from_slice(&7u16.to_le_bytes());
        bytes.extend_from_slice(b"comment");
        let (_tmp, parser) = parser_for(&bytes);

        let (eocd, offset) = parser.find_eocd().await.unwrap();
        assert_eq!(eocd.comment_len, 7);
        assert_eq!(offset, (len - EndOfCentralDirectory::SIZE) as u64);
        assert_eq!(parser.list_files().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn non_zip_is_an_archive_error() {
        let (_tmp, parser) = parser_for(&[0x42u8; 4096]);
        let err = parser.list_files().await.unwrap_err();
        assert!(err.is_archive_format(), "{err}");
    }

    #[tokio::test]
    async fn tiny_file_is_an_archive_error() {
        let (_tmp, parser) = parser_for(b"PK");
        let err = parser.list_files().await.unwrap_err();
        assert!(err.is_archive_format(), "{err}");
    }

    #[tokio::test]
    async fn truncated_central_directory_is_an_archive_error() {
        let mut bytes = test_archive(&[("a.txt", Some(b"alpha".as_slice()))]);
        // Claim a second entry the central directory has no room for.
        let eocd_start = bytes.len() - EndOfCentralDirectory::SIZE;
        bytes[eocd_start + 8..eocd_start + 10].copy_from_slice(&2u16.to_le_bytes());
        bytes[eocd_start + 10..eocd_start + 12].copy_from_slice(&2u16.to_le_bytes());
        let (_tmp, parser) = parser_for(&bytes);

        let err = parser.list_files().await.unwrap_err();
        assert!(err.is_archive_format(), "{err}");
    }

    /// Rewrite a plain archive so its EOCD is saturated and the real
    /// directory location lives in a ZIP64 record reached through the locator.
    fn into_zip64(bytes: Vec<u8>) -> Vec<u8> {
        let eocd_start = bytes.len() - EndOfCentralDirectory::SIZE;
        let eocd = EndOfCentralDirectory::from_bytes(&bytes[eocd_start..]).unwrap();

        let mut out = bytes[..eocd_start].to_vec();
        let eocd64_offset = out.len() as u64;

        out.extend_from_slice(Zip64EOCD::SIGNATURE);
        out.extend_from_slice(&44u64.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&45u16.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&(eocd.disk_entries as u64).to_le_bytes());
        out.extend_from_slice(&(eocd.total_entries as u64).to_le_bytes());
        out.extend_from_slice(&(eocd.cd_size as u64).to_le_bytes());
        out.extend_from_slice(&(eocd.cd_offset as u64).to_le_bytes());

        out.extend_from_slice(Zip64EOCDLocator::SIGNATURE);
        out.extend_from_slice(&0u32.to_le_bytes());
        out.extend_from_slice(&eocd64_offset.to_le_bytes());
        out.extend_from_slice(&1u32.to_le_bytes());

        out.extend_from_slice(EndOfCentralDirectory::SIGNATURE);
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(&u16::MAX.to_le_bytes());
        out.extend_from_slice(&u16::MAX.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&u32::MAX.to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out
    }

    #[tokio::test]
    async fn saturated_eocd_follows_zip64_locator() {
        let plain = test_archive(&[
            ("a.txt", Some(b"alpha".as_slice())),
            ("dir/b.txt", Some(b"bravo".as_slice())),
        ]);
        let plain_eocd =
            EndOfCentralDirectory::from_bytes(&plain[plain.len() - EndOfCentralDirectory::SIZE..])
                .unwrap();
        let (_tmp, parser) = parser_for(&into_zip64(plain));

        let (eocd, eocd_offset) = parser.find_eocd().await.unwrap();
        assert!(eocd.is_zip64());

        let eocd64 = parser.read_zip64_eocd(eocd_offset).await.unwrap();
        assert_eq!(eocd64.total_entries, 2);
        assert_eq!(eocd64.cd_offset, plain_eocd.cd_offset as u64);
        assert_eq!(eocd64.cd_size, plain_eocd.cd_size as u64);

        let entries = parser.list_files().await.unwrap();
        let names: Vec<_> = entries.iter().map(|e| e.file_name.as_str()).collect();
        assert_eq!(names, ["a.txt", "dir/b.txt"]);
    }

    #[tokio::test]
    async fn saturated_eocd_without_locator_is_an_archive_error() {
        let mut bytes = test_archive(&[("a.txt", Some(b"alpha".as_slice()))]);
        let eocd_start = bytes.len() - EndOfCentralDirectory::SIZE;
        bytes[eocd_start + 16..eocd_start + 20].copy_from_slice(&u32::MAX.to_le_bytes());
        let (_tmp, parser) = parser_for(&bytes);

        let err = parser.list_files().await.unwrap_err();
        assert!(err.is_archive_format(), "{err}");
    }

    #[test]
    fn zip64_extra_overrides_saturated_fields() {
        let mut extra = Vec::new();
        extra.extend_from_slice(&ZIP64_EXTRA_ID.to_le_bytes());
        extra.extend_from_slice(&16u16.to_le_bytes());
        extra.extend_from_slice(&5_000_000_000u64.to_le_bytes());
        extra.extend_from_slice(&6_000_000_000u64.to_le_bytes());

        let mut uncompressed = u32::MAX as u64;
        let mut compressed = u32::MAX as u64;
        let mut offset = 1234u64;
        apply_zip64_extra(&extra, &mut uncompressed, &mut compressed, &mut offset).unwrap();

        assert_eq!(uncompressed, 5_000_000_000);
        assert_eq!(compressed, 6_000_000_000);
        assert_eq!(offset, 1234);
    }
}
