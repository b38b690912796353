use byteorder::{LittleEndian, ReadBytesExt};
use std::io::Cursor;

use crate::error::{Error, Result};

/// ZIP compression methods
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompressionMethod {
    Stored,
    Deflate,
    Unknown(u16),
}

impl From<u16> for CompressionMethod {
    fn from(value: u16) -> Self {
        match value {
            0 => CompressionMethod::Stored,
            8 => CompressionMethod::Deflate,
            other => CompressionMethod::Unknown(other),
        }
    }
}

/// End of Central Directory record, fixed 22-byte part.
#[derive(Debug, Clone)]
pub struct EndOfCentralDirectory {
    pub disk_entries: u16,
    pub total_entries: u16,
    pub cd_size: u32,
    pub cd_offset: u32,
    pub comment_len: u16,
}

impl EndOfCentralDirectory {
    pub const SIGNATURE: &'static [u8] = b"PK\x05\x06";
    pub const SIZE: usize = 22;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::archive("invalid end of central directory record"));
        }

        // Skip the two disk-number fields; multi-disk archives are not read.
        let mut cursor = Cursor::new(&data[8..Self::SIZE]);
        let disk_entries = cursor.read_u16::<LittleEndian>()?;
        let total_entries = cursor.read_u16::<LittleEndian>()?;
        let cd_size = cursor.read_u32::<LittleEndian>()?;
        let cd_offset = cursor.read_u32::<LittleEndian>()?;
        let comment_len = cursor.read_u16::<LittleEndian>()?;

        Ok(Self {
            disk_entries,
            total_entries,
            cd_size,
            cd_offset,
            comment_len,
        })
    }

    /// Any saturated field means the real value lives in the ZIP64 record.
    pub fn is_zip64(&self) -> bool {
        self.disk_entries == u16::MAX
            || self.total_entries == u16::MAX
            || self.cd_size == u32::MAX
            || self.cd_offset == u32::MAX
    }
}

/// ZIP64 End of Central Directory Locator - 20 bytes
#[derive(Debug, Clone)]
pub struct Zip64EOCDLocator {
    pub eocd64_offset: u64,
}

impl Zip64EOCDLocator {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x07";
    pub const SIZE: usize = 20;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::archive("invalid ZIP64 end of central directory locator"));
        }

        let mut cursor = Cursor::new(&data[8..16]);
        Ok(Self {
            eocd64_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// ZIP64 End of Central Directory record, fixed 56-byte part.
#[derive(Debug, Clone)]
pub struct Zip64EOCD {
    pub total_entries: u64,
    pub cd_size: u64,
    pub cd_offset: u64,
}

impl Zip64EOCD {
    pub const SIGNATURE: &'static [u8] = b"PK\x06\x06";
    pub const MIN_SIZE: usize = 56;

    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() < Self::MIN_SIZE || &data[0..4] != Self::SIGNATURE {
            return Err(Error::archive("invalid ZIP64 end of central directory record"));
        }

        // size(8) versions(2+2) disk numbers(4+4) entries on this disk(8)
        let mut cursor = Cursor::new(&data[32..Self::MIN_SIZE]);
        Ok(Self {
            total_entries: cursor.read_u64::<LittleEndian>()?,
            cd_size: cursor.read_u64::<LittleEndian>()?,
            cd_offset: cursor.read_u64::<LittleEndian>()?,
        })
    }
}

/// Central Directory File Header (CDFH) - 46 bytes minimum
pub const CDFH_SIGNATURE: &[u8] = b"PK\x01\x02";

/// Local File Header (LFH) - 30 bytes
pub const LFH_SIGNATURE: &[u8] = b"PK\x03\x04";
pub const LFH_SIZE: usize = 30;

/// General purpose flag bit 0: entry is encrypted.
const FLAG_ENCRYPTED: u16 = 0x0001;

/// One entry of the central directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ZipFileEntry {
    /// Stored name, `/`-separated, directories end with `/`.
    pub file_name: String,
    pub compression_method: CompressionMethod,
    pub flags: u16,
    pub compressed_size: u64,
    pub uncompressed_size: u64,
    pub crc32: u32,
    pub lfh_offset: u64,
    pub is_directory: bool,
}

impl ZipFileEntry {
    pub fn is_encrypted(&self) -> bool {
        self.flags & FLAG_ENCRYPTED != 0
    }
}
