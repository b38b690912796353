//! Error taxonomy shared by both phases.

use thiserror::Error;

/// Errors produced while fetching or unpacking an archive.
///
/// None of these are recovered from inside the library: every failure is
/// returned to the caller, and anything already written to disk is left as is.
#[derive(Debug, Error)]
pub enum Error {
    /// URL, connection, DNS or HTTP status failure.
    #[error("network error: {0}")]
    Network(String),

    /// Disk write or read failure, including size mismatches in strict mode.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The local file is not a readable ZIP archive.
    #[error("archive format error: {0}")]
    ArchiveFormat(String),

    /// A response header or URL could not be interpreted.
    #[error("parsing error: {0}")]
    Parsing(String),
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Network(err.to_string())
    }
}

impl Error {
    pub(crate) fn archive(msg: impl Into<String>) -> Self {
        Error::ArchiveFormat(msg.into())
    }

    pub fn is_network(&self) -> bool {
        matches!(self, Error::Network(_))
    }

    pub fn is_io(&self) -> bool {
        matches!(self, Error::Io(_))
    }

    pub fn is_archive_format(&self) -> bool {
        matches!(self, Error::ArchiveFormat(_))
    }

    pub fn is_parsing(&self) -> bool {
        matches!(self, Error::Parsing(_))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
