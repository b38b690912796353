use super::ReadAt;
use async_trait::async_trait;
use std::io;
use std::path::Path;

/// Local file reader with random access support
pub struct LocalFileReader {
    #[cfg(unix)]
    file: std::fs::File,
    #[cfg(not(unix))]
    file: std::sync::Mutex<std::fs::File>,
    size: u64,
}

impl LocalFileReader {
    pub fn new(path: &Path) -> io::Result<Self> {
        let file = std::fs::File::open(path)?;
        let size = file.metadata()?.len();
        #[cfg(not(unix))]
        let file = std::sync::Mutex::new(file);
        Ok(Self { file, size })
    }
}

#[async_trait]
impl ReadAt for LocalFileReader {
    async fn read_exact_at(&self, offset: u64, buf: &mut [u8]) -> io::Result<()> {
        #[cfg(unix)]
        {
            use std::os::unix::fs::FileExt;
            self.file.read_exact_at(buf, offset)
        }

        #[cfg(not(unix))]
        {
            use std::io::{Read, Seek, SeekFrom};
            // Seek and read must not interleave with another caller.
            let mut file = self
                .file
                .lock()
                .map_err(|_| io::Error::other("archive file lock poisoned"))?;
            file.seek(SeekFrom::Start(offset))?;
            file.read_exact(buf)
        }
    }

    fn size(&self) -> u64 {
        self.size
    }
}
