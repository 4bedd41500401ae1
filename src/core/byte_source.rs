use super::error::{PDFError, PDFResult};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::warn;

/// Random-access byte source consumed by every parsing component.
///
/// `read_at` fills the whole buffer or returns false. A false return is a
/// hard error for the tokenizer and a "not ready" signal for the
/// availability checker.
pub trait ByteSource {
    /// Total size of the underlying data in bytes.
    fn size(&self) -> u64;

    /// Reads `buf.len()` bytes starting at `offset`.
    fn read_at(&self, offset: u64, buf: &mut [u8]) -> bool;
}

/// Byte source over a shared in-memory buffer.
#[derive(Clone)]
pub struct MemorySource {
    bytes: Arc<[u8]>,
}

impl MemorySource {
    pub fn new(bytes: impl Into<Arc<[u8]>>) -> Self {
        MemorySource {
            bytes: bytes.into(),
        }
    }

    /// Returns the underlying bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl From<Vec<u8>> for MemorySource {
    fn from(bytes: Vec<u8>) -> Self {
        MemorySource::new(bytes)
    }
}

impl ByteSource for MemorySource {
    fn size(&self) -> u64 {
        self.bytes.len() as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> bool {
        let Ok(start) = usize::try_from(offset) else {
            return false;
        };
        let Some(end) = start.checked_add(buf.len()) else {
            return false;
        };
        if end > self.bytes.len() {
            return false;
        }
        buf.copy_from_slice(&self.bytes[start..end]);
        true
    }
}

/// Helper function to standardize mutex lock error handling for the file handle.
#[inline]
fn lock_file(file: &Mutex<File>) -> PDFResult<MutexGuard<'_, File>> {
    file.lock().map_err(|_| {
        PDFError::StreamError("Failed to lock file handle (mutex poisoned)".to_string())
    })
}

/// Byte source that seeks and reads a filesystem file on demand.
///
/// Nothing is cached here; the tokenizer's read window and the document's
/// object cache keep repeated reads rare.
pub struct FileSource {
    file: Mutex<File>,
    file_path: PathBuf,
    length: u64,
}

impl FileSource {
    /// Opens a file and records its length.
    pub fn open<P: AsRef<Path>>(path: P) -> PDFResult<Self> {
        let file_path = path.as_ref().to_path_buf();
        let mut file = File::open(&file_path)?;
        let length = file.seek(SeekFrom::End(0))?;
        file.seek(SeekFrom::Start(0))?;

        Ok(FileSource {
            file: Mutex::new(file),
            file_path,
            length,
        })
    }

    /// Returns the path this source was opened from.
    pub fn path(&self) -> &Path {
        &self.file_path
    }

    fn read_block(&self, offset: u64, buf: &mut [u8]) -> PDFResult<()> {
        let mut file = lock_file(&self.file)?;
        file.seek(SeekFrom::Start(offset))?;
        file.read_exact(buf)?;
        Ok(())
    }
}

impl ByteSource for FileSource {
    fn size(&self) -> u64 {
        self.length
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> bool {
        match offset.checked_add(buf.len() as u64) {
            Some(end) if end <= self.length => {}
            _ => return false,
        }
        match self.read_block(offset, buf) {
            Ok(()) => true,
            Err(e) => {
                warn!(path = %self.file_path.display(), offset, "file read failed: {}", e);
                false
            }
        }
    }
}
