use super::byte_source::ByteSource;
use super::error::{PDFError, PDFResult};
use super::options::{DEFAULT_CHUNK_SIZE, ParseOptions};
use super::read_validator::FileAvail;
use rustc_hash::FxHashSet;
use std::sync::{Mutex, MutexGuard};
use tracing::trace;

/// Buffer for a document that arrives in pieces.
///
/// The full length is known up front; data is delivered with
/// [`on_receive_data`](Self::on_receive_data) in any order. A chunk counts
/// as loaded once every byte of it has been received, and reads only
/// succeed when all chunks they touch are loaded.
///
/// The state sits behind a mutex so the same manager can be shared (via
/// `Arc`) between the code feeding it and the parser reading from it.
pub struct ChunkManager {
    /// Total length of the data in bytes
    total_length: usize,
    /// Size of each chunk in bytes
    chunk_size: usize,
    /// Total number of chunks
    num_chunks: usize,

    inner: Mutex<ChunkState>,
}

struct ChunkState {
    buffer: Vec<u8>,
    /// Chunks whose bytes are all present
    loaded_chunks: FxHashSet<usize>,
    /// Bytes received per partially filled chunk
    partial: Vec<Vec<(usize, usize)>>,
}

impl ChunkManager {
    /// Creates a manager for `total_length` bytes split into `chunk_size`
    /// chunks (default 64 KiB).
    pub fn new(total_length: usize, chunk_size: Option<usize>) -> Self {
        let chunk_size = chunk_size.unwrap_or(DEFAULT_CHUNK_SIZE).max(1);
        let num_chunks = total_length.div_ceil(chunk_size);

        ChunkManager {
            total_length,
            chunk_size,
            num_chunks,
            inner: Mutex::new(ChunkState {
                buffer: vec![0; total_length],
                loaded_chunks: FxHashSet::default(),
                partial: vec![Vec::new(); num_chunks],
            }),
        }
    }

    /// Creates a manager using `options.chunk_size`.
    pub fn with_options(total_length: usize, options: &ParseOptions) -> Self {
        Self::new(total_length, Some(options.chunk_size))
    }

    fn state(&self) -> MutexGuard<'_, ChunkState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns the total length of the data.
    pub fn length(&self) -> usize {
        self.total_length
    }

    /// Returns the chunk size.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Returns the total number of chunks.
    pub fn num_chunks(&self) -> usize {
        self.num_chunks
    }

    /// Gets the chunk number for a given byte position.
    pub fn get_chunk_number(&self, pos: usize) -> usize {
        pos / self.chunk_size
    }

    fn chunk_end(&self, chunk: usize) -> usize {
        ((chunk + 1) * self.chunk_size).min(self.total_length)
    }

    /// Stores `data` received for the range starting at `begin`.
    ///
    /// Chunks become loaded once their whole range has arrived, possibly
    /// over several calls.
    pub fn on_receive_data(&self, begin: usize, data: &[u8]) -> PDFResult<()> {
        let end = begin
            .checked_add(data.len())
            .filter(|end| *end <= self.total_length)
            .ok_or(PDFError::InvalidByteRange {
                begin,
                end: begin.saturating_add(data.len()),
            })?;
        if data.is_empty() {
            return Ok(());
        }

        let mut state = self.state();
        state.buffer[begin..end].copy_from_slice(data);

        for chunk in self.get_chunk_number(begin)..=self.get_chunk_number(end - 1) {
            if state.loaded_chunks.contains(&chunk) {
                continue;
            }
            let chunk_start = chunk * self.chunk_size;
            let chunk_end = self.chunk_end(chunk);
            let covered = (begin.max(chunk_start), end.min(chunk_end));

            let ranges = &mut state.partial[chunk];
            ranges.push(covered);
            if covers(ranges, chunk_start, chunk_end) {
                ranges.clear();
                state.loaded_chunks.insert(chunk);
                trace!(chunk, "chunk loaded");
            }
        }
        Ok(())
    }

    /// Checks if a specific chunk has been loaded.
    pub fn has_chunk(&self, chunk: usize) -> bool {
        self.state().loaded_chunks.contains(&chunk)
    }

    /// Returns a list of chunk numbers that have not been loaded.
    pub fn get_missing_chunks(&self) -> Vec<usize> {
        let state = self.state();
        (0..self.num_chunks)
            .filter(|chunk| !state.loaded_chunks.contains(chunk))
            .collect()
    }

    /// Returns the next unloaded chunk starting from `begin_chunk`, with
    /// wraparound.
    pub fn next_empty_chunk(&self, begin_chunk: usize) -> Option<usize> {
        let state = self.state();
        (0..self.num_chunks)
            .map(|i| (begin_chunk + i) % self.num_chunks)
            .find(|chunk| !state.loaded_chunks.contains(chunk))
    }

    /// Returns the number of chunks loaded so far.
    pub fn num_chunks_loaded(&self) -> usize {
        self.state().loaded_chunks.len()
    }

    /// Returns true if all chunks have been loaded.
    pub fn is_data_loaded(&self) -> bool {
        self.num_chunks_loaded() == self.num_chunks
    }

    /// Returns true if every chunk touching `[begin, end)` is loaded.
    pub fn is_range_available(&self, begin: usize, end: usize) -> bool {
        if begin >= end {
            return true;
        }
        if end > self.total_length {
            return false;
        }
        let state = self.state();
        (self.get_chunk_number(begin)..=self.get_chunk_number(end - 1))
            .all(|chunk| state.loaded_chunks.contains(&chunk))
    }

    /// Chunk-aligned ranges that are still missing inside `[begin, end)`.
    pub fn missing_ranges(&self, begin: usize, end: usize) -> Vec<(usize, usize)> {
        let end = end.min(self.total_length);
        if begin >= end {
            return Vec::new();
        }
        let state = self.state();
        let mut ranges: Vec<(usize, usize)> = Vec::new();
        for chunk in self.get_chunk_number(begin)..=self.get_chunk_number(end - 1) {
            if state.loaded_chunks.contains(&chunk) {
                continue;
            }
            let range = (chunk * self.chunk_size, self.chunk_end(chunk));
            match ranges.last_mut() {
                Some(last) if last.1 == range.0 => last.1 = range.1,
                _ => ranges.push(range),
            }
        }
        ranges
    }
}

/// Returns true if `ranges` together cover `[start, end)`.
fn covers(ranges: &[(usize, usize)], start: usize, end: usize) -> bool {
    let mut sorted = ranges.to_vec();
    sorted.sort_unstable();
    let mut reached = start;
    for (begin, stop) in sorted {
        if begin > reached {
            return false;
        }
        reached = reached.max(stop);
    }
    reached >= end
}

impl ByteSource for ChunkManager {
    fn size(&self) -> u64 {
        self.total_length as u64
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> bool {
        let Ok(begin) = usize::try_from(offset) else {
            return false;
        };
        let Some(end) = begin.checked_add(buf.len()) else {
            return false;
        };
        if !self.is_range_available(begin, end) {
            return false;
        }
        buf.copy_from_slice(&self.state().buffer[begin..end]);
        true
    }
}

impl FileAvail for ChunkManager {
    fn is_data_available(&self, offset: u64, size: u64) -> bool {
        match (usize::try_from(offset), usize::try_from(offset.saturating_add(size))) {
            (Ok(begin), Ok(end)) => self.is_range_available(begin, end.min(self.total_length)),
            _ => false,
        }
    }
}
