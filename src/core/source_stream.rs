use super::base_stream::BaseStream;
use super::byte_source::ByteSource;
use super::error::{PDFError, PDFResult};
use std::sync::Arc;

/// Size of the read-ahead window used for byte-at-a-time access.
pub const READ_WINDOW_SIZE: usize = 512;

/// Seekable cursor over a [`ByteSource`].
///
/// Single-byte reads go through a small window so the tokenizer does not hit
/// the source once per byte. Bulk reads bypass the window. Any read the
/// source cannot satisfy surfaces as [`PDFError::DataNotLoaded`] naming the
/// exact block that was requested (in source coordinates).
///
/// Positions are relative to `base`, the offset of the file header, since
/// every offset written inside a document is relative to it.
pub struct SourceStream {
    source: Arc<dyn ByteSource>,
    base: u64,
    pos: usize,
    length: usize,
    window: Vec<u8>,
    window_start: usize,
}

impl SourceStream {
    pub fn new(source: Arc<dyn ByteSource>) -> Self {
        Self::with_base(source, 0)
    }

    /// Creates a cursor whose position 0 is `base` in the source.
    pub fn with_base(source: Arc<dyn ByteSource>, base: u64) -> Self {
        let base = base.min(source.size());
        let length = usize::try_from(source.size() - base).unwrap_or(usize::MAX);
        SourceStream {
            source,
            base,
            pos: 0,
            length,
            window: Vec::new(),
            window_start: 0,
        }
    }

    /// Offset of position 0 within the source.
    pub fn base(&self) -> u64 {
        self.base
    }

    /// Returns the shared source this cursor reads from.
    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.source
    }

    fn read_exact_at(&self, offset: usize, buf: &mut [u8]) -> PDFResult<()> {
        let offset = self.base + offset as u64;
        if self.source.read_at(offset, buf) {
            Ok(())
        } else {
            Err(PDFError::DataNotLoaded {
                offset,
                length: buf.len() as u64,
            })
        }
    }

    fn fill_window(&mut self, pos: usize) -> PDFResult<()> {
        let read_size = READ_WINDOW_SIZE.min(self.length);
        let read_pos = if pos + read_size > self.length {
            self.length - read_size
        } else {
            pos
        };

        let mut window = vec![0u8; read_size];
        self.read_exact_at(read_pos, &mut window)?;
        self.window = window;
        self.window_start = read_pos;
        Ok(())
    }

    fn window_contains(&self, pos: usize) -> bool {
        pos >= self.window_start && pos < self.window_start + self.window.len()
    }
}

impl BaseStream for SourceStream {
    fn length(&self) -> usize {
        self.length
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) -> PDFResult<()> {
        if pos > self.length {
            return Err(PDFError::InvalidPosition {
                pos,
                length: self.length,
            });
        }
        self.pos = pos;
        Ok(())
    }

    fn get_byte(&mut self) -> PDFResult<u8> {
        if self.pos >= self.length {
            return Err(PDFError::UnexpectedEndOfStream);
        }
        if !self.window_contains(self.pos) {
            self.fill_window(self.pos)?;
        }
        let byte = self.window[self.pos - self.window_start];
        self.pos += 1;
        Ok(byte)
    }

    fn get_bytes(&mut self, length: usize) -> PDFResult<Vec<u8>> {
        let end = self
            .pos
            .checked_add(length)
            .filter(|end| *end <= self.length)
            .ok_or(PDFError::UnexpectedEndOfStream)?;
        let bytes = self.get_byte_range(self.pos, end)?;
        self.pos = end;
        Ok(bytes)
    }

    fn get_byte_range(&mut self, begin: usize, end: usize) -> PDFResult<Vec<u8>> {
        if begin > end || end > self.length {
            return Err(PDFError::InvalidByteRange { begin, end });
        }
        if self.window_contains(begin) && end <= self.window_start + self.window.len() {
            let from = begin - self.window_start;
            return Ok(self.window[from..from + (end - begin)].to_vec());
        }
        let mut buf = vec![0u8; end - begin];
        self.read_exact_at(begin, &mut buf)?;
        Ok(buf)
    }
}
