use super::base_stream::BaseStream;
use super::error::{PDFError, PDFResult};
use std::sync::Arc;

/// A simple in-memory stream implementation.
///
/// Used for decoded payloads (object streams, xref streams) and in tests.
/// The underlying data is stored in an Arc, so cloning a cursor to re-parse
/// the same payload never copies the bytes.
#[derive(Clone)]
pub struct Stream {
    /// The underlying byte buffer (shared via Arc)
    bytes: Arc<[u8]>,
    /// Current read position
    pos: usize,
}

impl Stream {
    /// Creates a new Stream from a byte vector.
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Stream {
            bytes: bytes.into(),
            pos: 0,
        }
    }

    /// Creates a new Stream sharing an existing buffer.
    pub fn from_arc(bytes: Arc<[u8]>) -> Self {
        Stream { bytes, pos: 0 }
    }

    /// Returns a reference to the underlying byte buffer.
    pub fn get_bytes_ref(&self) -> &[u8] {
        &self.bytes
    }
}

impl BaseStream for Stream {
    fn length(&self) -> usize {
        self.bytes.len()
    }

    fn pos(&self) -> usize {
        self.pos
    }

    fn set_pos(&mut self, pos: usize) -> PDFResult<()> {
        if pos > self.bytes.len() {
            return Err(PDFError::InvalidPosition {
                pos,
                length: self.bytes.len(),
            });
        }
        self.pos = pos;
        Ok(())
    }

    fn get_byte(&mut self) -> PDFResult<u8> {
        let byte = *self
            .bytes
            .get(self.pos)
            .ok_or(PDFError::UnexpectedEndOfStream)?;
        self.pos += 1;
        Ok(byte)
    }

    fn get_bytes(&mut self, length: usize) -> PDFResult<Vec<u8>> {
        let end_pos = self
            .pos
            .checked_add(length)
            .filter(|end| *end <= self.bytes.len())
            .ok_or(PDFError::UnexpectedEndOfStream)?;

        let bytes = self.bytes[self.pos..end_pos].to_vec();
        self.pos = end_pos;
        Ok(bytes)
    }

    fn get_byte_range(&mut self, begin: usize, end: usize) -> PDFResult<Vec<u8>> {
        if begin > end || end > self.bytes.len() {
            return Err(PDFError::InvalidByteRange { begin, end });
        }
        Ok(self.bytes[begin..end].to_vec())
    }
}
