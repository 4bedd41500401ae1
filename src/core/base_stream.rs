use super::error::PDFResult;

/// Base trait for all seekable byte cursors.
///
/// The tokenizer, the object parser and the cross-reference loader all read
/// through this interface, whether the bytes live in memory (decoded object
/// streams) or behind a [`ByteSource`](super::byte_source::ByteSource).
/// Positions are absolute and may be moved freely for backtracking.
pub trait BaseStream {
    // ============================================================================
    // Required methods (must be implemented by all stream types)
    // ============================================================================

    /// Returns the total length of the stream in bytes.
    fn length(&self) -> usize;

    /// Returns the current position in the stream.
    fn pos(&self) -> usize;

    /// Sets the current position in the stream.
    fn set_pos(&mut self, pos: usize) -> PDFResult<()>;

    /// Reads and returns a single byte from the stream, advancing the position.
    ///
    /// Returns an error if the end of the stream is reached or data is not available.
    fn get_byte(&mut self) -> PDFResult<u8>;

    /// Reads the specified number of bytes from the stream, advancing the position.
    fn get_bytes(&mut self, length: usize) -> PDFResult<Vec<u8>>;

    /// Returns a range of bytes from the stream without changing the current position.
    ///
    /// # Arguments
    /// * `begin` - Starting byte offset (inclusive)
    /// * `end` - Ending byte offset (exclusive)
    fn get_byte_range(&mut self, begin: usize, end: usize) -> PDFResult<Vec<u8>>;

    // ============================================================================
    // Provided methods with default implementations
    // ============================================================================

    /// Returns true if the stream contains no data.
    fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Reads a single byte without advancing the position.
    fn peek_byte(&mut self) -> PDFResult<u8> {
        let current_pos = self.pos();
        let byte = self.get_byte();
        self.set_pos(current_pos)?;
        byte
    }

    /// Reads the specified number of bytes without advancing the position.
    fn peek_bytes(&mut self, length: usize) -> PDFResult<Vec<u8>> {
        let current_pos = self.pos();
        let bytes = self.get_bytes(length);
        self.set_pos(current_pos)?;
        bytes
    }

    /// Skips `n` bytes in the stream by advancing the position.
    fn skip(&mut self, n: usize) -> PDFResult<()> {
        self.set_pos(self.pos() + n)
    }
}
