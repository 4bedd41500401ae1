use thiserror::Error;

/// Universal error type for document parsing.
///
/// The first group of variants mirrors the recovery policy of the parser:
/// anything marked recoverable is defaulted in place (usually to `Null`),
/// the rest escalate to the caller. The second group covers byte-source
/// plumbing.
#[derive(Debug, Error)]
pub enum PDFError {
    /// An object could not be parsed; resolves to `Null` where it appears.
    #[error("Malformed object at offset {offset}: {message}")]
    MalformedObject { offset: usize, message: String },

    /// A reference names an object the cross-reference table cannot locate.
    #[error("Dangling reference {num} {generation} R")]
    DanglingReference { num: u64, generation: u16 },

    /// The declared cross-reference chain is absent, truncated or cyclic.
    #[error("Missing or cyclic cross-reference data: {0}")]
    MissingOrCyclicXref(String),

    /// No usable trailer dictionary could be located, even after recovery.
    #[error("Unparsable trailer: {0}")]
    UnparsableTrailer(String),

    /// The trailer does not name a resolvable catalog.
    #[error("Document has no root object")]
    NoRoot,

    /// A stream's declared /Length does not match its body.
    #[error("Stream length mismatch at offset {offset}: declared {declared}")]
    StreamLengthMismatch { offset: usize, declared: usize },

    /// The security handler refused the document.
    #[error("Encryption handler rejected document: {0}")]
    EncryptionHandlerRejected(String),

    /// End of stream reached unexpectedly
    #[error("Unexpected end of stream")]
    UnexpectedEndOfStream,

    /// Invalid byte range requested
    #[error("Invalid byte range: {begin}..{end}")]
    InvalidByteRange { begin: usize, end: usize },

    /// Bytes not yet delivered by a progressive source
    #[error("Data not loaded: {length} bytes at offset {offset}")]
    DataNotLoaded { offset: u64, length: u64 },

    /// Invalid stream position
    #[error("Invalid position {pos} for stream of length {length}")]
    InvalidPosition { pos: usize, length: usize },

    /// Stream operation failed
    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with message
    #[error("{0}")]
    Generic(String),
}

impl PDFError {
    /// Shorthand for [`PDFError::MalformedObject`].
    pub fn malformed(offset: usize, message: impl Into<String>) -> Self {
        PDFError::MalformedObject {
            offset,
            message: message.into(),
        }
    }

    /// Returns true if the failure may be replaced by `Null` in place.
    ///
    /// Missing bytes are never recoverable: a progressive caller must see
    /// them so it can fetch the range and retry.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            PDFError::MalformedObject { .. }
                | PDFError::DanglingReference { .. }
                | PDFError::StreamLengthMismatch { .. }
                | PDFError::UnexpectedEndOfStream
                | PDFError::InvalidPosition { .. }
                | PDFError::InvalidByteRange { .. }
                | PDFError::Generic(_)
        )
    }

    /// Returns true if this error reports bytes that are not available yet.
    pub fn is_data_not_loaded(&self) -> bool {
        matches!(self, PDFError::DataNotLoaded { .. })
    }
}

/// Result type alias for PDF operations
pub type PDFResult<T> = Result<T, PDFError>;
