pub mod core;

// Re-export main types for convenience
pub use core::{
    Availability, AvailabilityChecker, BaseStream, ByteSource, ChunkManager, CheckState,
    Decryptor, Dictionary, Document, DownloadHints, FileAvail, FileSource, HintList, Lexer,
    MemorySource, ObjectId, PDFError, PDFObject, PDFResult, ParseOptions, Parser, Stream, Token,
    Trailer, XRef, XRefEntry,
};
