pub mod base_stream;
pub mod byte_source;
pub mod chunk_manager;
pub mod crypt;
pub mod data_avail;
pub mod decode;
pub mod document;
pub mod error;
pub mod header;
pub mod lexer;
pub mod object;
pub mod object_stream;
pub mod options;
pub mod parser;
pub mod read_validator;
pub mod recovery;
pub mod source_stream;
pub mod stream;
pub mod xref;
pub mod xref_loader;

pub use base_stream::BaseStream;
pub use byte_source::{ByteSource, FileSource, MemorySource};
pub use chunk_manager::ChunkManager;
pub use crypt::{Decryptor, SecurityHandler};
pub use data_avail::{Availability, AvailabilityChecker, CheckState, PageNodeKind};
pub use decode::decode_stream;
pub use document::Document;
pub use error::{PDFError, PDFResult};
pub use header::{find_header, FileHeader, LinearizedHeader};
pub use lexer::{Lexer, Token};
pub use object::{Dictionary, ObjectId, PDFObject};
pub use object_stream::{ObjectStream, ObjectStreamCache};
pub use options::ParseOptions;
pub use parser::Parser;
pub use read_validator::{DownloadHints, FileAvail, HintList, ReadValidator};
pub use recovery::{recover_xref, RecoveryScanner};
pub use source_stream::SourceStream;
pub use stream::Stream;
pub use xref::{Trailer, XRef, XRefEntry};
pub use xref_loader::{find_startxref, load_xref, XRefChain, XRefSection};
