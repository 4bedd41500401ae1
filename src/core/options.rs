/// Default size of the trailing window searched for `startxref`.
pub const DEFAULT_STARTXREF_SEARCH_WINDOW: usize = 4096;

/// Default upper bound on object numbers a cross-reference table may declare.
pub const DEFAULT_MAX_XREF_SIZE: u64 = 1_048_576;

/// Default nesting ceiling for objects and page-tree walks.
pub const DEFAULT_MAX_RECURSION_DEPTH: usize = 64;

/// Default number of parsed objects kept by the document cache.
pub const DEFAULT_OBJECT_CACHE_CAPACITY: usize = 1024;

/// Default number of bytes added past an object when asking for its range.
pub const DEFAULT_AVAILABILITY_READ_PADDING: u64 = 512;

/// Default ceiling on the decoded size of a single stream: 256MB
pub const DEFAULT_MAX_DECODED_STREAM_SIZE: usize = 256 * 1024 * 1024;

/// Default chunk size for progressively received data: 64KB (same as PDF.js)
pub const DEFAULT_CHUNK_SIZE: usize = 65536;

/// Tunables shared by the loader, the recovery scanner, the document and
/// the availability checker.
///
/// ```
/// use pdf_x_syntax::ParseOptions;
///
/// let options = ParseOptions::default()
///     .with_max_recursion_depth(32)
///     .with_object_cache_capacity(64);
/// assert_eq!(options.max_recursion_depth, 32);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseOptions {
    /// Bytes searched backward from end-of-file for `startxref`.
    pub startxref_search_window: usize,
    /// Largest accepted `/Size` or subsection end.
    pub max_xref_size: u64,
    /// Nesting ceiling for arrays, dictionaries and page trees.
    pub max_recursion_depth: usize,
    /// Capacity of the document's LRU object cache.
    pub object_cache_capacity: usize,
    /// Extra bytes requested after an object's known extent.
    pub availability_read_padding: u64,
    /// Largest decoded stream payload; bigger output fails the decode.
    pub max_decoded_stream_size: usize,
    /// Chunk size used by [`ChunkManager`](super::chunk_manager::ChunkManager).
    pub chunk_size: usize,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            startxref_search_window: DEFAULT_STARTXREF_SEARCH_WINDOW,
            max_xref_size: DEFAULT_MAX_XREF_SIZE,
            max_recursion_depth: DEFAULT_MAX_RECURSION_DEPTH,
            object_cache_capacity: DEFAULT_OBJECT_CACHE_CAPACITY,
            availability_read_padding: DEFAULT_AVAILABILITY_READ_PADDING,
            max_decoded_stream_size: DEFAULT_MAX_DECODED_STREAM_SIZE,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl ParseOptions {
    pub fn with_startxref_search_window(mut self, window: usize) -> Self {
        self.startxref_search_window = window;
        self
    }

    pub fn with_max_xref_size(mut self, size: u64) -> Self {
        self.max_xref_size = size;
        self
    }

    pub fn with_max_recursion_depth(mut self, depth: usize) -> Self {
        self.max_recursion_depth = depth;
        self
    }

    /// A capacity of zero is treated as one.
    pub fn with_object_cache_capacity(mut self, capacity: usize) -> Self {
        self.object_cache_capacity = capacity.max(1);
        self
    }

    pub fn with_availability_read_padding(mut self, padding: u64) -> Self {
        self.availability_read_padding = padding;
        self
    }

    pub fn with_max_decoded_stream_size(mut self, size: usize) -> Self {
        self.max_decoded_stream_size = size;
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }
}
