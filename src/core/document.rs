use super::byte_source::{ByteSource, FileSource, MemorySource};
use super::crypt::{Decryptor, SecurityHandler};
use super::decode::decode_stream;
use super::error::{PDFError, PDFResult};
use super::header::{find_header, FileHeader};
use super::object::{ObjectId, PDFObject};
use super::object_stream::{ObjectStream, ObjectStreamCache};
use super::options::ParseOptions;
use super::parser::Parser;
use super::recovery::recover_xref;
use super::source_stream::SourceStream;
use super::xref::{Trailer, XRef, XRefEntry};
use super::xref_loader::load_xref;
use lru::LruCache;
use rustc_hash::FxHashSet;
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Lazily built page-number to object-id index.
///
/// The page tree is walked depth-first only as far as the highest page
/// requested so far; the walk state survives between calls.
#[derive(Debug, Default)]
struct PageIndex {
    pages: Vec<ObjectId>,
    /// Nodes still to visit with their depth, top of stack last
    stack: Vec<(ObjectId, usize)>,
    visited: FxHashSet<ObjectId>,
    started: bool,
}

impl PageIndex {
    fn is_complete(&self) -> bool {
        self.started && self.stack.is_empty()
    }
}

/// PDF Document reader.
///
/// Owns the merged trailer, the cross-reference table and a bounded cache
/// of parsed objects. Objects are parsed on first request and may be
/// evicted and re-parsed later; every lookup goes through
/// [`get_object`](Self::get_object).
///
/// A document is not thread-safe: lookups mutate the cache, so callers
/// sharing one across threads must serialize access.
pub struct Document {
    parser: Parser,
    source: Arc<dyn ByteSource>,
    header: Option<FileHeader>,
    xref: XRef,
    trailer: Trailer,
    cache: LruCache<ObjectId, Arc<PDFObject>>,
    object_streams: ObjectStreamCache,
    /// Objects currently being resolved (recursion guard)
    resolving: FxHashSet<ObjectId>,
    security: Option<(SecurityHandler, Box<dyn Decryptor>)>,
    page_index: PageIndex,
    recovered: bool,
    options: ParseOptions,
}

impl Document {
    /// Opens a PDF document from a byte array.
    ///
    /// # Example
    /// ```no_run
    /// use pdf_x_syntax::Document;
    ///
    /// let pdf_data = std::fs::read("document.pdf").unwrap();
    /// let mut doc = Document::open(pdf_data).unwrap();
    /// println!("{} pages", doc.page_count().unwrap());
    /// ```
    pub fn open(data: Vec<u8>) -> PDFResult<Self> {
        Self::open_with_options(data, ParseOptions::default())
    }

    /// Opens a PDF document from a byte array with explicit limits.
    pub fn open_with_options(data: Vec<u8>, options: ParseOptions) -> PDFResult<Self> {
        Self::open_source(Arc::new(MemorySource::from(data)), options)
    }

    /// Opens a PDF file from disk, reading it on demand.
    pub fn open_file<P: AsRef<Path>>(path: P) -> PDFResult<Self> {
        Self::open_source(Arc::new(FileSource::open(path)?), ParseOptions::default())
    }

    /// Opens a document over any byte source.
    ///
    /// A broken or missing cross-reference chain falls back to a recovery
    /// scan. Fails with `NoRoot` or `UnparsableTrailer` only when recovery
    /// cannot find the catalog either, and with `DataNotLoaded` when the
    /// source is missing bytes.
    pub fn open_source(source: Arc<dyn ByteSource>, options: ParseOptions) -> PDFResult<Self> {
        let header = find_header(source.as_ref())?;
        if header.is_none() {
            warn!("no %PDF- header found, assuming offset 0");
        }
        let mut parser = Self::make_parser(&source, header.as_ref(), &options)?;

        let mut document = match load_xref(&mut parser, &options) {
            Ok((xref, trailer)) => Self::assemble(
                parser,
                source.clone(),
                header.clone(),
                xref,
                trailer,
                options.clone(),
            ),
            Err(e) if e.is_data_not_loaded() => return Err(e),
            Err(e) => {
                warn!("cross-reference chain unusable ({}), rebuilding", e);
                let (xref, trailer) = recover_xref(&mut parser, &options)?;
                let mut document = Self::assemble(
                    parser,
                    source.clone(),
                    header.clone(),
                    xref,
                    trailer,
                    options.clone(),
                );
                document.recovered = true;
                document
            }
        };

        if !document.recovered && !document.has_usable_catalog()? {
            warn!("catalog unreachable through the declared chain, rebuilding");
            let mut parser = Self::make_parser(&source, header.as_ref(), &options)?;
            let (xref, trailer) = recover_xref(&mut parser, &options)?;
            let mut rebuilt = Self::assemble(parser, source, header, xref, trailer, options);
            rebuilt.recovered = true;
            if rebuilt.has_usable_catalog()? || !document.root_is_dict()? {
                document = rebuilt;
            }
        }

        document.ensure_root()?;
        info!(
            objects = document.xref.len(),
            recovered = document.recovered,
            encrypted = document.trailer.is_encrypted(),
            "document opened"
        );
        Ok(document)
    }

    /// Builds a document from an already loaded table and trailer.
    ///
    /// Used by the availability checker once it has walked the chain
    /// itself. No recovery is attempted.
    pub fn from_parts(
        source: Arc<dyn ByteSource>,
        header: Option<FileHeader>,
        xref: XRef,
        trailer: Trailer,
        options: ParseOptions,
    ) -> PDFResult<Self> {
        let parser = Self::make_parser(&source, header.as_ref(), &options)?;
        Ok(Self::assemble(parser, source, header, xref, trailer, options))
    }

    fn make_parser(
        source: &Arc<dyn ByteSource>,
        header: Option<&FileHeader>,
        options: &ParseOptions,
    ) -> PDFResult<Parser> {
        let base = header.map_or(0, |h| h.offset);
        let stream = SourceStream::with_base(source.clone(), base);
        Ok(Parser::from_stream(Box::new(stream))?.with_max_depth(options.max_recursion_depth))
    }

    fn assemble(
        parser: Parser,
        source: Arc<dyn ByteSource>,
        header: Option<FileHeader>,
        xref: XRef,
        trailer: Trailer,
        options: ParseOptions,
    ) -> Self {
        let capacity = NonZeroUsize::new(options.object_cache_capacity).unwrap_or(NonZeroUsize::MIN);
        Document {
            parser,
            source,
            header,
            xref,
            trailer,
            cache: LruCache::new(capacity),
            object_streams: ObjectStreamCache::new(),
            resolving: FxHashSet::default(),
            security: None,
            page_index: PageIndex::default(),
            recovered: false,
            options,
        }
    }

    /// Returns true if the root resolves to a dictionary whose `Pages`
    /// resolves to a dictionary.
    fn has_usable_catalog(&mut self) -> PDFResult<bool> {
        let Some(root) = self.trailer.root else {
            return Ok(false);
        };
        let catalog = self.get_object(root)?;
        let Some(pages) = catalog.as_dict().and_then(|d| d.get("Pages")).cloned() else {
            return Ok(false);
        };
        Ok(self.resolve(&pages)?.as_dict().is_some())
    }

    fn root_is_dict(&mut self) -> PDFResult<bool> {
        match self.trailer.root {
            Some(root) => Ok(self.get_object(root)?.as_dict().is_some()),
            None => Ok(false),
        }
    }

    fn ensure_root(&mut self) -> PDFResult<()> {
        if self.trailer.root.is_none() && self.xref.is_empty() {
            return Err(PDFError::UnparsableTrailer(
                "no objects or trailer found".to_string(),
            ));
        }
        if !self.root_is_dict()? {
            return Err(PDFError::NoRoot);
        }
        Ok(())
    }

    /// Resolves an indirect object.
    ///
    /// Free, unknown and generation-mismatched numbers resolve to null, as
    /// do damaged objects. Only missing bytes and fatal handler errors are
    /// returned as errors; results are never cached in that case.
    pub fn get_object(&mut self, id: ObjectId) -> PDFResult<Arc<PDFObject>> {
        if let Some(object) = self.cache.get(&id) {
            return Ok(object.clone());
        }
        if !self.resolving.insert(id) {
            warn!(object = %id, "object refers to itself while resolving");
            return Ok(Arc::new(PDFObject::Null));
        }

        let result = self.load_object(id);
        self.resolving.remove(&id);

        let object = match result {
            Ok(object) => object,
            Err(e) if e.is_recoverable() => {
                debug!(object = %id, "object unreadable, using null: {}", e);
                PDFObject::Null
            }
            Err(e) => return Err(e),
        };
        let object = Arc::new(object);
        self.cache.put(id, object.clone());
        Ok(object)
    }

    fn load_object(&mut self, id: ObjectId) -> PDFResult<PDFObject> {
        match self.xref.get_entry(id.num).copied() {
            None | Some(XRefEntry::Free) => {
                debug!(object = %id, "dangling reference");
                Ok(PDFObject::Null)
            }
            Some(XRefEntry::Offset { offset, generation }) => {
                if generation != id.generation {
                    debug!(object = %id, generation, "generation mismatch");
                    return Ok(PDFObject::Null);
                }
                let bound = self.xref.next_offset_after(offset).map(|o| o as usize);
                self.parser.set_stream_bound(bound);
                let parsed = self.parser.parse_indirect_object_at(offset as usize, Some(id.num));
                self.parser.set_stream_bound(None);

                let (found, object) = parsed?;
                if found.generation != id.generation {
                    debug!(object = %id, found = %found, "generation mismatch at offset");
                    return Ok(PDFObject::Null);
                }
                match &self.security {
                    Some((handler, decryptor)) => handler.decrypt_object(decryptor.as_ref(), id, object),
                    None => Ok(object),
                }
            }
            Some(XRefEntry::Compressed { container, index }) => {
                if id.generation != 0 {
                    return Ok(PDFObject::Null);
                }
                self.load_compressed(id.num, container, index)
            }
        }
    }

    fn load_compressed(&mut self, num: u64, container: u64, index: u32) -> PDFResult<PDFObject> {
        let stream = match self.object_streams.get(container) {
            Some(Some(stream)) => stream,
            Some(None) => return Ok(PDFObject::Null),
            None => match self.load_object_stream(container) {
                Ok(stream) => {
                    let stream = Arc::new(stream);
                    self.object_streams.insert(container, Some(stream.clone()));
                    stream
                }
                Err(e) if e.is_data_not_loaded() => return Err(e),
                Err(e) => {
                    warn!(container, "object stream unusable: {}", e);
                    self.object_streams.insert(container, None);
                    return Ok(PDFObject::Null);
                }
            },
        };
        stream.get_object(index as usize, num)
    }

    fn load_object_stream(&mut self, container: u64) -> PDFResult<ObjectStream> {
        let generation = match self.xref.get_entry(container) {
            Some(XRefEntry::Offset { generation, .. }) => *generation,
            other => {
                return Err(PDFError::malformed(
                    0,
                    format!("object stream {} has entry {:?}", container, other),
                ));
            }
        };
        let object = self.get_object(ObjectId::new(container, generation))?;
        let PDFObject::Stream { dict, data } = object.as_ref() else {
            return Err(PDFError::malformed(
                0,
                format!("object stream {} is not a stream", container),
            ));
        };
        let decoded = decode_stream(dict, data, self.options.max_decoded_stream_size)?;
        ObjectStream::parse(container, dict, decoded)
    }

    /// Follows `object` if it is a reference.
    pub fn resolve(&mut self, object: &PDFObject) -> PDFResult<Arc<PDFObject>> {
        match object {
            PDFObject::Ref(id) => self.get_object(*id),
            other => Ok(Arc::new(other.clone())),
        }
    }

    /// Decoded payload of a stream (or a reference to one).
    pub fn stream_data(&mut self, object: &PDFObject) -> PDFResult<Vec<u8>> {
        let resolved = self.resolve(object)?;
        match resolved.as_ref() {
            PDFObject::Stream { dict, data } => {
                decode_stream(dict, data, self.options.max_decoded_stream_size)
            }
            other => Err(PDFError::Generic(format!("expected a stream, found {:?}", other))),
        }
    }

    /// The merged trailer.
    pub fn trailer(&self) -> &Trailer {
        &self.trailer
    }

    /// The cross-reference table.
    pub fn xref(&self) -> &XRef {
        &self.xref
    }

    /// The document catalog (root dictionary).
    pub fn catalog(&mut self) -> PDFResult<Arc<PDFObject>> {
        let root = self.trailer.root.ok_or(PDFError::NoRoot)?;
        self.get_object(root)
    }

    /// Version from the `%PDF-x.y` header.
    pub fn version(&self) -> Option<&str> {
        self.header.as_ref().map(|h| h.version.as_str())
    }

    /// Offset of the header within the source.
    pub fn header_offset(&self) -> u64 {
        self.header.as_ref().map_or(0, |h| h.offset)
    }

    /// True if the table was rebuilt by the recovery scan.
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    pub fn is_encrypted(&self) -> bool {
        self.trailer.is_encrypted()
    }

    /// The byte source the document reads from.
    pub fn source(&self) -> &Arc<dyn ByteSource> {
        &self.source
    }

    /// Options the document was opened with.
    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Installs the decryptor for an encrypted document.
    ///
    /// The `Encrypt` dictionary must name a supported handler. Cached
    /// objects are dropped so they are parsed again through the decryptor.
    pub fn set_decryptor(&mut self, decryptor: Box<dyn Decryptor>) -> PDFResult<()> {
        let Some(encrypt) = self.trailer.encrypt.clone() else {
            return Err(PDFError::EncryptionHandlerRejected(
                "document is not encrypted".to_string(),
            ));
        };
        self.security = None;
        let resolved = self.resolve(&encrypt)?;
        let dict = resolved.as_dict().ok_or_else(|| {
            PDFError::EncryptionHandlerRejected("Encrypt is not a dictionary".to_string())
        })?;
        let handler = SecurityHandler::validate(dict, self.trailer.encrypt_ref())?;

        self.security = Some((handler, decryptor));
        self.cache.clear();
        self.object_streams = ObjectStreamCache::new();
        Ok(())
    }

    /// Number of pages, walking the whole page tree on first call.
    pub fn page_count(&mut self) -> PDFResult<usize> {
        self.walk_pages_until(usize::MAX)?;
        Ok(self.page_index.pages.len())
    }

    /// Object id of the page at `index`, or `None` past the last page.
    ///
    /// Walks the page tree only as far as needed.
    pub fn page(&mut self, index: usize) -> PDFResult<Option<ObjectId>> {
        self.walk_pages_until(index)?;
        Ok(self.page_index.pages.get(index).copied())
    }

    fn start_page_walk(&mut self) -> PDFResult<()> {
        let catalog = self.catalog()?;
        match catalog.as_dict().and_then(|d| d.get_reference("Pages")) {
            Some(pages) => self.page_index.stack.push((pages, 0)),
            None => warn!("catalog has no /Pages reference"),
        }
        self.page_index.started = true;
        Ok(())
    }

    fn walk_pages_until(&mut self, index: usize) -> PDFResult<()> {
        if !self.page_index.started {
            self.start_page_walk()?;
        }

        while self.page_index.pages.len() <= index {
            let Some(&(id, depth)) = self.page_index.stack.last() else {
                break;
            };
            // Fetch before popping so missing bytes leave the walk resumable
            let node = self.get_object(id)?;
            self.page_index.stack.pop();

            if !self.page_index.visited.insert(id) {
                warn!(node = %id, "page tree revisits a node");
                continue;
            }
            if depth > self.options.max_recursion_depth {
                warn!(node = %id, depth, "page tree too deep");
                continue;
            }
            let Some(dict) = node.as_dict() else {
                debug!(node = %id, "page tree node is not a dictionary");
                continue;
            };

            if dict.is_type("Pages") || (!dict.is_type("Page") && dict.contains_key("Kids")) {
                let kids = match dict.get("Kids") {
                    Some(kids @ PDFObject::Ref(_)) => self.resolve(kids)?,
                    Some(kids) => Arc::new(kids.clone()),
                    None => continue,
                };
                let Some(kids) = kids.as_array() else {
                    continue;
                };
                for kid in kids.iter().rev() {
                    if let Some(kid) = kid.as_reference() {
                        self.page_index.stack.push((kid, depth + 1));
                    }
                }
            } else {
                self.page_index.pages.push(id);
            }
        }

        if self.page_index.is_complete() && index == usize::MAX {
            debug!(pages = self.page_index.pages.len(), "page tree walked");
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_minimal_pdf() -> Vec<u8> {
        let body = b"%PDF-1.4\n\
            1 0 obj\n\
            << /Type /Catalog /Pages 2 0 R >>\n\
            endobj\n\
            2 0 obj\n\
            << /Type /Pages /Kids [3 0 R] /Count 1 >>\n\
            endobj\n\
            3 0 obj\n\
            << /Type /Page /Parent 2 0 R >>\n\
            endobj\n";
        let offsets: Vec<usize> = [&b"1 0 obj"[..], b"2 0 obj", b"3 0 obj"]
            .iter()
            .map(|needle| body.windows(needle.len()).position(|w| w == *needle).unwrap())
            .collect();

        let mut pdf = body.to_vec();
        let xref_offset = pdf.len();
        pdf.extend_from_slice(b"xref\n0 4\n0000000000 65535 f \n");
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size 4 /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                xref_offset
            )
            .as_bytes(),
        );
        pdf
    }

    #[test]
    fn test_open_minimal_pdf() {
        let mut doc = Document::open(create_minimal_pdf()).unwrap();

        assert!(!doc.is_recovered());
        assert_eq!(doc.version(), Some("1.4"));

        let catalog = doc.catalog().unwrap();
        let dict = catalog.as_dict().unwrap();
        assert!(dict.is_type("Catalog"));
        assert_eq!(dict.get_reference("Pages"), Some(ObjectId::new(2, 0)));
    }

    #[test]
    fn test_page_count() {
        let mut doc = Document::open(create_minimal_pdf()).unwrap();
        assert_eq!(doc.page_count().unwrap(), 1);
        assert_eq!(doc.page(0).unwrap(), Some(ObjectId::new(3, 0)));
        assert_eq!(doc.page(1).unwrap(), None);
    }

    #[test]
    fn test_dangling_reference_is_null() {
        let mut doc = Document::open(create_minimal_pdf()).unwrap();
        assert!(doc.get_object(ObjectId::new(99, 0)).unwrap().is_null());
        assert!(doc.get_object(ObjectId::new(0, 0)).unwrap().is_null());
        assert!(doc.get_object(ObjectId::new(1, 5)).unwrap().is_null());
    }

    #[test]
    fn test_broken_startxref_recovers() {
        let mut pdf = create_minimal_pdf();
        let len = pdf.len();
        // Point startxref at garbage
        let pos = pdf
            .windows(9)
            .rposition(|w| w == b"startxref")
            .unwrap();
        pdf.truncate(pos);
        pdf.extend_from_slice(b"startxref\n5\n%%EOF\n");
        assert!(pdf.len() <= len);

        let mut doc = Document::open(pdf).unwrap();
        assert!(doc.is_recovered());
        assert_eq!(doc.page_count().unwrap(), 1);
    }

    #[test]
    fn test_set_decryptor_on_plain_document() {
        let mut doc = Document::open(create_minimal_pdf()).unwrap();
        let result = doc.set_decryptor(Box::new(|_: ObjectId, data: &[u8]| -> PDFResult<Vec<u8>> {
            Ok(data.to_vec())
        }));
        assert!(matches!(result, Err(PDFError::EncryptionHandlerRejected(_))));
    }

    #[test]
    fn test_no_objects_is_fatal() {
        assert!(matches!(
            Document::open(b"%PDF-1.4\nnothing here".to_vec()),
            Err(PDFError::UnparsableTrailer(_))
        ));
    }
}
