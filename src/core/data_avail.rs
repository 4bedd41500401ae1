//! Progressive availability checking.
//!
//! [`AvailabilityChecker`] answers "can this document / page / form be
//! parsed from the bytes downloaded so far?" without blocking. Every step
//! reads through a [`ReadValidator`]; when bytes are missing the step
//! reports the ranges to fetch and leaves its state untouched, so the
//! caller downloads them and simply asks again.

use super::byte_source::ByteSource;
use super::chunk_manager::ChunkManager;
use super::document::Document;
use super::error::{PDFError, PDFResult};
use super::header::{find_header, FileHeader, LinearizedHeader, HEADER_SEARCH_LIMIT};
use super::object::{ObjectId, PDFObject};
use super::options::ParseOptions;
use super::parser::Parser;
use super::read_validator::{DownloadHints, FileAvail, ReadValidator};
use super::source_stream::SourceStream;
use super::xref::XRef;
use super::xref_loader::{find_startxref, read_section, XRefChain};
use rustc_hash::{FxHashMap, FxHashSet};
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Result of an availability query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Availability {
    /// Everything needed is downloaded (or the step made progress)
    Available,
    /// More bytes are needed; hints were emitted
    NotAvailable,
    /// The structure is broken even with the whole file present
    Error,
}

/// Stage of the availability state machine.
///
/// Document-level checks run `Header` through `PageTree` and end in
/// `Done`; page checks move through `Page`, `PageAnnotations` and
/// `Resources`; form checks use `AcroForm`. `Error` falls back to
/// requiring the whole file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckState {
    Header,
    FirstPageXref,
    TrailerScan,
    CrossRefLoad,
    Root,
    Info,
    AcroForm,
    PageTree,
    Page,
    PageAnnotations,
    Resources,
    Error,
    Done,
}

/// Classification of a page-tree node once it has been read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageNodeKind {
    /// Read but neither a page nor an inner node (dangling or untyped)
    Unknown,
    Page,
    Pages,
    /// A `Kids` array stored as its own object
    Array,
}

/// Resumable depth-first walk of the page tree.
#[derive(Debug, Default)]
struct PageTreeWalk {
    stack: Vec<(ObjectId, usize)>,
    nodes: FxHashMap<ObjectId, PageNodeKind>,
    pages: Vec<ObjectId>,
}

/// Keys never followed while checking reachable objects.
const PARENT_KEYS: &[&str] = &["Parent"];
/// Annotations point back at their page through `/P`.
const ANNOT_SKIP_KEYS: &[&str] = &["Parent", "P"];
/// Page entries handled by their own stages.
const PAGE_ROOT_SKIP_KEYS: &[&str] = &["Parent", "Annots", "Resources"];

/// Checks that every object reachable from a starting value is available.
///
/// Pending references form an explicit worklist so progress survives a
/// missing range. Dictionaries typed `/Page` other than the start are not
/// descended into, which keeps a page check from walking sibling pages.
#[derive(Debug)]
struct ObjectAvail {
    pending: Vec<ObjectId>,
    skip_keys: &'static [&'static str],
}

impl ObjectAvail {
    fn new(start: &PDFObject, root_skip_keys: &[&str], skip_keys: &'static [&'static str]) -> Self {
        let mut pending = Vec::new();
        collect_references(start, root_skip_keys, &mut pending);
        ObjectAvail { pending, skip_keys }
    }

    /// Returns Ok(()) once everything is confirmed; `DataNotLoaded` when
    /// blocked.
    fn check(&mut self, document: &mut Document, checked: &mut FxHashSet<ObjectId>) -> PDFResult<()> {
        while let Some(&id) = self.pending.last() {
            if checked.contains(&id) {
                self.pending.pop();
                continue;
            }
            let object = match document.get_object(id) {
                Ok(object) => object,
                Err(e) if e.is_data_not_loaded() => return Err(e),
                Err(e) => {
                    debug!(object = %id, "unreadable object counts as available: {}", e);
                    Arc::new(PDFObject::Null)
                }
            };
            self.pending.pop();
            checked.insert(id);

            let is_page = object.as_dict().is_some_and(|d| d.is_type("Page"));
            if !is_page {
                collect_references(&object, self.skip_keys, &mut self.pending);
            }
        }
        Ok(())
    }
}

/// Pushes every reference inside `object`, skipping dictionary `skip_keys`.
fn collect_references(object: &PDFObject, skip_keys: &[&str], out: &mut Vec<ObjectId>) {
    match object {
        PDFObject::Ref(id) => out.push(*id),
        PDFObject::Array(items) => {
            for item in items {
                collect_references(item, skip_keys, out);
            }
        }
        PDFObject::Dictionary(dict) | PDFObject::Stream { dict, .. } => {
            for (key, value) in dict.iter() {
                if !skip_keys.iter().any(|k| k.as_bytes() == key) {
                    collect_references(value, skip_keys, out);
                }
            }
        }
        _ => {}
    }
}

/// Per-page progress through the `Page`, `PageAnnotations` and
/// `Resources` stages.
#[derive(Debug)]
struct PageCheck {
    stage: CheckState,
    current: Option<ObjectAvail>,
}

impl PageCheck {
    fn new() -> Self {
        PageCheck {
            stage: CheckState::Page,
            current: None,
        }
    }
}

/// First page of a linearized file, checked against the cross-reference
/// section that follows the linearization dictionary.
struct FirstPageCheck {
    document: Document,
    /// Kept apart from the main set: objects missing from the first-page
    /// section read as null here
    checked: FxHashSet<ObjectId>,
    page: PageCheck,
}

/// Resumable availability checker for progressively downloaded files.
///
/// # Example
/// ```no_run
/// use pdf_x_syntax::{Availability, AvailabilityChecker, ChunkManager, HintList, ParseOptions};
/// use std::sync::Arc;
///
/// let chunks = Arc::new(ChunkManager::new(120_000, None));
/// let mut checker = AvailabilityChecker::from_chunks(chunks.clone(), ParseOptions::default());
/// let mut hints = HintList::new();
/// while checker.is_document_available(&mut hints) == Availability::NotAvailable {
///     for (offset, size) in hints.take() {
///         // fetch the range and hand it to `chunks.on_receive_data`
///         let _ = (offset, size);
///     }
///     # break;
/// }
/// ```
pub struct AvailabilityChecker {
    validator: Arc<ReadValidator>,
    options: ParseOptions,
    state: CheckState,
    file_size: u64,
    header: Option<FileHeader>,
    parser: Option<Parser>,
    linearized: Option<LinearizedHeader>,
    chain: Option<XRefChain>,
    document: Option<Document>,
    page_tree: PageTreeWalk,
    /// Objects confirmed available with everything they reference
    checked: FxHashSet<ObjectId>,
    page_checks: FxHashMap<usize, PageCheck>,
    pages_loaded: FxHashSet<usize>,
    form_check: Option<ObjectAvail>,
    form_loaded: bool,
    first_page: Option<FirstPageCheck>,
    /// The whole-file fallback already ran
    whole_file_loaded: bool,
}

impl AvailabilityChecker {
    /// Creates a checker reading from `source`, trusting `avail` to say
    /// which ranges are present.
    pub fn new(source: Arc<dyn ByteSource>, avail: Arc<dyn FileAvail>) -> Self {
        Self::with_options(source, avail, ParseOptions::default())
    }

    pub fn with_options(
        source: Arc<dyn ByteSource>,
        avail: Arc<dyn FileAvail>,
        options: ParseOptions,
    ) -> Self {
        let file_size = source.size();
        let validator = Arc::new(ReadValidator::new(
            source,
            avail,
            options.availability_read_padding,
        ));
        AvailabilityChecker {
            validator,
            options,
            state: CheckState::Header,
            file_size,
            header: None,
            parser: None,
            linearized: None,
            chain: None,
            document: None,
            page_tree: PageTreeWalk::default(),
            checked: FxHashSet::default(),
            page_checks: FxHashMap::default(),
            pages_loaded: FxHashSet::default(),
            form_check: None,
            form_loaded: false,
            first_page: None,
            whole_file_loaded: false,
        }
    }

    /// Creates a checker over a progressive chunk buffer, which serves as
    /// both the byte source and the availability oracle.
    pub fn from_chunks(chunks: Arc<ChunkManager>, options: ParseOptions) -> Self {
        let source: Arc<dyn ByteSource> = chunks.clone();
        let avail: Arc<dyn FileAvail> = chunks;
        Self::with_options(source, avail, options)
    }

    /// Current document-level state.
    pub fn state(&self) -> CheckState {
        self.state
    }

    pub fn is_linearized(&self) -> bool {
        self.linearized.is_some()
    }

    /// Linearization parameters, once the header has been checked.
    pub fn linearized_header(&self) -> Option<&LinearizedHeader> {
        self.linearized.as_ref()
    }

    /// Number of pages: `/N` for a linearized file, otherwise known once
    /// the page tree has been walked.
    pub fn page_count(&self) -> Option<usize> {
        if let Some(linearized) = &self.linearized {
            return usize::try_from(linearized.page_count).ok();
        }
        (self.state == CheckState::Done).then_some(self.page_tree.pages.len())
    }

    /// The document assembled from the checked structure, if any.
    pub fn document_mut(&mut self) -> Option<&mut Document> {
        self.document.as_mut()
    }

    /// Hands over the assembled document.
    pub fn into_document(self) -> Option<Document> {
        self.document
    }

    /// Runs one step of the document state machine.
    ///
    /// Returns `Available` if the step completed (the state may have
    /// moved on), `NotAvailable` with at least one hint if bytes are
    /// missing, and `Error` once the whole file is present and the
    /// structure is still unusable.
    pub fn advance(&mut self, hints: &mut dyn DownloadHints) -> Availability {
        if self.state == CheckState::Done {
            return Availability::Available;
        }
        self.validator.clear();

        let before = self.state;
        match self.step() {
            Ok(()) => {
                if self.state == CheckState::Error && self.whole_file_loaded {
                    return Availability::Error;
                }
                if self.state != before {
                    debug!(from = ?before, to = ?self.state, "availability state");
                }
                Availability::Available
            }
            Err(e) => self.blocked(e, hints),
        }
    }

    /// Drives [`advance`](Self::advance) until the document structure
    /// (trailer chain, catalog, info and page tree) is confirmed.
    pub fn is_document_available(&mut self, hints: &mut dyn DownloadHints) -> Availability {
        while self.state != CheckState::Done {
            match self.advance(hints) {
                Availability::Available => {}
                other => return other,
            }
        }
        Availability::Available
    }

    /// Checks a page dictionary, its annotations and its (possibly
    /// inherited) resources.
    ///
    /// The first page of a linearized file only needs the first-page
    /// section; every other page needs the document structure first.
    pub fn is_page_available(&mut self, index: usize, hints: &mut dyn DownloadHints) -> Availability {
        if self.pages_loaded.contains(&index) {
            return Availability::Available;
        }
        if self.state != CheckState::Done {
            if let Some(answer) = self.check_linearized_first_page(index, hints) {
                return answer;
            }
        }
        match self.is_document_available(hints) {
            Availability::Available => {}
            other => return other,
        }
        let Some(&page_id) = self.page_tree.pages.get(index) else {
            warn!(index, pages = self.page_tree.pages.len(), "page index out of range");
            return Availability::Error;
        };

        self.validator.clear();
        let mut check = self.page_checks.remove(&index).unwrap_or_else(PageCheck::new);
        let max_depth = self.options.max_recursion_depth;
        let result = match self.document.as_mut() {
            Some(document) => run_page_check(document, &mut self.checked, max_depth, page_id, &mut check),
            None => Ok(false),
        };

        match result {
            Ok(true) => {
                trace!(index, "page available");
                self.pages_loaded.insert(index);
                Availability::Available
            }
            Ok(false) => Availability::Error,
            Err(e) => {
                self.page_checks.insert(index, check);
                self.blocked(e, hints)
            }
        }
    }

    /// Answers for the first page of a linearized file without walking
    /// the main cross-reference chain. `None` hands over to the regular
    /// path.
    fn check_linearized_first_page(
        &mut self,
        index: usize,
        hints: &mut dyn DownloadHints,
    ) -> Option<Availability> {
        while matches!(self.state, CheckState::Header | CheckState::FirstPageXref) {
            match self.advance(hints) {
                Availability::Available => {}
                other => return Some(other),
            }
        }
        let linearized = self.linearized.clone()?;
        if linearized.first_page != index as u64 {
            return None;
        }

        self.validator.clear();
        if self.first_page.is_none() {
            match self.open_first_page_section(&linearized) {
                Ok(Some(document)) => {
                    self.first_page = Some(FirstPageCheck {
                        document,
                        checked: FxHashSet::default(),
                        page: PageCheck::new(),
                    });
                }
                Ok(None) => return None,
                Err(e) => return Some(self.blocked(e, hints)),
            }
        }

        let max_depth = self.options.max_recursion_depth;
        let first = self.first_page.as_mut()?;
        let result = run_page_check(
            &mut first.document,
            &mut first.checked,
            max_depth,
            linearized.first_page_object,
            &mut first.page,
        );
        match result {
            Ok(true) => {
                debug!(index, page = %linearized.first_page_object, "first page available");
                self.pages_loaded.insert(index);
                Some(Availability::Available)
            }
            Ok(false) => {
                debug!(page = %linearized.first_page_object, "first page object is not a dictionary");
                None
            }
            Err(e) => Some(self.blocked(e, hints)),
        }
    }

    /// Builds a document over the first-page cross-reference section.
    fn open_first_page_section(&mut self, linearized: &LinearizedHeader) -> PDFResult<Option<Document>> {
        let Some(parser) = self.parser.as_mut() else {
            return Ok(None);
        };
        let section = match read_section(parser, linearized.first_page_xref_offset, &self.options) {
            Ok(section) => section,
            Err(e) if e.is_data_not_loaded() => return Err(e),
            Err(e) => {
                debug!("no first-page cross-reference section: {}", e);
                return Ok(None);
            }
        };

        let mut xref = XRef::new();
        for (num, entry) in section.entries {
            xref.set_entry(num, entry);
        }
        let document = Document::from_parts(
            self.source(),
            self.header.clone(),
            xref,
            section.trailer,
            self.options.clone(),
        )?;
        Ok(Some(document))
    }

    /// Checks the interactive form tree under the catalog's `AcroForm`.
    ///
    /// A document without a form is reported as available.
    pub fn is_form_available(&mut self, hints: &mut dyn DownloadHints) -> Availability {
        if self.form_loaded {
            return Availability::Available;
        }
        match self.is_document_available(hints) {
            Availability::Available => {}
            other => return other,
        }
        self.validator.clear();

        let result = self.run_form_check();
        match result {
            Ok(()) => {
                self.form_loaded = true;
                Availability::Available
            }
            Err(e) => self.blocked(e, hints),
        }
    }

    fn blocked(&mut self, error: PDFError, hints: &mut dyn DownloadHints) -> Availability {
        match error {
            PDFError::DataNotLoaded { offset, length } => {
                if self.validator.flush(hints) == 0 {
                    hints.add_segment(offset, length.max(1));
                }
                Availability::NotAvailable
            }
            other => {
                warn!(state = ?self.state, "availability check failed: {}", other);
                self.validator.clear();
                Availability::Error
            }
        }
    }

    /// Fails unless `[offset, offset + size)` is downloaded.
    fn require(&self, offset: u64, size: u64) -> PDFResult<()> {
        if self.validator.check_range(offset, size) {
            Ok(())
        } else {
            Err(PDFError::DataNotLoaded {
                offset,
                length: size,
            })
        }
    }

    fn fail(&mut self, reason: impl std::fmt::Display) {
        warn!(state = ?self.state, "structure unusable, whole file needed: {}", reason);
        self.state = CheckState::Error;
    }

    fn source(&self) -> Arc<dyn ByteSource> {
        self.validator.clone()
    }

    fn step(&mut self) -> PDFResult<()> {
        match self.state {
            CheckState::Header => self.check_header(),
            CheckState::FirstPageXref => self.check_first_page(),
            CheckState::TrailerScan => self.check_trailer(),
            CheckState::CrossRefLoad => self.check_cross_ref(),
            CheckState::Root => self.check_root(),
            CheckState::Info => self.check_info(),
            CheckState::PageTree => self.check_page_tree(),
            CheckState::Error => self.load_whole_file(),
            CheckState::Done
            | CheckState::AcroForm
            | CheckState::Page
            | CheckState::PageAnnotations
            | CheckState::Resources => Ok(()),
        }
    }

    fn check_header(&mut self) -> PDFResult<()> {
        self.require(0, self.file_size.min(HEADER_SEARCH_LIMIT))?;
        let Some(header) = find_header(self.validator.as_ref())? else {
            self.fail("no %PDF- header");
            return Ok(());
        };

        let stream = SourceStream::with_base(self.source(), header.offset);
        let mut parser =
            Parser::from_stream(Box::new(stream))?.with_max_depth(self.options.max_recursion_depth);
        let linearized = LinearizedHeader::parse(&mut parser, self.file_size)?;

        debug!(
            version = %header.version,
            offset = header.offset,
            linearized = linearized.is_some(),
            "header available"
        );
        self.state = if linearized.is_some() {
            CheckState::FirstPageXref
        } else {
            CheckState::TrailerScan
        };
        self.header = Some(header);
        self.linearized = linearized;
        self.parser = Some(parser);
        Ok(())
    }

    fn check_first_page(&mut self) -> PDFResult<()> {
        let Some(linearized) = &self.linearized else {
            self.state = CheckState::TrailerScan;
            return Ok(());
        };
        if linearized.first_page_end == 0 || linearized.main_xref_offset == 0 {
            debug!("linearization dictionary without /E or /T, ignoring it");
            self.linearized = None;
            self.state = CheckState::TrailerScan;
            return Ok(());
        }
        let base = self.header.as_ref().map_or(0, |h| h.offset);
        let end = base
            .saturating_add(linearized.first_page_end)
            .saturating_add(self.options.availability_read_padding)
            .min(self.file_size);
        self.require(0, end)?;
        self.state = CheckState::TrailerScan;
        Ok(())
    }

    fn check_trailer(&mut self) -> PDFResult<()> {
        let window = (self.options.startxref_search_window as u64).min(self.file_size);
        self.require(self.file_size - window, window)?;

        let Some(parser) = self.parser.as_mut() else {
            self.fail("no parser");
            return Ok(());
        };
        match find_startxref(parser, self.options.startxref_search_window) {
            Ok(offset) => {
                self.chain = Some(XRefChain::new(offset));
                self.state = CheckState::CrossRefLoad;
                Ok(())
            }
            Err(e) if e.is_data_not_loaded() => Err(e),
            Err(e) => {
                self.fail(e);
                Ok(())
            }
        }
    }

    /// Reads one revision per call; assembles the document when the chain
    /// is complete.
    fn check_cross_ref(&mut self) -> PDFResult<()> {
        let (Some(chain), Some(parser)) = (self.chain.as_mut(), self.parser.as_mut()) else {
            self.fail("cross-reference walk not started");
            return Ok(());
        };

        if !chain.is_complete() {
            return match chain.step(parser, &self.options) {
                Ok(()) => Ok(()),
                Err(e) if e.is_data_not_loaded() => Err(e),
                Err(e) => {
                    self.fail(e);
                    Ok(())
                }
            };
        }

        let (xref, trailer) = match chain.finish(parser) {
            Ok(parts) => parts,
            Err(e) if e.is_data_not_loaded() => return Err(e),
            Err(e) => {
                self.fail(e);
                return Ok(());
            }
        };
        let document = Document::from_parts(
            self.source(),
            self.header.clone(),
            xref,
            trailer,
            self.options.clone(),
        )?;
        self.document = Some(document);
        self.state = CheckState::Root;
        Ok(())
    }

    fn check_root(&mut self) -> PDFResult<()> {
        let Some(document) = self.document.as_mut() else {
            self.fail("no document");
            return Ok(());
        };
        let Some(root) = document.trailer().root else {
            self.fail("trailer has no Root");
            return Ok(());
        };
        let catalog = document.get_object(root)?;
        let Some(pages) = catalog.as_dict().and_then(|d| d.get_reference("Pages")) else {
            self.fail("catalog has no Pages reference");
            return Ok(());
        };

        self.page_tree = PageTreeWalk::default();
        self.page_tree.stack.push((pages, 0));
        self.state = if document.trailer().info.is_some() {
            CheckState::Info
        } else {
            CheckState::PageTree
        };
        Ok(())
    }

    fn check_info(&mut self) -> PDFResult<()> {
        if let Some(document) = self.document.as_mut() {
            if let Some(info) = document.trailer().info {
                document.get_object(info)?;
            }
        }
        self.state = CheckState::PageTree;
        Ok(())
    }

    fn check_page_tree(&mut self) -> PDFResult<()> {
        let Some(document) = self.document.as_mut() else {
            self.fail("no document");
            return Ok(());
        };
        let max_depth = self.options.max_recursion_depth;
        let tree = &mut self.page_tree;

        while let Some(&(id, depth)) = tree.stack.last() {
            if depth > max_depth {
                let reason = format!("page tree deeper than {}", max_depth);
                self.fail(reason);
                return Ok(());
            }
            if tree.nodes.contains_key(&id) {
                let reason = format!("page tree node {} reached twice", id);
                self.fail(reason);
                return Ok(());
            }

            let node = document.get_object(id)?;
            tree.stack.pop();

            let kind = match node.as_ref() {
                PDFObject::Null => PageNodeKind::Unknown,
                PDFObject::Array(kids) => {
                    push_kids(&mut tree.stack, kids, depth + 1);
                    PageNodeKind::Array
                }
                PDFObject::Dictionary(dict)
                    if dict.is_type("Pages") || (!dict.is_type("Page") && dict.contains_key("Kids")) =>
                {
                    match dict.get("Kids") {
                        Some(PDFObject::Array(kids)) => push_kids(&mut tree.stack, kids, depth + 1),
                        Some(PDFObject::Ref(kids)) => tree.stack.push((*kids, depth + 1)),
                        None => {}
                        Some(other) => {
                            let reason = format!("Kids of {} is {:?}", id, other);
                            self.fail(reason);
                            return Ok(());
                        }
                    }
                    PageNodeKind::Pages
                }
                PDFObject::Dictionary(_) => {
                    tree.pages.push(id);
                    PageNodeKind::Page
                }
                other => {
                    let reason = format!("page tree node {} is {:?}", id, other);
                    self.fail(reason);
                    return Ok(());
                }
            };
            trace!(node = %id, ?kind, "page tree node");
            tree.nodes.insert(id, kind);
        }

        debug!(pages = tree.pages.len(), "page tree available");
        self.state = CheckState::Done;
        Ok(())
    }

    /// Requires every byte, then opens the document with recovery.
    fn load_whole_file(&mut self) -> PDFResult<()> {
        if self.whole_file_loaded {
            return Ok(());
        }
        if !self.validator.check_whole_file() {
            return Err(PDFError::DataNotLoaded {
                offset: 0,
                length: self.file_size,
            });
        }

        self.whole_file_loaded = true;
        match Document::open_source(self.source(), self.options.clone()) {
            Ok(document) => {
                debug!(recovered = document.is_recovered(), "whole file loaded");
                self.document = Some(document);
                self.state = CheckState::Root;
            }
            Err(e) if e.is_data_not_loaded() => {
                self.whole_file_loaded = false;
                return Err(e);
            }
            Err(e) => warn!("document unusable with the whole file present: {}", e),
        }
        Ok(())
    }

    fn run_form_check(&mut self) -> PDFResult<()> {
        let Some(document) = self.document.as_mut() else {
            return Ok(());
        };
        if self.form_check.is_none() {
            let catalog = document.catalog()?;
            match catalog.as_dict().and_then(|d| d.get("AcroForm")) {
                Some(form) => self.form_check = Some(ObjectAvail::new(form, ANNOT_SKIP_KEYS, ANNOT_SKIP_KEYS)),
                None => return Ok(()),
            }
        }
        if let Some(check) = self.form_check.as_mut() {
            check.check(document, &mut self.checked)?;
        }
        Ok(())
    }
}

/// Advances one page's stages. Ok(false) means the page is not a
/// dictionary.
fn run_page_check(
    document: &mut Document,
    checked: &mut FxHashSet<ObjectId>,
    max_depth: usize,
    page_id: ObjectId,
    check: &mut PageCheck,
) -> PDFResult<bool> {
    let page = document.get_object(page_id)?;
    let Some(page_dict) = page.as_dict() else {
        return Ok(false);
    };

    loop {
        if check.current.is_none() {
            check.current = match check.stage {
                CheckState::Page => Some(ObjectAvail::new(&page, PAGE_ROOT_SKIP_KEYS, PARENT_KEYS)),
                CheckState::PageAnnotations => page_dict
                    .get("Annots")
                    .map(|annots| ObjectAvail::new(annots, ANNOT_SKIP_KEYS, ANNOT_SKIP_KEYS)),
                CheckState::Resources => inherited_resources(document, page_dict, max_depth)?
                    .map(|resources| ObjectAvail::new(&resources, PARENT_KEYS, PARENT_KEYS)),
                _ => return Ok(true),
            };
        }

        if let Some(current) = check.current.as_mut() {
            current.check(document, checked)?;
        }
        check.current = None;
        check.stage = match check.stage {
            CheckState::Page => CheckState::PageAnnotations,
            CheckState::PageAnnotations => CheckState::Resources,
            _ => CheckState::Done,
        };
        trace!(page = %page_id, stage = ?check.stage, "page check stage");
    }
}

fn push_kids(stack: &mut Vec<(ObjectId, usize)>, kids: &[PDFObject], depth: usize) {
    for kid in kids.iter().rev() {
        if let Some(kid) = kid.as_reference() {
            stack.push((kid, depth));
        }
    }
}

/// Finds `Resources` on the page or the nearest ancestor.
fn inherited_resources(
    document: &mut Document,
    page: &super::object::Dictionary,
    max_depth: usize,
) -> PDFResult<Option<PDFObject>> {
    if let Some(resources) = page.get("Resources") {
        return Ok(Some(resources.clone()));
    }
    let mut parent = page.get_reference("Parent");
    for _ in 0..max_depth {
        let Some(id) = parent else {
            return Ok(None);
        };
        let node = document.get_object(id)?;
        let Some(dict) = node.as_dict() else {
            return Ok(None);
        };
        if let Some(resources) = dict.get("Resources") {
            return Ok(Some(resources.clone()));
        }
        parent = dict.get_reference("Parent");
    }
    warn!("Parent chain deeper than {} looking for Resources", max_depth);
    Ok(None)
}
