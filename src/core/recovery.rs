//! Cross-reference reconstruction by scanning the raw bytes.
//!
//! Used when the declared `startxref` / `Prev` chain is missing or
//! inconsistent. The scan is a single forward pass driven by a small
//! lexical state machine that skips comments and strings, so keywords
//! buried inside string data are never mistaken for structure.

use super::decode::decode_stream;
use super::error::PDFResult;
use super::lexer::{is_delimiter, is_whitespace};
use super::object::{Dictionary, ObjectId, PDFObject};
use super::object_stream::ObjectStream;
use super::options::ParseOptions;
use super::parser::Parser;
use super::xref::{Trailer, XRef, XRefEntry};
use tracing::{debug, info, trace, warn};

/// Bytes fetched per read while scanning.
const SCAN_CHUNK_SIZE: usize = 64 * 1024;

/// Lexical state of the scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ScanState {
    Default,
    Whitespace,
    Comment,
    String { depth: u32 },
    HexString { after_open: bool },
    Escaped,
    ObjNum,
    PostObjNum,
    GenNum,
    PostGenNum,
    /// Bytes of `obj` matched so far
    BeginObj(usize),
    /// Bytes of `endobj` matched so far
    EndObj(usize),
    /// Bytes of `trailer` matched so far
    Trailer(usize),
    /// Bytes of `xref` matched so far
    Xref(usize),
}

/// What the driver should do after feeding one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Effect {
    /// Move to the next byte
    Advance,
    /// Feed the same byte again in the new state
    Retry,
    /// `num gen obj` ended at the current byte
    Object { start: usize, num: u64, generation: u64 },
    /// `trailer` ended at the current byte
    Trailer,
    /// `xref` started at the given offset
    Xref { start: usize },
}

/// Byte-level recognizer for `N G obj`, `trailer` and `xref`.
#[derive(Debug, Clone)]
struct ScanMachine {
    state: ScanState,
    num: u64,
    generation: u64,
    start: usize,
    gen_start: usize,
}

const OBJ: &[u8] = b"obj";
const ENDOBJ: &[u8] = b"endobj";
const TRAILER: &[u8] = b"trailer";
const XREF: &[u8] = b"xref";

impl ScanMachine {
    fn new() -> Self {
        ScanMachine {
            state: ScanState::Default,
            num: 0,
            generation: 0,
            start: 0,
            gen_start: 0,
        }
    }

    fn goto(&mut self, state: ScanState, effect: Effect) -> Effect {
        self.state = state;
        effect
    }

    fn transition(&mut self, byte: u8, pos: usize) -> Effect {
        let ch = byte as i32;
        let ws = is_whitespace(ch);

        match self.state {
            ScanState::Default => match byte {
                _ if ws => self.goto(ScanState::Whitespace, Effect::Advance),
                b'0'..=b'9' => self.goto(ScanState::Whitespace, Effect::Retry),
                b'%' => self.goto(ScanState::Comment, Effect::Advance),
                b'(' => self.goto(ScanState::String { depth: 1 }, Effect::Advance),
                b'<' => self.goto(ScanState::HexString { after_open: true }, Effect::Advance),
                b'\\' => self.goto(ScanState::Escaped, Effect::Advance),
                b't' => self.goto(ScanState::Trailer(1), Effect::Advance),
                _ => Effect::Advance,
            },

            ScanState::Whitespace => match byte {
                b'0'..=b'9' => {
                    self.start = pos;
                    self.num = (byte - b'0') as u64;
                    self.goto(ScanState::ObjNum, Effect::Advance)
                }
                b't' => self.goto(ScanState::Trailer(1), Effect::Advance),
                b'x' => self.goto(ScanState::Xref(1), Effect::Advance),
                _ if ws => Effect::Advance,
                _ => self.goto(ScanState::Default, Effect::Retry),
            },

            ScanState::ObjNum => match byte {
                b'0'..=b'9' => {
                    self.num = self.num.saturating_mul(10).saturating_add((byte - b'0') as u64);
                    Effect::Advance
                }
                _ if ws => self.goto(ScanState::PostObjNum, Effect::Advance),
                _ => self.goto(ScanState::EndObj(0), Effect::Retry),
            },

            ScanState::PostObjNum => match byte {
                b'0'..=b'9' => {
                    self.gen_start = pos;
                    self.generation = (byte - b'0') as u64;
                    self.goto(ScanState::GenNum, Effect::Advance)
                }
                b't' => self.goto(ScanState::Trailer(1), Effect::Advance),
                _ if ws => Effect::Advance,
                _ => self.goto(ScanState::Default, Effect::Retry),
            },

            ScanState::GenNum => match byte {
                b'0'..=b'9' => {
                    self.generation = self
                        .generation
                        .saturating_mul(10)
                        .saturating_add((byte - b'0') as u64);
                    Effect::Advance
                }
                _ if ws => self.goto(ScanState::PostGenNum, Effect::Advance),
                _ => self.goto(ScanState::Default, Effect::Retry),
            },

            ScanState::PostGenNum => match byte {
                b'o' => self.goto(ScanState::BeginObj(1), Effect::Advance),
                b'0'..=b'9' => {
                    // "a b c": slide the window, b becomes the object number
                    self.num = self.generation;
                    self.start = self.gen_start;
                    self.gen_start = pos;
                    self.generation = (byte - b'0') as u64;
                    self.goto(ScanState::GenNum, Effect::Advance)
                }
                b't' => self.goto(ScanState::Trailer(1), Effect::Advance),
                _ if ws => Effect::Advance,
                _ => self.goto(ScanState::Default, Effect::Retry),
            },

            ScanState::BeginObj(matched) if matched < OBJ.len() => {
                if byte == OBJ[matched] {
                    self.goto(ScanState::BeginObj(matched + 1), Effect::Advance)
                } else {
                    self.goto(ScanState::Default, Effect::Retry)
                }
            }
            ScanState::BeginObj(_) => {
                self.state = ScanState::Default;
                if ws || is_delimiter(ch) {
                    Effect::Object {
                        start: self.start,
                        num: self.num,
                        generation: self.generation,
                    }
                } else {
                    Effect::Advance
                }
            }

            ScanState::Trailer(matched) if matched < TRAILER.len() => {
                if byte == TRAILER[matched] {
                    self.goto(ScanState::Trailer(matched + 1), Effect::Advance)
                } else {
                    self.goto(ScanState::Default, Effect::Retry)
                }
            }
            ScanState::Trailer(_) => {
                self.state = ScanState::Default;
                if ws || is_delimiter(ch) {
                    Effect::Trailer
                } else {
                    Effect::Advance
                }
            }

            ScanState::Xref(matched) if matched < XREF.len() => {
                if byte == XREF[matched] {
                    self.goto(ScanState::Xref(matched + 1), Effect::Advance)
                } else {
                    self.goto(ScanState::Default, Effect::Retry)
                }
            }
            ScanState::Xref(_) => {
                self.state = ScanState::Whitespace;
                Effect::Xref {
                    start: pos.saturating_sub(XREF.len()),
                }
            }

            ScanState::Comment => {
                if byte == b'\r' || byte == b'\n' {
                    self.state = ScanState::Default;
                }
                Effect::Advance
            }

            ScanState::String { depth } => {
                let depth = match byte {
                    b')' => depth.saturating_sub(1),
                    b'(' => depth + 1,
                    _ => depth,
                };
                self.state = if depth == 0 {
                    ScanState::Default
                } else {
                    ScanState::String { depth }
                };
                Effect::Advance
            }

            ScanState::HexString { after_open } => {
                if byte == b'>' || (byte == b'<' && after_open) {
                    self.state = ScanState::Default;
                } else {
                    self.state = ScanState::HexString { after_open: false };
                }
                Effect::Advance
            }

            ScanState::Escaped => {
                if is_delimiter(ch) || ws {
                    self.goto(ScanState::Default, Effect::Retry)
                } else {
                    Effect::Advance
                }
            }

            ScanState::EndObj(matched) => match byte {
                _ if ws => self.goto(ScanState::Default, Effect::Advance),
                b'%' | b'(' | b'<' | b'\\' => self.goto(ScanState::Default, Effect::Retry),
                _ if matched == ENDOBJ.len() => self.goto(ScanState::Default, Effect::Retry),
                _ if byte == ENDOBJ[matched] => self.goto(ScanState::EndObj(matched + 1), Effect::Advance),
                _ => Effect::Advance,
            },
        }
    }
}

/// Trailer dictionaries found during the scan, in byte order.
#[derive(Debug, Clone)]
struct TrailerCandidate {
    dict: Dictionary,
    /// Taken from an xref stream rather than a `trailer` keyword
    from_xref_stream: bool,
}

/// Rebuilds a cross-reference table from the bytes alone.
///
/// Every object found at `N G obj` is strictly re-parsed; the last copy of
/// a number in byte order wins. Objects packed in object streams are added
/// for numbers no direct object claimed.
pub struct RecoveryScanner {
    machine: ScanMachine,
    xref: XRef,
    trailers: Vec<TrailerCandidate>,
    catalog: Option<ObjectId>,
    containers: Vec<(u64, ObjectStream)>,
    max_object_number: u64,
    max_decoded_size: usize,
}

impl RecoveryScanner {
    pub fn new(options: &ParseOptions) -> Self {
        RecoveryScanner {
            machine: ScanMachine::new(),
            xref: XRef::new(),
            trailers: Vec::new(),
            catalog: None,
            containers: Vec::new(),
            max_object_number: options.max_xref_size,
            max_decoded_size: options.max_decoded_stream_size,
        }
    }

    /// Scans the whole stream and returns the rebuilt table and trailer.
    ///
    /// Only missing bytes (`DataNotLoaded`) make this fail. The result may
    /// be empty or lack a root; the caller decides whether that is fatal.
    pub fn scan(mut self, parser: &mut Parser) -> PDFResult<(XRef, Trailer)> {
        info!(length = parser.length(), "rebuilding cross-reference table");
        parser.set_stream_bound(None);

        let length = parser.length();
        let mut chunk: Vec<u8> = Vec::new();
        let mut chunk_start = 0;
        let mut pos = 0;

        while pos < length {
            if pos < chunk_start || pos >= chunk_start + chunk.len() {
                chunk_start = pos;
                let end = (pos + SCAN_CHUNK_SIZE).min(length);
                chunk = parser.lexer_mut().stream_mut().get_byte_range(pos, end)?;
            }
            let byte = chunk[pos - chunk_start];

            match self.machine.transition(byte, pos) {
                Effect::Advance => pos += 1,
                Effect::Retry => {}
                Effect::Object {
                    start,
                    num,
                    generation,
                } => {
                    let resume = self.on_object(parser, start, num, generation)?;
                    pos = resume.map_or(pos + 1, |end| end.max(pos + 1));
                }
                Effect::Trailer => {
                    let resume = self.on_trailer(parser, pos)?;
                    pos = resume.map_or(pos + 1, |end| end.max(pos + 1));
                }
                Effect::Xref { start } => {
                    trace!(offset = start, "xref keyword");
                    self.xref.add_boundary(start as u64);
                    pos += 1;
                }
            }
        }

        self.finish(parser)
    }

    /// Strictly parses an object found by the scan. Returns where to resume.
    fn on_object(
        &mut self,
        parser: &mut Parser,
        start: usize,
        num: u64,
        generation: u64,
    ) -> PDFResult<Option<usize>> {
        if num >= self.max_object_number || generation > u16::MAX as u64 {
            return Ok(None);
        }

        let (id, object) = match parser.parse_indirect_object_at(start, Some(num)) {
            Ok(parsed) => parsed,
            Err(e) if e.is_data_not_loaded() => return Err(e),
            Err(e) => {
                trace!(offset = start, num, "object candidate rejected: {}", e);
                return Ok(None);
            }
        };
        let end = parser.position();

        self.xref.set_entry(
            num,
            XRefEntry::Offset {
                offset: start as u64,
                generation: id.generation,
            },
        );

        match &object {
            PDFObject::Stream { dict, data } => {
                if dict.is_type("XRef") && dict.contains_key("Size") && dict.contains_key("Root") {
                    debug!(object = %id, "xref stream trailer candidate");
                    self.trailers.push(TrailerCandidate {
                        dict: dict.clone(),
                        from_xref_stream: true,
                    });
                } else if dict.is_type("ObjStm") {
                    self.on_object_stream(num, dict, data);
                }
            }
            PDFObject::Dictionary(dict) if dict.is_type("Catalog") => {
                self.catalog = Some(id);
            }
            _ => {}
        }

        Ok(Some(end))
    }

    fn on_object_stream(&mut self, num: u64, dict: &Dictionary, data: &[u8]) {
        let parsed = decode_stream(dict, data, self.max_decoded_size)
            .and_then(|decoded| ObjectStream::parse(num, dict, decoded));
        match parsed {
            Ok(stream) => self.containers.push((num, stream)),
            Err(e) => debug!(container = num, "object stream unusable during recovery: {}", e),
        }
    }

    /// Parses the dictionary after a `trailer` keyword ending at `pos`.
    fn on_trailer(&mut self, parser: &mut Parser, pos: usize) -> PDFResult<Option<usize>> {
        parser.seek(pos)?;
        match parser.parse_object() {
            Ok(object) => {
                if let Some(dict) = object.as_dict() {
                    trace!(offset = pos, "trailer dictionary");
                    self.trailers.push(TrailerCandidate {
                        dict: dict.clone(),
                        from_xref_stream: false,
                    });
                    return Ok(Some(parser.position()));
                }
                Ok(None)
            }
            Err(e) if e.is_data_not_loaded() => Err(e),
            Err(e) => {
                trace!(offset = pos, "unparsable trailer: {}", e);
                Ok(None)
            }
        }
    }

    /// Picks the authoritative trailer and fills in object-stream entries.
    fn finish(mut self, parser: &mut Parser) -> PDFResult<(XRef, Trailer)> {
        for (container, stream) in &self.containers {
            // The container itself must be a live direct object
            if !matches!(self.xref.get_entry(*container), Some(XRefEntry::Offset { .. })) {
                continue;
            }
            for (index, num) in stream.object_numbers().enumerate() {
                if num < self.max_object_number && num != *container {
                    self.xref.insert_if_absent(
                        num,
                        XRefEntry::Compressed {
                            container: *container,
                            index: index as u32,
                        },
                    );
                }
            }
        }

        let mut authoritative = None;
        for (i, candidate) in self.trailers.iter().enumerate().rev() {
            if !candidate.from_xref_stream {
                continue;
            }
            let root = candidate.dict.get_reference("Root");
            if let Some(root) = root {
                if self.root_resolves(parser, root)? {
                    authoritative = Some(i);
                    break;
                }
            }
        }
        if authoritative.is_none() {
            authoritative = self.trailers.iter().rposition(|c| !c.from_xref_stream);
        }

        let mut trailer = match authoritative {
            Some(i) => {
                let mut trailer = Trailer::from_dict(&self.trailers[i].dict);
                for (j, older) in self.trailers.iter().enumerate().rev() {
                    if j != i {
                        trailer.merge_older(&Trailer::from_dict(&older.dict));
                    }
                }
                trailer
            }
            None => {
                warn!("no trailer found, synthesizing one");
                Trailer::default()
            }
        };

        let root_ok = match trailer.root {
            Some(root) => self.root_resolves(parser, root)?,
            None => false,
        };
        if !root_ok {
            if let Some(catalog) = self.catalog {
                debug!(root = %catalog, "using last catalog found as root");
                trailer.root = Some(catalog);
            }
        }
        // The rebuilt table replaces the chain entirely
        trailer.prev = None;
        trailer.xref_stm = None;
        if trailer.size.is_none() {
            trailer.size = self.xref.max_object_number().map(|n| n + 1);
        }

        info!(
            objects = self.xref.len(),
            root = ?trailer.root,
            "cross-reference table rebuilt"
        );
        Ok((self.xref, trailer))
    }

    /// Returns true if `root` names an object the rebuilt table can reach
    /// and that parses as a dictionary.
    fn root_resolves(&self, parser: &mut Parser, root: ObjectId) -> PDFResult<bool> {
        match self.xref.get_entry(root.num) {
            Some(XRefEntry::Offset { offset, generation }) if *generation == root.generation => {
                match parser.parse_indirect_object_at(*offset as usize, Some(root.num)) {
                    Ok((_, object)) => Ok(object.as_dict().is_some()),
                    Err(e) if e.is_data_not_loaded() => Err(e),
                    Err(_) => Ok(false),
                }
            }
            Some(XRefEntry::Compressed { container, .. }) => Ok(self
                .containers
                .iter()
                .any(|(num, _)| num == container)),
            _ => Ok(false),
        }
    }
}

/// Runs a full recovery scan over `parser`.
pub fn recover_xref(parser: &mut Parser, options: &ParseOptions) -> PDFResult<(XRef, Trailer)> {
    RecoveryScanner::new(options).scan(parser)
}
