//! Cross-reference loading: locating `startxref`, reading classic tables
//! and xref streams, and walking the `/Prev` chain newest-first.

use super::decode::decode_stream;
use super::error::{PDFError, PDFResult};
use super::lexer::{is_special, is_whitespace, Token};
use super::object::{Dictionary, PDFObject};
use super::options::ParseOptions;
use super::parser::{keyword_at, Parser};
use super::xref::{Trailer, XRef, XRefEntry};
use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;
use tracing::{debug, trace, warn};

/// Size of one classic cross-reference record: `nnnnnnnnnn ggggg n\r\n`.
pub const XREF_RECORD_SIZE: usize = 20;

/// Widest field accepted in an xref stream `/W` array.
const MAX_FIELD_WIDTH: i64 = 8;

/// One revision's cross-reference data, parsed but not yet merged.
#[derive(Debug, Clone, PartialEq)]
pub struct XRefSection {
    pub offset: u64,
    pub entries: Vec<(u64, XRefEntry)>,
    pub trailer: Trailer,
    pub is_stream: bool,
}

fn chain_error(message: impl Into<String>) -> PDFError {
    PDFError::MissingOrCyclicXref(message.into())
}

/// Finds the offset named by the last `startxref` keyword.
///
/// Only the trailing `window` bytes are searched. The offset must lie
/// inside the file.
pub fn find_startxref(parser: &mut Parser, window: usize) -> PDFResult<u64> {
    let length = parser.length();
    let start = length.saturating_sub(window);
    let tail = parser
        .lexer_mut()
        .stream_mut()
        .get_byte_range(start, length)?;

    const KEYWORD: &[u8] = b"startxref";
    let found = (0..tail.len().saturating_sub(KEYWORD.len() - 1))
        .rev()
        .find(|&i| {
            keyword_at(&tail, i, KEYWORD) && (i == 0 || is_special(tail[i - 1] as i32))
        })
        .ok_or_else(|| chain_error("startxref not found"))?;

    parser.seek(start + found + KEYWORD.len())?;
    match parser.next_integer()? {
        Some(offset) if offset >= 0 && (offset as usize) < length => {
            trace!(offset, "startxref");
            Ok(offset as u64)
        }
        other => Err(chain_error(format!("invalid startxref offset {:?}", other))),
    }
}

/// Reads the cross-reference section (classic or stream) at `offset`.
pub fn read_section(parser: &mut Parser, offset: u64, options: &ParseOptions) -> PDFResult<XRefSection> {
    let pos = usize::try_from(offset).map_err(|_| chain_error("offset overflow"))?;
    if pos >= parser.length() {
        return Err(chain_error(format!("section offset {} beyond end of file", offset)));
    }
    parser.seek(pos)?;

    match parser.read_token()? {
        Token::Keyword(k) if k == "xref" => read_classic_section(parser, offset, options),
        Token::Integer(_) => read_stream_section(parser, offset, options),
        other => Err(chain_error(format!(
            "no cross-reference section at {} (found {:?})",
            offset, other
        ))),
    }
}

/// Reads `xref` subsections and the following trailer dictionary.
///
/// The parser must be positioned just after the `xref` keyword.
fn read_classic_section(parser: &mut Parser, offset: u64, options: &ParseOptions) -> PDFResult<XRefSection> {
    let mut entries = Vec::new();

    loop {
        let mut start = match parser.read_token()? {
            Token::Keyword(k) if k == "trailer" => break,
            Token::Integer(n) if n >= 0 => n as u64,
            other => {
                return Err(chain_error(format!(
                    "unexpected {:?} in xref table at {}",
                    other, offset
                )));
            }
        };
        let count = match parser.next_integer()? {
            Some(c) if c >= 0 => c as u64,
            _ => return Err(chain_error(format!("bad subsection count at {}", offset))),
        };
        if start.saturating_add(count) > options.max_xref_size {
            return Err(chain_error(format!(
                "subsection {} +{} exceeds the table size limit",
                start, count
            )));
        }

        let records_start = skip_whitespace(parser, parser.position())?;
        let records_len = count as usize * XREF_RECORD_SIZE;
        let records = parser
            .lexer_mut()
            .stream_mut()
            .get_byte_range(records_start, records_start + records_len)
            .map_err(|e| match e {
                PDFError::DataNotLoaded { .. } => e,
                _ => chain_error(format!("truncated xref subsection at {}", records_start)),
            })?;

        for (i, record) in records.chunks_exact(XREF_RECORD_SIZE).enumerate() {
            // Some writers start the first subsection at 1 but still emit
            // the free-list head
            if i == 0 && start == 1 && record.starts_with(b"0000000000 65535 f") {
                start = 0;
            }
            let entry = parse_classic_record(record).ok_or_else(|| {
                chain_error(format!(
                    "malformed xref record for object {}",
                    start + i as u64
                ))
            })?;
            entries.push((start + i as u64, entry));
        }

        parser.seek(records_start + records_len)?;
    }

    let dict = match parser.parse_object() {
        Ok(PDFObject::Dictionary(dict)) => dict,
        Ok(other) => {
            return Err(PDFError::UnparsableTrailer(format!(
                "trailer at {} is not a dictionary: {:?}",
                offset, other
            )));
        }
        Err(e) if e.is_data_not_loaded() => return Err(e),
        Err(e) => return Err(PDFError::UnparsableTrailer(e.to_string())),
    };

    Ok(XRefSection {
        offset,
        entries,
        trailer: Trailer::from_dict(&dict),
        is_stream: false,
    })
}

fn skip_whitespace(parser: &mut Parser, mut pos: usize) -> PDFResult<usize> {
    let length = parser.length();
    while pos < length {
        let end = (pos + 64).min(length);
        let bytes = parser.lexer_mut().stream_mut().get_byte_range(pos, end)?;
        match bytes.iter().position(|b| !is_whitespace(*b as i32)) {
            Some(i) => return Ok(pos + i),
            None => pos = end,
        }
    }
    Ok(pos)
}

/// Decodes one fixed-width classic record.
///
/// Offset is the first 10 digits, generation starts at +11 and the type
/// byte sits at +17. Returns `None` for an unusable record.
pub fn parse_classic_record(record: &[u8]) -> Option<XRefEntry> {
    if record.len() < 18 {
        return None;
    }
    match record[17] {
        b'f' => Some(XRefEntry::Free),
        b'n' => {
            let offset = parse_digits(&record[0..10])?;
            let generation = parse_digits(&record[11..16])?.min(u16::MAX as u64) as u16;
            if offset == 0 {
                // In use at offset 0 cannot be an object
                return Some(XRefEntry::Free);
            }
            Some(XRefEntry::Offset { offset, generation })
        }
        _ => None,
    }
}

fn parse_digits(bytes: &[u8]) -> Option<u64> {
    bytes.iter().try_fold(0u64, |acc, b| {
        b.is_ascii_digit()
            .then(|| acc * 10 + (b - b'0') as u64)
    })
}

/// Reads a cross-reference stream object at `offset`.
fn read_stream_section(parser: &mut Parser, offset: u64, options: &ParseOptions) -> PDFResult<XRefSection> {
    let (id, object) = parser.parse_indirect_object_at(offset as usize, None)?;
    let PDFObject::Stream { dict, data } = object else {
        return Err(chain_error(format!("object {} at {} is not a stream", id, offset)));
    };
    if !dict.is_type("XRef") {
        return Err(chain_error(format!("object {} is not an xref stream", id)));
    }

    let decoded = decode_stream(&dict, &data, options.max_decoded_stream_size)
        .map_err(|e| chain_error(e.to_string()))?;
    let entries = parse_xref_stream_entries(&dict, &decoded, options.max_xref_size)?;

    Ok(XRefSection {
        offset,
        entries,
        trailer: Trailer::from_dict(&dict),
        is_stream: true,
    })
}

/// Decodes the fixed-width records of an xref stream payload.
///
/// `/W` needs at least three widths of at most 8 bytes. A zero type width
/// means every record is type 1. Unknown types and records numbered past
/// `/Size` are skipped.
pub fn parse_xref_stream_entries(
    dict: &Dictionary,
    data: &[u8],
    max_xref_size: u64,
) -> PDFResult<Vec<(u64, XRefEntry)>> {
    let widths: SmallVec<[usize; 4]> = dict
        .get_array("W")
        .ok_or_else(|| chain_error("xref stream without /W"))?
        .iter()
        .map(|w| {
            w.as_integer()
                .filter(|v| (0..=MAX_FIELD_WIDTH).contains(v))
                .map(|v| v as usize)
        })
        .collect::<Option<_>>()
        .ok_or_else(|| chain_error("invalid /W entry"))?;
    if widths.len() < 3 {
        return Err(chain_error("/W needs three fields"));
    }

    let size = dict
        .get_integer("Size")
        .filter(|s| *s >= 0)
        .ok_or_else(|| chain_error("xref stream without /Size"))? as u64;
    if size > max_xref_size {
        return Err(chain_error(format!("/Size {} exceeds the table size limit", size)));
    }

    let index: SmallVec<[(u64, u64); 4]> = match dict.get_array("Index") {
        Some(items) => items
            .chunks_exact(2)
            .map(|pair| {
                let start = pair[0].as_integer().filter(|v| *v >= 0)?;
                let count = pair[1].as_integer().filter(|v| *v >= 0)?;
                Some((start as u64, count as u64))
            })
            .collect::<Option<_>>()
            .ok_or_else(|| chain_error("invalid /Index entry"))?,
        None => SmallVec::from_slice(&[(0, size)]),
    };

    let record_len: usize = widths.iter().sum();
    if record_len == 0 {
        return Err(chain_error("xref stream records are empty"));
    }

    let mut records = data.chunks_exact(record_len);
    let mut entries = Vec::new();

    'subsections: for (start, count) in index {
        for i in 0..count {
            let Some(record) = records.next() else {
                break 'subsections;
            };
            let num = start.saturating_add(i);
            if num >= size {
                continue;
            }

            let (type_field, rest) = record.split_at(widths[0]);
            let (field2, rest) = rest.split_at(widths[1]);
            let field3 = &rest[..widths[2]];

            let entry_type = if widths[0] == 0 { 1 } else { read_be(type_field) };
            let entry = match entry_type {
                0 => XRefEntry::Free,
                1 => XRefEntry::Offset {
                    offset: read_be(field2),
                    generation: read_be(field3).min(u16::MAX as u64) as u16,
                },
                2 => XRefEntry::Compressed {
                    container: read_be(field2),
                    index: read_be(field3).min(u32::MAX as u64) as u32,
                },
                _ => continue,
            };
            entries.push((num, entry));
        }
    }

    Ok(entries)
}

fn read_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0u64, |acc, b| (acc << 8) | *b as u64)
}

/// Progress of a trailer-chain walk.
///
/// Each [`step`](Self::step) reads one revision into scratch state and
/// merges it only on success, so a step that fails (including for bytes
/// that are not downloaded yet) leaves the chain exactly as it was and can
/// simply be retried.
#[derive(Debug, Clone, PartialEq)]
pub struct XRefChain {
    table: XRef,
    trailer: Option<Trailer>,
    next: Option<u64>,
    visited: FxHashSet<u64>,
    has_xref_stm: bool,
    revisions: usize,
}

impl XRefChain {
    /// Starts a walk at the offset named by `startxref`.
    pub fn new(start: u64) -> Self {
        XRefChain {
            table: XRef::new(),
            trailer: None,
            next: Some(start),
            visited: FxHashSet::default(),
            has_xref_stm: false,
            revisions: 0,
        }
    }

    /// Offset of the next revision to read.
    pub fn next_offset(&self) -> Option<u64> {
        self.next
    }

    pub fn is_complete(&self) -> bool {
        self.next.is_none()
    }

    /// Returns true if any revision was a hybrid (`XRefStm`) table.
    pub fn uses_xref_stm(&self) -> bool {
        self.has_xref_stm
    }

    /// Number of revisions merged so far.
    pub fn revisions(&self) -> usize {
        self.revisions
    }

    /// Trailer merged from the revisions read so far.
    pub fn trailer(&self) -> Option<&Trailer> {
        self.trailer.as_ref()
    }

    /// Reads and merges the next revision.
    pub fn step(&mut self, parser: &mut Parser, options: &ParseOptions) -> PDFResult<()> {
        let Some(offset) = self.next else {
            return Ok(());
        };
        if self.visited.contains(&offset) {
            return Err(chain_error(format!("Prev chain revisits offset {}", offset)));
        }

        let section = read_section(parser, offset, options)?;

        let mut revision: FxHashMap<u64, XRefEntry> = section.entries.iter().copied().collect();
        let mut stm_offset = None;
        if let Some(stm) = section.trailer.xref_stm.filter(|_| !section.is_stream) {
            if !self.visited.contains(&stm) {
                match read_section(parser, stm, options) {
                    Ok(stream) if stream.is_stream => {
                        for (num, entry) in stream.entries {
                            // Only numbers the classic table left free or unlisted
                            let replace = revision.get(&num).is_none_or(XRefEntry::is_free);
                            if replace {
                                revision.insert(num, entry);
                            }
                        }
                        stm_offset = Some(stm);
                    }
                    Ok(_) => warn!(offset = stm, "XRefStm does not point at an xref stream"),
                    Err(e) if e.is_data_not_loaded() => return Err(e),
                    Err(e) => warn!(offset = stm, "ignoring unreadable XRefStm: {}", e),
                }
            }
        }

        self.visited.insert(offset);
        self.table.add_boundary(offset);
        if let Some(stm) = stm_offset {
            self.visited.insert(stm);
            self.table.add_boundary(stm);
            self.has_xref_stm = true;
        }

        let mut numbers: Vec<u64> = revision.keys().copied().collect();
        numbers.sort_unstable();
        for num in numbers {
            if let Some(entry) = revision.get(&num) {
                self.table.insert_if_absent(num, *entry);
            }
        }

        self.next = section.trailer.prev;
        match &mut self.trailer {
            Some(newer) => newer.merge_older(&section.trailer),
            None => self.trailer = Some(section.trailer),
        }
        self.revisions += 1;

        debug!(
            offset,
            entries = revision.len(),
            stream = section.is_stream,
            prev = ?self.next,
            "merged cross-reference revision"
        );
        Ok(())
    }

    /// Validates the finished chain and returns the table and trailer.
    ///
    /// Fails when the walk is incomplete, `Root` is missing, an offset lies
    /// outside the file, or the root entry does not lead to its object.
    pub fn finish(&self, parser: &mut Parser) -> PDFResult<(XRef, Trailer)> {
        if !self.is_complete() {
            return Err(chain_error("cross-reference chain not fully read"));
        }
        let trailer = self
            .trailer
            .clone()
            .ok_or_else(|| PDFError::UnparsableTrailer("no trailer read".to_string()))?;
        let root = trailer.root.ok_or(PDFError::NoRoot)?;

        let length = parser.length() as u64;
        for (num, entry) in self.table.iter() {
            if let XRefEntry::Offset { offset, .. } = entry {
                if *offset >= length {
                    return Err(chain_error(format!(
                        "object {} offset {} beyond end of file",
                        num, offset
                    )));
                }
            }
        }

        if let Some(XRefEntry::Offset { offset, .. }) = self.table.get_entry(root.num) {
            match parser.parse_indirect_object_at(*offset as usize, Some(root.num)) {
                Ok(_) => {}
                Err(e) if e.is_data_not_loaded() => return Err(e),
                Err(e) => {
                    return Err(chain_error(format!(
                        "root entry does not lead to object {}: {}",
                        root.num, e
                    )));
                }
            }
        }

        Ok((self.table.clone(), trailer))
    }
}

/// Loads the complete cross-reference table of a document.
pub fn load_xref(parser: &mut Parser, options: &ParseOptions) -> PDFResult<(XRef, Trailer)> {
    let start = find_startxref(parser, options.startxref_search_window)?;
    let mut chain = XRefChain::new(start);
    while !chain.is_complete() {
        chain.step(parser, options)?;
    }
    chain.finish(parser)
}
