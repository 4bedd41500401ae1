use super::byte_source::ByteSource;
use super::error::{PDFError, PDFResult};
use super::lexer::Token;
use super::object::{Dictionary, ObjectId};
use super::parser::Parser;
use tracing::debug;

/// How far into the file the `%PDF-` marker may appear.
pub const HEADER_SEARCH_LIMIT: u64 = 1024;

const HEADER_MARKER: &[u8] = b"%PDF-";

/// Location and version of the `%PDF-x.y` header.
///
/// Every offset recorded inside the file is relative to `offset`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHeader {
    pub offset: u64,
    pub version: String,
}

/// Searches the first bytes of `source` for the header marker.
///
/// Returns `Ok(None)` when there is no marker, and `DataNotLoaded` when the
/// leading bytes are not available yet.
pub fn find_header(source: &dyn ByteSource) -> PDFResult<Option<FileHeader>> {
    let length = source.size().min(HEADER_SEARCH_LIMIT);
    let mut buf = vec![0u8; length as usize];
    if !source.read_at(0, &mut buf) {
        return Err(PDFError::DataNotLoaded { offset: 0, length });
    }

    let Some(pos) = buf
        .windows(HEADER_MARKER.len())
        .position(|window| window == HEADER_MARKER)
    else {
        return Ok(None);
    };

    let version: String = buf[pos + HEADER_MARKER.len()..]
        .iter()
        .take_while(|b| b.is_ascii_digit() || **b == b'.')
        .map(|b| *b as char)
        .collect();

    Ok(Some(FileHeader {
        offset: pos as u64,
        version,
    }))
}

/// Parameters of a linearization dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinearizedHeader {
    /// Offset of the linearization object itself
    pub object_offset: u64,
    /// Declared file length (`/L`)
    pub file_length: u64,
    /// End of the first page's section (`/E`)
    pub first_page_end: u64,
    /// Offset of the main cross-reference table (`/T`)
    pub main_xref_offset: u64,
    /// First page number (`/P`)
    pub first_page: u64,
    /// Page count (`/N`)
    pub page_count: u64,
    /// Object number of the first page (`/O`)
    pub first_page_object: ObjectId,
    /// Primary hint stream (offset, length) from `/H`
    pub hint_stream: Option<(u64, u64)>,
    /// End of the linearization object, where the first-page
    /// cross-reference section begins
    pub first_page_xref_offset: u64,
}

impl LinearizedHeader {
    /// Reads the first object of the file and checks it for `/Linearized`.
    ///
    /// The declared `/L` must match `file_size`; a stale linearization
    /// dictionary (the file was updated incrementally) is ignored.
    pub fn parse(parser: &mut Parser, file_size: u64) -> PDFResult<Option<Self>> {
        parser.seek(0)?;
        // The header line is a comment, so the first token is the object number
        if !matches!(parser.read_token()?, Token::Integer(_)) {
            return Ok(None);
        }
        let object_offset = parser.lexer_mut().token_start();

        let (_, object) = match parser.parse_indirect_object_at(object_offset, None) {
            Ok(parsed) => parsed,
            Err(e) if e.is_data_not_loaded() => return Err(e),
            Err(e) => {
                debug!("first object unreadable, not linearized: {}", e);
                return Ok(None);
            }
        };

        let Some(dict) = object.as_dict() else {
            return Ok(None);
        };
        let end = parser.position() as u64;
        Ok(Self::from_dict(dict, object_offset as u64, end, file_size))
    }

    fn from_dict(dict: &Dictionary, object_offset: u64, object_end: u64, file_size: u64) -> Option<Self> {
        if !dict.contains_key("Linearized") {
            return None;
        }
        let positive = |key: &str| dict.get_integer(key).filter(|v| *v >= 0).map(|v| v as u64);

        let file_length = positive("L")?;
        if file_length != file_size {
            debug!(
                declared = file_length,
                actual = file_size,
                "linearization dictionary does not match file length"
            );
            return None;
        }

        let hint_stream = dict.get_array("H").and_then(|h| match h {
            [offset, length, ..] => Some((
                offset.as_integer()?.max(0) as u64,
                length.as_integer()?.max(0) as u64,
            )),
            _ => None,
        });

        Some(LinearizedHeader {
            object_offset,
            file_length,
            first_page_end: positive("E")?,
            main_xref_offset: positive("T")?,
            first_page: positive("P").unwrap_or(0),
            page_count: positive("N")?,
            first_page_object: ObjectId::new(positive("O")?, 0),
            hint_stream,
            first_page_xref_offset: object_end,
        })
    }
}
