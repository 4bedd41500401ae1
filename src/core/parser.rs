use super::base_stream::BaseStream;
use super::error::{PDFError, PDFResult};
use super::lexer::{is_special, is_whitespace, Lexer, Token};
use super::object::{Dictionary, ObjectId, PDFObject};
use super::options::DEFAULT_MAX_RECURSION_DEPTH;
use tracing::{debug, trace, warn};

/// Bytes read per step while searching for the end of a stream body.
const STREAM_SCAN_CHUNK: usize = 4096;

/// Bytes that must be buffered past a candidate keyword before it is judged.
const STREAM_SCAN_LOOKAHEAD: usize = 256;

/// Bytes inspected after a declared stream length to confirm `endstream`.
const LENGTH_CHECK_WINDOW: usize = 64;

/// Parser for building objects from tokens.
///
/// Converts tokens from the Lexer into higher-level objects (arrays,
/// dictionaries, indirect references, streams).
///
/// The parser keeps up to two tokens of lookahead to detect indirect
/// references (N G R) and stream objects (dictionary followed by `stream`).
/// Lookahead is filled lazily, so parsing a complete object never reads
/// further than its last token requires.
pub struct Parser {
    /// The lexer that provides tokens
    lexer: Lexer,

    /// First lookahead token
    buf1: Option<Token>,

    /// Second lookahead token
    buf2: Option<Token>,

    /// Offsets the lookahead tokens were read from
    buf1_start: usize,
    buf2_start: usize,

    /// Current array/dictionary nesting
    depth: usize,

    /// Nesting ceiling
    max_depth: usize,

    /// Offset at which the enclosing object is known to end
    stream_bound: Option<usize>,
}

impl Parser {
    /// Creates a new Parser from a Lexer.
    pub fn new(lexer: Lexer) -> Self {
        Parser {
            lexer,
            buf1: None,
            buf2: None,
            buf1_start: 0,
            buf2_start: 0,
            depth: 0,
            max_depth: DEFAULT_MAX_RECURSION_DEPTH,
            stream_bound: None,
        }
    }

    /// Creates a parser over any seekable stream.
    pub fn from_stream(stream: Box<dyn BaseStream>) -> PDFResult<Self> {
        Ok(Parser::new(Lexer::new(stream)?))
    }

    /// Sets the nesting ceiling for arrays and dictionaries.
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Bounds the `endstream` search of the next stream body.
    ///
    /// Set from the next known object-start offset so a scan never runs
    /// into a neighbouring object.
    pub fn set_stream_bound(&mut self, bound: Option<usize>) {
        self.stream_bound = bound;
    }

    /// Total length of the underlying stream.
    pub fn length(&self) -> usize {
        self.lexer.length()
    }

    /// Offset of the next unread token.
    ///
    /// Buffered lookahead counts as unread, so resuming a scan here never
    /// skips a token the parser only peeked at.
    pub fn position(&self) -> usize {
        if self.buf1.is_some() {
            self.buf1_start
        } else {
            self.lexer.position()
        }
    }

    /// Moves to `pos`, dropping any buffered lookahead.
    pub fn seek(&mut self, pos: usize) -> PDFResult<()> {
        self.buf1 = None;
        self.buf2 = None;
        self.lexer.seek(pos)
    }

    /// Access to the lexer for raw keyword scans.
    pub fn lexer_mut(&mut self) -> &mut Lexer {
        &mut self.lexer
    }

    fn peek(&mut self) -> PDFResult<&Token> {
        if self.buf1.is_none() {
            self.buf1_start = self.lexer.position();
            self.buf1 = Some(self.lexer.get_object()?);
        }
        self.buf1
            .as_ref()
            .ok_or_else(|| PDFError::Generic("lookahead buffer empty".to_string()))
    }

    fn peek2(&mut self) -> PDFResult<&Token> {
        self.peek()?;
        if self.buf2.is_none() {
            self.buf2_start = self.lexer.position();
            self.buf2 = Some(self.lexer.get_object()?);
        }
        self.buf2
            .as_ref()
            .ok_or_else(|| PDFError::Generic("lookahead buffer empty".to_string()))
    }

    /// Takes the next token, shifting buf2 -> buf1.
    fn next_token(&mut self) -> PDFResult<Token> {
        match self.buf1.take() {
            Some(token) => {
                self.buf1 = self.buf2.take();
                self.buf1_start = self.buf2_start;
                Ok(token)
            }
            None => self.lexer.get_object(),
        }
    }

    /// Reads the next token, which the caller expects to be an integer.
    pub fn next_integer(&mut self) -> PDFResult<Option<i64>> {
        match self.next_token()? {
            Token::Integer(i) => Ok(Some(i)),
            _ => Ok(None),
        }
    }

    /// Reads the next raw token.
    pub fn read_token(&mut self) -> PDFResult<Token> {
        self.next_token()
    }

    /// Returns true if the next token is the given keyword (without consuming it).
    pub fn peek_keyword(&mut self, keyword: &str) -> PDFResult<bool> {
        Ok(self.peek()?.is_keyword(keyword))
    }

    /// Checks if there are more objects to parse.
    pub fn has_more(&mut self) -> PDFResult<bool> {
        Ok(!matches!(self.peek()?, Token::EOF))
    }

    /// Gets the next object from the stream.
    ///
    /// Handles:
    /// - Arrays: [ obj1 obj2 ... ]
    /// - Dictionaries: << /Key1 value1 /Key2 value2 ... >> (and streams)
    /// - Indirect references: N1 N2 R
    /// - Simple objects: numbers, strings, names, booleans, null
    pub fn parse_object(&mut self) -> PDFResult<PDFObject> {
        let offset = self.position();
        let token = self.next_token()?;

        match token {
            Token::ArrayStart => self.nested(offset, Self::parse_array),

            Token::DictStart => self.nested(offset, Self::parse_dictionary),

            Token::ArrayEnd | Token::DictEnd => {
                Err(PDFError::malformed(offset, "unexpected container end"))
            }

            // Number: could be the start of an indirect reference (N1 N2 R)
            Token::Integer(num) => {
                if num >= 0 {
                    let generation = match self.peek()? {
                        Token::Integer(g) => Some(*g),
                        _ => None,
                    };
                    if let Some(generation) = generation {
                        if (0..=u16::MAX as i64).contains(&generation)
                            && self.peek2()?.is_keyword("R")
                        {
                            self.next_token()?; // Consume generation number
                            self.next_token()?; // Consume 'R'
                            return Ok(PDFObject::Ref(ObjectId::new(
                                num as u64,
                                generation as u16,
                            )));
                        }
                    }
                }

                // Not an indirect reference, just a number
                Ok(PDFObject::Integer(num))
            }

            Token::Real(r) => Ok(PDFObject::Real(r)),
            Token::Boolean(b) => Ok(PDFObject::Boolean(b)),
            Token::Null => Ok(PDFObject::Null),
            Token::String(s) => Ok(PDFObject::String(s)),
            Token::HexString(s) => Ok(PDFObject::HexString(s)),
            Token::Name(n) => Ok(PDFObject::Name(n)),
            Token::EOF => Err(PDFError::UnexpectedEndOfStream),
            Token::Keyword(keyword) => Err(PDFError::malformed(
                offset,
                format!("unexpected keyword '{}'", keyword),
            )),
        }
    }

    /// Runs a container parser one nesting level deeper.
    fn nested(
        &mut self,
        offset: usize,
        parse: fn(&mut Self) -> PDFResult<PDFObject>,
    ) -> PDFResult<PDFObject> {
        if self.depth >= self.max_depth {
            return Err(PDFError::malformed(
                offset,
                format!("nesting deeper than {}", self.max_depth),
            ));
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Parses an array: [ obj1 obj2 ... ]
    ///
    /// A damaged element becomes null; the array keeps going.
    fn parse_array(&mut self) -> PDFResult<PDFObject> {
        let mut array = Vec::new();

        loop {
            let (at_end, at_eof, at_endobj) = {
                let token = self.peek()?;
                (
                    matches!(token, Token::ArrayEnd),
                    matches!(token, Token::EOF),
                    token.is_keyword("endobj"),
                )
            };

            if at_end {
                self.next_token()?; // Consume the ']'
                break;
            }
            if at_eof {
                return Err(PDFError::malformed(
                    self.lexer.position(),
                    "unterminated array (missing ']')",
                ));
            }
            if at_endobj {
                return Err(PDFError::malformed(
                    self.lexer.token_start(),
                    "unterminated array (endobj before ']')",
                ));
            }

            match self.parse_object() {
                Ok(obj) => array.push(obj),
                Err(e) if e.is_recoverable() => {
                    warn!("Error parsing array element: {}, using null", e);
                    array.push(PDFObject::Null);
                }
                Err(e) => return Err(e),
            }
        }

        Ok(PDFObject::Array(array))
    }

    /// Parses a dictionary: << /Key1 value1 /Key2 value2 ... >>
    ///
    /// A non-name key aborts the dictionary. Duplicate keys resolve
    /// last-wins. A dictionary followed by `stream` becomes a stream object.
    fn parse_dictionary(&mut self) -> PDFResult<PDFObject> {
        let mut dict = Dictionary::new();

        loop {
            let key = match self.next_token()? {
                Token::DictEnd => break,
                Token::Name(name) => name,
                Token::EOF => {
                    return Err(PDFError::malformed(
                        self.lexer.position(),
                        "unterminated dictionary (missing '>>')",
                    ));
                }
                Token::Keyword(k) if k == "endobj" => {
                    return Err(PDFError::malformed(
                        self.lexer.token_start(),
                        "unterminated dictionary (endobj before '>>')",
                    ));
                }
                other => {
                    return Err(PDFError::malformed(
                        self.lexer.token_start(),
                        format!("dictionary key is not a name: {:?}", other),
                    ));
                }
            };

            // Key directly followed by '>>': no value, store null
            if matches!(self.peek()?, Token::DictEnd) {
                dict.insert(key, PDFObject::Null);
                continue;
            }

            let value = match self.parse_object() {
                Ok(val) => val,
                Err(e) if e.is_recoverable() => {
                    warn!(
                        "Error parsing dictionary value for key '{}': {}, using null",
                        String::from_utf8_lossy(&key),
                        e
                    );
                    PDFObject::Null
                }
                Err(e) => return Err(e),
            };
            dict.insert(key, value);
        }

        // Format: << /Key value >> stream\n...binary data...endstream
        // Only one token of lookahead is taken, so the lexer sits right
        // after the `stream` keyword.
        if self.peek()?.is_keyword("stream") {
            if self.buf2.is_some() {
                return Err(PDFError::malformed(
                    self.lexer.token_start(),
                    "stream keyword read past its body",
                ));
            }
            self.buf1 = None;
            return self.parse_stream(dict);
        }

        Ok(PDFObject::Dictionary(dict))
    }

    /// Parses a stream body after its dictionary and `stream` keyword.
    ///
    /// Format:
    /// ```text
    /// << /Length 100 >> stream
    /// ...binary data...
    /// endstream
    /// ```
    ///
    /// A direct, consistent `Length` is read exactly. An indirect or wrong
    /// `Length` falls back to scanning for `endstream`.
    fn parse_stream(&mut self, dict: Dictionary) -> PDFResult<PDFObject> {
        let data_start = self.skip_stream_eol()?;
        let bound = self
            .stream_bound
            .filter(|bound| *bound > data_start)
            .unwrap_or(self.lexer.length())
            .min(self.lexer.length());

        let declared = match dict.get("Length") {
            Some(PDFObject::Integer(n)) if *n >= 0 => Some(*n as usize),
            Some(PDFObject::Ref(id)) => {
                debug!("/Length is an indirect reference ({}), scanning for endstream", id);
                None
            }
            _ => None,
        };

        if let Some(length) = declared {
            match self.check_declared_length(data_start, length)? {
                Some(resume) => {
                    let data = self
                        .lexer
                        .stream_mut()
                        .get_byte_range(data_start, data_start + length)?;
                    self.lexer.seek(resume)?;
                    return Ok(PDFObject::Stream { dict, data });
                }
                None => {
                    let mismatch = PDFError::StreamLengthMismatch {
                        offset: data_start,
                        declared: length,
                    };
                    warn!("{}, scanning for endstream", mismatch);
                }
            }
        }

        let (data_end, resume) = self.scan_for_stream_end(data_start, bound)?;
        let data = self.lexer.stream_mut().get_byte_range(data_start, data_end)?;
        self.lexer.seek(resume)?;

        let mut dict = dict;
        if declared != Some(data.len()) {
            dict.insert("Length", PDFObject::Integer(data.len() as i64));
        }
        Ok(PDFObject::Stream { dict, data })
    }

    /// Skips the single end-of-line marker after `stream`.
    fn skip_stream_eol(&mut self) -> PDFResult<usize> {
        let mut pos = self.lexer.position();
        let length = self.lexer.length();
        let stream = self.lexer.stream_mut();
        let head = stream.get_byte_range(pos, (pos + 2).min(length))?;

        match head.as_slice() {
            [b'\r', b'\n', ..] => pos += 2,
            [b'\r', ..] | [b'\n', ..] => pos += 1,
            [b' ', ..] | [b'\t', ..] => {
                // Writers sometimes leave blanks before the newline
                let tail_end = (pos + 32).min(length);
                let tail = stream.get_byte_range(pos, tail_end)?;
                if let Some(i) = tail.iter().position(|b| *b != b' ' && *b != b'\t') {
                    match &tail[i..] {
                        [b'\r', b'\n', ..] => pos += i + 2,
                        [b'\n', ..] | [b'\r', ..] => pos += i + 1,
                        _ => {}
                    }
                }
            }
            _ => {}
        }
        Ok(pos)
    }

    /// Confirms that `endstream` follows `length` bytes of data.
    ///
    /// Returns the offset just past the keyword, or `None` on mismatch.
    fn check_declared_length(&mut self, data_start: usize, length: usize) -> PDFResult<Option<usize>> {
        let total = self.lexer.length();
        let Some(data_end) = data_start.checked_add(length).filter(|end| *end <= total) else {
            return Ok(None);
        };

        let window_end = (data_end + LENGTH_CHECK_WINDOW).min(total);
        let window = self.lexer.stream_mut().get_byte_range(data_end, window_end)?;
        let skip = window
            .iter()
            .position(|b| !is_whitespace(*b as i32))
            .unwrap_or(window.len());

        if keyword_at(&window, skip, b"endstream") {
            Ok(Some(data_end + skip + b"endstream".len()))
        } else {
            Ok(None)
        }
    }

    /// Finds where a stream body ends without trusting `Length`.
    ///
    /// The first `endstream` followed by `endobj` wins; otherwise the first
    /// `endstream` seen before the object's `endobj`; otherwise the body runs
    /// up to `endobj`. Returns (data end, resume offset).
    fn scan_for_stream_end(&mut self, data_start: usize, bound: usize) -> PDFResult<(usize, usize)> {
        let mut buf: Vec<u8> = Vec::new();
        let mut read_end = data_start;
        let mut search_pos = 0;
        let mut first_endstream: Option<(usize, usize)> = None;

        loop {
            if read_end < bound {
                let next_end = (read_end + STREAM_SCAN_CHUNK).min(bound);
                let chunk = self.lexer.stream_mut().get_byte_range(read_end, next_end)?;
                buf.extend_from_slice(&chunk);
                read_end = next_end;
            }
            let complete = read_end >= bound;
            let limit = if complete {
                buf.len()
            } else {
                buf.len().saturating_sub(STREAM_SCAN_LOOKAHEAD)
            };

            while search_pos < limit {
                if keyword_at(&buf, search_pos, b"endstream") {
                    let data_end = data_start + strip_eol(&buf, search_pos);
                    let after = search_pos + b"endstream".len();
                    let skip = buf[after..]
                        .iter()
                        .position(|b| !is_whitespace(*b as i32))
                        .unwrap_or(buf.len() - after);

                    if keyword_at(&buf, after + skip, b"endobj") {
                        trace!(offset = data_start + search_pos, "endstream followed by endobj");
                        return Ok((data_end, data_start + after));
                    }
                    if first_endstream.is_none() {
                        first_endstream = Some((data_end, data_start + after));
                    }
                    search_pos = after;
                    continue;
                }

                if keyword_at(&buf, search_pos, b"endobj") {
                    return Ok(first_endstream.unwrap_or((
                        data_start + strip_eol(&buf, search_pos),
                        data_start + search_pos,
                    )));
                }

                search_pos += 1;
            }

            if complete {
                break;
            }
        }

        first_endstream.ok_or_else(|| PDFError::malformed(data_start, "stream without endstream"))
    }

    /// Parses `N G obj ... endobj` at `offset`.
    ///
    /// When `expected_num` is given, a different object number in the
    /// header is rejected. A damaged body becomes null; a missing `endobj`
    /// is tolerated.
    pub fn parse_indirect_object_at(
        &mut self,
        offset: usize,
        expected_num: Option<u64>,
    ) -> PDFResult<(ObjectId, PDFObject)> {
        self.seek(offset)?;
        self.depth = 0;

        let id = self.parse_indirect_header(offset)?;
        if let Some(expected) = expected_num {
            if expected != id.num {
                return Err(PDFError::malformed(
                    offset,
                    format!("expected object {}, found {}", expected, id.num),
                ));
            }
        }

        let object = match self.parse_object() {
            Ok(obj) => obj,
            Err(e) if e.is_recoverable() => {
                warn!(object = %id, "Error parsing object body: {}, using null", e);
                PDFObject::Null
            }
            Err(e) => return Err(e),
        };

        if self.peek_keyword("endobj")? {
            self.next_token()?;
        } else {
            trace!(object = %id, "object without endobj");
        }

        Ok((id, object))
    }

    /// Reads the `N G obj` header at the current position.
    fn parse_indirect_header(&mut self, offset: usize) -> PDFResult<ObjectId> {
        let num = match self.next_token()? {
            Token::Integer(n) if n >= 0 => n as u64,
            _ => return Err(PDFError::malformed(offset, "expected object number")),
        };
        let generation = match self.next_token()? {
            Token::Integer(g) if (0..=u16::MAX as i64).contains(&g) => g as u16,
            _ => return Err(PDFError::malformed(offset, "expected generation number")),
        };
        if !self.next_token()?.is_keyword("obj") {
            return Err(PDFError::malformed(offset, "expected 'obj' keyword"));
        }
        Ok(ObjectId::new(num, generation))
    }
}

/// Returns true if `keyword` starts at `pos` and is followed by a delimiter,
/// whitespace or the end of the buffer.
pub(crate) fn keyword_at(buf: &[u8], pos: usize, keyword: &[u8]) -> bool {
    let end = pos + keyword.len();
    buf.get(pos..end) == Some(keyword)
        && buf.get(end).is_none_or(|next| is_special(*next as i32))
}

/// Length of `buf[..pos]` without one trailing EOL.
fn strip_eol(buf: &[u8], pos: usize) -> usize {
    if pos >= 2 && &buf[pos - 2..pos] == b"\r\n" {
        pos - 2
    } else if pos >= 1 && (buf[pos - 1] == b'\n' || buf[pos - 1] == b'\r') {
        pos - 1
    } else {
        pos
    }
}
