use super::base_stream::BaseStream;
use super::error::{PDFError, PDFResult};

/// Longest keyword accepted before the token is rejected as garbage.
const MAX_KEYWORD_LENGTH: usize = 128;

/// Token types returned by the Lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum Token {
    /// End of file marker
    EOF,

    /// Boolean value
    Boolean(bool),

    /// Null value
    Null,

    /// Integer value
    Integer(i64),

    /// Real value (has a fraction or exponent)
    Real(f64),

    /// String value (from literal strings like (hello))
    String(Vec<u8>),

    /// Hex string value (from hex strings like <48656c6c6f>)
    HexString(Vec<u8>),

    /// Name value with `#xx` escapes decoded (from /Name)
    Name(Vec<u8>),

    /// Bare keyword (`obj`, `endobj`, `stream`, `R`, `trailer`, `xref`, ...)
    Keyword(String),

    /// Array start '['
    ArrayStart,

    /// Array end ']'
    ArrayEnd,

    /// Dictionary start '<<'
    DictStart,

    /// Dictionary end '>>'
    DictEnd,
}

impl Token {
    /// Returns true if this token is the given keyword.
    pub fn is_keyword(&self, keyword: &str) -> bool {
        matches!(self, Token::Keyword(k) if k == keyword)
    }
}

/// Checks if a character is whitespace.
///
/// Whitespace: NUL, TAB, LF, FF, CR, SPACE
pub fn is_whitespace(ch: i32) -> bool {
    matches!(ch, 0x00 | 0x09 | 0x0A | 0x0C | 0x0D | 0x20)
}

/// Checks if a character is a delimiter.
///
/// Delimiters: ( ) < > [ ] { } / %
pub fn is_delimiter(ch: i32) -> bool {
    matches!(
        ch,
        0x28 | 0x29 | 0x3C | 0x3E | 0x5B | 0x5D | 0x7B | 0x7D | 0x2F | 0x25
    )
}

/// Checks if a character is special (whitespace or delimiter).
pub fn is_special(ch: i32) -> bool {
    is_whitespace(ch) || is_delimiter(ch)
}

/// Converts a hex character to its numeric value.
///
/// Returns -1 if not a valid hex digit.
pub fn to_hex_digit(ch: i32) -> i32 {
    if (0x30..=0x39).contains(&ch) {
        // '0'-'9'
        ch & 0x0F
    } else if (0x41..=0x46).contains(&ch) || (0x61..=0x66).contains(&ch) {
        // 'A'-'F' or 'a'-'f'
        (ch & 0x0F) + 9
    } else {
        -1
    }
}

/// Lexer for tokenizing document syntax.
///
/// The lexer keeps one character of lookahead (`current_char`) and reads
/// through a seekable [`BaseStream`], so callers can jump to any offset
/// (xref sections, recovery candidates, stream bodies) and resume.
///
/// The lexer handles:
/// - Whitespace and comment skipping
/// - Number parsing (integers, reals, scientific notation)
/// - String parsing (literal and hexadecimal)
/// - Name parsing
/// - Keywords and special characters ([, ], <<, >>, etc.)
pub struct Lexer {
    /// The input stream
    stream: Box<dyn BaseStream>,

    /// Current character being examined (-1 at EOF)
    current_char: i32,

    /// Offset of the first byte of the most recent token
    token_start: usize,

    /// Buffer for building strings
    str_buf: Vec<u8>,
}

impl Lexer {
    /// Creates a new Lexer from a stream, starting at the stream's position.
    pub fn new(mut stream: Box<dyn BaseStream>) -> PDFResult<Self> {
        let token_start = stream.pos();
        let current_char = Self::read_char(&mut stream)?;

        Ok(Lexer {
            stream,
            current_char,
            token_start,
            str_buf: Vec::new(),
        })
    }

    /// Reads the next character from the stream.
    ///
    /// Returns -1 on EOF. Missing bytes on a progressive source propagate.
    fn read_char(stream: &mut Box<dyn BaseStream>) -> PDFResult<i32> {
        match stream.get_byte() {
            Ok(byte) => Ok(byte as i32),
            Err(PDFError::UnexpectedEndOfStream) => Ok(-1),
            Err(e) => Err(e),
        }
    }

    /// Advances to the next character.
    fn next_char(&mut self) -> PDFResult<i32> {
        self.current_char = Self::read_char(&mut self.stream)?;
        Ok(self.current_char)
    }

    /// Peeks at the next character without consuming it.
    fn peek_char(&mut self) -> PDFResult<i32> {
        match self.stream.peek_byte() {
            Ok(byte) => Ok(byte as i32),
            Err(PDFError::UnexpectedEndOfStream) => Ok(-1),
            Err(e) => Err(e),
        }
    }

    /// Offset of the character the lexer will examine next.
    pub fn position(&self) -> usize {
        if self.current_char >= 0 {
            self.stream.pos() - 1
        } else {
            self.stream.pos()
        }
    }

    /// Offset where the most recently returned token began.
    pub fn token_start(&self) -> usize {
        self.token_start
    }

    /// Total length of the underlying stream.
    pub fn length(&self) -> usize {
        self.stream.length()
    }

    /// Repositions the lexer so the next token starts scanning at `pos`.
    pub fn seek(&mut self, pos: usize) -> PDFResult<()> {
        self.stream.set_pos(pos)?;
        self.token_start = pos;
        self.current_char = Self::read_char(&mut self.stream)?;
        Ok(())
    }

    /// Raw access to the underlying stream for binary bodies.
    ///
    /// Callers must [`seek`](Self::seek) afterwards to resynchronize the
    /// lookahead character.
    pub fn stream_mut(&mut self) -> &mut dyn BaseStream {
        self.stream.as_mut()
    }

    /// Skips whitespace and comments.
    fn skip_whitespace_and_comments(&mut self) -> PDFResult<()> {
        let mut comment = false;

        loop {
            let ch = self.current_char;

            if ch < 0 {
                break;
            }

            if comment {
                // In a comment, skip until newline
                if ch == 0x0A || ch == 0x0D {
                    comment = false;
                }
            } else if ch == 0x25 {
                // '%' starts a comment
                comment = true;
            } else if !is_whitespace(ch) {
                break;
            }

            self.next_char()?;
        }

        Ok(())
    }

    /// Gets the next token from the stream.
    pub fn get_object(&mut self) -> PDFResult<Token> {
        self.skip_whitespace_and_comments()?;
        self.token_start = self.position();

        let ch = self.current_char;

        if ch < 0 {
            return Ok(Token::EOF);
        }

        match ch {
            // Numbers: 0-9, +, -, .
            0x30..=0x39 | 0x2B | 0x2D | 0x2E => self.get_number(),

            // Literal string: (
            0x28 => self.get_string(),

            // Name: /
            0x2F => self.get_name(),

            // Array start: [
            0x5B => {
                self.next_char()?;
                Ok(Token::ArrayStart)
            }

            // Array end: ]
            0x5D => {
                self.next_char()?;
                Ok(Token::ArrayEnd)
            }

            // Hex string or dict start: <
            0x3C => {
                let next_ch = self.next_char()?;
                if next_ch == 0x3C {
                    self.next_char()?;
                    Ok(Token::DictStart)
                } else {
                    self.get_hex_string()
                }
            }

            // Dict end: >
            0x3E => {
                let next_ch = self.next_char()?;
                if next_ch == 0x3E {
                    self.next_char()?;
                    Ok(Token::DictEnd)
                } else {
                    Err(PDFError::malformed(self.token_start, "unexpected '>'"))
                }
            }

            // Braces only appear in PostScript calculator functions
            0x7B | 0x7D => {
                self.next_char()?;
                Ok(Token::Keyword(if ch == 0x7B { "{" } else { "}" }.to_string()))
            }

            // Closing paren is an error if encountered here
            0x29 => {
                self.next_char()?;
                Err(PDFError::malformed(self.token_start, "unbalanced ')'"))
            }

            _ => self.get_keyword(),
        }
    }

    /// Parses a number token.
    ///
    /// Handles integers, reals, and scientific notation. Sloppy input is
    /// tolerated the way Adobe Reader does: double minus, line breaks after
    /// the sign and stray minus signs inside the digits.
    fn get_number(&mut self) -> PDFResult<Token> {
        let mut ch = self.current_char;
        let mut e_notation = false;
        let mut divide_by = 0.0; // Non-zero if it's a floating point value
        let mut sign = 1;

        if ch == 0x2D {
            // '-'
            sign = -1;
            ch = self.next_char()?;

            // Ignore double negative
            if ch == 0x2D {
                ch = self.next_char()?;
            }
        } else if ch == 0x2B {
            // '+'
            ch = self.next_char()?;
        }

        // Ignore line-breaks after sign
        if ch == 0x0A || ch == 0x0D {
            loop {
                ch = self.next_char()?;
                if ch != 0x0A && ch != 0x0D {
                    break;
                }
            }
        }

        // Handle optional leading decimal point
        if ch == 0x2E {
            divide_by = 10.0;
            ch = self.next_char()?;
        }

        if !(0x30..=0x39).contains(&ch) {
            // A lone sign or dot before a separator reads as zero
            if is_whitespace(ch) || ch == 0x28 || ch == 0x3C || ch == -1 {
                return Ok(Token::Integer(0));
            }
            return Err(PDFError::malformed(
                self.token_start,
                format!("invalid number (charCode {})", ch),
            ));
        }

        let mut base_value = (ch - 0x30) as f64;
        let mut int_value = (ch - 0x30) as i64;
        let mut power_value: i32 = 0;
        let mut power_value_sign = 1;

        loop {
            ch = self.next_char()?;
            if ch < 0 {
                break;
            }

            if (0x30..=0x39).contains(&ch) {
                let current_digit = ch - 0x30;
                if e_notation {
                    power_value = power_value.saturating_mul(10).saturating_add(current_digit);
                } else {
                    if divide_by != 0.0 {
                        divide_by *= 10.0;
                    }
                    base_value = base_value * 10.0 + current_digit as f64;
                    int_value = int_value
                        .saturating_mul(10)
                        .saturating_add(current_digit as i64);
                }
            } else if ch == 0x2E {
                if divide_by == 0.0 {
                    divide_by = 1.0;
                } else {
                    // A number can have only one dot
                    break;
                }
            } else if ch == 0x2D {
                // Minus signs in the middle of a number are ignored
            } else if ch == 0x45 || ch == 0x65 {
                // 'E' or 'e': exponent, or the start of the next keyword
                let peek_ch = self.peek_char()?;
                if peek_ch == 0x2B || peek_ch == 0x2D {
                    power_value_sign = if peek_ch == 0x2D { -1 } else { 1 };
                    self.next_char()?;
                } else if !(0x30..=0x39).contains(&peek_ch) {
                    break;
                }
                e_notation = true;
            } else {
                break;
            }
        }

        if divide_by == 0.0 && !e_notation {
            return Ok(Token::Integer(sign * int_value));
        }

        let mut result = base_value;
        if divide_by != 0.0 {
            result /= divide_by;
        }
        if e_notation {
            result *= 10_f64.powi(power_value_sign * power_value);
        }

        Ok(Token::Real(sign as f64 * result))
    }

    /// Parses a literal string token.
    ///
    /// Handles nested parentheses and escape sequences. An unterminated
    /// string runs to end of input.
    fn get_string(&mut self) -> PDFResult<Token> {
        let mut num_paren = 1;
        self.str_buf.clear();

        let mut ch = self.next_char()?; // Consume opening '('

        loop {
            let mut char_buffered = false;

            match ch {
                -1 => break,

                0x28 => {
                    num_paren += 1;
                    self.str_buf.push(b'(');
                }

                0x29 => {
                    num_paren -= 1;
                    if num_paren == 0 {
                        self.next_char()?;
                        break;
                    }
                    self.str_buf.push(b')');
                }

                0x5C => {
                    // '\' - escape sequence
                    ch = self.next_char()?;
                    match ch {
                        -1 => break,
                        0x6E => self.str_buf.push(b'\n'),
                        0x72 => self.str_buf.push(b'\r'),
                        0x74 => self.str_buf.push(b'\t'),
                        0x62 => self.str_buf.push(0x08),
                        0x66 => self.str_buf.push(0x0C),
                        0x5C | 0x28 | 0x29 => self.str_buf.push(ch as u8),
                        0x30..=0x37 => {
                            // Octal escape \ddd (1-3 digits)
                            let mut x = (ch & 0x0F) as u8;
                            ch = self.next_char()?;
                            char_buffered = true;

                            if (0x30..=0x37).contains(&ch) {
                                x = (x << 3).wrapping_add((ch & 0x0F) as u8);
                                ch = self.next_char()?;

                                if (0x30..=0x37).contains(&ch) {
                                    char_buffered = false;
                                    x = (x << 3).wrapping_add((ch & 0x0F) as u8);
                                }
                            }
                            self.str_buf.push(x);
                        }
                        0x0D => {
                            // Line continuation: CR or CR LF
                            if self.peek_char()? == 0x0A {
                                self.next_char()?;
                            }
                        }
                        0x0A => {}
                        _ => self.str_buf.push(ch as u8),
                    }
                }

                _ => self.str_buf.push(ch as u8),
            }

            if !char_buffered {
                ch = self.next_char()?;
            }
        }

        Ok(Token::String(self.str_buf.clone()))
    }

    /// Parses a hex string token.
    ///
    /// Non-hex characters are skipped; an odd digit count behaves as if a
    /// trailing `0` were present.
    fn get_hex_string(&mut self) -> PDFResult<Token> {
        self.str_buf.clear();
        let mut ch = self.current_char;
        let mut first_digit = -1;

        loop {
            if ch < 0 {
                break;
            } else if ch == 0x3E {
                self.next_char()?;
                break;
            }

            let digit = to_hex_digit(ch);
            if digit != -1 {
                if first_digit == -1 {
                    first_digit = digit;
                } else {
                    self.str_buf.push(((first_digit << 4) | digit) as u8);
                    first_digit = -1;
                }
            }
            ch = self.next_char()?;
        }

        if first_digit != -1 {
            self.str_buf.push((first_digit << 4) as u8);
        }

        Ok(Token::HexString(self.str_buf.clone()))
    }

    /// Parses a name token.
    ///
    /// Names start with '/' and continue until whitespace or delimiter.
    /// `#xx` sequences decode to the byte they name; a malformed escape
    /// keeps its characters literally.
    fn get_name(&mut self) -> PDFResult<Token> {
        self.str_buf.clear();

        let mut ch = self.next_char()?;

        while ch >= 0 && !is_special(ch) {
            if ch == 0x23 {
                ch = self.next_char()?;

                if ch < 0 || is_special(ch) {
                    self.str_buf.push(b'#');
                    break;
                }

                let x = to_hex_digit(ch);
                if x != -1 {
                    let previous_ch = ch;
                    ch = self.next_char()?;
                    let x2 = to_hex_digit(ch);

                    if x2 == -1 {
                        self.str_buf.push(b'#');
                        self.str_buf.push(previous_ch as u8);

                        if ch < 0 || is_special(ch) {
                            break;
                        }
                        self.str_buf.push(ch as u8);
                        ch = self.next_char()?;
                        continue;
                    }

                    self.str_buf.push(((x << 4) | x2) as u8);
                } else {
                    self.str_buf.push(b'#');
                    self.str_buf.push(ch as u8);
                }
            } else {
                self.str_buf.push(ch as u8);
            }

            ch = self.next_char()?;
        }

        Ok(Token::Name(self.str_buf.clone()))
    }

    /// Parses a keyword token.
    ///
    /// Handles the literal keywords `true`, `false` and `null`; everything
    /// else is returned as [`Token::Keyword`].
    fn get_keyword(&mut self) -> PDFResult<Token> {
        let mut buf = Vec::new();
        let mut ch = self.current_char;

        while ch >= 0 && !is_special(ch) {
            if buf.len() >= MAX_KEYWORD_LENGTH {
                return Err(PDFError::malformed(
                    self.token_start,
                    format!("keyword longer than {} bytes", MAX_KEYWORD_LENGTH),
                ));
            }

            buf.push(ch as u8);
            ch = self.next_char()?;
        }

        match buf.as_slice() {
            b"true" => Ok(Token::Boolean(true)),
            b"false" => Ok(Token::Boolean(false)),
            b"null" => Ok(Token::Null),
            _ => Ok(Token::Keyword(String::from_utf8_lossy(&buf).into_owned())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Stream;

    fn lexer_for(data: &[u8]) -> Lexer {
        let stream = Box::new(Stream::from_bytes(data.to_vec())) as Box<dyn BaseStream>;
        Lexer::new(stream).unwrap()
    }

    #[test]
    fn test_is_whitespace() {
        assert!(is_whitespace(0x00)); // NUL
        assert!(is_whitespace(0x09)); // TAB
        assert!(is_whitespace(0x0A)); // LF
        assert!(is_whitespace(0x0C)); // FF
        assert!(is_whitespace(0x0D)); // CR
        assert!(is_whitespace(0x20)); // SPACE
        assert!(!is_whitespace(0x41)); // 'A'
    }

    #[test]
    fn test_is_delimiter() {
        for ch in b"()<>[]{}/%" {
            assert!(is_delimiter(*ch as i32));
        }
        assert!(!is_delimiter(0x41));
    }

    #[test]
    fn test_eof() {
        let mut lexer = lexer_for(b"");
        assert_eq!(lexer.get_object().unwrap(), Token::EOF);
        assert_eq!(lexer.get_object().unwrap(), Token::EOF);
    }

    #[test]
    fn test_array_and_dict_tokens() {
        let mut lexer = lexer_for(b"[ ] << >>");
        assert_eq!(lexer.get_object().unwrap(), Token::ArrayStart);
        assert_eq!(lexer.get_object().unwrap(), Token::ArrayEnd);
        assert_eq!(lexer.get_object().unwrap(), Token::DictStart);
        assert_eq!(lexer.get_object().unwrap(), Token::DictEnd);
        assert_eq!(lexer.get_object().unwrap(), Token::EOF);
    }

    #[test]
    fn test_skip_comments() {
        let mut lexer = lexer_for(b"% comment\n%another\r[");
        assert_eq!(lexer.get_object().unwrap(), Token::ArrayStart);
    }

    #[test]
    fn test_integers() {
        let mut lexer = lexer_for(b"123 -456 +789 --5 0000000100");
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(123));
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(-456));
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(789));
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(-5));
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(100));
    }

    #[test]
    fn test_reals() {
        let mut lexer = lexer_for(b"3.14 -2.5 .5 4. 1.5e2 3e-2");
        assert_eq!(lexer.get_object().unwrap(), Token::Real(3.14));
        assert_eq!(lexer.get_object().unwrap(), Token::Real(-2.5));
        assert_eq!(lexer.get_object().unwrap(), Token::Real(0.5));
        assert_eq!(lexer.get_object().unwrap(), Token::Real(4.0));
        assert_eq!(lexer.get_object().unwrap(), Token::Real(150.0));
        assert_eq!(lexer.get_object().unwrap(), Token::Real(0.03));
    }

    #[test]
    fn test_number_followed_by_keyword() {
        let mut lexer = lexer_for(b"12 0 R 7endobj");
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(12));
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(0));
        assert!(lexer.get_object().unwrap().is_keyword("R"));
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(7));
        assert!(lexer.get_object().unwrap().is_keyword("endobj"));
    }

    #[test]
    fn test_invalid_number_returns_zero() {
        let mut lexer = lexer_for(b"- ");
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(0));
    }

    #[test]
    fn test_invalid_number_is_malformed() {
        let mut lexer = lexer_for(b"-x");
        let err = lexer.get_object().unwrap_err();
        assert!(matches!(err, PDFError::MalformedObject { offset: 0, .. }));
    }

    #[test]
    fn test_literal_strings() {
        let mut lexer = lexer_for(b"(hello (nested) world) (a\\nb\\tc\\\\d) (\\(\\))");
        assert_eq!(
            lexer.get_object().unwrap(),
            Token::String(b"hello (nested) world".to_vec())
        );
        assert_eq!(
            lexer.get_object().unwrap(),
            Token::String(b"a\nb\tc\\d".to_vec())
        );
        assert_eq!(lexer.get_object().unwrap(), Token::String(b"()".to_vec()));
    }

    #[test]
    fn test_octal_escape() {
        let mut lexer = lexer_for(b"(\\101\\102\\103) (\\0053)");
        assert_eq!(lexer.get_object().unwrap(), Token::String(b"ABC".to_vec()));
        // At most three octal digits are consumed
        assert_eq!(lexer.get_object().unwrap(), Token::String(vec![0o5, b'3']));
    }

    #[test]
    fn test_line_continuation() {
        let mut lexer = lexer_for(b"(abc\\\r\ndef\\\nghi)");
        assert_eq!(
            lexer.get_object().unwrap(),
            Token::String(b"abcdefghi".to_vec())
        );
    }

    #[test]
    fn test_unterminated_string_runs_to_eof() {
        let mut lexer = lexer_for(b"(abc");
        assert_eq!(lexer.get_object().unwrap(), Token::String(b"abc".to_vec()));
        assert_eq!(lexer.get_object().unwrap(), Token::EOF);
    }

    #[test]
    fn test_hex_strings() {
        let mut lexer = lexer_for(b"<48656c6c6f> <48 65 6C\n6c 6F> <414> <4zz1>");
        assert_eq!(lexer.get_object().unwrap(), Token::HexString(b"Hello".to_vec()));
        assert_eq!(lexer.get_object().unwrap(), Token::HexString(b"Hello".to_vec()));
        assert_eq!(lexer.get_object().unwrap(), Token::HexString(vec![0x41, 0x40]));
        assert_eq!(lexer.get_object().unwrap(), Token::HexString(vec![0x41]));
    }

    #[test]
    fn test_names() {
        let mut lexer = lexer_for(b"/Type /My#20Name /A#2FB /Bad#zz /Trail# /");
        assert_eq!(lexer.get_object().unwrap(), Token::Name(b"Type".to_vec()));
        assert_eq!(lexer.get_object().unwrap(), Token::Name(b"My Name".to_vec()));
        assert_eq!(lexer.get_object().unwrap(), Token::Name(b"A/B".to_vec()));
        assert_eq!(lexer.get_object().unwrap(), Token::Name(b"Bad#zz".to_vec()));
        assert_eq!(lexer.get_object().unwrap(), Token::Name(b"Trail#".to_vec()));
        assert_eq!(lexer.get_object().unwrap(), Token::Name(Vec::new()));
    }

    #[test]
    fn test_name_high_byte_escape() {
        let mut lexer = lexer_for(b"/caf#E9");
        assert_eq!(
            lexer.get_object().unwrap(),
            Token::Name(vec![b'c', b'a', b'f', 0xE9])
        );
    }

    #[test]
    fn test_keywords() {
        let mut lexer = lexer_for(b"true false null obj endobj stream trailer xref startxref { }");
        assert_eq!(lexer.get_object().unwrap(), Token::Boolean(true));
        assert_eq!(lexer.get_object().unwrap(), Token::Boolean(false));
        assert_eq!(lexer.get_object().unwrap(), Token::Null);
        for keyword in ["obj", "endobj", "stream", "trailer", "xref", "startxref", "{", "}"] {
            assert!(lexer.get_object().unwrap().is_keyword(keyword));
        }
        assert_eq!(lexer.get_object().unwrap(), Token::EOF);
    }

    #[test]
    fn test_overlong_keyword() {
        let data = vec![b'k'; 200];
        let mut lexer = lexer_for(&data);
        assert!(matches!(
            lexer.get_object(),
            Err(PDFError::MalformedObject { .. })
        ));
    }

    #[test]
    fn test_stray_closing_tokens() {
        let mut lexer = lexer_for(b") >x");
        assert!(lexer.get_object().is_err());
        assert!(lexer.get_object().is_err());
    }

    #[test]
    fn test_positions_and_seek() {
        let mut lexer = lexer_for(b"  /Key  42 (s)");
        assert_eq!(lexer.get_object().unwrap(), Token::Name(b"Key".to_vec()));
        assert_eq!(lexer.token_start(), 2);
        assert_eq!(lexer.get_object().unwrap(), Token::Integer(42));
        assert_eq!(lexer.token_start(), 8);
        assert_eq!(lexer.position(), 10);

        lexer.seek(3).unwrap();
        assert_eq!(lexer.get_object().unwrap(), Token::Keyword("Key".to_string()));
    }
}
