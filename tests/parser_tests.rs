//! Tokenizer and object parser tests

mod test_utils;

use pdf_x_syntax::core::*;
use test_utils::*;

fn lex_all(input: &[u8]) -> Vec<Token> {
    let mut lexer = Lexer::new(Box::new(Stream::from_bytes(input.to_vec()))).unwrap();
    let mut tokens = Vec::new();
    loop {
        let token = lexer.get_object().unwrap();
        if token == Token::EOF {
            return tokens;
        }
        tokens.push(token);
    }
}

// ============================================================================
// Tokenizer Tests
// ============================================================================

#[test]
fn test_keywords_and_delimiters() {
    let tokens = lex_all(b"1 0 obj << /A [ true false null ] >> endobj");
    assert_eq!(
        tokens,
        vec![
            Token::Integer(1),
            Token::Integer(0),
            Token::Keyword("obj".to_string()),
            Token::DictStart,
            Token::Name(b"A".to_vec()),
            Token::ArrayStart,
            Token::Boolean(true),
            Token::Boolean(false),
            Token::Null,
            Token::ArrayEnd,
            Token::DictEnd,
            Token::Keyword("endobj".to_string()),
        ]
    );
}

#[test]
fn test_comments_are_skipped() {
    let tokens = lex_all(b"% leading comment\n42 % trailing\r\n/Name");
    assert_eq!(tokens, vec![Token::Integer(42), Token::Name(b"Name".to_vec())]);
}

#[test]
fn test_name_hex_escapes() {
    let tokens = lex_all(b"/A#20B /Lime#23Green");
    assert_eq!(
        tokens,
        vec![Token::Name(b"A B".to_vec()), Token::Name(b"Lime#Green".to_vec())]
    );
}

#[test]
fn test_literal_string_escapes() {
    let tokens = lex_all(b"(a\\nb\\t\\(c\\)\\101 (nested) \\\nend)");
    assert_eq!(tokens, vec![Token::String(b"a\nb\t(c)A (nested) end".to_vec())]);
}

#[test]
fn test_hex_string_odd_digits_and_junk() {
    let tokens = lex_all(b"<48 65 6C 6C 6F> <901FA>");
    assert_eq!(
        tokens,
        vec![
            Token::HexString(b"Hello".to_vec()),
            Token::HexString(vec![0x90, 0x1F, 0xA0]),
        ]
    );
}

#[test]
fn test_signed_and_fractional_numbers() {
    let tokens = lex_all(b"-17 +4 3.25 -.5");
    assert_eq!(
        tokens,
        vec![
            Token::Integer(-17),
            Token::Integer(4),
            Token::Real(3.25),
            Token::Real(-0.5),
        ]
    );
}

// ============================================================================
// Object Parser Tests
// ============================================================================

#[test]
fn test_reference_lookahead() {
    let mut parser = parser_for(b"[1 0 R 2 3 4 0 R]");
    let array = parser.parse_object().unwrap();
    assert_eq!(
        array,
        PDFObject::Array(vec![
            PDFObject::Ref(ObjectId::new(1, 0)),
            PDFObject::Integer(2),
            PDFObject::Integer(3),
            PDFObject::Ref(ObjectId::new(4, 0)),
        ])
    );
}

#[test]
fn test_duplicate_keys_resolve_to_last() {
    let dict = parse_one("<< /Type /Page /Type /Pages >>").unwrap();
    assert_eq!(dict.as_dict().unwrap().get_name("Type"), Some(&b"Pages"[..]));
}

#[test]
fn test_unterminated_dictionary_before_endobj() {
    let mut parser = parser_for(b"5 0 obj << /Type /Font endobj");
    let (id, object) = parser.parse_indirect_object_at(0, Some(5)).unwrap();
    assert_eq!(id, ObjectId::new(5, 0));
    assert_eq!(object, PDFObject::Null);
}

#[test]
fn test_damaged_entry_does_not_abort_outer_dictionary() {
    let dict = parse_one("<< /Good 1 /Bad << 3 4 >> /Also 2 >>").unwrap();
    let dict = dict.as_dict().unwrap();
    assert_eq!(dict.get_integer("Good"), Some(1));
    assert_eq!(dict.get("Bad"), Some(&PDFObject::Null));
}

// ============================================================================
// Stream Body Tests
// ============================================================================

#[test]
fn test_binary_stream_reads_declared_length() {
    let mut data = b"9 0 obj\n<< /Length 10 >>\nstream\n".to_vec();
    data.extend_from_slice(&[0xFF, 0x00, 0x13, b'e', b'n', b'd', 0x80, 0x7F, 0x01, 0x02]);
    data.extend_from_slice(b"\nendstream\nendobj\n");

    let (_, object) = parser_for(&data).parse_indirect_object_at(0, Some(9)).unwrap();
    match object {
        PDFObject::Stream { data, .. } => {
            assert_eq!(data, vec![0xFF, 0x00, 0x13, b'e', b'n', b'd', 0x80, 0x7F, 0x01, 0x02]);
        }
        other => panic!("expected stream, got {:?}", other),
    }
}

#[test]
fn test_indirect_length_scans_for_endstream() {
    let data = b"9 0 obj\n<< /Length 12 0 R >>\nstream\nhello world\nendstream\nendobj\n";
    let (_, object) = parser_for(data).parse_indirect_object_at(0, Some(9)).unwrap();
    match object {
        PDFObject::Stream { data, .. } => assert_eq!(data, b"hello world"),
        other => panic!("expected stream, got {:?}", other),
    }
}

#[test]
fn test_endstream_followed_by_endobj_is_preferred() {
    let data = b"9 0 obj\n<< /Length 3 0 R >>\nstream\nA endstream B\nendstream\nendobj\n";
    let (_, object) = parser_for(data).parse_indirect_object_at(0, Some(9)).unwrap();
    match object {
        PDFObject::Stream { data, .. } => assert_eq!(data, b"A endstream B"),
        other => panic!("expected stream, got {:?}", other),
    }
}

#[test]
fn test_stream_decoding_flate() {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(b"BT /F1 12 Tf ET").unwrap();
    let compressed = encoder.finish().unwrap();

    let mut dict = Dictionary::new();
    dict.insert("Filter", PDFObject::Name(b"FlateDecode".to_vec()));
    let limit = ParseOptions::default().max_decoded_stream_size;
    assert_eq!(decode_stream(&dict, &compressed, limit).unwrap(), b"BT /F1 12 Tf ET");
}
