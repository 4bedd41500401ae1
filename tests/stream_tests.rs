//! Byte source and stream cursor tests

mod test_utils;

use pdf_x_syntax::core::*;
use std::io::Write;
use std::sync::Arc;
use test_utils::*;

// ============================================================================
// In-Memory Stream Tests
// ============================================================================

#[test]
fn test_base_stream_read_and_seek() {
    let mut stream = Stream::from_bytes(b"%PDF-1.7\nrest".to_vec());
    assert_eq!(stream.length(), 13);
    assert_eq!(stream.get_bytes(8).unwrap(), b"%PDF-1.7");

    stream.set_pos(9).unwrap();
    assert_eq!(stream.get_byte().unwrap(), b'r');
    assert!(stream.set_pos(14).is_err());
}

#[test]
fn test_base_stream_end_of_stream() {
    let mut stream = Stream::from_bytes(b"ab".to_vec());
    stream.get_bytes(2).unwrap();
    assert!(matches!(stream.get_byte(), Err(PDFError::UnexpectedEndOfStream)));
}

// ============================================================================
// Source Stream Tests
// ============================================================================

#[test]
fn test_source_stream_reads_across_windows() {
    let data: Vec<u8> = (0..2000u32).map(|i| (i % 251) as u8).collect();
    let mut stream = SourceStream::new(memory_source(&data));

    stream.set_pos(510).unwrap();
    let bytes = stream.get_bytes(10).unwrap();
    assert_eq!(bytes, data[510..520].to_vec());
    assert_eq!(stream.get_byte_range(1990, 2000).unwrap(), data[1990..].to_vec());
}

#[test]
fn test_source_stream_base_offset() {
    let mut stream = SourceStream::with_base(memory_source(b"junk%PDF-1.4"), 4);
    assert_eq!(stream.base(), 4);
    assert_eq!(stream.length(), 8);
    assert_eq!(stream.get_bytes(5).unwrap(), b"%PDF-");
}

#[test]
fn test_missing_bytes_surface_as_not_loaded() {
    let chunks = Arc::new(ChunkManager::new(1000, Some(100)));
    chunks.on_receive_data(0, &[b' '; 100]).unwrap();
    let mut stream = SourceStream::new(chunks);

    stream.set_pos(50).unwrap();
    match stream.get_byte() {
        Err(PDFError::DataNotLoaded { offset, length }) => {
            assert!(offset + length > 100);
        }
        other => panic!("expected DataNotLoaded, got {:?}", other),
    }
}

// ============================================================================
// File Source Tests
// ============================================================================

#[test]
fn test_file_source_reads() {
    let mut temp = tempfile::NamedTempFile::new().unwrap();
    temp.write_all(b"0123456789").unwrap();
    temp.flush().unwrap();

    let source = FileSource::open(temp.path()).unwrap();
    assert_eq!(source.size(), 10);
    let mut buf = [0u8; 4];
    assert!(source.read_at(3, &mut buf));
    assert_eq!(&buf, b"3456");
    assert!(!source.read_at(8, &mut buf));
}

#[test]
fn test_file_source_nonexistent_file() {
    assert!(FileSource::open("/nonexistent/file.pdf").is_err());
}
