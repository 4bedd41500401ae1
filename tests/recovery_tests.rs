//! Cross-reference rebuild tests for damaged files

mod test_utils;

use pdf_x_syntax::core::*;
use test_utils::*;

fn recover(data: &[u8]) -> (XRef, Trailer) {
    let mut parser = parser_for(data);
    recover_xref(&mut parser, &ParseOptions::default()).unwrap()
}

/// Two bare trailers followed by an xref stream object whose Root
/// resolves. No usable `startxref`.
fn trailers_then_xref_stream() -> Vec<u8> {
    let mut data = PdfBuilder::new().with_pages(1).build_without_xref();
    data.extend_from_slice(b"trailer\n<< /Size 4 /Root 90 0 R /Info 91 0 R >>\n");
    data.extend_from_slice(b"4 0 obj\n(filler)\nendobj\n");
    data.extend_from_slice(b"trailer\n<< /Size 5 /Root 92 0 R >>\n");
    let records = [0u8; 6];
    data.extend_from_slice(
        format!(
            "5 0 obj\n<< /Type /XRef /Size 6 /W [1 1 1] /Root 1 0 R /Length {} >>\nstream\n",
            records.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(&records);
    data.extend_from_slice(b"\nendstream\nendobj\n%%EOF\n");
    data
}

// ============================================================================
// Trailer Selection Tests
// ============================================================================

#[test]
fn test_xref_stream_after_trailers_is_authoritative() {
    let (xref, trailer) = recover(&trailers_then_xref_stream());

    assert_eq!(trailer.root, Some(ObjectId::new(1, 0)));
    assert_eq!(trailer.dict().get_name("Type"), Some(&b"XRef"[..]));
    assert_eq!(trailer.size, Some(6));
    // Older candidates only fill gaps
    assert_eq!(trailer.info, Some(ObjectId::new(91, 0)));
    assert!(xref.get_entry(5).is_some());
}

#[test]
fn test_document_opens_through_recovery() {
    let mut doc = Document::open(trailers_then_xref_stream()).unwrap();
    assert!(doc.is_recovered());
    assert_eq!(doc.trailer().root, Some(ObjectId::new(1, 0)));
    assert_eq!(doc.page_count().unwrap(), 1);
}

#[test]
fn test_last_bare_trailer_without_xref_stream() {
    let mut data = PdfBuilder::new().with_pages(1).build_without_xref();
    data.extend_from_slice(b"trailer\n<< /Size 4 /Root 2 0 R >>\n");
    data.extend_from_slice(b"trailer\n<< /Size 4 /Root 1 0 R >>\n%%EOF\n");

    let (_, trailer) = recover(&data);
    assert_eq!(trailer.root, Some(ObjectId::new(1, 0)));
}

// ============================================================================
// Damaged File Tests
// ============================================================================

#[test]
fn test_truncated_table_recovers_objects() {
    let file = PdfBuilder::new().with_pages(2).build("/Root 1 0 R");
    let cut = file.xref_offset + 30;
    let truncated = file.bytes[..cut].to_vec();

    let mut doc = Document::open(truncated).unwrap();
    assert!(doc.is_recovered());
    assert_eq!(doc.page_count().unwrap(), 2);
}

#[test]
fn test_stale_startxref_offset() {
    let file = PdfBuilder::new().with_pages(1).build("/Root 1 0 R");
    let at = file.find(b"startxref\n").unwrap() + b"startxref\n".len();
    // Point startxref into the middle of the first object
    let mut bytes = file.bytes[..at].to_vec();
    bytes.extend_from_slice(b"17\n%%EOF\n");

    let mut doc = Document::open(bytes).unwrap();
    assert!(doc.is_recovered());
    assert!(doc.catalog().unwrap().as_dict().unwrap().is_type("Catalog"));
}

#[test]
fn test_object_without_endobj_keeps_its_neighbour() {
    let data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog /Pages 2 0 R >>\n2 0 obj\n<< /Type /Pages /Kids [] /Count 0 >>\nendobj\n".to_vec();
    let second = data.windows(7).position(|w| w == b"2 0 obj").unwrap();

    let (xref, trailer) = recover(&data);
    assert_eq!(
        xref.get_entry(1),
        Some(&XRefEntry::Offset { offset: 9, generation: 0 })
    );
    assert_eq!(
        xref.get_entry(2),
        Some(&XRefEntry::Offset { offset: second as u64, generation: 0 })
    );
    assert_eq!(trailer.root, Some(ObjectId::new(1, 0)));

    let mut doc = Document::open(data).unwrap();
    assert_eq!(doc.page_count().unwrap(), 0);
}

#[test]
fn test_object_directly_after_trailer_is_found() {
    let mut data = PdfBuilder::new().with_pages(1).build_without_xref();
    data.extend_from_slice(b"trailer\n<< /Size 5 /Root 1 0 R >>\n4 0 obj\n(after)\nendobj\n");

    let (xref, trailer) = recover(&data);
    assert!(xref.get_entry(4).is_some());
    assert_eq!(trailer.size, Some(5));
}

#[test]
fn test_later_copy_of_object_wins() {
    let mut data = PdfBuilder::new().with_pages(1).build_without_xref();
    data.extend_from_slice(b"4 0 obj\n(first)\nendobj\n4 0 obj\n(second)\nendobj\n");
    data.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n");

    let mut doc = Document::open(data).unwrap();
    assert_eq!(
        *doc.get_object(ObjectId::new(4, 0)).unwrap(),
        PDFObject::String(b"second".to_vec())
    );
}

#[test]
fn test_keywords_inside_strings_are_ignored() {
    let mut data = PdfBuilder::new()
        .with_pages(1)
        .object(4, "(9 0 obj << /Fake true >> endobj trailer << /Root 4 0 R >>)")
        .build_without_xref();
    data.extend_from_slice(b"trailer\n<< /Root 1 0 R >>\n");

    let (xref, trailer) = recover(&data);
    assert!(xref.get_entry(9).is_none());
    assert_eq!(trailer.root, Some(ObjectId::new(1, 0)));
}

#[test]
fn test_objects_in_object_streams_are_found() {
    let file = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .packed(10, &[(3, "<< /Type /Page /Parent 2 0 R >>")])
        .build_xref_stream("/Root 1 0 R");
    // Drop startxref so the chain cannot be followed
    let end = file.find(b"startxref").unwrap();
    let damaged = file.bytes[..end].to_vec();

    let (xref, _) = recover(&damaged);
    assert_eq!(
        xref.get_entry(3),
        Some(&XRefEntry::Compressed { container: 10, index: 0 })
    );

    let mut doc = Document::open(damaged).unwrap();
    assert_eq!(doc.page_count().unwrap(), 1);
}

#[test]
fn test_catalog_found_without_trailer() {
    let data = PdfBuilder::new().with_pages(1).build_without_xref();
    let (_, trailer) = recover(&data);
    assert_eq!(trailer.root, Some(ObjectId::new(1, 0)));
}

#[test]
fn test_pure_garbage_is_fatal() {
    let garbage = b"this is not a document at all, just text with obj and trailer words".to_vec();
    assert!(Document::open(garbage).is_err());
}
