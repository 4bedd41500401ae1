//! Cross-reference loading tests

mod test_utils;

use pdf_x_syntax::core::*;
use pdf_x_syntax::core::xref_loader::{parse_xref_stream_entries, read_section};
use test_utils::*;

fn load(file: &PdfFile) -> PDFResult<(XRef, Trailer)> {
    let mut parser = parser_for(&file.bytes);
    load_xref(&mut parser, &ParseOptions::default())
}

// ============================================================================
// Classic Table Tests
// ============================================================================

#[test]
fn test_classic_subsection_entries() {
    let data = b"xref\n0 3\n0000000000 65535 f \n0000000100 00000 n \n0000000200 00000 n \ntrailer\n<< /Size 3 >>\n";
    let mut parser = parser_for(data);
    let section = read_section(&mut parser, 0, &ParseOptions::default()).unwrap();

    assert!(!section.is_stream);
    assert_eq!(
        section.entries,
        vec![
            (0, XRefEntry::Free),
            (1, XRefEntry::Offset { offset: 100, generation: 0 }),
            (2, XRefEntry::Offset { offset: 200, generation: 0 }),
        ]
    );
    assert_eq!(section.trailer.size, Some(3));
}

#[test]
fn test_multiple_subsections() {
    let data = b"xref\n0 1\n0000000000 65535 f \n4 2\n0000000010 00000 n \n0000000020 00002 n \ntrailer\n<< /Size 6 >>\n";
    let mut parser = parser_for(data);
    let section = read_section(&mut parser, 0, &ParseOptions::default()).unwrap();

    assert_eq!(section.entries.len(), 3);
    assert_eq!(
        section.entries[2],
        (5, XRefEntry::Offset { offset: 20, generation: 2 })
    );
}

#[test]
fn test_load_built_document() {
    let file = PdfBuilder::new().with_pages(2).build("/Root 1 0 R");
    let (xref, trailer) = load(&file).unwrap();

    assert_eq!(trailer.root, Some(ObjectId::new(1, 0)));
    assert_eq!(trailer.size, Some(5));
    for (num, offset) in &file.offsets {
        assert_eq!(
            xref.get_entry(*num),
            Some(&XRefEntry::Offset { offset: *offset as u64, generation: 0 })
        );
    }
    assert!(xref.get_entry(0).unwrap().is_free());
}

// ============================================================================
// Revision Chain Tests
// ============================================================================

#[test]
fn test_incremental_update_newest_wins() {
    let file = PdfBuilder::new()
        .with_pages(1)
        .object(4, "(original)")
        .build("/Root 1 0 R /Info 4 0 R")
        .append_update(&[(4, "(updated)")], "/Root 1 0 R");

    let (xref, trailer) = load(&file).unwrap();
    assert_eq!(
        xref.get_entry(4),
        Some(&XRefEntry::Offset { offset: file.offsets[&4] as u64, generation: 0 })
    );
    // Info is inherited from the older trailer
    assert_eq!(trailer.info, Some(ObjectId::new(4, 0)));
    assert!(trailer.prev.is_some());

    let mut doc = Document::open(file.bytes.clone()).unwrap();
    let info = doc.get_object(ObjectId::new(4, 0)).unwrap();
    assert_eq!(*info, PDFObject::String(b"updated".to_vec()));
}

#[test]
fn test_prev_cycle_is_detected() {
    let mut chain_data = b"%PDF-1.4\n1 0 obj\n<< /Type /Catalog >>\nendobj\n".to_vec();
    let xref_at = chain_data.len();
    chain_data.extend_from_slice(
        format!(
            "xref\n0 2\n0000000000 65535 f \n0000000009 00000 n \ntrailer\n<< /Size 2 /Root 1 0 R /Prev {} >>\nstartxref\n{}\n%%EOF\n",
            xref_at, xref_at
        )
        .as_bytes(),
    );

    let mut parser = parser_for(&chain_data);
    let err = load_xref(&mut parser, &ParseOptions::default()).unwrap_err();
    assert!(matches!(err, PDFError::MissingOrCyclicXref(_)));

    // The document layer falls back to a rebuild
    let doc = Document::open(chain_data).unwrap();
    assert!(doc.is_recovered());
}

#[test]
fn test_chain_steps_are_resumable() {
    let file = PdfBuilder::new()
        .with_pages(1)
        .build("/Root 1 0 R")
        .append_update(&[(3, "<< /Type /Page /Parent 2 0 R >>")], "/Root 1 0 R");

    let mut parser = parser_for(&file.bytes);
    let options = ParseOptions::default();
    let start = find_startxref(&mut parser, options.startxref_search_window).unwrap();
    let mut chain = XRefChain::new(start);

    let mut steps = 0;
    while !chain.is_complete() {
        chain.step(&mut parser, &options).unwrap();
        steps += 1;
    }
    assert_eq!(steps, 2);
    assert_eq!(chain.revisions(), 2);

    let (xref, trailer) = chain.finish(&mut parser).unwrap();
    assert_eq!((xref, trailer), load(&file).unwrap());
}

#[test]
fn test_loading_twice_is_identical() {
    let file = PdfBuilder::new().with_pages(3).build("/Root 1 0 R");
    assert_eq!(load(&file).unwrap(), load(&file).unwrap());
}

// ============================================================================
// Compressed Table Tests
// ============================================================================

#[test]
fn test_compressed_record_widths() {
    let mut dict = Dictionary::new();
    dict.insert(
        "W",
        PDFObject::Array(vec![
            PDFObject::Integer(1),
            PDFObject::Integer(2),
            PDFObject::Integer(1),
        ]),
    );
    dict.insert("Size", PDFObject::Integer(1));

    let entries = parse_xref_stream_entries(&dict, &[0x02, 0x00, 0x05, 0x03], 1024).unwrap();
    assert_eq!(
        entries,
        vec![(0, XRefEntry::Compressed { container: 5, index: 3 })]
    );
}

#[test]
fn test_xref_stream_document() {
    let file = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .packed(10, &[(3, "<< /Type /Page /Parent 2 0 R >>"), (4, "(packed)")])
        .build_xref_stream("/Root 1 0 R");

    let (xref, trailer) = load(&file).unwrap();
    assert_eq!(trailer.root, Some(ObjectId::new(1, 0)));
    assert_eq!(
        xref.get_entry(3),
        Some(&XRefEntry::Compressed { container: 10, index: 0 })
    );
    assert_eq!(
        xref.get_entry(4),
        Some(&XRefEntry::Compressed { container: 10, index: 1 })
    );

    let mut doc = Document::open(file.bytes.clone()).unwrap();
    assert_eq!(
        *doc.get_object(ObjectId::new(4, 0)).unwrap(),
        PDFObject::String(b"packed".to_vec())
    );
    assert_eq!(doc.page_count().unwrap(), 1);
}

#[test]
fn test_hybrid_xref_stm_fills_missing_entries() {
    // Classic table lists 1 and 2; the companion stream adds 3 and 4.
    let base = PdfBuilder::new()
        .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
        .object(2, "<< /Type /Pages /Kids [3 0 R] /Count 1 >>")
        .packed(10, &[(3, "<< /Type /Page /Parent 2 0 R >>"), (4, "(hidden)")])
        .build_xref_stream("/Root 1 0 R");
    let stream_offset = base.xref_offset;

    let mut bytes = base.bytes.clone();
    let classic_at = bytes.len();
    bytes.extend_from_slice(
        format!(
            "xref\n0 3\n0000000000 65535 f \n{:010} 00000 n \n{:010} 00000 n \ntrailer\n<< /Size 12 /Root 1 0 R /XRefStm {} >>\nstartxref\n{}\n%%EOF\n",
            base.offsets[&1], base.offsets[&2], stream_offset, classic_at
        )
        .as_bytes(),
    );

    let mut parser = parser_for(&bytes);
    let (xref, trailer) = load_xref(&mut parser, &ParseOptions::default()).unwrap();
    assert_eq!(trailer.xref_stm, Some(stream_offset as u64));
    assert_eq!(
        xref.get_entry(4),
        Some(&XRefEntry::Compressed { container: 10, index: 1 })
    );
    assert_eq!(
        xref.get_entry(1),
        Some(&XRefEntry::Offset { offset: base.offsets[&1] as u64, generation: 0 })
    );
}

#[test]
fn test_xref_stream_with_oversized_predictor_rows() {
    use flate2::Compression;
    use flate2::write::ZlibEncoder;
    use std::io::Write;

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(&[2, 1, 0, 0, 0, 0, 0, 0]).unwrap();
    let payload = encoder.finish().unwrap();

    let mut data = PdfBuilder::new().with_pages(1).build_without_xref();
    let xref_at = data.len();
    data.extend_from_slice(
        format!(
            "4 0 obj\n<< /Type /XRef /Size 5 /W [1 4 2] /Root 1 0 R /Filter /FlateDecode /DecodeParms << /Predictor 12 /Columns 4611686018427387904 >> /Length {} >>\nstream\n",
            payload.len()
        )
        .as_bytes(),
    );
    data.extend_from_slice(&payload);
    data.extend_from_slice(format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_at).as_bytes());

    let mut parser = parser_for(&data);
    assert!(load_xref(&mut parser, &ParseOptions::default()).is_err());

    let mut doc = Document::open(data).unwrap();
    assert!(doc.is_recovered());
    assert_eq!(doc.page_count().unwrap(), 1);
}

// ============================================================================
// startxref Tests
// ============================================================================

#[test]
fn test_missing_startxref() {
    let bytes = PdfBuilder::new().with_pages(1).build_without_xref();
    let mut parser = parser_for(&bytes);
    assert!(find_startxref(&mut parser, 4096).is_err());
}

#[test]
fn test_startxref_with_header_prefix() {
    let file = PdfBuilder::new()
        .prefix(b"garbage before the header\n")
        .with_pages(1)
        .build("/Root 1 0 R");

    let mut doc = Document::open(file.bytes.clone()).unwrap();
    assert_eq!(doc.header_offset(), file.prefix_len as u64);
    assert!(!doc.is_recovered());
    assert_eq!(doc.page_count().unwrap(), 1);
}
