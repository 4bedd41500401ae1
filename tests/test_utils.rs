//! Test utilities shared by the integration tests.
//!
//! [`PdfBuilder`] writes small but structurally exact files: every
//! cross-reference offset is computed from the bytes actually emitted.

#![allow(dead_code)]

use pdf_x_syntax::core::*;
use std::collections::BTreeMap;
use std::sync::Arc;

/// One object body before serialization.
#[derive(Debug, Clone)]
enum Body {
    Direct(String),
    Stream { dict: String, data: Vec<u8> },
}

/// A file produced by [`PdfBuilder`].
#[derive(Debug, Clone)]
pub struct PdfFile {
    pub bytes: Vec<u8>,
    /// Offsets of `N G obj` lines, relative to the `%PDF-` header
    pub offsets: BTreeMap<u64, usize>,
    /// Offset of the newest cross-reference section, relative to the header
    pub xref_offset: usize,
    /// Bytes before the header
    pub prefix_len: usize,
}

impl PdfFile {
    /// Absolute position of `needle` in the file.
    pub fn find(&self, needle: &[u8]) -> Option<usize> {
        self.bytes.windows(needle.len()).position(|w| w == needle)
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Appends an incremental update with a classic table chained via `Prev`.
    pub fn append_update(mut self, objects: &[(u64, &str)], trailer_extra: &str) -> PdfFile {
        let mut updated = Vec::new();
        for (num, body) in objects {
            let offset = self.bytes.len() - self.prefix_len;
            self.offsets.insert(*num, offset);
            updated.push((*num, offset));
            self.bytes
                .extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", num, body).as_bytes());
        }

        let xref_offset = self.bytes.len() - self.prefix_len;
        let mut table = String::from("xref\n");
        for (num, offset) in &updated {
            table.push_str(&format!("{} 1\n{:010} 00000 n \n", num, offset));
        }
        let size = self.offsets.keys().max().map_or(1, |max| max + 1);
        table.push_str(&format!(
            "trailer\n<< /Size {} /Prev {} {} >>\nstartxref\n{}\n%%EOF\n",
            size, self.xref_offset, trailer_extra, xref_offset
        ));
        self.bytes.extend_from_slice(table.as_bytes());
        self.xref_offset = xref_offset;
        self
    }
}

/// Builder for synthetic test documents.
#[derive(Debug, Clone)]
pub struct PdfBuilder {
    version: String,
    prefix: Vec<u8>,
    objects: Vec<(u64, Body)>,
    /// Objects packed into an object stream: container number and members
    packed: Option<(u64, Vec<(u64, String)>)>,
}

impl Default for PdfBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PdfBuilder {
    pub fn new() -> Self {
        PdfBuilder {
            version: "1.7".to_string(),
            prefix: Vec::new(),
            objects: Vec::new(),
            packed: None,
        }
    }

    pub fn version(mut self, version: &str) -> Self {
        self.version = version.to_string();
        self
    }

    /// Junk written before the `%PDF-` header.
    pub fn prefix(mut self, prefix: &[u8]) -> Self {
        self.prefix = prefix.to_vec();
        self
    }

    pub fn object(mut self, num: u64, body: &str) -> Self {
        self.objects.push((num, Body::Direct(body.to_string())));
        self
    }

    /// Adds a stream object; `/Length` is appended to `dict_entries`.
    pub fn stream(mut self, num: u64, dict_entries: &str, data: &[u8]) -> Self {
        self.objects.push((
            num,
            Body::Stream {
                dict: dict_entries.to_string(),
                data: data.to_vec(),
            },
        ));
        self
    }

    /// Packs objects into object stream `container` (xref-stream files only).
    pub fn packed(mut self, container: u64, members: &[(u64, &str)]) -> Self {
        let members = members
            .iter()
            .map(|(num, body)| (*num, body.to_string()))
            .collect();
        self.packed = Some((container, members));
        self
    }

    /// Catalog at 1, page tree at 2, one page per entry of `pages` starting
    /// at object 3.
    pub fn with_pages(mut self, pages: usize) -> Self {
        let kids: Vec<String> = (0..pages).map(|i| format!("{} 0 R", i + 3)).collect();
        self = self
            .object(1, "<< /Type /Catalog /Pages 2 0 R >>")
            .object(
                2,
                &format!("<< /Type /Pages /Kids [{}] /Count {} >>", kids.join(" "), pages),
            );
        for i in 0..pages {
            self = self.object(
                i as u64 + 3,
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] >>",
            );
        }
        self
    }

    fn write_body(&self) -> (Vec<u8>, BTreeMap<u64, usize>) {
        let mut bytes = self.prefix.clone();
        bytes.extend_from_slice(format!("%PDF-{}\n%\u{e2}\u{e3}\n", self.version).as_bytes());
        let mut offsets = BTreeMap::new();

        for (num, body) in &self.objects {
            offsets.insert(*num, bytes.len() - self.prefix.len());
            bytes.extend_from_slice(format!("{} 0 obj\n", num).as_bytes());
            match body {
                Body::Direct(text) => bytes.extend_from_slice(text.as_bytes()),
                Body::Stream { dict, data } => {
                    bytes.extend_from_slice(
                        format!("<< {} /Length {} >>\nstream\n", dict, data.len()).as_bytes(),
                    );
                    bytes.extend_from_slice(data);
                    bytes.extend_from_slice(b"\nendstream");
                }
            }
            bytes.extend_from_slice(b"\nendobj\n");
        }
        (bytes, offsets)
    }

    /// Writes a classic `xref` table and trailer.
    pub fn build(&self, trailer_extra: &str) -> PdfFile {
        let (mut bytes, offsets) = self.write_body();
        let size = offsets.keys().max().map_or(1, |max| max + 1);
        let xref_offset = bytes.len() - self.prefix.len();

        let mut table = format!("xref\n0 {}\n", size);
        for num in 0..size {
            match offsets.get(&num) {
                Some(offset) => table.push_str(&format!("{:010} 00000 n \n", offset)),
                None => table.push_str("0000000000 65535 f \n"),
            }
        }
        table.push_str(&format!(
            "trailer\n<< /Size {} {} >>\nstartxref\n{}\n%%EOF\n",
            size, trailer_extra, xref_offset
        ));
        bytes.extend_from_slice(table.as_bytes());

        PdfFile {
            bytes,
            offsets,
            xref_offset,
            prefix_len: self.prefix.len(),
        }
    }

    /// Writes a cross-reference stream (`/W [1 4 2]`, unfiltered) and
    /// packs the members registered with [`packed`](Self::packed).
    pub fn build_xref_stream(&self, trailer_extra: &str) -> PdfFile {
        let mut builder = self.clone();
        let mut compressed = BTreeMap::new();
        if let Some((container, members)) = &self.packed {
            let mut header = String::new();
            let mut payload = String::new();
            for (index, (num, body)) in members.iter().enumerate() {
                header.push_str(&format!("{} {} ", num, payload.len()));
                payload.push_str(body);
                payload.push(' ');
                compressed.insert(*num, (*container, index as u64));
            }
            let data = format!("{}{}", header, payload);
            builder = builder.stream(
                *container,
                &format!("/Type /ObjStm /N {} /First {}", members.len(), header.len()),
                data.as_bytes(),
            );
        }

        let (mut bytes, offsets) = builder.write_body();
        let xref_num = offsets
            .keys()
            .chain(compressed.keys())
            .max()
            .map_or(1, |max| max + 1);
        let size = xref_num + 1;
        let xref_offset = bytes.len() - self.prefix.len();

        let mut rows = Vec::new();
        for num in 0..size {
            let (kind, field2, field3): (u8, u64, u16) = if num == xref_num {
                (1, xref_offset as u64, 0)
            } else if let Some(offset) = offsets.get(&num) {
                (1, *offset as u64, 0)
            } else if let Some((container, index)) = compressed.get(&num) {
                (2, *container, *index as u16)
            } else {
                (0, 0, if num == 0 { 65535 } else { 0 })
            };
            rows.push(kind);
            rows.extend_from_slice(&(field2 as u32).to_be_bytes());
            rows.extend_from_slice(&field3.to_be_bytes());
        }

        bytes.extend_from_slice(
            format!(
                "{} 0 obj\n<< /Type /XRef /Size {} /W [1 4 2] /Length {} {} >>\nstream\n",
                xref_num,
                size,
                rows.len(),
                trailer_extra
            )
            .as_bytes(),
        );
        bytes.extend_from_slice(&rows);
        bytes.extend_from_slice(
            format!("\nendstream\nendobj\nstartxref\n{}\n%%EOF\n", xref_offset).as_bytes(),
        );

        let mut offsets = offsets;
        offsets.insert(xref_num, xref_offset);
        PdfFile {
            bytes,
            offsets,
            xref_offset,
            prefix_len: self.prefix.len(),
        }
    }

    /// Writes only the objects, with no table, trailer or `startxref`.
    pub fn build_without_xref(&self) -> Vec<u8> {
        self.write_body().0
    }
}

/// A single-page document with a classic table.
pub fn simple_pdf() -> PdfFile {
    PdfBuilder::new().with_pages(1).build("/Root 1 0 R")
}

pub fn parser_for(data: &[u8]) -> Parser {
    Parser::from_stream(Box::new(Stream::from_bytes(data.to_vec()))).unwrap()
}

pub fn parse_one(input: &str) -> PDFResult<PDFObject> {
    parser_for(input.as_bytes()).parse_object()
}

pub fn memory_source(bytes: &[u8]) -> Arc<dyn ByteSource> {
    Arc::new(MemorySource::from(bytes.to_vec()))
}

/// Feeds `data` into `chunks` for every hinted range until `query` stops
/// reporting `NotAvailable`. Returns the final answer and the number of
/// rounds taken.
pub fn satisfy_hints<F>(chunks: &ChunkManager, data: &[u8], mut query: F) -> (Availability, usize)
where
    F: FnMut(&mut HintList) -> Availability,
{
    let mut rounds = 0;
    loop {
        let mut hints = HintList::new();
        let answer = query(&mut hints);
        if answer != Availability::NotAvailable {
            return (answer, rounds);
        }
        assert!(!hints.is_empty(), "blocked query must request data");
        // Chunks only count once complete, so deliver whole chunks.
        let chunk_size = chunks.chunk_size();
        for (offset, size) in hints.take() {
            let first = offset as usize / chunk_size;
            let last = (offset + size - 1) as usize / chunk_size;
            for chunk in first..=last {
                let begin = chunk * chunk_size;
                let end = (begin + chunk_size).min(data.len());
                chunks.on_receive_data(begin, &data[begin..end]).unwrap();
            }
        }
        rounds += 1;
        assert!(rounds < 1000, "availability check did not converge");
    }
}
