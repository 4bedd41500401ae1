//! Object streams (`/Type /ObjStm`): many small objects packed into one
//! compressed stream, addressed by index.

use super::error::{PDFError, PDFResult};
use super::object::{Dictionary, ObjectId, PDFObject};
use super::parser::Parser;
use super::stream::Stream;
use rustc_hash::FxHashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// A decoded object stream with its offset table.
#[derive(Debug, Clone)]
pub struct ObjectStream {
    container: u64,
    /// (object number, offset relative to `first`) in declaration order
    pairs: Vec<(u64, usize)>,
    first: usize,
    payload: Arc<[u8]>,
}

impl ObjectStream {
    /// Builds the offset table from a container's dictionary and its
    /// decoded payload.
    ///
    /// `N` and `First` must be direct non-negative integers, and every
    /// declared offset must land inside the payload.
    pub fn parse(container: u64, dict: &Dictionary, decoded: Vec<u8>) -> PDFResult<Self> {
        let direct = |key: &str| match dict.get(key) {
            Some(PDFObject::Integer(v)) if *v >= 0 => Ok(*v as usize),
            other => Err(PDFError::malformed(
                0,
                format!("object stream {} has invalid /{}: {:?}", container, key, other),
            )),
        };
        let count = direct("N")?;
        let first = direct("First")?;
        if first > decoded.len() {
            return Err(PDFError::malformed(
                0,
                format!("object stream {} /First beyond payload", container),
            ));
        }

        let payload: Arc<[u8]> = decoded.into();
        let mut header = Parser::from_stream(Box::new(Stream::from_arc(payload.clone())))?;
        let body_len = payload.len() - first;

        // N counts pairs, each at least four bytes, so a huge N is a lie
        let mut pairs = Vec::with_capacity(count.min(first / 4 + 1));
        for i in 0..count {
            if header.position() >= first {
                return Err(PDFError::malformed(
                    first,
                    format!("object stream {} declares {} objects, found {}", container, count, i),
                ));
            }
            let num = header.next_integer()?.filter(|n| *n >= 0);
            let offset = header.next_integer()?.filter(|o| *o >= 0);
            match (num, offset) {
                (Some(num), Some(offset)) if (offset as usize) < body_len => {
                    pairs.push((num as u64, offset as usize));
                }
                _ => {
                    return Err(PDFError::malformed(
                        header.position(),
                        format!("bad offset table entry {} in object stream {}", i, container),
                    ));
                }
            }
        }

        debug!(container, objects = pairs.len(), "parsed object stream");
        Ok(ObjectStream {
            container,
            pairs,
            first,
            payload,
        })
    }

    /// Number of objects in the stream.
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Object numbers in declaration order.
    pub fn object_numbers(&self) -> impl Iterator<Item = u64> + '_ {
        self.pairs.iter().map(|(num, _)| *num)
    }

    /// Parses the object at `index`.
    ///
    /// The object number recorded at that index must equal `expected_num`.
    /// The object's bytes run to the next larger offset in the table.
    pub fn get_object(&self, index: usize, expected_num: u64) -> PDFResult<PDFObject> {
        let (num, offset) = *self.pairs.get(index).ok_or_else(|| {
            PDFError::malformed(
                0,
                format!("index {} out of range in object stream {}", index, self.container),
            )
        })?;
        if num != expected_num {
            return Err(PDFError::DanglingReference {
                num: expected_num,
                generation: 0,
            });
        }

        let start = self.first + offset;
        let end = self
            .pairs
            .iter()
            .map(|(_, o)| self.first + *o)
            .filter(|o| *o > start)
            .min()
            .unwrap_or(self.payload.len());

        let slice: Arc<[u8]> = self.payload[start..end].into();
        let mut parser = Parser::from_stream(Box::new(Stream::from_arc(slice)))?;
        match parser.parse_object()? {
            PDFObject::Stream { .. } => {
                warn!(
                    object = %ObjectId::new(num, 0),
                    container = self.container,
                    "stream object inside object stream"
                );
                Err(PDFError::malformed(start, "object streams cannot hold streams"))
            }
            object => Ok(object),
        }
    }
}

/// Parsed object streams keyed by container number.
///
/// A container that failed to parse is remembered as `None` so it is not
/// decoded again. Failures caused by missing bytes are never stored.
#[derive(Debug, Default)]
pub struct ObjectStreamCache {
    streams: FxHashMap<u64, Option<Arc<ObjectStream>>>,
}

impl ObjectStreamCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached state of `container`: `None` if never tried, `Some(None)` if
    /// it failed.
    pub fn get(&self, container: u64) -> Option<Option<Arc<ObjectStream>>> {
        self.streams.get(&container).cloned()
    }

    pub fn insert(&mut self, container: u64, stream: Option<Arc<ObjectStream>>) {
        self.streams.insert(container, stream);
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}
