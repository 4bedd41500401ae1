use indexmap::IndexMap;
use std::fmt;

/// Identity of an indirect object: object number plus generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId {
    pub num: u64,
    pub generation: u16,
}

impl ObjectId {
    pub const fn new(num: u64, generation: u16) -> Self {
        ObjectId { num, generation }
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} R", self.num, self.generation)
    }
}

/// Object types that can appear in a document body.
///
/// Arrays and dictionaries own their children; references are lookups
/// resolved against the document's object cache.
#[derive(Debug, Clone, PartialEq)]
pub enum PDFObject {
    /// Null value (also the result of any recovered failure)
    Null,

    /// Boolean value
    Boolean(bool),

    /// Integer value
    Integer(i64),

    /// Real value
    Real(f64),

    /// String value (from literal strings like (hello))
    String(Vec<u8>),

    /// Hex string value (from hex strings like <48656c6c6f>)
    HexString(Vec<u8>),

    /// Name value, raw bytes after `#xx` decoding
    Name(Vec<u8>),

    /// Array of objects
    Array(Vec<PDFObject>),

    /// Dictionary (ordered key-value pairs)
    Dictionary(Dictionary),

    /// Stream object (dictionary + raw payload as stored in the file)
    Stream { dict: Dictionary, data: Vec<u8> },

    /// Indirect object reference (like "5 0 R")
    Ref(ObjectId),
}

impl PDFObject {
    /// Returns true if this object is null.
    pub fn is_null(&self) -> bool {
        matches!(self, PDFObject::Null)
    }

    /// Integer value; reals are truncated.
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            PDFObject::Integer(i) => Some(*i),
            PDFObject::Real(r) => Some(*r as i64),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            PDFObject::Integer(i) => Some(*i as f64),
            PDFObject::Real(r) => Some(*r),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            PDFObject::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            PDFObject::Name(name) => Some(name),
            _ => None,
        }
    }

    /// Returns true if this object is the name `name`.
    pub fn is_name(&self, name: &str) -> bool {
        self.as_name() == Some(name.as_bytes())
    }

    /// String bytes for both literal and hex strings.
    pub fn as_string_bytes(&self) -> Option<&[u8]> {
        match self {
            PDFObject::String(bytes) | PDFObject::HexString(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[PDFObject]> {
        match self {
            PDFObject::Array(items) => Some(items),
            _ => None,
        }
    }

    /// Dictionary of a dictionary or of a stream.
    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            PDFObject::Dictionary(dict) | PDFObject::Stream { dict, .. } => Some(dict),
            _ => None,
        }
    }

    pub fn as_reference(&self) -> Option<ObjectId> {
        match self {
            PDFObject::Ref(id) => Some(*id),
            _ => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, PDFObject::Stream { .. })
    }
}

/// Ordered name-to-object map. Inserting an existing key replaces its value,
/// so duplicate keys in the source resolve last-wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: IndexMap<Vec<u8>, PDFObject>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn insert(&mut self, key: impl Into<Vec<u8>>, value: PDFObject) -> Option<PDFObject> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<PDFObject> {
        self.entries.shift_remove(key.as_bytes())
    }

    pub fn get(&self, key: &str) -> Option<&PDFObject> {
        self.entries.get(key.as_bytes())
    }

    /// Lookup by raw key bytes (keys may hold non-UTF-8 escapes).
    pub fn get_raw(&self, key: &[u8]) -> Option<&PDFObject> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key.as_bytes())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], &PDFObject)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &[u8]> {
        self.entries.keys().map(|k| k.as_slice())
    }

    pub fn values_mut(&mut self) -> impl Iterator<Item = &mut PDFObject> {
        self.entries.values_mut()
    }

    pub fn get_integer(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(PDFObject::as_integer)
    }

    pub fn get_name(&self, key: &str) -> Option<&[u8]> {
        self.get(key).and_then(PDFObject::as_name)
    }

    pub fn get_reference(&self, key: &str) -> Option<ObjectId> {
        self.get(key).and_then(PDFObject::as_reference)
    }

    pub fn get_array(&self, key: &str) -> Option<&[PDFObject]> {
        self.get(key).and_then(PDFObject::as_array)
    }

    pub fn get_dict(&self, key: &str) -> Option<&Dictionary> {
        self.get(key).and_then(PDFObject::as_dict)
    }

    /// Returns true if `/Type` is the name `type_name`.
    pub fn is_type(&self, type_name: &str) -> bool {
        self.get_name("Type") == Some(type_name.as_bytes())
    }
}

impl FromIterator<(Vec<u8>, PDFObject)> for Dictionary {
    fn from_iter<T: IntoIterator<Item = (Vec<u8>, PDFObject)>>(iter: T) -> Self {
        let mut dict = Dictionary::new();
        for (key, value) in iter {
            dict.insert(key, value);
        }
        dict
    }
}
