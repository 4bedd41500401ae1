use super::object::{Dictionary, ObjectId, PDFObject};
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;

/// Cross-reference table entry.
///
/// Each entry describes where to find an indirect object in the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XRefEntry {
    /// Free entry - object number is not in use
    Free,

    /// Object is stored uncompressed at a byte offset
    Offset { offset: u64, generation: u16 },

    /// Object is packed inside an object stream
    Compressed { container: u64, index: u32 },
}

impl XRefEntry {
    /// Returns true if this entry is free.
    pub fn is_free(&self) -> bool {
        matches!(self, XRefEntry::Free)
    }

    /// Returns the generation number for this entry.
    ///
    /// Objects inside object streams always have generation 0.
    pub fn generation(&self) -> u16 {
        match self {
            XRefEntry::Offset { generation, .. } => *generation,
            XRefEntry::Free | XRefEntry::Compressed { .. } => 0,
        }
    }
}

/// Cross-reference table for a document.
///
/// Maps object numbers to their locations, plus the sorted set of byte
/// offsets where objects (and xref sections) are known to start. The
/// offsets bound stream bodies whose declared length cannot be trusted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XRef {
    entries: FxHashMap<u64, XRefEntry>,
    object_offsets: BTreeSet<u64>,
}

impl XRef {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gets an entry from the xref table.
    pub fn get_entry(&self, num: u64) -> Option<&XRefEntry> {
        self.entries.get(&num)
    }

    /// Assigns an entry unless the number already has one.
    ///
    /// Chain walks visit the newest revision first, so the first
    /// assignment is the one that stays. Returns true if inserted.
    pub fn insert_if_absent(&mut self, num: u64, entry: XRefEntry) -> bool {
        if self.entries.contains_key(&num) {
            return false;
        }
        self.record_offset(&entry);
        self.entries.insert(num, entry);
        true
    }

    /// Assigns an entry, replacing any previous one.
    ///
    /// Used by the recovery scan, where later bytes supersede earlier ones.
    pub fn set_entry(&mut self, num: u64, entry: XRefEntry) {
        self.record_offset(&entry);
        self.entries.insert(num, entry);
    }

    fn record_offset(&mut self, entry: &XRefEntry) {
        if let XRefEntry::Offset { offset, .. } = entry {
            self.object_offsets.insert(*offset);
        }
    }

    /// Records a structural offset (an xref section) that bounds objects.
    pub fn add_boundary(&mut self, offset: u64) {
        self.object_offsets.insert(offset);
    }

    /// First known object or section start strictly after `offset`.
    pub fn next_offset_after(&self, offset: u64) -> Option<u64> {
        self.object_offsets
            .range(offset.saturating_add(1)..)
            .next()
            .copied()
    }

    /// Known start offsets in ascending order.
    pub fn object_offsets(&self) -> impl Iterator<Item = u64> + '_ {
        self.object_offsets.iter().copied()
    }

    /// Number of entries in the table.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the table has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Highest object number with an entry.
    pub fn max_object_number(&self) -> Option<u64> {
        self.entries.keys().copied().max()
    }

    /// Iterates over (object number, entry) pairs in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = (u64, &XRefEntry)> {
        self.entries.iter().map(|(num, entry)| (*num, entry))
    }

    /// Object numbers in ascending order.
    pub fn object_numbers(&self) -> Vec<u64> {
        let mut numbers: Vec<u64> = self.entries.keys().copied().collect();
        numbers.sort_unstable();
        numbers
    }
}

/// Merged trailer of a revision chain.
///
/// Fields come from the newest trailer that has them; older trailers only
/// fill gaps.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Trailer {
    pub root: Option<ObjectId>,
    pub info: Option<ObjectId>,
    /// The `/Encrypt` value, a reference or a direct dictionary.
    pub encrypt: Option<PDFObject>,
    pub id: Option<(Vec<u8>, Vec<u8>)>,
    /// Declared upper bound on object numbers.
    pub size: Option<u64>,
    /// Byte offset of the previous revision's table (newest revision only).
    pub prev: Option<u64>,
    /// Compressed table of a hybrid file (newest revision only).
    pub xref_stm: Option<u64>,
    dict: Dictionary,
}

/// Keys that describe a single revision and are never inherited.
const PER_REVISION_KEYS: [&str; 2] = ["Prev", "XRefStm"];

impl Trailer {
    /// Extracts the known keys from a trailer (or xref stream) dictionary.
    pub fn from_dict(dict: &Dictionary) -> Self {
        let offset = |key: &str| {
            dict.get_integer(key)
                .filter(|v| *v > 0)
                .map(|v| v as u64)
        };
        let id = dict.get_array("ID").and_then(|items| match items {
            [first, second, ..] => Some((
                first.as_string_bytes()?.to_vec(),
                second.as_string_bytes()?.to_vec(),
            )),
            _ => None,
        });

        Trailer {
            root: dict.get_reference("Root"),
            info: dict.get_reference("Info"),
            encrypt: dict.get("Encrypt").filter(|v| !v.is_null()).cloned(),
            id,
            size: dict.get_integer("Size").filter(|v| *v >= 0).map(|v| v as u64),
            prev: offset("Prev"),
            xref_stm: offset("XRefStm"),
            dict: dict.clone(),
        }
    }

    /// Fills fields missing here from an older revision's trailer.
    pub fn merge_older(&mut self, older: &Trailer) {
        self.root = self.root.or(older.root);
        self.info = self.info.or(older.info);
        if self.encrypt.is_none() {
            self.encrypt = older.encrypt.clone();
        }
        if self.id.is_none() {
            self.id = older.id.clone();
        }
        self.size = self.size.or(older.size);

        for (key, value) in older.dict.iter() {
            let inherited = !PER_REVISION_KEYS.iter().any(|k| k.as_bytes() == key);
            if inherited && self.dict.get_raw(key).is_none() {
                self.dict.insert(key.to_vec(), value.clone());
            }
        }
    }

    /// The merged trailer dictionary.
    pub fn dict(&self) -> &Dictionary {
        &self.dict
    }

    /// Reference to the encryption dictionary, when it is indirect.
    pub fn encrypt_ref(&self) -> Option<ObjectId> {
        self.encrypt.as_ref().and_then(PDFObject::as_reference)
    }

    pub fn is_encrypted(&self) -> bool {
        self.encrypt.is_some()
    }
}
