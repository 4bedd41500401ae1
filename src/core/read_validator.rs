//! Byte-range gating for progressive loading.
//!
//! A [`ReadValidator`] sits between the parser and the real byte source.
//! Reads of ranges the [`FileAvail`] oracle has not confirmed fail, and
//! the failing window is remembered so it can be handed to the caller as
//! a download hint.

use super::byte_source::ByteSource;
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::trace;

/// Alignment of requested download windows.
const HINT_ALIGNMENT: u64 = 512;

/// Answers whether a byte range has been downloaded.
pub trait FileAvail {
    fn is_data_available(&self, offset: u64, size: u64) -> bool;
}

/// Receives ranges the caller should fetch next.
pub trait DownloadHints {
    fn add_segment(&mut self, offset: u64, size: u64);
}

/// Collects download hints in request order, dropping exact repeats.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintList {
    segments: Vec<(u64, u64)>,
}

impl HintList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requested (offset, size) windows.
    pub fn segments(&self) -> &[(u64, u64)] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    /// Removes and returns all collected windows.
    pub fn take(&mut self) -> Vec<(u64, u64)> {
        std::mem::take(&mut self.segments)
    }
}

impl DownloadHints for HintList {
    fn add_segment(&mut self, offset: u64, size: u64) {
        if size > 0 && !self.segments.contains(&(offset, size)) {
            self.segments.push((offset, size));
        }
    }
}

/// Byte source that only serves confirmed ranges.
pub struct ReadValidator {
    source: Arc<dyn ByteSource>,
    avail: Arc<dyn FileAvail>,
    padding: u64,
    missing: Mutex<Vec<(u64, u64)>>,
}

impl ReadValidator {
    /// Wraps `source`; `padding` extra bytes are requested around every
    /// missing read so small neighbouring reads share one download.
    pub fn new(source: Arc<dyn ByteSource>, avail: Arc<dyn FileAvail>, padding: u64) -> Self {
        ReadValidator {
            source,
            avail,
            padding,
            missing: Mutex::new(Vec::new()),
        }
    }

    fn missing(&self) -> MutexGuard<'_, Vec<(u64, u64)>> {
        self.missing.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Returns true if `[offset, offset + size)` (clipped to the file) is
    /// available; otherwise records it as missing.
    pub fn check_range(&self, offset: u64, size: u64) -> bool {
        let file_size = self.source.size();
        let end = offset.saturating_add(size).min(file_size);
        if offset >= end {
            return true;
        }
        if self.avail.is_data_available(offset, end - offset) {
            return true;
        }
        self.schedule(offset, end - offset);
        false
    }

    /// Checks the entire file.
    pub fn check_whole_file(&self) -> bool {
        self.check_range(0, self.source.size())
    }

    fn schedule(&self, offset: u64, size: u64) {
        let file_size = self.source.size();
        let start = offset.saturating_sub(self.padding) / HINT_ALIGNMENT * HINT_ALIGNMENT;
        let end = offset
            .saturating_add(size)
            .saturating_add(self.padding)
            .min(file_size);
        if start >= end {
            return;
        }
        trace!(offset = start, size = end - start, "range not available");
        let mut missing = self.missing();
        if !missing.contains(&(start, end - start)) {
            missing.push((start, end - start));
        }
    }

    /// Returns true if some read failed since the last [`flush`](Self::flush).
    pub fn has_read_problems(&self) -> bool {
        !self.missing().is_empty()
    }

    /// Forwards every recorded window to `hints` and clears the record.
    pub fn flush(&self, hints: &mut dyn DownloadHints) -> usize {
        let windows = std::mem::take(&mut *self.missing());
        for (offset, size) in &windows {
            hints.add_segment(*offset, *size);
        }
        windows.len()
    }

    /// Drops recorded windows without reporting them.
    pub fn clear(&self) {
        self.missing().clear();
    }
}

impl ByteSource for ReadValidator {
    fn size(&self) -> u64 {
        self.source.size()
    }

    fn read_at(&self, offset: u64, buf: &mut [u8]) -> bool {
        let size = buf.len() as u64;
        if !self.avail.is_data_available(offset, size) {
            self.schedule(offset, size);
            return false;
        }
        if !self.source.read_at(offset, buf) {
            self.schedule(offset, size);
            return false;
        }
        true
    }
}
