//! Rolling sample window for the risk detector
//!
//! A fixed-capacity chronological ring of `(timestamp, value)` samples
//! covering the most recent `max_age_ms` milliseconds for one sensor.
//! Entries older than the window age are evicted lazily on each insert;
//! when the ring is full the oldest entry is overwritten, so recent data
//! always wins. Capacity is a compile-time constant - the window never
//! allocates after construction.
//!
//! Not persisted: on restart the window starts empty and the detector
//! reports no risk until it refills.

use crate::time::Timestamp;

/// One `(timestamp, value)` pair in a window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Observation time, milliseconds since epoch
    pub timestamp: Timestamp,
    /// Observed value
    pub value: f64,
}

/// Time-bounded ring of chronologically ordered samples
#[derive(Debug, Clone)]
pub struct RollingWindow<const N: usize> {
    slots: [Option<Sample>; N],
    /// Index of the oldest sample
    head: usize,
    len: usize,
    max_age_ms: u64,
}

impl<const N: usize> RollingWindow<N> {
    /// Create an empty window covering the most recent `max_age_ms`
    pub fn new(max_age_ms: u64) -> Self {
        Self {
            slots: [None; N],
            head: 0,
            len: 0,
            max_age_ms,
        }
    }

    /// Number of samples currently held
    pub fn len(&self) -> usize {
        self.len
    }

    /// True if no samples are held
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Most recent sample, if any
    pub fn last(&self) -> Option<&Sample> {
        if self.len == 0 {
            return None;
        }
        self.slots[(self.head + self.len - 1) % N].as_ref()
    }

    /// Oldest sample, if any
    pub fn first(&self) -> Option<&Sample> {
        if self.len == 0 {
            return None;
        }
        self.slots[self.head].as_ref()
    }

    /// Insert a sample, evicting entries older than the window age
    ///
    /// A sample identical to the most recent one (same timestamp, same
    /// value) is ignored: repeated polling of an unchanged reading must not
    /// inflate the window. Returns whether the sample was inserted.
    pub fn push(&mut self, sample: Sample) -> bool {
        if let Some(last) = self.last() {
            if last.timestamp == sample.timestamp && last.value == sample.value {
                return false;
            }
        }

        self.evict_older_than(sample.timestamp.saturating_sub(self.max_age_ms));

        let slot = (self.head + self.len) % N;
        self.slots[slot] = Some(sample);
        if self.len == N {
            // Full: the write above replaced the oldest entry
            self.head = (self.head + 1) % N;
        } else {
            self.len += 1;
        }
        true
    }

    /// Iterate samples oldest to newest
    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        (0..self.len).filter_map(move |i| self.slots[(self.head + i) % N].as_ref())
    }

    fn evict_older_than(&mut self, cutoff: Timestamp) {
        while let Some(first) = self.first() {
            if first.timestamp >= cutoff {
                break;
            }
            self.slots[self.head] = None;
            self.head = (self.head + 1) % N;
            self.len -= 1;
        }
    }
}
