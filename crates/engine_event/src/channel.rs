//! Append-only event storage shared by several independent readers.
//!
//! An [`EventChannel`] keeps every pushed event until all registered readers
//! have read it. Readers are not tracked individually: each record counts
//! how many times it has been read, and [`EventChannel::clear`] drops the
//! leading records whose count has reached the number of registered
//! readers.
//!
//! ## Indexing
//!
//! Events are addressed by a *logical* index: the number of events pushed
//! before it since the channel was created. Reclaiming records never
//! renumbers the survivors. [`EventChannel::sent_events`] is the index the
//! next pushed event will get.
//!
//! ## Concurrency
//!
//! [`EventChannel::get`] takes `&self` and bumps the read count atomically,
//! so readers on different threads can share the channel. Everything that
//! changes the record list or the reader count takes `&mut self`.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, trace};

use crate::error::EventError;

/// Consumer-defined filter tag attached to each event.
pub type EventMask = u32;

/// Mask given to events pushed without one. Matches every filter.
pub const DEFAULT_PUSH_MASK: EventMask = 0;

/// Filter used by readers that do not ask for one. Accepts every mask.
pub const DEFAULT_FILTER_MASK: EventMask = !0;

/// One stored event.
#[derive(Debug)]
struct Record<T> {
    event: T,
    mask: EventMask,
    reads: AtomicUsize,
}

impl<T> Record<T> {
    fn new(event: T, mask: EventMask) -> Self {
        Self {
            event,
            mask,
            reads: AtomicUsize::new(0),
        }
    }
}

/// Event buffer read independently by a fixed number of readers.
#[derive(Debug)]
pub struct EventChannel<T> {
    /// Live records, oldest first.
    records: VecDeque<Record<T>>,
    /// Number of reads a record needs before it can be reclaimed.
    reader_count: usize,
    /// Number of records reclaimed so far.
    deleted: usize,
}

impl<T> EventChannel<T> {
    /// Create an empty channel with no readers.
    #[must_use]
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create an empty channel with room for `capacity` live events.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            reader_count: 0,
            deleted: 0,
        }
    }

    /// Push an event with [`DEFAULT_PUSH_MASK`].
    pub fn push(&mut self, event: T) {
        self.push_masked(event, DEFAULT_PUSH_MASK);
    }

    /// Push an event with an explicit mask.
    pub fn push_masked(&mut self, event: T, mask: EventMask) {
        self.records.push_back(Record::new(event, mask));
    }

    fn record(&self, index: usize) -> Result<&Record<T>, EventError> {
        index
            .checked_sub(self.deleted)
            .and_then(|offset| self.records.get(offset))
            .ok_or_else(|| EventError::OutOfRange {
                index,
                first: self.deleted,
                end: self.sent_events(),
            })
    }

    /// Read the event at logical `index` along with its mask.
    ///
    /// Every call counts as one read towards reclaiming the record.
    ///
    /// # Panics
    ///
    /// Panics if the record was already reclaimed or has not been pushed.
    #[must_use]
    pub fn get(&self, index: usize) -> (&T, EventMask) {
        match self.try_get(index) {
            Ok(entry) => entry,
            Err(err) => panic!("{err}"),
        }
    }

    /// Checked form of [`EventChannel::get`].
    ///
    /// # Errors
    ///
    /// Returns [`EventError::OutOfRange`] if `index` is not live.
    pub fn try_get(&self, index: usize) -> Result<(&T, EventMask), EventError> {
        let record = self.record(index)?;
        record.reads.fetch_add(1, Ordering::AcqRel);
        Ok((&record.event, record.mask))
    }

    /// The mask of the event at logical `index`. Does not count as a read.
    ///
    /// # Panics
    ///
    /// Panics if the record was already reclaimed or has not been pushed.
    #[must_use]
    pub fn event_mask(&self, index: usize) -> EventMask {
        match self.record(index) {
            Ok(record) => record.mask,
            Err(err) => panic!("{err}"),
        }
    }

    /// Reclaim leading records that every registered reader has read.
    ///
    /// Stops at the first record that still has readers pending. Returns the
    /// number of records reclaimed.
    pub fn clear(&mut self) -> usize {
        let mut removed = 0;
        while let Some(front) = self.records.front() {
            if front.reads.load(Ordering::Acquire) < self.reader_count {
                break;
            }
            self.records.pop_front();
            removed += 1;
        }
        self.deleted += removed;
        trace!(
            removed,
            live = self.records.len(),
            deleted = self.deleted,
            "event channel swept"
        );
        removed
    }

    /// Total number of events ever pushed, live or reclaimed.
    #[must_use]
    pub fn sent_events(&self) -> usize {
        self.deleted + self.records.len()
    }

    /// Number of events reclaimed so far. The oldest live index.
    #[must_use]
    pub fn deleted_events(&self) -> usize {
        self.deleted
    }

    /// Number of live events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns `true` if no events are live.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of registered readers.
    #[must_use]
    pub fn reader_count(&self) -> usize {
        self.reader_count
    }

    /// Register one more reader.
    pub fn add_reader(&mut self) {
        self.reader_count += 1;
        debug!(readers = self.reader_count, "event reader added");
    }

    /// Deregister a reader. Does nothing if there are none.
    pub fn remove_reader(&mut self) {
        if self.reader_count > 0 {
            self.reader_count -= 1;
            debug!(readers = self.reader_count, "event reader removed");
        }
    }

    /// Register a reader that starts at the end of the channel.
    ///
    /// The new reader will never read the events already live, so they are
    /// counted as read on its behalf; otherwise they could never reach the
    /// raised reader count and would block reclamation. Returns the logical
    /// index the reader should start at.
    pub fn subscribe(&mut self) -> usize {
        for record in &self.records {
            record.reads.fetch_add(1, Ordering::AcqRel);
        }
        self.add_reader();
        self.sent_events()
    }

    /// Deregister a reader whose next unread index is `next`.
    ///
    /// Withdraws the reader's reads of live records below `next`, so that
    /// those records wait for the remaining readers only.
    pub fn unsubscribe(&mut self, next: usize) {
        let consumed = next.saturating_sub(self.deleted).min(self.records.len());
        for record in self.records.iter().take(consumed) {
            // Saturates at zero if `next` overstates what this reader read.
            let _ = record
                .reads
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |reads| {
                    reads.checked_sub(1)
                });
        }
        self.remove_reader();
    }
}

impl<T> Default for EventChannel<T> {
    fn default() -> Self {
        Self::new()
    }
}
