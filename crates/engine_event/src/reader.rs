//! Per-consumer cursors over an [`EventChannel`].
//!
//! The channel itself only counts reads. An [`EventReader`] is the piece a
//! system holds on to: it remembers the next logical index to read and an
//! optional mask filter.
//!
//! A reader registered after events were pushed starts at the end of the
//! channel and never sees those earlier events.

use crate::channel::{DEFAULT_FILTER_MASK, EventChannel, EventMask};

/// Returns `true` if an event with `mask` should reach a reader filtering
/// on `filter`. Events with mask 0 are broadcast.
#[must_use]
pub fn mask_passes(mask: EventMask, filter: EventMask) -> bool {
    mask == 0 || mask & filter != 0
}

/// A registered consumer of one channel.
#[derive(Debug)]
pub struct EventReader {
    next: usize,
    filter: EventMask,
}

impl EventReader {
    /// Register a reader that accepts every event.
    pub fn register<T>(channel: &mut EventChannel<T>) -> Self {
        Self::register_filtered(channel, DEFAULT_FILTER_MASK)
    }

    /// Register a reader that only yields events whose mask passes `filter`.
    pub fn register_filtered<T>(channel: &mut EventChannel<T>, filter: EventMask) -> Self {
        Self {
            next: channel.subscribe(),
            filter,
        }
    }

    /// The next logical index this reader will read.
    #[must_use]
    pub fn next_index(&self) -> usize {
        self.next
    }

    /// The mask filter.
    #[must_use]
    pub fn filter(&self) -> EventMask {
        self.filter
    }

    /// Number of events pushed since this reader last caught up, filtered
    /// or not.
    #[must_use]
    pub fn pending<T>(&self, channel: &EventChannel<T>) -> usize {
        channel.sent_events().saturating_sub(self.next)
    }

    /// Read every event pushed since the last call.
    ///
    /// Filtered-out events are still consumed so the channel can reclaim
    /// them. Dropping the iterator early leaves the remaining events for the
    /// next call.
    pub fn read<'c, T>(&'c mut self, channel: &'c EventChannel<T>) -> Read<'c, T> {
        Read {
            end: channel.sent_events(),
            channel,
            reader: self,
        }
    }

    /// Deregister from `channel`.
    ///
    /// Events this reader already read but others have not stay in the
    /// channel until the remaining readers get to them.
    pub fn unregister<T>(self, channel: &mut EventChannel<T>) {
        channel.unsubscribe(self.next);
    }
}

/// Iterator over newly pushed events. Created by [`EventReader::read`].
#[derive(Debug)]
pub struct Read<'c, T> {
    channel: &'c EventChannel<T>,
    reader: &'c mut EventReader,
    end: usize,
}

impl<'c, T> Iterator for Read<'c, T> {
    type Item = &'c T;

    fn next(&mut self) -> Option<Self::Item> {
        while self.reader.next < self.end {
            let (event, mask) = self.channel.get(self.reader.next);
            self.reader.next += 1;
            if mask_passes(mask, self.reader.filter) {
                return Some(event);
            }
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, Some(self.end - self.reader.next))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DAMAGE: EventMask = 0b01;
    const HEAL: EventMask = 0b10;

    #[test]
    fn test_mask_passes() {
        assert!(mask_passes(0, 0));
        assert!(mask_passes(DAMAGE, DEFAULT_FILTER_MASK));
        assert!(mask_passes(DAMAGE | HEAL, HEAL));
        assert!(!mask_passes(DAMAGE, HEAL));
    }

    #[test]
    fn test_readers_progress_independently() {
        let mut channel = EventChannel::new();
        let mut a = EventReader::register(&mut channel);
        let mut b = EventReader::register(&mut channel);

        channel.push(1);
        channel.push(2);
        assert_eq!(a.read(&channel).copied().collect::<Vec<_>>(), vec![1, 2]);

        channel.push(3);
        assert_eq!(a.read(&channel).copied().collect::<Vec<_>>(), vec![3]);
        assert_eq!(b.read(&channel).copied().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(channel.clear(), 3);
    }

    #[test]
    fn test_filtered_events_are_still_consumed() {
        let mut channel = EventChannel::new();
        let mut healer = EventReader::register_filtered(&mut channel, HEAL);

        channel.push_masked("hit", DAMAGE);
        channel.push_masked("potion", HEAL);
        channel.push("tick");

        let seen: Vec<_> = healer.read(&channel).copied().collect();
        assert_eq!(seen, vec!["potion", "tick"]);
        assert_eq!(healer.pending(&channel), 0);
        assert_eq!(channel.clear(), 3);
    }

    #[test]
    fn test_late_reader_starts_at_end() {
        let mut channel = EventChannel::new();
        let mut early = EventReader::register(&mut channel);
        channel.push('a');

        let mut late = EventReader::register(&mut channel);
        assert_eq!(late.next_index(), 1);
        assert_eq!(late.read(&channel).count(), 0);

        channel.push('b');
        assert_eq!(late.read(&channel).copied().collect::<Vec<_>>(), vec!['b']);
        assert_eq!(early.read(&channel).copied().collect::<Vec<_>>(), vec!['a', 'b']);
        assert_eq!(channel.clear(), 2);
    }

    #[test]
    fn test_partial_read_resumes() {
        let mut channel = EventChannel::new();
        let mut reader = EventReader::register(&mut channel);
        for n in 0..4 {
            channel.push(n);
        }
        assert_eq!(reader.read(&channel).take(2).count(), 2);
        assert_eq!(reader.pending(&channel), 2);
        assert_eq!(reader.read(&channel).copied().collect::<Vec<_>>(), vec![2, 3]);
    }

    #[test]
    fn test_unregister_lets_channel_drain() {
        let mut channel = EventChannel::new();
        let mut stays = EventReader::register(&mut channel);
        let leaves = EventReader::register(&mut channel);
        channel.push(10);
        channel.push(20);

        let _ = stays.read(&channel).count();
        assert_eq!(channel.clear(), 0);

        leaves.unregister(&mut channel);
        assert_eq!(channel.reader_count(), 1);
        assert_eq!(channel.clear(), 2);
    }
}
