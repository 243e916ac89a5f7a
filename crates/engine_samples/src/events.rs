//! Event fan-out walkthrough: several systems reading one channel with
//! different filters over a few frames.

use std::fmt;

use engine_event::{EventChannel, EventMask, EventReader};
use tracing::{debug, info, trace};

use crate::config::SampleConfig;

/// Mask bit for collision events.
pub const COLLISION: EventMask = 1 << 0;
/// Mask bit for input events.
pub const INPUT: EventMask = 1 << 1;

/// Events pushed by the sample.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleEvent {
    /// Two entities touched.
    Collision { a: u32, b: u32 },
    /// A key went down.
    Input(char),
    /// End-of-frame marker, seen by everyone.
    FrameEnd(u64),
}

impl SampleEvent {
    fn mask(&self) -> EventMask {
        match self {
            Self::Collision { .. } => COLLISION,
            Self::Input(_) => INPUT,
            Self::FrameEnd(_) => 0,
        }
    }
}

impl fmt::Display for SampleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Collision { a, b } => write!(f, "collision {a}<->{b}"),
            Self::Input(key) => write!(f, "key '{key}'"),
            Self::FrameEnd(frame) => write!(f, "end of frame {frame}"),
        }
    }
}

/// Per-run totals, returned for the caller to report.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct FanOutStats {
    /// Events each reader yielded, in reader order.
    pub delivered: Vec<usize>,
    /// Events reclaimed over the run.
    pub reclaimed: usize,
    /// Events still live at the end.
    pub live: usize,
}

fn filter_for(reader: usize) -> EventMask {
    match reader % 3 {
        0 => COLLISION,
        1 => INPUT,
        _ => engine_event::DEFAULT_FILTER_MASK,
    }
}

fn frame_events(frame: u64, count: usize) -> impl Iterator<Item = SampleEvent> {
    // Colliding entities are drawn from a small fixed pool.
    (0..count).map(move |n| match n % 3 {
        0 => SampleEvent::Collision {
            a: (n % 64) as u32,
            b: (n % 64) as u32 + 1,
        },
        1 => SampleEvent::Input(char::from(b'a' + (n % 26) as u8)),
        _ => SampleEvent::FrameEnd(frame),
    })
}

/// Run `frames` frames with the configured readers and events per frame.
///
/// The last reader skips every other frame, so reclamation has to wait for
/// it.
#[must_use]
pub fn run(config: &SampleConfig, frames: u64) -> FanOutStats {
    let mut channel = EventChannel::with_capacity(config.events_per_frame);
    let mut readers: Vec<EventReader> = (0..config.readers)
        .map(|n| EventReader::register_filtered(&mut channel, filter_for(n)))
        .collect();
    let mut stats = FanOutStats {
        delivered: vec![0; config.readers],
        ..FanOutStats::default()
    };

    for frame in 0..frames {
        for event in frame_events(frame, config.events_per_frame) {
            let mask = event.mask();
            channel.push_masked(event, mask);
        }

        let last = readers.len().saturating_sub(1);
        for (n, reader) in readers.iter_mut().enumerate() {
            if n == last && frame % 2 == 1 {
                continue;
            }
            for event in reader.read(&channel) {
                trace!(reader = n, %event, "delivered");
                stats.delivered[n] += 1;
            }
        }

        let reclaimed = channel.clear();
        stats.reclaimed += reclaimed;
        debug!(frame, reclaimed, live = channel.len(), "frame done");
    }

    stats.live = channel.len();
    for reader in readers {
        reader.unregister(&mut channel);
    }
    info!(
        sent = channel.sent_events(),
        reclaimed = stats.reclaimed,
        live = stats.live,
        "event fan-out finished"
    );
    stats
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_split_the_stream() {
        let stats = run(&SampleConfig::new(3, 9, 0), 2);
        // Per frame: 3 collisions, 3 inputs, 3 broadcasts.
        // Reader 0 sees collisions and broadcasts, reader 1 inputs and
        // broadcasts, reader 2 everything but skips frame 1.
        assert_eq!(stats.delivered, vec![12, 12, 9]);
        assert_eq!(stats.reclaimed, 9);
        assert_eq!(stats.live, 9);
    }

    #[test]
    fn test_skipping_reader_catches_up() {
        // A lone reader is also the last one, so it skips frame 1 and reads
        // two frames' worth in frame 2.
        let stats = run(&SampleConfig::new(1, 4, 0), 3);
        assert_eq!(stats.delivered, vec![9]);
        assert_eq!(stats.reclaimed, 12);
        assert_eq!(stats.live, 0);
    }

    #[test]
    fn test_no_readers_reclaims_immediately() {
        let stats = run(&SampleConfig::new(0, 5, 0), 2);
        assert!(stats.delivered.is_empty());
        assert_eq!(stats.reclaimed, 10);
        assert_eq!(stats.live, 0);
    }
}
