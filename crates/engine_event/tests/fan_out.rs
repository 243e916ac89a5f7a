//! Several systems consuming one event stream over multiple frames.

use engine_event::{EventChannel, EventMask, EventReader};

const COLLISION: EventMask = 1 << 0;
const INPUT: EventMask = 1 << 1;

#[derive(Debug, Clone, PartialEq)]
enum GameEvent {
    Collided(u32, u32),
    KeyPressed(char),
    FrameEnd(u64),
}

#[test]
fn test_each_system_sees_its_slice_of_every_frame() {
    let mut channel = EventChannel::new();
    let mut physics = EventReader::register_filtered(&mut channel, COLLISION);
    let mut controls = EventReader::register_filtered(&mut channel, INPUT);
    let mut logger = EventReader::register(&mut channel);

    let mut physics_seen = Vec::new();
    let mut controls_seen = Vec::new();
    let mut logged = 0;

    for frame in 0..3u64 {
        channel.push_masked(GameEvent::Collided(1, 2), COLLISION);
        channel.push_masked(GameEvent::KeyPressed('w'), INPUT);
        channel.push(GameEvent::FrameEnd(frame));

        physics_seen.extend(physics.read(&channel).cloned());
        controls_seen.extend(controls.read(&channel).cloned());
        logged += logger.read(&channel).count();

        // Everyone caught up, so each frame drains completely.
        assert_eq!(channel.clear(), 3);
        assert!(channel.is_empty());
    }

    assert_eq!(logged, 9);
    assert_eq!(physics_seen.len(), 6);
    assert!(physics_seen
        .iter()
        .all(|e| !matches!(e, GameEvent::KeyPressed(_))));
    assert_eq!(
        controls_seen
            .iter()
            .filter(|e| matches!(e, GameEvent::KeyPressed('w')))
            .count(),
        3
    );
    assert_eq!(channel.sent_events(), 9);
    assert_eq!(channel.deleted_events(), 9);
}

#[test]
fn test_slow_reader_holds_back_reclamation() {
    let mut channel = EventChannel::new();
    let mut fast = EventReader::register(&mut channel);
    let mut slow = EventReader::register(&mut channel);

    for n in 0..10 {
        channel.push(n);
        let _ = fast.read(&channel).count();
        assert_eq!(channel.clear(), 0);
    }
    assert_eq!(channel.len(), 10);

    let first_half: Vec<i32> = slow.read(&channel).take(5).copied().collect();
    assert_eq!(first_half, vec![0, 1, 2, 3, 4]);
    assert_eq!(channel.clear(), 5);
    assert_eq!(channel.deleted_events(), 5);

    let rest: Vec<i32> = slow.read(&channel).copied().collect();
    assert_eq!(rest, vec![5, 6, 7, 8, 9]);
    assert_eq!(channel.clear(), 5);
}

#[test]
fn test_reader_leaving_mid_stream() {
    let mut channel = EventChannel::new();
    let mut stays = EventReader::register(&mut channel);
    let mut leaves = EventReader::register(&mut channel);

    channel.push("a");
    channel.push("b");
    channel.push("c");
    let _ = leaves.read(&channel).take(2).count();
    leaves.unregister(&mut channel);

    assert_eq!(channel.reader_count(), 1);
    assert_eq!(channel.clear(), 0);

    let _ = stays.read(&channel).count();
    assert_eq!(channel.clear(), 3);
}

#[test]
fn test_readers_on_threads() {
    let mut channel = EventChannel::new();
    let mut readers: Vec<EventReader> = (0..4).map(|_| EventReader::register(&mut channel)).collect();
    for n in 0..100u32 {
        channel.push(n);
    }

    let totals: Vec<u32> = std::thread::scope(|scope| {
        let channel = &channel;
        let handles: Vec<_> = readers
            .iter_mut()
            .map(|reader| scope.spawn(move || reader.read(channel).sum::<u32>()))
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(totals, vec![4950; 4]);
    assert_eq!(channel.clear(), 100);
}
