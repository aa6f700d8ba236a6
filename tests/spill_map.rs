// SpillMap public-surface test suite.
//
// Each test documents what behavior is being verified and which
// invariants are assumed or asserted. The core invariants exercised:
// - Last-write-wins: get(k) returns the most recent put(k, v), including
//   for the reserved null key (None).
// - Counting: duplicate puts never grow len; new keys grow it by one;
//   remove shrinks it by one exactly when the key was present.
// - Sizing: capacity doubles at the load factor and every key survives.
// - Spilling: crossing the threshold hands the sink a full snapshot; a
//   failing sink never disturbs the in-memory table; the threshold only
//   rises.
// - Serialization: concurrent puts through the whole-table lock all land.

use spill_hashmap::{MemorySink, SnapshotError, SnapshotSink, SpillMap};
use std::sync::Arc;
use std::thread;

// Test: last-write-wins for ordinary keys and the null key.
// Assumes: get returns a clone of the stored value, None when absent.
#[test]
fn put_get_last_write_wins() {
    let m: SpillMap<String, String> = SpillMap::new();
    m.put(Some("k".to_string()), "v1".to_string());
    m.put(Some("k".to_string()), "v2".to_string());
    assert_eq!(m.get(Some(&"k".to_string())), Some("v2".to_string()));

    m.put(None, "a".to_string());
    m.put(None, "b".to_string());
    assert_eq!(m.get(None), Some("b".to_string()));
    assert_eq!(m.len(), 2, "null entry counted exactly once");
}

// Test: size accounting across duplicate puts and removals.
#[test]
fn size_accounting() {
    let m: SpillMap<u32, u32> = SpillMap::new();
    assert!(m.is_empty());

    m.put(Some(1), 10);
    assert_eq!(m.len(), 1);
    m.put(Some(1), 11);
    assert_eq!(m.len(), 1, "duplicate put must not grow len");
    m.put(Some(2), 20);
    assert_eq!(m.len(), 2);

    assert!(m.remove(Some(&1)));
    assert_eq!(m.len(), 1);
    assert_eq!(m.get(Some(&1)), None);
    assert!(!m.remove(Some(&1)), "missing key reports false, no error");
    assert_eq!(m.len(), 1);
}

// Test: the documented default-config growth example. With 16 buckets and
// load factor 0.75, the 13th distinct put doubles capacity to 32, and all
// 20 keys remain retrievable with their last-set values.
#[test]
fn default_config_growth_example() {
    let m: SpillMap<u32, u32> = SpillMap::new();
    assert_eq!(m.capacity(), 16);
    for i in 1..=20 {
        m.put(Some(i), i + 100);
    }
    assert_eq!(m.capacity(), 32);
    assert_eq!(m.len(), 20);
    for i in 1..=20 {
        assert_eq!(m.get(Some(&i)), Some(i + 100));
    }
}

// Test: crossing the spill threshold snapshots every live entry, in one
// atomic hand-off, without evicting anything from memory.
#[test]
fn spill_snapshots_all_entries() {
    let sink: MemorySink<u32, u32> = MemorySink::new();
    let m: SpillMap<u32, u32> = SpillMap::builder()
        .spill_threshold(10)
        .spill_increment(100)
        .sink(sink.clone())
        .build();

    for i in 0..11 {
        m.put(Some(i), i * 2);
    }
    m.put(None, 0);
    assert_eq!(sink.snapshot_count(), 1);

    let snap = &sink.snapshots()[0];
    assert_eq!(snap.len(), 11, "snapshot covers every entry live at spill time");
    let mut keys: Vec<u32> = snap.iter().map(|(k, _)| k.unwrap()).collect();
    keys.sort_unstable();
    assert_eq!(keys, (0..11).collect::<Vec<_>>());

    // Spilling is backup, not eviction.
    assert_eq!(m.len(), 12);
    for i in 0..11 {
        assert_eq!(m.get(Some(&i)), Some(i * 2));
    }
    assert_eq!(m.spill_threshold(), 110);
}

// A sink that always fails, to prove spill failures are absorbed.
struct FailingSink;

impl SnapshotSink<u32, u32> for FailingSink {
    fn write_snapshot(&mut self, _entries: Vec<(Option<u32>, u32)>) -> Result<(), SnapshotError> {
        Err(SnapshotError::Io(std::io::Error::other("sink offline")))
    }
}

// Test: a failing sink neither aborts the triggering put nor rolls back
// anything; the threshold still rises so the failure is not retried on
// every subsequent put.
#[test]
fn failing_sink_leaves_table_intact() {
    let m: SpillMap<u32, u32> = SpillMap::builder()
        .spill_threshold(5)
        .spill_increment(50)
        .sink(FailingSink)
        .build();

    for i in 0..8 {
        m.put(Some(i), i);
    }
    assert_eq!(m.len(), 8);
    for i in 0..8 {
        assert_eq!(m.get(Some(&i)), Some(i));
    }
    assert_eq!(m.spill_threshold(), 55);
}

// Test: clear() leaves every previously present key absent, resets len
// and capacity, and keeps the threshold's accumulated growth.
#[test]
fn clear_then_lookups_absent() {
    let m: SpillMap<u32, u32> = SpillMap::builder()
        .spill_threshold(4)
        .spill_increment(40)
        .build();
    m.put(None, 0);
    for i in 1..=30 {
        m.put(Some(i), i);
    }
    let raised = m.spill_threshold();
    assert_eq!(raised, 44);

    m.clear();
    assert_eq!(m.len(), 0);
    assert_eq!(m.get(None), None);
    for i in 1..=30 {
        assert_eq!(m.get(Some(&i)), None);
    }
    assert_eq!(m.spill_threshold(), raised, "clear never lowers the threshold");
}

// Test: contains_key/contains_value on the public surface.
#[test]
fn membership_queries() {
    let m: SpillMap<String, u32> = SpillMap::new();
    m.put(Some("a".to_string()), 1);
    m.put(None, 2);

    assert!(m.contains_key(Some(&"a".to_string())));
    assert!(m.contains_key(None));
    assert!(!m.contains_key(Some(&"b".to_string())));
    assert!(m.contains_value(&2));
    assert!(!m.contains_value(&3));
}

// Test: keys/values/entries agree with each other and include the null
// key as None.
#[test]
fn listing_agreement() {
    let m: SpillMap<u32, u32> = SpillMap::new();
    for i in 0..10 {
        m.put(Some(i), i + 1);
    }
    m.put(None, 0);

    let keys = m.keys();
    let values = m.values();
    let entries = m.entries();
    assert_eq!(keys.len(), 11);
    assert!(keys.contains(&None));
    for ((k, v), (lk, lv)) in entries.iter().zip(keys.iter().zip(values.iter())) {
        assert_eq!(k, lk);
        assert_eq!(v, lv);
    }
    for (k, v) in &entries {
        match k {
            None => assert_eq!(*v, 0),
            Some(k) => assert_eq!(*v, k + 1),
        }
    }
}

// Test: puts from many threads serialize through the single lock; every
// entry lands and len is exact. Resizes happen mid-flight.
#[test]
fn concurrent_puts_all_land() {
    let m: Arc<SpillMap<u32, u32>> = Arc::new(SpillMap::new());
    let threads = 8;
    let per_thread = 500;

    let handles: Vec<_> = (0..threads)
        .map(|t| {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                for i in 0..per_thread {
                    let k = t * per_thread + i;
                    m.put(Some(k), k);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(m.len(), (threads * per_thread) as usize);
    for k in 0..threads * per_thread {
        assert_eq!(m.get(Some(&k)), Some(k));
    }
}

// Test: spilling under concurrency takes coherent snapshots; each
// snapshot's size is exactly the live count at its trigger point, which
// only the serialized writer can guarantee.
#[test]
fn concurrent_spills_are_coherent() {
    let sink: MemorySink<u32, u32> = MemorySink::new();
    let m: Arc<SpillMap<u32, u32>> = Arc::new(
        SpillMap::builder()
            .spill_threshold(100)
            .spill_increment(100)
            .sink(sink.clone())
            .build(),
    );

    let handles: Vec<_> = (0..4u32)
        .map(|t| {
            let m = Arc::clone(&m);
            thread::spawn(move || {
                for i in 0..250 {
                    let k = t * 250 + i;
                    m.put(Some(k), k);
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(m.len(), 1000);
    let snaps = sink.snapshots();
    assert!(!snaps.is_empty());
    for snap in &snaps {
        // A torn snapshot would contain duplicate keys.
        let mut keys: Vec<u32> = snap.iter().map(|(k, _)| k.unwrap()).collect();
        keys.sort_unstable();
        keys.dedup();
        assert_eq!(keys.len(), snap.len(), "snapshot must not contain duplicates");
    }
}
