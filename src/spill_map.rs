//! SpillMap: the public surface. One whole-table lock around a `ChainMap`,
//! plus the threshold-triggered backup spill policy.

use core::hash::{BuildHasher, Hash};
use log::{debug, warn};
use parking_lot::Mutex;
use std::collections::hash_map::RandomState;

use crate::chain_map::{
    ChainMap, DEFAULT_INITIAL_BUCKETS, DEFAULT_LOAD_FACTOR, MAX_BUCKETS,
};
use crate::snapshot::SnapshotSink;

/// Element count at which the first backup snapshot is taken.
pub const DEFAULT_SPILL_THRESHOLD: usize = 1_000_000;
/// How much the threshold rises after each spill.
pub const DEFAULT_SPILL_INCREMENT: usize = 500_000;

struct Inner<K, V, S> {
    table: ChainMap<K, V, S>,
    spill_threshold: usize,
    spill_increment: usize,
    sink: Option<Box<dyn SnapshotSink<K, V> + Send>>,
}

impl<K, V, S> Inner<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Snapshot every live entry to the sink and raise the threshold. A
    /// failed write is logged and otherwise ignored; the in-memory table is
    /// authoritative either way, and the threshold still rises so a broken
    /// sink does not retrigger on every subsequent insert.
    fn spill(&mut self) {
        if let Some(sink) = self.sink.as_mut() {
            let entries = self.table.entries();
            let n = entries.len();
            match sink.write_snapshot(entries) {
                Ok(()) => debug!("spilled {} entries to backup sink", n),
                Err(e) => warn!("backup snapshot of {} entries failed: {}", n, e),
            }
        }
        self.spill_threshold += self.spill_increment;
    }
}

/// A thread-safe chained hash map over the key domain `Option<K>`, with a
/// reserved null-key slot and automatic backup snapshots.
///
/// Every operation acquires one whole-table mutex for its full duration, so
/// operations on a shared map are strictly serialized; resize and spill run
/// under the same acquisition as the insert that triggers them. Sink I/O is
/// synchronous, so a slow sink stalls the table for its duration.
///
/// All mutable state, including the spill threshold, is owned by the
/// instance; two maps never share policy state.
pub struct SpillMap<K, V, S = RandomState> {
    inner: Mutex<Inner<K, V, S>>,
}

impl<K, V> SpillMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// A map with default sizing and spill policy and no sink configured.
    pub fn new() -> Self {
        SpillMapBuilder::new().build()
    }

    pub fn builder() -> SpillMapBuilder<K, V, RandomState> {
        SpillMapBuilder::new()
    }
}

impl<K, V> Default for SpillMap<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SpillMap<K, V, S>
where
    K: Eq + Hash + Clone,
    V: Clone,
    S: BuildHasher,
{
    /// Insert or overwrite. Checks the spill policy first, then the load
    /// factor, then places the entry, all under one lock acquisition.
    pub fn put(&self, key: Option<K>, value: V) {
        let mut inner = self.inner.lock();
        if inner.table.len() > inner.spill_threshold {
            inner.spill();
        }
        inner.table.insert(key, value);
    }

    /// The value for `key`, if present. `None` both as argument (the null
    /// key) and as the absent result; absence is never conflated with a
    /// stored value.
    pub fn get(&self, key: Option<&K>) -> Option<V> {
        self.inner.lock().table.get(key).cloned()
    }

    /// Remove `key`'s entry. Returns whether a removal occurred; removing a
    /// missing key is not an error.
    pub fn remove(&self, key: Option<&K>) -> bool {
        self.inner.lock().table.remove(key).is_some()
    }

    pub fn contains_key(&self, key: Option<&K>) -> bool {
        self.inner.lock().table.contains_key(key)
    }

    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.inner.lock().table.contains_value(value)
    }

    pub fn len(&self) -> usize {
        self.inner.lock().table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.lock().table.is_empty()
    }

    /// Current bucket count.
    pub fn capacity(&self) -> usize {
        self.inner.lock().table.capacity()
    }

    /// The element count the next spill triggers at. Only ever rises over
    /// the map's lifetime; `clear` does not reset it.
    pub fn spill_threshold(&self) -> usize {
        self.inner.lock().spill_threshold
    }

    /// All keys, in bucket order then chain order. A fresh copy per call,
    /// never a live view.
    pub fn keys(&self) -> Vec<Option<K>> {
        self.inner.lock().table.keys()
    }

    /// All values, in the same traversal order as [`keys`](Self::keys).
    pub fn values(&self) -> Vec<V> {
        self.inner.lock().table.values()
    }

    /// All entries, in the same traversal order as [`keys`](Self::keys).
    pub fn entries(&self) -> Vec<(Option<K>, V)> {
        self.inner.lock().table.entries()
    }

    /// Empty the table and reset its bucket count. The spill threshold
    /// keeps its accumulated growth.
    pub fn clear(&self) {
        self.inner.lock().table.clear();
    }
}

/// Configures a [`SpillMap`]. All knobs default to the values the map
/// documents; `with_hasher` swaps the hasher state type.
pub struct SpillMapBuilder<K, V, S = RandomState> {
    initial_buckets: usize,
    load_factor: f64,
    max_buckets: usize,
    spill_threshold: usize,
    spill_increment: usize,
    sink: Option<Box<dyn SnapshotSink<K, V> + Send>>,
    hasher: S,
}

impl<K, V> SpillMapBuilder<K, V, RandomState> {
    pub fn new() -> Self {
        Self {
            initial_buckets: DEFAULT_INITIAL_BUCKETS,
            load_factor: DEFAULT_LOAD_FACTOR,
            max_buckets: MAX_BUCKETS,
            spill_threshold: DEFAULT_SPILL_THRESHOLD,
            spill_increment: DEFAULT_SPILL_INCREMENT,
            sink: None,
            hasher: RandomState::new(),
        }
    }
}

impl<K, V> Default for SpillMapBuilder<K, V, RandomState> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V, S> SpillMapBuilder<K, V, S> {
    /// Initial bucket count; rounded up to a power of two.
    pub fn initial_buckets(mut self, buckets: usize) -> Self {
        self.initial_buckets = buckets;
        self
    }

    /// Occupancy ratio at which the bucket array doubles. Must be > 0.
    pub fn load_factor(mut self, load_factor: f64) -> Self {
        assert!(load_factor > 0.0, "load factor must be > 0");
        self.load_factor = load_factor;
        self
    }

    /// Cap on bucket growth; past it, chains lengthen instead.
    pub fn max_buckets(mut self, max_buckets: usize) -> Self {
        self.max_buckets = max_buckets;
        self
    }

    /// Element count at which the first backup snapshot is taken.
    pub fn spill_threshold(mut self, threshold: usize) -> Self {
        self.spill_threshold = threshold;
        self
    }

    /// How much the threshold rises after each spill.
    pub fn spill_increment(mut self, increment: usize) -> Self {
        self.spill_increment = increment;
        self
    }

    /// The durable sink spills write to. Without one, crossing the
    /// threshold still raises it but writes nothing.
    pub fn sink(mut self, sink: impl SnapshotSink<K, V> + Send + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn hasher<T: BuildHasher>(self, hasher: T) -> SpillMapBuilder<K, V, T> {
        SpillMapBuilder {
            initial_buckets: self.initial_buckets,
            load_factor: self.load_factor,
            max_buckets: self.max_buckets,
            spill_threshold: self.spill_threshold,
            spill_increment: self.spill_increment,
            sink: self.sink,
            hasher,
        }
    }

    pub fn build(self) -> SpillMap<K, V, S>
    where
        K: Eq + Hash,
        S: BuildHasher,
    {
        SpillMap {
            inner: Mutex::new(Inner {
                table: ChainMap::with_config(
                    self.initial_buckets,
                    self.load_factor,
                    self.max_buckets,
                    self.hasher,
                ),
                spill_threshold: self.spill_threshold,
                spill_increment: self.spill_increment,
                sink: self.sink,
            }),
        }
    }
}
