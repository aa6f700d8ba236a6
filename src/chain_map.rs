//! ChainMap: unsynchronized chained-bucket engine with a null-key slot.
//!
//! Buckets are chain heads into a slot map; nodes link to their chain
//! successor by slot key. The `None` key is routed to bucket 0 and shares
//! that chain with ordinary keys whose hash masks to 0.

use core::hash::{BuildHasher, Hash};
use slotmap::{DefaultKey, SlotMap};
use std::collections::hash_map::RandomState;

/// Default number of buckets for a fresh map.
pub const DEFAULT_INITIAL_BUCKETS: usize = 16;
/// Default occupancy ratio at which the bucket array doubles.
pub const DEFAULT_LOAD_FACTOR: f64 = 0.75;
/// Bucket count never grows past this; chains grow instead.
pub const MAX_BUCKETS: usize = 1 << 30;

#[derive(Debug)]
struct Node<K, V> {
    key: Option<K>,
    value: V,
    next: Option<DefaultKey>,
}

/// A separate-chaining hash map over the key domain `Option<K>`.
///
/// `None` is the reserved null key: it always lives in bucket 0's chain,
/// alongside any `Some` keys that happen to mask to 0. The bucket count is
/// kept a power of two so routing is a plain mask over the key's hash.
///
/// This layer is not synchronized; [`SpillMap`](crate::SpillMap) wraps it
/// behind a whole-table lock and adds the backup spill policy.
pub struct ChainMap<K, V, S = RandomState> {
    buckets: Vec<Option<DefaultKey>>,
    nodes: SlotMap<DefaultKey, Node<K, V>>,
    len: usize,
    initial_buckets: usize,
    max_buckets: usize,
    load_factor: f64,
    hasher: S,
}

impl<K, V> ChainMap<K, V>
where
    K: Eq + Hash,
{
    pub fn new() -> Self {
        Self::with_config(
            DEFAULT_INITIAL_BUCKETS,
            DEFAULT_LOAD_FACTOR,
            MAX_BUCKETS,
            Default::default(),
        )
    }
}

impl<K, V> Default for ChainMap<K, V>
where
    K: Eq + Hash,
{
    fn default() -> Self {
        Self::new()
    }
}

/// Iterator over entries in bucket order, then chain order.
pub struct Iter<'a, K, V> {
    buckets: &'a [Option<DefaultKey>],
    nodes: &'a SlotMap<DefaultKey, Node<K, V>>,
    next_bucket: usize,
    cursor: Option<DefaultKey>,
}

impl<'a, K, V> Iterator for Iter<'a, K, V> {
    type Item = (Option<&'a K>, &'a V);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(k) = self.cursor {
                let node = &self.nodes[k];
                self.cursor = node.next;
                return Some((node.key.as_ref(), &node.value));
            }
            if self.next_bucket >= self.buckets.len() {
                return None;
            }
            self.cursor = self.buckets[self.next_bucket];
            self.next_bucket += 1;
        }
    }
}

impl<K, V, S> ChainMap<K, V, S>
where
    K: Eq + Hash,
    S: BuildHasher,
{
    /// Create a map with explicit sizing knobs. `initial_buckets` is rounded
    /// up to a power of two and clamped to `max_buckets`.
    pub fn with_config(
        initial_buckets: usize,
        load_factor: f64,
        max_buckets: usize,
        hasher: S,
    ) -> Self {
        assert!(load_factor > 0.0, "load factor must be > 0");
        let max_buckets = max_buckets.max(1).next_power_of_two();
        let initial_buckets = initial_buckets
            .max(1)
            .next_power_of_two()
            .min(max_buckets);
        Self {
            buckets: vec![None; initial_buckets],
            nodes: SlotMap::with_key(),
            len: 0,
            initial_buckets,
            max_buckets,
            load_factor,
            hasher,
        }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Current bucket count.
    pub fn capacity(&self) -> usize {
        self.buckets.len()
    }

    /// Bucket index for a key: 0 for the null key, otherwise the key's hash
    /// masked against the bucket count. No extra bit mixing; keys whose
    /// hashes share low bits land in the same bucket.
    fn route(&self, key: Option<&K>) -> usize {
        match key {
            None => 0,
            Some(k) => (self.hasher.hash_one(k) as usize) & (self.buckets.len() - 1),
        }
    }

    /// Insert or overwrite. Grows the bucket array first when the load
    /// factor is reached.
    pub fn insert(&mut self, key: Option<K>, value: V) {
        if self.len as f64 >= self.load_factor * self.buckets.len() as f64 {
            self.grow();
        }
        match key {
            None => self.insert_null(value),
            Some(k) => self.insert_keyed(k, value),
        }
    }

    /// The null key has at most one node, always in bucket 0's chain. A
    /// repeat insert overwrites that node's value in place.
    fn insert_null(&mut self, value: V) {
        let mut cursor = self.buckets[0];
        while let Some(k) = cursor {
            if self.nodes[k].key.is_none() {
                self.nodes[k].value = value;
                return;
            }
            cursor = self.nodes[k].next;
        }
        self.push_tail(0, None, value);
        self.len += 1;
    }

    fn insert_keyed(&mut self, key: K, value: V) {
        let idx = self.route(Some(&key));
        let Some(head) = self.buckets[idx] else {
            let node = self.nodes.insert(Node {
                key: Some(key),
                value,
                next: None,
            });
            self.buckets[idx] = Some(node);
            self.len += 1;
            return;
        };

        let mut prev: Option<DefaultKey> = None;
        let mut cursor = head;
        loop {
            if self.nodes[cursor].key.as_ref() == Some(&key) {
                // Overwrite as node replacement: a fresh node takes the
                // matched node's chain position, the rest of the chain
                // follows it, and the old slot is freed.
                let next = self.nodes[cursor].next;
                let node = self.nodes.insert(Node {
                    key: Some(key),
                    value,
                    next,
                });
                match prev {
                    None => self.buckets[idx] = Some(node),
                    Some(p) => self.nodes[p].next = Some(node),
                }
                let _ = self.nodes.remove(cursor);
                return;
            }
            match self.nodes[cursor].next {
                Some(n) => {
                    prev = Some(cursor);
                    cursor = n;
                }
                None => break,
            }
        }
        // No match; cursor is the chain tail.
        let node = self.nodes.insert(Node {
            key: Some(key),
            value,
            next: None,
        });
        self.nodes[cursor].next = Some(node);
        self.len += 1;
    }

    /// Append a fresh node at the tail of a bucket's chain.
    fn push_tail(&mut self, idx: usize, key: Option<K>, value: V) {
        let node = self.nodes.insert(Node {
            key,
            value,
            next: None,
        });
        match self.buckets[idx] {
            None => self.buckets[idx] = Some(node),
            Some(head) => {
                let mut tail = head;
                while let Some(n) = self.nodes[tail].next {
                    tail = n;
                }
                self.nodes[tail].next = Some(node);
            }
        }
    }

    /// Double the bucket array, capped at `max_buckets`. Past the cap the
    /// map stops growing and chains lengthen instead.
    fn grow(&mut self) {
        if self.buckets.len() >= self.max_buckets {
            return;
        }
        let new_count = (self.buckets.len() * 2).min(self.max_buckets);
        log::debug!(
            "resizing bucket array {} -> {} at len {}",
            self.buckets.len(),
            new_count,
            self.len
        );
        self.rehash_into(new_count);
    }

    /// Relink every node into a fresh bucket array of `new_count` heads.
    /// Nodes keep their slots (identity is preserved); old chains are walked
    /// in bucket order and each node is appended at the tail of its new
    /// chain, after any node relinked there earlier.
    fn rehash_into(&mut self, new_count: usize) {
        let old = std::mem::replace(&mut self.buckets, vec![None; new_count]);
        let mut tails: Vec<Option<DefaultKey>> = vec![None; new_count];
        for head in old {
            let mut cursor = head;
            while let Some(k) = cursor {
                cursor = self.nodes[k].next;
                self.nodes[k].next = None;
                let idx = self.route(self.nodes[k].key.as_ref());
                match tails[idx] {
                    None => self.buckets[idx] = Some(k),
                    Some(t) => self.nodes[t].next = Some(k),
                }
                tails[idx] = Some(k);
            }
        }
    }

    pub fn get(&self, key: Option<&K>) -> Option<&V> {
        let mut cursor = self.buckets[self.route(key)];
        while let Some(k) = cursor {
            let node = &self.nodes[k];
            if node.key.as_ref() == key {
                return Some(&node.value);
            }
            cursor = node.next;
        }
        None
    }

    pub fn get_mut(&mut self, key: Option<&K>) -> Option<&mut V> {
        let mut cursor = self.buckets[self.route(key)];
        while let Some(k) = cursor {
            if self.nodes[k].key.as_ref() == key {
                return Some(&mut self.nodes[k].value);
            }
            cursor = self.nodes[k].next;
        }
        None
    }

    pub fn contains_key(&self, key: Option<&K>) -> bool {
        self.get(key).is_some()
    }

    /// Linear scan across all chains; returns on the first equal value.
    pub fn contains_value(&self, value: &V) -> bool
    where
        V: PartialEq,
    {
        self.iter().any(|(_, v)| v == value)
    }

    /// Unlink the first node with an equal key and return its value.
    pub fn remove(&mut self, key: Option<&K>) -> Option<V> {
        let idx = self.route(key);
        let mut prev: Option<DefaultKey> = None;
        let mut cursor = self.buckets[idx];
        while let Some(k) = cursor {
            if self.nodes[k].key.as_ref() == key {
                let next = self.nodes[k].next;
                match prev {
                    None => self.buckets[idx] = next,
                    Some(p) => self.nodes[p].next = next,
                }
                self.len -= 1;
                return self.nodes.remove(k).map(|n| n.value);
            }
            prev = Some(k);
            cursor = self.nodes[k].next;
        }
        None
    }

    /// Empty all buckets and reset the bucket count to its initial value.
    pub fn clear(&mut self) {
        self.nodes.clear();
        self.buckets = vec![None; self.initial_buckets];
        self.len = 0;
    }

    /// Borrowing traversal in bucket order, then chain order.
    pub fn iter(&self) -> Iter<'_, K, V> {
        Iter {
            buckets: &self.buckets,
            nodes: &self.nodes,
            next_bucket: 0,
            cursor: None,
        }
    }

    /// Flattened owned snapshot of all live entries, in traversal order.
    pub fn entries(&self) -> Vec<(Option<K>, V)>
    where
        K: Clone,
        V: Clone,
    {
        self.iter()
            .map(|(k, v)| (k.cloned(), v.clone()))
            .collect()
    }

    pub fn keys(&self) -> Vec<Option<K>>
    where
        K: Clone,
    {
        self.iter().map(|(k, _)| k.cloned()).collect()
    }

    pub fn values(&self) -> Vec<V>
    where
        V: Clone,
    {
        self.iter().map(|(_, v)| v.clone()).collect()
    }
}
