//! spill-hashmap: a chained hash map with a reserved null-key slot and
//! threshold-triggered backup snapshots.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: build SpillMap in small, separately testable layers so each
//!   piece carries one precise contract.
//! - Layers:
//!   - ChainMap<K, V, S>: unsynchronized chained-bucket engine. Buckets are
//!     chain heads into a slot map; nodes link to their successor by slot
//!     key, so resize relinks entries without moving or recreating them.
//!     Owns routing, the null-key slot, doubling, and traversal.
//!   - snapshot: the SnapshotSink trait plus the stock FileSink (bincode)
//!     and MemorySink (in-memory, for tests and tooling). The table owns no
//!     knowledge of the on-disk encoding.
//!   - SpillMap<K, V, S>: public API. One whole-table mutex around a
//!     ChainMap plus the spill policy; every operation locks for its full
//!     duration and clones results out.
//!
//! Key domain
//! - Keys are `Option<K>`. `None` is the reserved null key: it is stored at
//!   most once, always in bucket 0's chain, where it coexists with ordinary
//!   keys whose hashes mask to 0. `get` returns `Option<V>`, so absence is
//!   never conflated with a stored value.
//!
//! Sizing policy
//! - The bucket count is a power of two (routing is `hash & (n - 1)`), and
//!   doubles when `len` reaches `load_factor * buckets`, up to a cap past
//!   which chains simply lengthen. `clear` resets the bucket count.
//!
//! Spill policy
//! - When an insert finds `len` above the spill threshold, the table hands
//!   its sink one flattened snapshot of every live entry, then raises the
//!   threshold by a fixed increment. Spilling is backup, not eviction: a
//!   failed write is logged and the insert proceeds; the in-memory table is
//!   authoritative. The threshold only ever rises, and is never shared
//!   between map instances.
//!
//! Concurrency
//! - Strictly serialized: one mutex, held end to end per operation, resize
//!   and spill included. Sink I/O is synchronous under the lock, so a slow
//!   sink stalls the table.
//!
//! Notes and non-goals
//! - No per-bucket or lock-free concurrency.
//! - No rehashing strategy other than capacity doubling.
//! - Listings (`keys`/`values`/`entries`) are detached copies, not live
//!   views; there is no streaming iterator on the public surface.
//! - Routing applies no extra bit mixing; keys whose hashes share low bits
//!   cluster in one bucket. Accepted, not a defect.

pub mod chain_map;
pub mod snapshot;
mod spill_map;
mod spill_map_proptest;

// Public surface
pub use chain_map::{ChainMap, DEFAULT_INITIAL_BUCKETS, DEFAULT_LOAD_FACTOR, MAX_BUCKETS};
pub use snapshot::{FileSink, MemorySink, SnapshotError, SnapshotSink};
pub use spill_map::{SpillMap, SpillMapBuilder, DEFAULT_SPILL_INCREMENT, DEFAULT_SPILL_THRESHOLD};
