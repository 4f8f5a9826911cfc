//! run-hashmap: a single-threaded hash map and set whose buckets are
//! contiguous runs of one shared entry list.
//!
//! Internal Design:
//!
//! Summary
//! - Goal: fuse array-indexed hashing with linked-list chaining in safe,
//!   verifiable layers, so the cross-structure contiguity invariant can be
//!   reasoned about (and machine-checked) per layer.
//! - Layers:
//!   - LinkedArena<T>: slotmap arena of entries threaded into one doubly
//!     linked list; stable generational keys instead of node pointers, so
//!     stale references miss instead of dangling.
//!   - Directory: contiguous array of bucket descriptors; each names the
//!     boundary pair of its bucket's run in the list, or nothing at all.
//!   - RunTable<T>: the engine. All mutation happens at a run's recorded
//!     edge: a new bucket starts its run at the list tail, a collision
//!     extends the run after its last entry, and erase/extract move at most
//!     one boundary. No operation ever touches another bucket's entries.
//!   - RunHashMap / RunHashSet: facades supplying the hasher and the key
//!     extraction policy (pair-first vs identity); everything else
//!     forwards.
//!
//! Constraints
//! - Single-threaded, synchronous; callers serialize external access.
//! - One shared list holds every entry, so full iteration is pointer-chasing
//!   in list order and a bucket's collision cost is bounded by its own run
//!   length.
//! - Bucket descriptors are non-owning; the arena exclusively owns entry
//!   storage.
//! - Duplicate keys are rejected without mutation, like the C++ unique-key
//!   containers this mirrors; positions returned on insert stay valid until
//!   that entry is erased or extracted (rehashing relinks, never moves).
//!
//! Hasher and rehashing invariants
//! - Each entry stores a precomputed `u64` hash, computed once by the
//!   facade when the entry enters the table. Every later bucket computation
//!   (erase, extract, rehash, introspection for live entries) uses the
//!   stored hash; user hashing code is never invoked after insertion.
//! - Key equality runs only during the bounded pre-mutation probe of one
//!   bucket's run. The engine performs no user calls while its structure is
//!   transiently inconsistent, so a panicking hasher or equality predicate
//!   cannot corrupt the table.
//!
//! Growth and rehash
//! - An insert that would breach `max_load_factor` rebuilds the directory
//!   first (doubling by default; the policy is configurable). Rebuilds
//!   allocate up front and then relink entries in pre-rehash list order, so
//!   intra-bucket order is preserved and an allocation failure leaves the
//!   old table intact.
//! - `rehash(n)` rejects an `n` that cannot hold the current entries within
//!   the load factor; the table is unchanged on rejection.
//!
//! Debug validation
//! - In debug builds, every mutating engine call re-checks the full
//!   directory/list agreement (contiguity, membership, accounting, empty
//!   markers). Release builds compile the check away.
//!
//! Notes and non-goals
//! - No thread safety, persistence, or custom allocation.
//! - No transactional rollback around user callbacks; instead, callbacks
//!   simply never run at a point where the structure is inconsistent.
//! - Mutable iteration visits arena storage order; `for_each_mut` is the
//!   list-order alternative. Immutable iteration always follows list order.

pub mod map;
pub mod set;
pub mod table;

mod bucket;
mod list;
mod table_proptest;

// Public surface
pub use map::RunHashMap;
pub use set::RunHashSet;
pub use table::{GrowthPolicy, HandleInsert, NodeHandle, Pos, RehashError, RunTable};
