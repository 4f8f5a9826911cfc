//! RunTable: the hash table engine.
//!
//! One shared list of entries (the arena in `list`), one directory of run
//! descriptors (`bucket`), and the orchestration that keeps them agreed:
//! every non-empty bucket's entries form one contiguous run of the list,
//! and all mutation happens at a run's recorded edge, so collision cost is
//! proportional to that bucket's run length and no other bucket is ever
//! touched.
//!
//! The engine is generic over the stored value `T` and never hashes
//! anything itself: callers pass a precomputed 64-bit hash per operation
//! plus an equality closure for the bounded run scan. Each entry caches its
//! hash on entry, so erase, extract, rehash, and teardown run no user code
//! at all, and equality only ever runs during the pre-mutation probe. A
//! panicking hasher or equality therefore cannot leave the structure
//! inconsistent.
//!
//! In debug builds an invariant validator re-checks the directory/list
//! agreement after every mutating call; release builds compile it out.

use crate::bucket::{Directory, Run};
use crate::list::{LinkedArena, Node};
use core::fmt;
use slotmap::DefaultKey;

/// Bucket count seeded on first insert into a table created without one.
const DEFAULT_BUCKETS: usize = 8;

/// Stable position of an entry. Generational: once its entry is erased or
/// extracted, a `Pos` misses forever, even if the slot is reused. Positions
/// survive rehashing (entries are relinked, never moved).
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct Pos(DefaultKey);

impl Pos {
    pub(crate) fn new(k: DefaultKey) -> Self {
        Pos(k)
    }

    pub(crate) fn key(&self) -> DefaultKey {
        self.0
    }
}

/// An entry detached from a table by `extract`, owning its payload. Insert
/// it into this or any compatible table, or drop it to discard the entry.
#[derive(Debug)]
pub struct NodeHandle<T> {
    value: T,
}

impl<T> NodeHandle<T> {
    pub fn get(&self) -> &T {
        &self.value
    }

    pub fn get_mut(&mut self) -> &mut T {
        &mut self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<K, V> NodeHandle<(K, V)> {
    pub fn key(&self) -> &K {
        &self.value.0
    }

    pub fn value(&self) -> &V {
        &self.value.1
    }

    pub fn value_mut(&mut self) -> &mut V {
        &mut self.value.1
    }

    pub fn into_pair(self) -> (K, V) {
        self.value
    }
}

/// Outcome of re-inserting a [`NodeHandle`]. When the table already holds
/// an equal key, the handle comes back unconsumed in `node`.
#[derive(Debug)]
pub struct HandleInsert<T> {
    pub pos: Pos,
    pub inserted: bool,
    pub node: Option<NodeHandle<T>>,
}

/// How the directory grows when an insert would breach the load factor.
/// Growth always also satisfies the load-factor minimum for the new size.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum GrowthPolicy {
    /// Double the bucket count.
    Double,
    /// Multiply the bucket count by the given factor; factors below 2 are
    /// treated as 2.
    Factor(usize),
}

impl GrowthPolicy {
    fn next_size(self, current: usize) -> usize {
        let factor = match self {
            GrowthPolicy::Double => 2,
            GrowthPolicy::Factor(f) => f.max(2),
        };
        current.saturating_mul(factor).max(DEFAULT_BUCKETS)
    }
}

impl Default for GrowthPolicy {
    fn default() -> Self {
        GrowthPolicy::Double
    }
}

/// Rejected `rehash`: the requested bucket count cannot hold the current
/// entries within the load factor. The table is unchanged.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct RehashError {
    pub requested: usize,
    pub required: usize,
}

impl fmt::Display for RehashError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "rehash to {} buckets rejected: current size needs at least {}",
            self.requested, self.required
        )
    }
}

impl std::error::Error for RehashError {}

pub struct RunTable<T> {
    list: LinkedArena<T>,
    dir: Directory,
    occupied: usize,
    max_load: f32,
    growth: GrowthPolicy,
}

impl<T> RunTable<T> {
    /// An empty table with a deferred directory: no buckets are allocated
    /// until the first insert seeds the default count.
    pub fn new() -> Self {
        Self::with_buckets(0)
    }

    pub fn with_buckets(buckets: usize) -> Self {
        Self {
            list: LinkedArena::new(),
            dir: Directory::with_buckets(buckets),
            occupied: 0,
            max_load: 1.0,
            growth: GrowthPolicy::default(),
        }
    }

    pub fn len(&self) -> usize {
        self.list.len()
    }

    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    pub fn bucket_count(&self) -> usize {
        self.dir.len()
    }

    pub fn load_factor(&self) -> f32 {
        if self.dir.is_empty() {
            0.0
        } else {
            self.list.len() as f32 / self.dir.len() as f32
        }
    }

    pub fn max_load_factor(&self) -> f32 {
        self.max_load
    }

    /// Set the rehash threshold. Takes effect on the next insert; the table
    /// is not rehashed eagerly.
    pub fn set_max_load_factor(&mut self, mlf: f32) {
        assert!(
            mlf.is_finite() && mlf > 0.0,
            "max load factor must be positive and finite"
        );
        self.max_load = mlf;
    }

    pub fn growth_policy(&self) -> GrowthPolicy {
        self.growth
    }

    pub fn set_growth_policy(&mut self, policy: GrowthPolicy) {
        self.growth = policy;
    }

    /// Number of buckets currently holding at least one entry.
    pub fn occupied_buckets(&self) -> usize {
        self.occupied
    }

    /// Look up an entry by its precomputed hash, scanning only the owning
    /// bucket's run with `pred`.
    pub fn find(&self, hash: u64, pred: impl FnMut(&T) -> bool) -> Option<Pos> {
        let run = self.dir.bucket_for(hash)?.run?;
        self.scan_run(run, pred).map(Pos::new)
    }

    /// Insert `value` under `hash` unless an equal entry already exists.
    ///
    /// `eq` receives `(candidate, stored)`. Returns the entry's position and
    /// whether it was inserted; a rejected duplicate causes no mutation and
    /// the candidate is dropped. Growth (when the load factor would be
    /// breached) happens before the duplicate scan, so it may occur even for
    /// an insert that is then rejected.
    pub fn insert(&mut self, hash: u64, value: T, eq: impl FnMut(&T, &T) -> bool) -> (Pos, bool) {
        let (pos, rejected) = self.insert_impl(hash, value, eq);
        (pos, rejected.is_none())
    }

    /// Re-attach an extracted entry. On a duplicate the handle is returned
    /// unconsumed so the caller keeps ownership of the payload.
    pub fn insert_handle(
        &mut self,
        hash: u64,
        node: NodeHandle<T>,
        eq: impl FnMut(&T, &T) -> bool,
    ) -> HandleInsert<T> {
        let (pos, rejected) = self.insert_impl(hash, node.into_inner(), eq);
        HandleInsert {
            pos,
            inserted: rejected.is_none(),
            node: rejected.map(|value| NodeHandle { value }),
        }
    }

    /// Shared insert path. Returns the candidate back on a duplicate.
    fn insert_impl(
        &mut self,
        hash: u64,
        value: T,
        mut eq: impl FnMut(&T, &T) -> bool,
    ) -> (Pos, Option<T>) {
        self.grow_to_fit_one_more();
        let idx = self.dir.index_of(hash);
        let result = match self.dir.get(idx).run {
            None => {
                // Empty bucket: the new entry starts a run at the list tail.
                let k = self.list.push_back(value, hash);
                let desc = self.dir.get_mut(idx);
                desc.run = Some(Run { first: k, last: k });
                desc.cached_hash = hash;
                self.occupied += 1;
                (Pos::new(k), None)
            }
            Some(run) => {
                if let Some(existing) = self.scan_run(run, |stored| eq(&value, stored)) {
                    (Pos::new(existing), Some(value))
                } else {
                    // Extend the run at its recorded edge; no other bucket's
                    // entries move, which is what keeps runs contiguous.
                    let k = self.list.insert_after(run.last, value, hash);
                    self.dir.get_mut(idx).run = Some(Run {
                        first: run.first,
                        last: k,
                    });
                    (Pos::new(k), None)
                }
            }
        };
        debug_assert!(result.1.is_some() || self.load_factor() <= self.max_load_factor());
        self.debug_validate();
        result
    }

    /// Remove the entry at `pos`, returning its payload and the following
    /// list position. `None` for a stale position; nothing changes.
    pub fn erase(&mut self, pos: Pos) -> Option<(T, Option<Pos>)> {
        self.detach(pos.key())
            .map(|(value, next)| (value, next.map(Pos::new)))
    }

    /// Like [`erase`](Self::erase), but the payload is handed back in an
    /// owning [`NodeHandle`] instead of being dropped.
    pub fn extract(&mut self, pos: Pos) -> Option<NodeHandle<T>> {
        self.detach(pos.key())
            .map(|(value, _next)| NodeHandle { value })
    }

    /// Unlink one entry, maintaining its bucket's boundary pair.
    fn detach(&mut self, k: DefaultKey) -> Option<(T, Option<DefaultKey>)> {
        let hash = self.list.get(k)?.hash;
        // The boundary update depends on the entry's neighbors, so read the
        // adjacency strictly before unlinking.
        let prev = self.list.prev(k);
        let next = self.list.next(k);
        let idx = self.dir.index_of(hash);
        let desc = self.dir.get_mut(idx);
        if let Some(run) = desc.run {
            if run.first == k && run.last == k {
                desc.run = None;
                self.occupied -= 1;
            } else if run.first == k {
                if let Some(n) = next {
                    desc.run = Some(Run {
                        first: n,
                        last: run.last,
                    });
                }
            } else if run.last == k {
                if let Some(p) = prev {
                    desc.run = Some(Run {
                        first: run.first,
                        last: p,
                    });
                }
            }
            // Interior removal: both boundaries stay put.
        }
        let (value, _hash) = self.list.remove(k)?;
        self.debug_validate();
        Some((value, next))
    }

    /// Drop every entry. The directory keeps its size with all runs empty.
    pub fn clear(&mut self) {
        self.list.clear();
        self.dir.reset_runs();
        self.occupied = 0;
        self.debug_validate();
    }

    /// Rebuild the directory at `new_bucket_count` buckets, relinking every
    /// entry in pre-rehash list order. Rejected (table unchanged) when the
    /// count cannot hold the current entries within the load factor.
    ///
    /// Entries are relinked, not moved: positions and payload references
    /// stay valid. Intra-bucket order is preserved; inter-bucket order is
    /// not guaranteed.
    pub fn rehash(&mut self, new_bucket_count: usize) -> Result<(), RehashError> {
        let required = self.min_buckets_for(self.list.len());
        if new_bucket_count < required {
            return Err(RehashError {
                requested: new_bucket_count,
                required,
            });
        }
        self.rebuild(new_bucket_count);
        Ok(())
    }

    /// Make room for at least `entries` entries without breaching the load
    /// factor. Never shrinks and never fails.
    pub fn reserve(&mut self, entries: usize) {
        let target = self.min_buckets_for(entries.max(self.list.len()));
        if target > self.dir.len() {
            self.rebuild(target);
        }
    }

    fn min_buckets_for(&self, entries: usize) -> usize {
        if entries == 0 {
            0
        } else {
            (entries as f64 / self.max_load as f64).ceil() as usize
        }
    }

    fn grow_to_fit_one_more(&mut self) {
        let needed = self.list.len() + 1;
        if self.dir.is_empty() {
            self.rebuild(self.min_buckets_for(needed).max(DEFAULT_BUCKETS));
            return;
        }
        if needed as f64 > self.max_load as f64 * self.dir.len() as f64 {
            let grown = self.growth.next_size(self.dir.len());
            self.rebuild(grown.max(self.min_buckets_for(needed)));
        }
    }

    /// Replace the directory and rethread the list. The allocations (the
    /// traversal order and the fresh directory) happen before any relinking,
    /// so a failed allocation leaves the table intact; the relink itself
    /// cannot fail.
    fn rebuild(&mut self, new_count: usize) {
        debug_assert!(new_count >= self.min_buckets_for(self.list.len()));
        let order = self.list.keys_in_order();
        let mut dir = Directory::with_buckets(new_count);
        let mut occupied = 0;
        self.list.unlink_all();
        for k in order {
            let hash = match self.list.get(k) {
                Some(node) => node.hash,
                None => continue,
            };
            let idx = dir.index_of(hash);
            let desc = dir.get_mut(idx);
            match desc.run {
                None => {
                    self.list.link_back(k);
                    desc.run = Some(Run { first: k, last: k });
                    desc.cached_hash = hash;
                    occupied += 1;
                }
                Some(run) => {
                    self.list.link_after(run.last, k);
                    desc.run = Some(Run {
                        first: run.first,
                        last: k,
                    });
                }
            }
        }
        self.dir = dir;
        self.occupied = occupied;
        self.debug_validate();
    }

    /// Walk `[run.first, run.last]`, returning the first entry `pred`
    /// accepts.
    fn scan_run(&self, run: Run, mut pred: impl FnMut(&T) -> bool) -> Option<DefaultKey> {
        let mut cur = run.first;
        loop {
            let node = self.list.get(cur)?;
            if pred(&node.value) {
                return Some(cur);
            }
            if cur == run.last {
                return None;
            }
            cur = self.list.next(cur)?;
        }
    }

    pub fn get(&self, pos: Pos) -> Option<&T> {
        self.list.get(pos.key()).map(|node| &node.value)
    }

    pub fn get_mut(&mut self, pos: Pos) -> Option<&mut T> {
        self.list.get_mut(pos.key()).map(|node| &mut node.value)
    }

    /// First position in list order.
    pub fn first(&self) -> Option<Pos> {
        self.list.first().map(Pos::new)
    }

    /// Position following `pos` in list order.
    pub fn next(&self, pos: Pos) -> Option<Pos> {
        self.list.next(pos.key()).map(Pos::new)
    }

    /// Bucket index a hash maps to, or `None` while the directory is empty.
    pub fn bucket_index(&self, hash: u64) -> Option<usize> {
        if self.dir.is_empty() {
            None
        } else {
            Some(self.dir.index_of(hash))
        }
    }

    /// Number of entries in bucket `idx` (0 for out-of-range indices).
    pub fn bucket_size(&self, idx: usize) -> usize {
        self.bucket_iter(idx).count()
    }

    /// Iterator bounded to exactly bucket `idx`'s run.
    pub fn bucket_iter(&self, idx: usize) -> BucketIter<'_, T> {
        let run = self.dir.desc_at(idx).and_then(|desc| desc.run);
        BucketIter {
            list: &self.list,
            cur: run.map(|r| r.first),
            last: run.map(|r| r.last),
        }
    }

    /// Iterate all entries in current list order.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            list: &self.list,
            cur: self.list.first(),
            remaining: self.list.len(),
        }
    }

    /// Mutable iteration. Visits entries in arena storage order, not list
    /// order; use [`for_each_mut`](Self::for_each_mut) when the order
    /// matters.
    pub fn iter_mut(&mut self) -> IterMut<'_, T> {
        IterMut {
            inner: self.list.nodes_mut(),
        }
    }

    /// Apply `f` to every entry in list order.
    pub fn for_each_mut(&mut self, mut f: impl FnMut(&mut T)) {
        let mut cur = self.list.first();
        while let Some(k) = cur {
            cur = self.list.next(k);
            if let Some(node) = self.list.get_mut(k) {
                f(&mut node.value);
            }
        }
    }

    /// Re-check the directory/list agreement: contiguity of every run,
    /// bucket membership of every entry, size accounting, and the
    /// occupied-bucket count. Debug builds only; the release build compiles
    /// this to nothing.
    #[cfg(debug_assertions)]
    fn debug_validate(&self) {
        if self.dir.is_empty() {
            assert_eq!(self.list.len(), 0, "entries present without a directory");
            assert_eq!(self.occupied, 0);
            return;
        }
        let mut seen = vec![false; self.dir.len()];
        let mut total = 0usize;
        let mut cur = self.list.first();
        while let Some(k) = cur {
            let hash = self.list.get(k).expect("list cursor hit a dead key").hash;
            let idx = self.dir.index_of(hash);
            let run = self
                .dir
                .get(idx)
                .run
                .expect("entry linked into an empty bucket");
            assert_eq!(run.first, k, "run does not start at its segment head");
            assert!(!seen[idx], "bucket split across list segments");
            seen[idx] = true;
            let mut member = k;
            loop {
                let node = self.list.get(member).expect("run references a dead key");
                assert_eq!(
                    self.dir.index_of(node.hash),
                    idx,
                    "foreign entry inside a bucket run"
                );
                total += 1;
                if member == run.last {
                    break;
                }
                member = self
                    .list
                    .next(member)
                    .expect("run truncated before its recorded tail");
            }
            cur = self.list.next(run.last);
        }
        assert_eq!(total, self.list.len(), "run accounting disagrees with list");
        assert_eq!(
            seen.iter().filter(|s| **s).count(),
            self.occupied,
            "occupied-bucket count out of sync"
        );
        for idx in 0..self.dir.len() {
            let desc = self.dir.get(idx);
            if desc.run.is_some() {
                assert!(seen[idx], "descriptor points at unreachable entries");
                assert_eq!(
                    self.dir.index_of(desc.cached_hash),
                    idx,
                    "cached hash maps outside its bucket"
                );
            }
        }
    }

    #[cfg(not(debug_assertions))]
    #[inline]
    fn debug_validate(&self) {}
}

impl<T> Default for RunTable<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for RunTable<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.iter()).finish()
    }
}

/// Immutable list-order iterator over a table's entries.
pub struct Iter<'a, T> {
    list: &'a LinkedArena<T>,
    cur: Option<DefaultKey>,
    remaining: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur?;
        let node = self.list.get(k)?;
        self.cur = self.list.next(k);
        self.remaining -= 1;
        Some(&node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<'a, T> ExactSizeIterator for Iter<'a, T> {}

/// Mutable iterator over a table's entries, in arena storage order.
pub struct IterMut<'a, T> {
    inner: slotmap::basic::IterMut<'a, DefaultKey, Node<T>>,
}

impl<'a, T> Iterator for IterMut<'a, T> {
    type Item = &'a mut T;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.next().map(|(_, node)| &mut node.value)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl<'a, T> ExactSizeIterator for IterMut<'a, T> {}

/// Iterator over exactly one bucket's run.
pub struct BucketIter<'a, T> {
    list: &'a LinkedArena<T>,
    cur: Option<DefaultKey>,
    last: Option<DefaultKey>,
}

impl<'a, T> Iterator for BucketIter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let k = self.cur.take()?;
        let node = self.list.get(k)?;
        if Some(k) != self.last {
            self.cur = self.list.next(k);
        }
        Some(&node.value)
    }
}
