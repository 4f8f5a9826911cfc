// RunHashMap integration suite.
//
// Each test documents the behavior being verified and the invariants it
// leans on. The core invariants exercised:
// - Contiguity: a bucket's entries always form one unbroken run of the
//   shared list, observable through bucket_iter and full iteration order.
// - Accounting: len() equals both the iterated count and the sum of all
//   bucket_size(i).
// - Uniqueness: duplicate inserts are rejected without mutation.
// - Load bound: load_factor() <= max_load_factor() after every successful
//   insert; a breach grows the directory without losing entries.
// - Node identity: extract/insert_node moves payloads, never rebuilds them.
use run_hashmap::{GrowthPolicy, RunHashMap};
use std::hash::{BuildHasher, Hasher};

// Passes u64 keys through untouched so tests can place keys in chosen
// buckets deterministically.
#[derive(Clone, Default)]
struct IdentityBuildHasher;

struct IdentityHasher(u64);

impl Hasher for IdentityHasher {
    fn finish(&self) -> u64 {
        self.0
    }
    fn write(&mut self, bytes: &[u8]) {
        for &b in bytes.iter().take(8) {
            self.0 = (self.0 << 8) | u64::from(b);
        }
    }
    fn write_u64(&mut self, n: u64) {
        self.0 = n;
    }
}

impl BuildHasher for IdentityBuildHasher {
    type Hasher = IdentityHasher;
    fn build_hasher(&self) -> IdentityHasher {
        IdentityHasher(0)
    }
}

type PinnedMap<V> = RunHashMap<u64, V, IdentityBuildHasher>;

fn pinned<V>(buckets: usize) -> PinnedMap<V> {
    RunHashMap::with_buckets_and_hasher(buckets, IdentityBuildHasher)
}

fn bucket_keys<V>(m: &PinnedMap<V>, idx: usize) -> Vec<u64> {
    m.bucket_iter(idx).map(|(k, _)| *k).collect()
}

// Test: keys hashing to 0, 4, 8 collide into bucket 0 of a 4-bucket map
// and form one contiguous run in insertion order; hash 1 sits alone.
#[test]
fn colliding_keys_share_one_contiguous_run() {
    let mut m: PinnedMap<&str> = pinned(4);
    for (k, v) in [(0u64, "a"), (4, "b"), (8, "c"), (1, "d")] {
        let (_, inserted) = m.insert(k, v);
        assert!(inserted);
    }
    assert_eq!(m.bucket_count(), 4);
    assert_eq!(m.bucket(&0), Some(0));
    assert_eq!(m.bucket(&4), Some(0));
    assert_eq!(m.bucket(&1), Some(1));
    assert_eq!(bucket_keys(&m, 0), vec![0, 4, 8]);
    assert_eq!(bucket_keys(&m, 1), vec![1]);
    assert_eq!(m.bucket_size(0), 3);
    assert_eq!(m.bucket_size(1), 1);
    assert_eq!(m.bucket_size(2), 0);
}

// Test: erasing the middle of a run leaves the boundary entries in place;
// the erased key becomes unfindable and size drops by one.
#[test]
fn interior_erase_keeps_run_boundaries() {
    let mut m: PinnedMap<&str> = pinned(4);
    for (k, v) in [(0u64, "a"), (4, "b"), (8, "c"), (1, "d")] {
        m.insert(k, v);
    }
    assert_eq!(m.remove(&4), Some((4, "b")));
    assert_eq!(bucket_keys(&m, 0), vec![0, 8]);
    assert_eq!(m.len(), 3);
    assert!(m.find(&4).is_none());
}

// Test: erasing a run's first entry advances the run start; erasing its
// last recedes the run end.
#[test]
fn edge_erase_moves_one_boundary() {
    let mut m: PinnedMap<&str> = pinned(4);
    for k in [0u64, 4, 8] {
        m.insert(k, "v");
    }
    m.remove(&0);
    assert_eq!(bucket_keys(&m, 0), vec![4, 8]);
    m.remove(&8);
    assert_eq!(bucket_keys(&m, 0), vec![4]);
    m.remove(&4);
    assert_eq!(bucket_keys(&m, 0), Vec::<u64>::new());
    assert!(m.is_empty());
}

// Test: with max_load_factor 1.0 and 4 buckets, a fifth insert triggers
// growth. The bucket count at least doubles, every key stays findable, and
// the accounting invariants hold afterwards.
#[test]
fn fifth_insert_grows_directory() {
    let mut m: PinnedMap<u64> = pinned(4);
    assert_eq!(m.max_load_factor(), 1.0);
    for k in 0u64..5 {
        m.insert(k, k * 10);
        assert!(m.load_factor() <= m.max_load_factor());
    }
    assert!(m.bucket_count() >= 8);
    for k in 0u64..5 {
        assert_eq!(m.get(&k), Some(&(k * 10)), "key {k} lost in growth");
    }
    let bucket_sum: usize = (0..m.bucket_count()).map(|i| m.bucket_size(i)).sum();
    assert_eq!(bucket_sum, m.len());
}

// Test: extract + insert_node re-attaches the same entry without
// reconstructing the payload. The Box address proves heap identity.
#[test]
fn extract_preserves_payload_identity() {
    let mut m: PinnedMap<Box<u64>> = pinned(4);
    m.insert(3, Box::new(33));
    let before = m.get(&3).map(|b| &**b as *const u64).expect("present");

    let node = m.extract(&3).expect("present");
    assert!(m.is_empty());
    assert_eq!(**node.value(), 33);

    let res = m.insert_node(node);
    assert!(res.inserted);
    let after = m.get(&3).map(|b| &**b as *const u64).expect("re-attached");
    assert_eq!(before, after, "payload must be moved, not rebuilt");
}

// Test: inserting a node whose key already exists hands the handle back
// untouched instead of dropping it.
#[test]
fn duplicate_node_insert_returns_handle() {
    let mut a: PinnedMap<&str> = pinned(4);
    let mut b: PinnedMap<&str> = pinned(4);
    a.insert(7, "a-side");
    b.insert(7, "b-side");

    let node = b.extract(&7).expect("present");
    let res = a.insert_node(node);
    assert!(!res.inserted);
    let node = res.node.expect("handle returned on duplicate");
    assert_eq!(*node.key(), 7);
    assert_eq!(*node.value(), "b-side");
    assert_eq!(a.get(&7), Some(&"a-side"), "existing entry untouched");
}

// Test: node handles move between maps with different hasher instances;
// the destination re-hashes the key with its own state.
#[test]
fn node_handles_cross_hasher_instances() {
    let mut a: RunHashMap<String, i32> = RunHashMap::new();
    let mut b: RunHashMap<String, i32> = RunHashMap::new();
    a.insert("k".to_string(), 5);

    let node = a.extract("k").expect("present");
    let res = b.insert_node(node);
    assert!(res.inserted);
    assert_eq!(b.get("k"), Some(&5));
    assert!(a.is_empty());
}

// Test: merge moves every non-conflicting entry out of the source, even
// across different hasher types; conflicts stay behind.
#[test]
fn merge_moves_non_conflicting_entries() {
    let mut dst: RunHashMap<u64, &str> = RunHashMap::new();
    let mut src: PinnedMap<&str> = pinned(4);
    dst.insert(1, "kept");
    src.insert(1, "conflict");
    src.insert(2, "moved");
    src.insert(3, "moved too");

    dst.merge(&mut src);
    assert_eq!(dst.len(), 3);
    assert_eq!(dst.get(&1), Some(&"kept"));
    assert_eq!(dst.get(&2), Some(&"moved"));
    assert_eq!(src.len(), 1, "conflicting entry stays in the source");
    assert_eq!(src.get(&1), Some(&"conflict"));
}

// Test: rehash to a sufficient count regroups runs and keeps content;
// an under-provisioned count errors and mutates nothing.
#[test]
fn rehash_preserves_content_and_validates() {
    let mut m: PinnedMap<u64> = pinned(4);
    for k in [0u64, 4, 8, 1] {
        m.insert(k, k);
    }

    let err = m.rehash(2).expect_err("2 buckets cannot hold 4 entries");
    assert_eq!(err.requested, 2);
    assert_eq!(err.required, 4);
    assert_eq!(m.bucket_count(), 4);
    assert_eq!(bucket_keys(&m, 0), vec![0, 4, 8]);

    m.rehash(12).expect("12 buckets is plenty");
    assert_eq!(m.bucket_count(), 12);
    for k in [0u64, 4, 8, 1] {
        assert_eq!(m.get(&k), Some(&k));
    }
    assert_eq!(bucket_keys(&m, 0), vec![0]);
    assert_eq!(bucket_keys(&m, 4), vec![4]);
    assert_eq!(bucket_keys(&m, 8), vec![8]);
}

// Test: full iteration visits bucket runs contiguously, with insertion
// order preserved inside each run.
#[test]
fn iteration_groups_runs_contiguously() {
    let mut m: PinnedMap<&str> = pinned(4);
    for k in [0u64, 5, 4, 1, 8] {
        m.insert(k, "v");
    }
    let keys: Vec<u64> = m.iter().map(|(k, _)| *k).collect();
    assert_eq!(keys, vec![0, 4, 8, 5, 1]);
    assert_eq!(m.iter().len(), 5);
}

// Test: the insert hint is advisory. An equal-key hint short-circuits; a
// wrong or stale hint is ignored and the insert still lands correctly.
#[test]
fn insert_hint_is_advisory_only() {
    let mut m: PinnedMap<&str> = pinned(4);
    let (pos, _) = m.insert(0, "a");

    assert_eq!(m.insert_hint(pos, 0, "ignored"), pos);
    assert_eq!(m.get(&0), Some(&"a"));

    let other = m.insert_hint(pos, 4, "b");
    assert_ne!(other, pos);
    assert_eq!(m.get(&4), Some(&"b"));

    m.remove(&0);
    let fresh = m.insert_hint(pos, 12, "c");
    assert_eq!(m.get(&12), Some(&"c"));
    assert_ne!(fresh, pos, "stale hint must not be trusted");
}

// Test: erase(pos) walks to the next position in iteration order, allowing
// position-based sweeps.
#[test]
fn erase_returns_following_position() {
    let mut m: PinnedMap<&str> = pinned(4);
    m.insert(0, "a");
    m.insert(4, "b");

    let first = m.first_pos().expect("non-empty");
    let second = m.next_pos(first).expect("two entries");
    assert_eq!(m.erase(first), Some(second));
    assert_eq!(m.erase(second), None, "tail has no successor");
    assert!(m.is_empty());
}

// Test: clear drops everything, keeps the directory size, and the map is
// immediately reusable.
#[test]
fn clear_keeps_buckets_and_reuses() {
    let mut m: PinnedMap<&str> = pinned(4);
    m.insert(0, "a");
    m.insert(1, "b");
    m.clear();
    assert!(m.is_empty());
    assert_eq!(m.bucket_count(), 4);
    m.insert(0, "again");
    assert_eq!(m.get(&0), Some(&"again"));
}

// Test: a custom growth policy multiplies the bucket count on breach.
#[test]
fn growth_policy_is_configurable() {
    let mut m: PinnedMap<u64> = pinned(8);
    m.set_growth_policy(GrowthPolicy::Factor(4));
    assert_eq!(m.growth_policy(), GrowthPolicy::Factor(4));
    for k in 0u64..9 {
        m.insert(k, k);
    }
    assert_eq!(m.bucket_count(), 32);
}

// Test: reserve provisions buckets ahead of inserts so no growth happens
// mid-stream; positions handed out stay stable.
#[test]
fn reserve_prevents_mid_stream_growth() {
    let mut m: RunHashMap<u64, u64> = RunHashMap::new();
    m.reserve(100);
    let buckets = m.bucket_count();
    assert!(buckets >= 100);
    for k in 0u64..100 {
        m.insert(k, k);
    }
    assert_eq!(m.bucket_count(), buckets);
}

// Test: lookups on an absent key return misses, never errors, and leave
// the map untouched.
#[test]
fn absent_key_lookups_are_misses() {
    let mut m: RunHashMap<String, i32> = RunHashMap::new();
    m.insert("present".to_string(), 1);
    assert!(m.find("absent").is_none());
    assert_eq!(m.get("absent"), None);
    assert_eq!(m.count("absent"), 0);
    assert_eq!(m.equal_range("absent").count(), 0);
    assert!(m.remove("absent").is_none());
    assert_eq!(m.len(), 1);
}

// Test: FromIterator/Extend build maps equal to incrementally-built ones.
#[test]
fn from_iterator_and_extend() {
    let built: RunHashMap<u64, u64> = (0..10u64).map(|k| (k, k * k)).collect();
    let mut grown: RunHashMap<u64, u64> = RunHashMap::new();
    grown.extend((0..10u64).map(|k| (k, k * k)));
    assert_eq!(built, grown);
    assert_eq!(built.len(), 10);
}

// Test: Debug output renders as a map.
#[test]
fn debug_renders_entries() {
    let mut m: RunHashMap<&str, i32> = RunHashMap::new();
    m.insert("k", 1);
    let s = format!("{m:?}");
    assert!(s.contains("\"k\": 1"), "unexpected debug output: {s}");
}
