//! The bucket directory: a contiguous array of run descriptors addressed by
//! `hash % bucket_count`.
//!
//! A descriptor owns nothing. It names the boundary entries of its bucket's
//! contiguous run in the backing list, or nothing at all when the bucket is
//! empty; holding both boundaries inside one `Option` makes the
//! both-or-neither rule a matter of representation rather than discipline.
//! The directory is replaced wholesale whenever the bucket count changes.

use slotmap::DefaultKey;

/// Boundary pair of a non-empty bucket: the first and last entry of its run
/// in the backing list. `first == last` for a single-entry run.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub(crate) struct Run {
    pub(crate) first: DefaultKey,
    pub(crate) last: DefaultKey,
}

#[derive(Copy, Clone, Debug, Default)]
pub(crate) struct BucketDesc {
    pub(crate) run: Option<Run>,
    /// Hash of the entry that opened the current run. Any member's hash maps
    /// to the same index while the directory size is fixed, so this stays
    /// consistent across edge erasures.
    pub(crate) cached_hash: u64,
}

#[derive(Debug)]
pub(crate) struct Directory {
    buckets: Vec<BucketDesc>,
}

impl Directory {
    pub(crate) fn with_buckets(count: usize) -> Self {
        Self {
            buckets: vec![BucketDesc::default(); count],
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.buckets.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    /// Bucket index for a hash. Callers must not address an empty directory.
    pub(crate) fn index_of(&self, hash: u64) -> usize {
        debug_assert!(!self.buckets.is_empty(), "indexing an empty directory");
        (hash % self.buckets.len() as u64) as usize
    }

    pub(crate) fn get(&self, idx: usize) -> &BucketDesc {
        &self.buckets[idx]
    }

    pub(crate) fn get_mut(&mut self, idx: usize) -> &mut BucketDesc {
        &mut self.buckets[idx]
    }

    /// Bounds-checked descriptor access for the public bucket interface.
    pub(crate) fn desc_at(&self, idx: usize) -> Option<&BucketDesc> {
        self.buckets.get(idx)
    }

    pub(crate) fn bucket_for(&self, hash: u64) -> Option<&BucketDesc> {
        if self.buckets.is_empty() {
            None
        } else {
            Some(self.get(self.index_of(hash)))
        }
    }

    /// Empty every descriptor, keeping the directory size.
    pub(crate) fn reset_runs(&mut self) {
        for desc in &mut self.buckets {
            *desc = BucketDesc::default();
        }
    }
}
