//! The backing list: a slotmap arena of entries threaded into one doubly
//! linked list.
//!
//! Every entry of a table lives here, in list order. The table layer above
//! stores arena keys (not references) in its bucket descriptors, so a key
//! that outlives its entry misses instead of dangling. `head`/`tail` stand
//! in for a sentinel node: the absence of a key terminates the list in both
//! directions.
//!
//! Removing a key invalidates only that key; every other key remains valid.
//! The `unlink_all`/`link_back`/`link_after` trio lets the table rebuild the
//! list order in place without moving any entry (rehash relinks, it never
//! reallocates entries).

use slotmap::{DefaultKey, SlotMap};

/// One stored entry: the payload plus its cached hash and its links.
///
/// The hash is computed once, when the entry enters a table, and reused for
/// every later bucket computation; user hashing code never runs again for
/// this entry.
#[derive(Debug)]
pub(crate) struct Node<T> {
    pub(crate) value: T,
    pub(crate) hash: u64,
    prev: Option<DefaultKey>,
    next: Option<DefaultKey>,
}

#[derive(Debug)]
pub(crate) struct LinkedArena<T> {
    slots: SlotMap<DefaultKey, Node<T>>,
    head: Option<DefaultKey>,
    tail: Option<DefaultKey>,
}

impl<T> LinkedArena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: SlotMap::with_key(),
            head: None,
            tail: None,
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.slots.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub(crate) fn first(&self) -> Option<DefaultKey> {
        self.head
    }

    pub(crate) fn get(&self, k: DefaultKey) -> Option<&Node<T>> {
        self.slots.get(k)
    }

    pub(crate) fn get_mut(&mut self, k: DefaultKey) -> Option<&mut Node<T>> {
        self.slots.get_mut(k)
    }

    pub(crate) fn next(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.slots.get(k).and_then(|node| node.next)
    }

    pub(crate) fn prev(&self, k: DefaultKey) -> Option<DefaultKey> {
        self.slots.get(k).and_then(|node| node.prev)
    }

    /// Append a new entry at the tail.
    pub(crate) fn push_back(&mut self, value: T, hash: u64) -> DefaultKey {
        let k = self.slots.insert(Node {
            value,
            hash,
            prev: self.tail,
            next: None,
        });
        match self.tail {
            Some(t) => self.slots[t].next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
        k
    }

    /// Insert a new entry immediately after `anchor`.
    pub(crate) fn insert_after(&mut self, anchor: DefaultKey, value: T, hash: u64) -> DefaultKey {
        let after = self.slots[anchor].next;
        let k = self.slots.insert(Node {
            value,
            hash,
            prev: Some(anchor),
            next: after,
        });
        self.slots[anchor].next = Some(k);
        match after {
            Some(n) => self.slots[n].prev = Some(k),
            None => self.tail = Some(k),
        }
        k
    }

    /// Unlink and free the entry at `k`, relinking its neighbors around it.
    /// Returns the payload and its cached hash.
    pub(crate) fn remove(&mut self, k: DefaultKey) -> Option<(T, u64)> {
        let node = self.slots.remove(k)?;
        match node.prev {
            Some(p) => self.slots[p].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(n) => self.slots[n].prev = node.prev,
            None => self.tail = node.prev,
        }
        Some((node.value, node.hash))
    }

    pub(crate) fn clear(&mut self) {
        self.slots.clear();
        self.head = None;
        self.tail = None;
    }

    /// Arena keys in current list order. Allocates; used by the rebuild path
    /// before any relinking happens.
    pub(crate) fn keys_in_order(&self) -> Vec<DefaultKey> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cur = self.head;
        while let Some(k) = cur {
            keys.push(k);
            cur = self.slots[k].next;
        }
        keys
    }

    /// Detach the whole chain without freeing any entry. Entries keep their
    /// slots (and stale links) until `link_back`/`link_after` rethread them.
    pub(crate) fn unlink_all(&mut self) {
        self.head = None;
        self.tail = None;
    }

    /// Rethread an existing entry at the tail. Overwrites both of its links.
    pub(crate) fn link_back(&mut self, k: DefaultKey) {
        let old_tail = self.tail;
        {
            let node = &mut self.slots[k];
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail {
            Some(t) => self.slots[t].next = Some(k),
            None => self.head = Some(k),
        }
        self.tail = Some(k);
    }

    /// Rethread an existing entry immediately after `anchor`. Overwrites
    /// both of its links.
    pub(crate) fn link_after(&mut self, anchor: DefaultKey, k: DefaultKey) {
        let after = self.slots[anchor].next;
        {
            let node = &mut self.slots[k];
            node.prev = Some(anchor);
            node.next = after;
        }
        self.slots[anchor].next = Some(k);
        match after {
            Some(n) => self.slots[n].prev = Some(k),
            None => self.tail = Some(k),
        }
    }

    pub(crate) fn nodes_mut(
        &mut self,
    ) -> slotmap::basic::IterMut<'_, DefaultKey, Node<T>> {
        self.slots.iter_mut()
    }
}
