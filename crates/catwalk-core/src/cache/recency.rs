//! Recency ordering over resident entries.
//!
//! A doubly linked list threaded through a slab of nodes, plus an
//! `id → slot` index. Touch, insert and remove are O(1); iteration walks the
//! list from the least-recently-used end.

use std::collections::HashMap;

const NIL: usize = usize::MAX;

#[derive(Debug)]
struct Node {
    id: String,
    prev: usize,
    next: usize,
}

/// Access order of resident entries, least recently used first.
///
/// Every touch happens under the cache lock, so the list order is the total
/// order of touches. Entries touched within the same clock tick keep the
/// order in which they were touched.
#[derive(Debug)]
pub struct RecencyTracker {
    slots: Vec<Option<Node>>,
    free: Vec<usize>,
    index: HashMap<String, usize>,
    head: usize,
    tail: usize,
}

impl Default for RecencyTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl RecencyTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self { slots: Vec::new(), free: Vec::new(), index: HashMap::new(), head: NIL, tail: NIL }
    }

    /// Marks `id` as the most recently used entry, inserting it if absent.
    pub fn touch(&mut self, id: &str) {
        let slot = if let Some(&slot) = self.index.get(id) {
            if slot == self.tail {
                return;
            }
            self.unlink(slot);
            slot
        } else {
            let node = Node { id: id.to_string(), prev: NIL, next: NIL };
            let slot = if let Some(slot) = self.free.pop() {
                self.slots[slot] = Some(node);
                slot
            } else {
                self.slots.push(Some(node));
                self.slots.len() - 1
            };
            self.index.insert(id.to_string(), slot);
            slot
        };

        self.push_back(slot);
    }

    /// Removes `id` from the ordering. Returns whether it was present.
    pub fn remove(&mut self, id: &str) -> bool {
        let Some(slot) = self.index.remove(id) else {
            return false;
        };
        self.unlink(slot);
        self.slots[slot] = None;
        self.free.push(slot);
        true
    }

    /// Whether `id` is tracked.
    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Number of tracked ids.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Whether no ids are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Iterates ids from least to most recently used.
    ///
    /// The iterator borrows the tracker, so each call observes the order at
    /// the time it is made.
    #[must_use]
    pub fn peek_lru_candidates(&self) -> LruCandidates<'_> {
        LruCandidates { tracker: self, cursor: self.head }
    }

    fn node(&self, slot: usize) -> &Node {
        self.slots[slot].as_ref().expect("linked slot is occupied")
    }

    fn node_mut(&mut self, slot: usize) -> &mut Node {
        self.slots[slot].as_mut().expect("linked slot is occupied")
    }

    fn unlink(&mut self, slot: usize) {
        let (prev, next) = {
            let node = self.node(slot);
            (node.prev, node.next)
        };

        if prev == NIL {
            self.head = next;
        } else {
            self.node_mut(prev).next = next;
        }

        if next == NIL {
            self.tail = prev;
        } else {
            self.node_mut(next).prev = prev;
        }

        let node = self.node_mut(slot);
        node.prev = NIL;
        node.next = NIL;
    }

    fn push_back(&mut self, slot: usize) {
        let old_tail = self.tail;
        {
            let node = self.node_mut(slot);
            node.prev = old_tail;
            node.next = NIL;
        }

        if old_tail == NIL {
            self.head = slot;
        } else {
            self.node_mut(old_tail).next = slot;
        }
        self.tail = slot;
    }
}

/// Lazy LRU-first walk over a [`RecencyTracker`].
#[derive(Debug)]
pub struct LruCandidates<'a> {
    tracker: &'a RecencyTracker,
    cursor: usize,
}

impl<'a> Iterator for LruCandidates<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<Self::Item> {
        if self.cursor == NIL {
            return None;
        }
        let node = self.tracker.node(self.cursor);
        self.cursor = node.next;
        Some(node.id.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(tracker: &RecencyTracker) -> Vec<&str> {
        tracker.peek_lru_candidates().collect()
    }

    #[test]
    fn test_insertion_order_is_lru_order() {
        let mut tracker = RecencyTracker::new();
        tracker.touch("a");
        tracker.touch("b");
        tracker.touch("c");

        assert_eq!(order(&tracker), vec!["a", "b", "c"]);
        assert_eq!(tracker.len(), 3);
    }

    #[test]
    fn test_touch_moves_to_most_recent() {
        let mut tracker = RecencyTracker::new();
        tracker.touch("a");
        tracker.touch("b");
        tracker.touch("c");
        tracker.touch("a");

        assert_eq!(order(&tracker), vec!["b", "c", "a"]);

        // Touching the tail is a no-op.
        tracker.touch("a");
        assert_eq!(order(&tracker), vec!["b", "c", "a"]);
    }

    #[test]
    fn test_remove_head_middle_and_tail() {
        let mut tracker = RecencyTracker::new();
        for id in ["a", "b", "c", "d"] {
            tracker.touch(id);
        }

        assert!(tracker.remove("b"));
        assert_eq!(order(&tracker), vec!["a", "c", "d"]);
        assert!(tracker.remove("a"));
        assert_eq!(order(&tracker), vec!["c", "d"]);
        assert!(tracker.remove("d"));
        assert_eq!(order(&tracker), vec!["c"]);
        assert!(!tracker.remove("d"));

        assert!(tracker.remove("c"));
        assert!(tracker.is_empty());
        assert_eq!(order(&tracker), Vec::<&str>::new());
    }

    #[test]
    fn test_slots_are_reused() {
        let mut tracker = RecencyTracker::new();
        tracker.touch("a");
        tracker.touch("b");
        tracker.remove("a");
        tracker.touch("c");

        assert_eq!(tracker.slots.len(), 2);
        assert_eq!(order(&tracker), vec!["b", "c"]);
        assert!(tracker.contains("c"));
        assert!(!tracker.contains("a"));
    }

    #[test]
    fn test_iteration_is_restartable() {
        let mut tracker = RecencyTracker::new();
        tracker.touch("a");
        tracker.touch("b");

        let first: Vec<String> =
            tracker.peek_lru_candidates().map(ToString::to_string).collect();
        tracker.touch("a");
        let second: Vec<&str> = tracker.peek_lru_candidates().collect();

        assert_eq!(first, vec!["a", "b"]);
        assert_eq!(second, vec!["b", "a"]);
    }
}
