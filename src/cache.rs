use alloc::vec::Vec;

use crate::key::{KeyMap, TreeKey};
use crate::Row;

/// Ordered, randomly addressable sequence of materialized rows.
///
/// Rows are kept in depth-first pre-order. A key → index map is kept in sync on every splice so
/// `index_of` does not scan.
#[derive(Clone, Debug)]
pub(crate) struct FlatCache<K, D> {
    rows: Vec<Row<K, D>>,
    index: KeyMap<K, usize>,
}

impl<K: TreeKey, D> FlatCache<K, D> {
    pub(crate) fn new() -> Self {
        Self {
            rows: Vec::new(),
            index: KeyMap::new(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.rows.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub(crate) fn rows(&self) -> &[Row<K, D>] {
        &self.rows
    }

    pub(crate) fn contains_key(&self, key: &K) -> bool {
        self.index.contains_key(key)
    }

    pub(crate) fn index_of(&self, key: &K) -> Option<usize> {
        self.index.get(key).copied()
    }

    pub(crate) fn get(&self, index: usize) -> Option<&Row<K, D>> {
        self.rows.get(index)
    }

    pub(crate) fn get_mut(&mut self, index: usize) -> Option<&mut Row<K, D>> {
        self.rows.get_mut(index)
    }

    pub(crate) fn last_index(&self) -> Option<usize> {
        self.rows.len().checked_sub(1)
    }

    /// Number of contiguous rows after `index` that are deeper than the row at `index`.
    pub(crate) fn descendant_count(&self, index: usize) -> usize {
        let Some(row) = self.rows.get(index) else {
            return 0;
        };
        let depth = row.tree_depth;
        self.rows[index + 1..]
            .iter()
            .take_while(|r| r.tree_depth > depth)
            .count()
    }

    /// End (exclusive) of the block formed by `parent` and its cached descendants.
    ///
    /// For the virtual root (`None`) this is the end of the cache.
    pub(crate) fn block_end(&self, parent: Option<usize>) -> usize {
        match parent {
            Some(index) => index + 1 + self.descendant_count(index),
            None => self.rows.len(),
        }
    }

    /// Cache indexes of the direct children of `parent` (`None` = top-level rows).
    pub(crate) fn child_indexes(&self, parent: Option<usize>) -> Vec<usize> {
        let (start, depth) = match parent {
            Some(index) => match self.rows.get(index) {
                Some(row) => (index + 1, row.tree_depth + 1),
                None => return Vec::new(),
            },
            None => (0, 0),
        };
        let end = self.block_end(parent);
        (start..end)
            .filter(|&i| self.rows[i].tree_depth == depth)
            .collect()
    }

    pub(crate) fn splice_insert(&mut self, index: usize, row: Row<K, D>) {
        debug_assert!(index <= self.rows.len(), "splice_insert out of bounds");
        debug_assert!(!self.index.contains_key(&row.key), "duplicate key in flat cache");
        let index = index.min(self.rows.len());
        self.index.insert(row.key.clone(), index);
        self.rows.insert(index, row);
        self.reindex_from(index + 1);
    }

    /// Removes `count` rows starting at `index` and returns them in order.
    pub(crate) fn splice_remove(&mut self, index: usize, count: usize) -> Vec<Row<K, D>> {
        let end = index.saturating_add(count).min(self.rows.len());
        if index >= end {
            return Vec::new();
        }
        let removed: Vec<_> = self.rows.drain(index..end).collect();
        for row in &removed {
            self.index.remove(&row.key);
        }
        self.reindex_from(index);
        removed
    }

    pub(crate) fn clear(&mut self) {
        self.rows.clear();
        self.index.clear();
    }

    fn reindex_from(&mut self, start: usize) {
        for (i, row) in self.rows.iter().enumerate().skip(start) {
            if let Some(slot) = self.index.get_mut(&row.key) {
                *slot = i;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &'static str, parent: Option<&'static str>, depth: usize) -> Row<&'static str, ()> {
        Row {
            key,
            parent_key: parent,
            index_from_parent: 0,
            tree_depth: depth,
            is_leaf: false,
            data: (),
        }
    }

    fn sample() -> FlatCache<&'static str, ()> {
        let mut c = FlatCache::new();
        c.splice_insert(0, row("A", None, 0));
        c.splice_insert(1, row("A1", Some("A"), 1));
        c.splice_insert(2, row("A1a", Some("A1"), 2));
        c.splice_insert(3, row("A2", Some("A"), 1));
        c.splice_insert(4, row("B", None, 0));
        c
    }

    #[test]
    fn descendant_count_stops_at_same_depth() {
        let c = sample();
        assert_eq!(c.descendant_count(0), 3);
        assert_eq!(c.descendant_count(1), 1);
        assert_eq!(c.descendant_count(3), 0);
        assert_eq!(c.descendant_count(4), 0);
        assert_eq!(c.descendant_count(99), 0);
    }

    #[test]
    fn index_map_follows_splices() {
        let mut c = sample();
        c.splice_insert(0, row("Z", None, 0));
        assert_eq!(c.index_of(&"B"), Some(5));
        assert_eq!(c.index_of(&"A"), Some(1));

        let removed = c.splice_remove(1, 4);
        assert_eq!(removed.len(), 4);
        assert!(!c.contains_key(&"A1a"));
        assert_eq!(c.index_of(&"B"), Some(1));
        assert_eq!(c.last_index(), Some(1));
    }

    #[test]
    fn child_indexes_skip_grandchildren() {
        let c = sample();
        assert_eq!(c.child_indexes(Some(0)), [1usize, 3]);
        assert_eq!(c.child_indexes(None), [0usize, 4]);
        assert_eq!(c.block_end(Some(0)), 4);
        assert_eq!(c.block_end(None), 5);
    }
}
