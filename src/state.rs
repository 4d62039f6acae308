use alloc::vec::Vec;

use crate::cache::FlatCache;
use crate::key::TreeKey;
use crate::registry::NotDoneRegistry;
use crate::tracker::OffsetTracker;
use crate::{Row, RowChange};

/// The engine's mutable state: flat cache, not-done registry and iterator cursors.
///
/// All row splices go through this type so cursors move once per row, in splice order, and
/// removed keys leave the registry.
#[derive(Clone, Debug)]
pub(crate) struct TreeState<K, D> {
    pub(crate) cache: FlatCache<K, D>,
    pub(crate) not_done: NotDoneRegistry<K>,
    pub(crate) cursors: OffsetTracker,
}

impl<K: TreeKey, D: Clone> TreeState<K, D> {
    pub(crate) fn new() -> Self {
        Self {
            cache: FlatCache::new(),
            not_done: NotDoneRegistry::new(),
            cursors: OffsetTracker::default(),
        }
    }

    pub(crate) fn insert(&mut self, index: usize, row: Row<K, D>) {
        self.cache.splice_insert(index, row);
        self.cursors.on_insert_at(index);
    }

    /// Removes `count` rows at `index`, recording one `Removed` change per row.
    pub(crate) fn remove(&mut self, index: usize, count: usize, changes: &mut Vec<RowChange<K, D>>) {
        let removed = self.cache.splice_remove(index, count);
        for row in removed {
            self.cursors.on_remove_at(index);
            self.not_done.forget(&row.key);
            changes.push(RowChange::Removed { index, row });
        }
    }

    /// Removes rows inserted at `start..end` without recording changes (failed fetch rollback).
    pub(crate) fn rollback(&mut self, start: usize, end: usize) {
        let removed = self.cache.splice_remove(start, end.saturating_sub(start));
        for _ in removed {
            self.cursors.on_remove_at(start);
        }
    }

    /// Adds `delta` to the sibling index of every row at depth `depth`, starting at `from`, until
    /// the enclosing parent block ends.
    pub(crate) fn renumber_siblings(&mut self, from: usize, depth: usize, delta: isize) {
        let mut i = from;
        while let Some(row) = self.cache.get_mut(i) {
            if row.tree_depth < depth {
                break;
            }
            if row.tree_depth == depth {
                row.index_from_parent = row.index_from_parent.saturating_add_signed(delta);
            }
            i += 1;
        }
    }

    /// Keys of the ancestors of the row at `index`, nearest first.
    pub(crate) fn ancestors(&self, index: usize) -> Vec<K> {
        let mut out = Vec::new();
        let mut parent = self.cache.get(index).and_then(|r| r.parent_key.clone());
        while let Some(key) = parent {
            parent = self
                .cache
                .index_of(&key)
                .and_then(|i| self.cache.get(i))
                .and_then(|r| r.parent_key.clone());
            out.push(key);
        }
        out
    }

    /// Drops all rows and cursors; the root becomes not-done.
    pub(crate) fn reset(&mut self) {
        self.cache.clear();
        self.not_done.reset();
        self.cursors.invalidate_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: u32, parent: Option<u32>, index: usize, depth: usize) -> Row<u32, ()> {
        Row {
            key,
            parent_key: parent,
            index_from_parent: index,
            tree_depth: depth,
            is_leaf: false,
            data: (),
        }
    }

    #[test]
    fn remove_records_changes_and_moves_cursors_per_row() {
        let mut s = TreeState::new();
        s.insert(0, row(1, None, 0, 0));
        s.insert(1, row(2, Some(1), 0, 1));
        s.insert(2, row(3, Some(1), 1, 1));
        s.insert(3, row(4, None, 1, 0));
        s.not_done.mark_not_done(Some(&2));

        let id = s.cursors.register();
        s.cursors.set_offset(id, 4);

        let mut changes = Vec::new();
        s.remove(1, 2, &mut changes);
        assert_eq!(changes.len(), 2);
        assert!(changes.iter().all(|c| c.index() == 1));
        assert_eq!(s.cursors.offset(id), Some(2));
        assert!(s.not_done.is_done(Some(&2)));
        assert_eq!(s.cache.index_of(&4), Some(1));
    }

    #[test]
    fn renumber_stops_at_parent_block_end() {
        let mut s = TreeState::new();
        s.insert(0, row(1, None, 0, 0));
        s.insert(1, row(2, Some(1), 0, 1));
        s.insert(2, row(5, Some(2), 0, 2));
        s.insert(3, row(3, Some(1), 1, 1));
        s.insert(4, row(4, None, 1, 0));
        s.insert(5, row(6, Some(4), 0, 1));

        s.renumber_siblings(1, 1, 1);
        let ifp: Vec<_> = s.cache.rows().iter().map(|r| r.index_from_parent).collect();
        assert_eq!(ifp, [0usize, 1, 0, 2, 1, 0]);

        assert_eq!(s.ancestors(2), [2u32, 1]);
        assert!(s.ancestors(0).is_empty());
    }
}
