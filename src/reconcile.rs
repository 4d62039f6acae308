use alloc::vec;
use alloc::vec::Vec;
use core::cmp::Ordering;

use crate::error::Result;
use crate::{
    Addition, InsertPosition, Mutation, RefreshScope, Row, RowChange, SourceEvent, TreeChange,
    TreeFlattener, TreeSource, Update,
};

/// Where an addition lands: flat index and sibling index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Slot {
    index: usize,
    index_from_parent: usize,
}

impl<S: TreeSource> TreeFlattener<S> {
    /// Applies a notification from the source.
    ///
    /// Events must be handed over in the order the source emitted them; each one is fully
    /// reconciled (and re-published to subscribers) before this returns.
    pub async fn handle_event(
        &mut self,
        event: SourceEvent<S::Key, S::Data>,
    ) -> Result<(), S::Error> {
        match event {
            SourceEvent::Refresh(RefreshScope::All) => {
                fdebug!("source refresh, resetting");
                self.reset();
                self.publish(TreeChange::Refresh(RefreshScope::All));
                Ok(())
            }
            SourceEvent::Refresh(RefreshScope::Keys(keys)) => {
                self.refresh_keys(keys);
                Ok(())
            }
            SourceEvent::Mutate(mutation) => self.apply_mutation(mutation).await,
        }
    }

    /// Invalidates everything from the first cached refreshed key on: its subtree and all rows
    /// after it are discarded and re-fetched on demand.
    fn refresh_keys(&mut self, keys: Vec<S::Key>) {
        let first = keys
            .iter()
            .filter_map(|k| self.state.cache.index_of(k))
            .min();
        let mut changes = Vec::new();
        if let Some(index) = first {
            fdebug!(index, "scoped source refresh");
            self.discard_from(index + 1, &mut changes);
        }
        if !changes.is_empty() {
            self.publish(TreeChange::Mutate(crate::FlatMutation { changes }));
        }
        self.publish(TreeChange::Refresh(RefreshScope::Keys(keys)));
    }

    async fn apply_mutation(
        &mut self,
        mutation: Mutation<S::Key, S::Data>,
    ) -> Result<(), S::Error> {
        let Mutation {
            removed,
            added,
            updated,
        } = mutation;
        let mut changes = Vec::new();

        for key in &removed {
            self.remove_key(key, &mut changes);
        }

        let inserted = self.reconcile_additions(added, &mut changes);
        let mut disregard = None;
        let fetched = self
            .expand_keys(inserted, &mut changes, &mut disregard)
            .await;

        for update in updated {
            self.update_row(update, &mut changes);
        }

        self.publish_changes(changes, disregard);
        fetched
    }

    fn remove_key(&mut self, key: &S::Key, changes: &mut Vec<RowChange<S::Key, S::Data>>) {
        let Some(index) = self.state.cache.index_of(key) else {
            return;
        };
        let Some(depth) = self.state.cache.get(index).map(|r| r.tree_depth) else {
            return;
        };
        let count = 1 + self.state.cache.descendant_count(index);
        ftrace!(?key, index, count, "remove");
        self.state.remove(index, count, changes);
        self.state.renumber_siblings(index, depth, -1);
    }

    fn update_row(
        &mut self,
        update: Update<S::Key, S::Data>,
        changes: &mut Vec<RowChange<S::Key, S::Data>>,
    ) {
        let Some(index) = self.state.cache.index_of(&update.key) else {
            return;
        };
        let is_leaf = self.source.children(&update.key).is_leaf();
        if let Some(row) = self.state.cache.get_mut(index) {
            row.data = update.data;
            row.is_leaf = is_leaf;
            changes.push(RowChange::Updated {
                index,
                row: row.clone(),
            });
        }
    }

    /// Inserts additions until no held addition becomes insertable (or the pass limit is hit).
    ///
    /// Returns the keys of inserted rows whose children should be fetched.
    fn reconcile_additions(
        &mut self,
        added: Vec<Addition<S::Key, S::Data>>,
        changes: &mut Vec<RowChange<S::Key, S::Data>>,
    ) -> Vec<S::Key> {
        let mut pending: Vec<_> = added
            .into_iter()
            .filter(|a| !self.state.cache.contains_key(&a.key))
            .collect();
        let mut inserted = Vec::new();
        let mut passes = 0;

        while !pending.is_empty() {
            if passes == self.options.max_reconcile_passes {
                fwarn!(held = pending.len(), passes, "reconcile pass limit reached");
                break;
            }
            passes += 1;
            let before = pending.len();
            pending = self.reconcile_pass(pending, changes, &mut inserted);
            if pending.len() == before {
                break;
            }
        }

        if !pending.is_empty() {
            fdebug!(dropped = pending.len(), "dropping additions outside the fetched scope");
        }
        inserted
    }

    /// One pass over held additions; returns those still not insertable.
    fn reconcile_pass(
        &mut self,
        pending: Vec<Addition<S::Key, S::Data>>,
        changes: &mut Vec<RowChange<S::Key, S::Data>>,
        inserted: &mut Vec<S::Key>,
    ) -> Vec<Addition<S::Key, S::Data>> {
        let mut held = Vec::new();
        let mut buckets: Vec<(Option<S::Key>, Vec<Addition<S::Key, S::Data>>)> = Vec::new();

        for addition in pending {
            if !self.can_insert(&addition) {
                held.push(addition);
                continue;
            }
            if self.criteria.sort.is_none() {
                if let InsertPosition::Index(_) = addition.position {
                    match buckets.iter_mut().find(|(p, _)| *p == addition.parent_key) {
                        Some((_, bucket)) => bucket.push(addition),
                        None => buckets.push((addition.parent_key.clone(), vec![addition])),
                    }
                    continue;
                }
            }
            if let Some(rejected) = self.try_insert(addition, changes, inserted) {
                held.push(rejected);
            }
        }

        for (_, mut bucket) in buckets {
            bucket.sort_by_key(|a| match a.position {
                InsertPosition::Index(i) => i,
                _ => usize::MAX,
            });
            for addition in bucket {
                if let Some(rejected) = self.try_insert(addition, changes, inserted) {
                    held.push(rejected);
                }
            }
        }
        held
    }

    /// Parent present and expanded (or the root), key not cached yet, and passes the filter.
    fn can_insert(&self, addition: &Addition<S::Key, S::Data>) -> bool {
        if self.state.cache.contains_key(&addition.key) || !self.criteria.accepts(&addition.data)
        {
            return false;
        }
        match &addition.parent_key {
            Some(parent) => {
                self.state.cache.contains_key(parent) && self.expanded.contains(parent)
            }
            None => true,
        }
    }

    /// Inserts `addition` if a position can be determined, otherwise hands it back.
    fn try_insert(
        &mut self,
        addition: Addition<S::Key, S::Data>,
        changes: &mut Vec<RowChange<S::Key, S::Data>>,
        inserted: &mut Vec<S::Key>,
    ) -> Option<Addition<S::Key, S::Data>> {
        let parent_index = match addition
            .parent_key
            .as_ref()
            .map(|p| self.state.cache.index_of(p))
        {
            Some(Some(i)) => Some(i),
            Some(None) => return Some(addition),
            None => None,
        };
        let Some(slot) = self.slot_for(&addition, parent_index) else {
            return Some(addition);
        };

        let depth = parent_index
            .and_then(|i| self.state.cache.get(i))
            .map_or(0, |p| p.tree_depth + 1);
        let children = self.source.children(&addition.key);
        if children.may_have_rows() && self.expanded.contains(&addition.key) {
            self.state.not_done.mark_not_done(Some(&addition.key));
            inserted.push(addition.key.clone());
        }
        let row = Row {
            key: addition.key,
            parent_key: addition.parent_key,
            index_from_parent: slot.index_from_parent,
            tree_depth: depth,
            is_leaf: children.is_leaf(),
            data: addition.data,
        };
        ftrace!(key = ?row.key, index = slot.index, "insert addition");

        self.state.renumber_siblings(slot.index, depth, 1);
        changes.push(RowChange::Added {
            index: slot.index,
            row: row.clone(),
        });
        self.state.insert(slot.index, row);
        None
    }

    fn slot_for(
        &self,
        addition: &Addition<S::Key, S::Data>,
        parent_index: Option<usize>,
    ) -> Option<Slot> {
        let cache = &self.state.cache;
        let siblings = cache.child_indexes(parent_index);
        let parent_done = self.state.not_done.is_done(addition.parent_key.as_ref());
        let append = Slot {
            index: cache.block_end(parent_index),
            index_from_parent: siblings.len(),
        };
        let before = |i: usize| {
            cache.get(i).map(|r| Slot {
                index: i,
                index_from_parent: r.index_from_parent,
            })
        };

        if let Some(sort) = &self.criteria.sort {
            let next = siblings.iter().copied().find(|&i| {
                cache
                    .get(i)
                    .is_some_and(|r| sort(&addition.data, &r.data) == Ordering::Less)
            });
            return match next {
                Some(i) => before(i),
                None => parent_done.then_some(append),
            };
        }

        match &addition.position {
            InsertPosition::Before(sibling) => {
                let target = cache
                    .index_of(sibling)
                    .filter(|&i| cache.get(i).is_some_and(|r| r.parent_key == addition.parent_key));
                match target {
                    Some(i) => before(i),
                    None => parent_done.then_some(append),
                }
            }
            InsertPosition::Index(0) => Some(Slot {
                index: parent_index.map_or(0, |p| p + 1),
                index_from_parent: 0,
            }),
            InsertPosition::Index(i) if *i < siblings.len() => {
                let prev = siblings[*i - 1];
                Some(Slot {
                    index: prev + 1 + cache.descendant_count(prev),
                    index_from_parent: *i,
                })
            }
            InsertPosition::Index(_) => parent_done.then_some(append),
            InsertPosition::Unspecified => parent_done.then_some(append),
        }
    }
}
