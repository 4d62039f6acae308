use alloc::vec;
use alloc::vec::Vec;

use crate::error::Result;
use crate::fetch::Budget;
use crate::{
    ExpandedNotice, ExpansionDiff, ExpansionSet, ExpansionStatus, RefreshScope, RowChange,
    TreeChange, TreeFlattener, TreeSource,
};

impl<S: TreeSource> TreeFlattener<S> {
    /// Replaces the expansion set and brings the cache in line with it.
    ///
    /// Collapsed nodes lose their cached descendants. Newly expanded nodes that are cached get up
    /// to `page_size` rows of their subtree fetched right after them, closest to the root first.
    /// When an expansion does not complete within that budget everything cached after its last
    /// fetched row is discarded and a scoped refresh for the node is published after the combined
    /// mutation notification.
    ///
    /// Switching between explicit and complement sets resets the whole cache instead.
    pub async fn set_expanded(&mut self, expanded: ExpansionSet<S::Key>) -> Result<(), S::Error> {
        let diff = self.expanded.diff(&expanded);
        self.expanded = expanded;
        self.notify_expanded(ExpansionStatus::Started);

        let result = match diff {
            ExpansionDiff::Incompatible => {
                fdebug!("set_expanded: incompatible expansion sets, resetting");
                self.reset();
                self.publish(TreeChange::Refresh(RefreshScope::All));
                Ok(())
            }
            ExpansionDiff::Incremental {
                to_expand,
                to_collapse,
            } => {
                fdebug!(
                    expand = to_expand.len(),
                    collapse = to_collapse.len(),
                    "set_expanded"
                );
                let mut changes = Vec::new();
                for key in &to_collapse {
                    self.collapse_key(key, &mut changes);
                }
                let mut disregard = None;
                let result = self
                    .expand_keys(to_expand, &mut changes, &mut disregard)
                    .await;
                self.publish_changes(changes, disregard);
                result
            }
        };

        self.notify_expanded(if result.is_ok() {
            ExpansionStatus::Settled
        } else {
            ExpansionStatus::Failed
        });
        result
    }

    fn notify_expanded(&self, status: ExpansionStatus) {
        self.expanded_listeners.emit(&ExpandedNotice {
            value: self.expanded.clone(),
            status,
        });
    }

    fn collapse_key(&mut self, key: &S::Key, changes: &mut Vec<RowChange<S::Key, S::Data>>) {
        self.state.not_done.forget(key);
        let Some(index) = self.state.cache.index_of(key) else {
            return;
        };
        let count = self.state.cache.descendant_count(index);
        ftrace!(?key, index, count, "collapse");
        self.state.remove(index + 1, count, changes);
    }

    /// Fetches the children of each cached key in `keys`, in cache order.
    ///
    /// Stops at the first key whose subtree does not complete within `page_size` rows and
    /// records it in `disregard`. A failed fetch rolls back that key's rows, also makes it the
    /// disregard point, and returns the error.
    pub(crate) async fn expand_keys(
        &mut self,
        keys: Vec<S::Key>,
        changes: &mut Vec<RowChange<S::Key, S::Data>>,
        disregard: &mut Option<S::Key>,
    ) -> Result<(), S::Error> {
        let mut targets: Vec<_> = keys
            .into_iter()
            .filter_map(|k| self.state.cache.index_of(&k).map(|i| (i, k)))
            .collect();
        targets.sort_by_key(|(i, _)| *i);

        for (_, key) in targets {
            let Some(index) = self.state.cache.index_of(&key) else {
                continue;
            };
            if !self.expanded.contains(&key) || !self.source.children(&key).may_have_rows() {
                continue;
            }
            let start = self.state.cache.block_end(Some(index));
            if start > index + 1 && self.state.not_done.is_done(Some(&key)) {
                continue;
            }

            let offset = self.state.cache.child_indexes(Some(index)).len();
            let registry = self.state.not_done.clone();
            let mut cursor = start;
            let mut budget = Budget::Rows(self.options.page_size.max(1));
            let fetched = self
                .fill_scope(Some(key.clone()), offset, &mut cursor, &mut budget)
                .await;

            if let Err(e) = fetched {
                fwarn!(?key, "expansion fetch failed, rolling back");
                self.state.rollback(start, cursor);
                self.state.not_done = registry;
                self.discard_from(start, changes);
                *disregard = Some(key);
                return Err(e);
            }

            for i in start..cursor {
                if let Some(row) = self.state.cache.get(i) {
                    changes.push(RowChange::Added {
                        index: i,
                        row: row.clone(),
                    });
                }
            }

            if !self.state.not_done.is_done(Some(&key)) {
                fdebug!(?key, index = cursor, "expansion incomplete, disregarding the rest");
                self.discard_from(cursor, changes);
                *disregard = Some(key);
                break;
            }
        }
        Ok(())
    }

    /// Discards every row at or after `index` and reopens the new tail so the fetch walk
    /// resumes from it.
    pub(crate) fn discard_from(
        &mut self,
        index: usize,
        changes: &mut Vec<RowChange<S::Key, S::Data>>,
    ) {
        let len = self.state.cache.len();
        if index < len {
            self.state.remove(index, len - index, changes);
        }

        if let Some(last) = self.state.cache.last_index() {
            let mut reopen = self.state.ancestors(last);
            if let Some(row) = self.state.cache.get(last) {
                if self.expanded.contains(&row.key) && self.source.children(&row.key).may_have_rows()
                {
                    reopen.push(row.key.clone());
                }
            }
            for key in &reopen {
                self.state.not_done.mark_not_done(Some(key));
            }
        }
        self.state.not_done.mark_not_done(None);
    }

    /// Publishes the combined mutation for `changes`, then a scoped refresh if a disregard point
    /// was hit.
    pub(crate) fn publish_changes(
        &self,
        changes: Vec<RowChange<S::Key, S::Data>>,
        disregard: Option<S::Key>,
    ) {
        if !changes.is_empty() {
            self.publish(TreeChange::Mutate(crate::FlatMutation { changes }));
        }
        if let Some(key) = disregard {
            self.publish(TreeChange::Refresh(RefreshScope::Keys(vec![key])));
        }
    }
}
