use alloc::collections::VecDeque;
use alloc::vec;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::{FetchSize, Item, OffsetRequest, Row, TreeFlattener, TreeSource, Window};

/// Remaining number of rows a request may still append.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Budget {
    Rows(usize),
    Unlimited,
}

impl Budget {
    pub(crate) fn exhausted(self) -> bool {
        matches!(self, Self::Rows(0))
    }

    fn page_size(self, default: usize) -> usize {
        match self {
            Self::Rows(n) => n,
            Self::Unlimited => default,
        }
    }

    fn consume(&mut self) {
        if let Self::Rows(n) = self {
            *n = n.saturating_sub(1);
        }
    }
}

/// One level of the depth-first walk: a parent whose children are being fetched.
struct Frame<K, D> {
    parent: Option<K>,
    child_depth: usize,
    /// Source offset of the next page.
    next_offset: usize,
    /// Sibling index for the next inserted child.
    next_sibling: usize,
    pending: VecDeque<Item<K, D>>,
    exhausted: bool,
    /// Every fetched child was inserted.
    complete: bool,
}

impl<K, D> Frame<K, D> {
    fn new(parent: Option<K>, child_depth: usize, offset: usize) -> Self {
        Self {
            parent,
            child_depth,
            next_offset: offset,
            next_sibling: offset,
            pending: VecDeque::new(),
            exhausted: false,
            complete: true,
        }
    }
}

impl<S: TreeSource> TreeFlattener<S> {
    /// Returns the rows at `[offset, offset + size)`, fetching from the source only when the
    /// cache does not cover the range yet.
    ///
    /// With [`FetchSize::All`] the whole expanded tree is fetched before returning. On error the
    /// cache is left exactly as it was before the call.
    pub async fn fetch_window(
        &mut self,
        offset: usize,
        size: FetchSize,
    ) -> Result<Window<S::Key, S::Data>, S::Error> {
        if !self.covers(offset, size) {
            let len = self.state.cache.len();
            let mut budget = match size {
                FetchSize::Count(n) => Budget::Rows(offset.saturating_add(n).saturating_sub(len)),
                FetchSize::All => Budget::Unlimited,
            };
            fdebug!(offset, len, ?size, "fetch_window: extending cache");
            self.extend(&mut budget).await?;
        }
        Ok(self.window(offset, size))
    }

    fn covers(&self, offset: usize, size: FetchSize) -> bool {
        if self.state.not_done.is_done(None) {
            return true;
        }
        match size {
            FetchSize::Count(n) => offset.saturating_add(n) <= self.state.cache.len(),
            FetchSize::All => false,
        }
    }

    fn window(&self, offset: usize, size: FetchSize) -> Window<S::Key, S::Data> {
        let rows = self.state.cache.rows();
        let start = offset.min(rows.len());
        let end = match size {
            FetchSize::Count(n) => offset.saturating_add(n).min(rows.len()),
            FetchSize::All => rows.len(),
        };
        Window {
            offset,
            rows: rows[start..end.max(start)].to_vec(),
            done: self.state.not_done.is_done(None) && end >= rows.len(),
        }
    }

    /// Appends rows at the end of the cache by walking up from the last cached row.
    ///
    /// Rolls back every row appended by this call if any page fetch fails.
    async fn extend(&mut self, budget: &mut Budget) -> Result<(), S::Error> {
        let start = self.state.cache.len();
        let registry = self.state.not_done.clone();
        if let Err(e) = self.walk_tail(budget).await {
            fwarn!(appended = self.state.cache.len() - start, "fetch failed, rolling back");
            let end = self.state.cache.len();
            self.state.rollback(start, end);
            self.state.not_done = registry;
            return Err(e);
        }
        Ok(())
    }

    async fn walk_tail(&mut self, budget: &mut Budget) -> Result<(), S::Error> {
        for (scope, offset) in self.tail_scopes() {
            if budget.exhausted() {
                break;
            }
            if self.state.not_done.is_done(scope.as_ref()) {
                continue;
            }
            let mut cursor = self.state.cache.len();
            self.fill_scope(scope, offset, &mut cursor, budget).await?;
        }
        Ok(())
    }

    /// Scopes that may have children past the end of the cache, innermost first, each with the
    /// number of its children already cached.
    ///
    /// These are the last row itself (when expanded), its ancestors, and the virtual root.
    fn tail_scopes(&self) -> Vec<(Option<S::Key>, usize)> {
        let cache = &self.state.cache;
        let Some(last) = cache.last_index().and_then(|i| cache.get(i)) else {
            return vec![(None, 0)];
        };

        let mut scopes = Vec::new();
        if !last.is_leaf && self.expanded.contains(&last.key) {
            scopes.push((Some(last.key.clone()), 0));
        }
        let mut current = last;
        loop {
            let next = current.index_from_parent + 1;
            match &current.parent_key {
                Some(parent) => {
                    scopes.push((Some(parent.clone()), next));
                    match cache.index_of(parent).and_then(|i| cache.get(i)) {
                        Some(row) => current = row,
                        None => break,
                    }
                }
                None => {
                    scopes.push((None, next));
                    break;
                }
            }
        }
        scopes
    }

    /// Depth-first, pre-order fetch of the children of `scope` starting at source offset
    /// `offset`, inserting rows at `*cursor` and advancing it.
    ///
    /// Every fetched child that is expanded and may have rows is marked not-done and descended
    /// into before its next sibling. Stops as soon as `budget` is exhausted; frames left on the
    /// stack stay not-done. A frame is marked done once its last page reported `done` and every
    /// fetched child was inserted.
    pub(crate) async fn fill_scope(
        &mut self,
        scope: Option<S::Key>,
        offset: usize,
        cursor: &mut usize,
        budget: &mut Budget,
    ) -> Result<(), S::Error> {
        let child_depth = match &scope {
            Some(key) => match self.state.cache.index_of(key).and_then(|i| self.state.cache.get(i)) {
                Some(row) => row.tree_depth + 1,
                None => return Ok(()),
            },
            None => 0,
        };
        self.state.not_done.mark_not_done(scope.as_ref());

        let page_size = self.options.page_size.max(1);
        let mut stack = vec![Frame::new(scope, child_depth, offset)];

        while let Some(frame) = stack.last_mut() {
            let Some(item) = frame.pending.pop_front() else {
                if frame.exhausted {
                    if frame.complete {
                        self.state.not_done.mark_done(frame.parent.as_ref());
                    }
                    stack.pop();
                    continue;
                }
                if budget.exhausted() {
                    break;
                }
                let request = OffsetRequest {
                    parent: frame.parent.as_ref(),
                    offset: frame.next_offset,
                    size: budget.page_size(page_size).max(1),
                    criteria: &self.criteria,
                };
                ftrace!(parent = ?frame.parent, offset = frame.next_offset, size = request.size, "fetch_by_offset");
                let page = self
                    .source
                    .fetch_by_offset(request)
                    .await
                    .map_err(Error::Source)?;
                frame.next_offset += page.rows.len();
                if page.rows.is_empty() && !page.done {
                    // No progress possible in this pass.
                    frame.complete = false;
                }
                frame.exhausted = page.done || page.rows.is_empty();
                frame.pending.extend(page.rows);
                continue;
            };

            if budget.exhausted() {
                break;
            }
            if self.state.cache.contains_key(&item.key) || !self.criteria.accepts(&item.data) {
                ftrace!(key = ?item.key, "discarding fetched row");
                frame.complete = false;
                continue;
            }

            let children = self.source.children(&item.key);
            let descend = children.may_have_rows() && self.expanded.contains(&item.key);
            let depth = frame.child_depth;
            let row = Row {
                key: item.key,
                parent_key: frame.parent.clone(),
                index_from_parent: frame.next_sibling,
                tree_depth: depth,
                is_leaf: children.is_leaf(),
                data: item.data,
            };
            frame.next_sibling += 1;

            let key = descend.then(|| row.key.clone());
            self.state.insert(*cursor, row);
            *cursor += 1;
            budget.consume();

            if let Some(key) = key {
                self.state.not_done.mark_not_done(Some(&key));
                stack.push(Frame::new(Some(key), depth + 1, 0));
            }
        }
        Ok(())
    }
}
