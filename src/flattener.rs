use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::emitter::Emitter;
use crate::error::{Error, Result};
use crate::key::{KeyMap, KeySet};
use crate::state::TreeState;
use crate::{
    Caching, Capability, CapabilityName, Criteria, Emptiness, ExpandedNotice, ExpansionSet,
    FetchSize, FlattenerOptions, IterationSpeed, IteratorId, ListenerId, OffsetImplementation,
    RefreshScope, Row, TreeChange, TreeSource, Window,
};

/// A depth-first, flat-list view over a hierarchical [`TreeSource`].
///
/// The flattener only materializes what has been asked for: window requests and iterator pages
/// extend the cache by walking up from the last cached row, expansion changes splice subtrees
/// in and out, and source mutations are reconciled into the cache and re-published in flat
/// coordinates.
///
/// All methods take `&mut self`, so a fetch (including every page of its depth-first walk) always
/// completes before another mutation can be applied. Wrap the flattener in an async mutex when
/// it is shared between tasks.
pub struct TreeFlattener<S: TreeSource> {
    pub(crate) source: S,
    pub(crate) options: FlattenerOptions<S::Key>,
    pub(crate) criteria: Criteria<S::Data>,
    pub(crate) expanded: ExpansionSet<S::Key>,
    pub(crate) state: TreeState<S::Key, S::Data>,
    pub(crate) changes: Emitter<TreeChange<S::Key, S::Data>>,
    pub(crate) expanded_listeners: Emitter<ExpandedNotice<S::Key>>,
}

impl<S: TreeSource> TreeFlattener<S> {
    pub fn new(source: S, options: FlattenerOptions<S::Key>) -> Self {
        fdebug!(
            page_size = options.page_size,
            max_reconcile_passes = options.max_reconcile_passes,
            "TreeFlattener::new"
        );
        Self {
            source,
            expanded: options.expanded.clone(),
            options,
            criteria: Criteria::new(),
            state: TreeState::new(),
            changes: Emitter::new(),
            expanded_listeners: Emitter::new(),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn options(&self) -> &FlattenerOptions<S::Key> {
        &self.options
    }

    pub fn set_page_size(&mut self, page_size: usize) {
        self.options.page_size = page_size.max(1);
    }

    pub fn criteria(&self) -> &Criteria<S::Data> {
        &self.criteria
    }

    /// Replaces the sort/filter criteria. Any change invalidates the whole cache.
    pub fn set_criteria(&mut self, criteria: Criteria<S::Data>) {
        if self.criteria.same_as(&criteria) {
            return;
        }
        fdebug!("criteria changed, resetting");
        self.criteria = criteria;
        self.reset();
        self.publish(TreeChange::Refresh(RefreshScope::All));
    }

    pub fn expanded(&self) -> &ExpansionSet<S::Key> {
        &self.expanded
    }

    /// Subscribes to flat-list change notifications.
    pub fn subscribe(
        &mut self,
        listener: impl Fn(&TreeChange<S::Key, S::Data>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.changes.subscribe(Arc::new(listener))
    }

    pub fn unsubscribe(&mut self, id: ListenerId) -> bool {
        self.changes.unsubscribe(id)
    }

    /// Subscribes to expansion changes; each `set_expanded` call reports `Started` and then
    /// `Settled` or `Failed`.
    pub fn subscribe_expanded(
        &mut self,
        listener: impl Fn(&ExpandedNotice<S::Key>) + Send + Sync + 'static,
    ) -> ListenerId {
        self.expanded_listeners.subscribe(Arc::new(listener))
    }

    pub fn unsubscribe_expanded(&mut self, id: ListenerId) -> bool {
        self.expanded_listeners.unsubscribe(id)
    }

    pub(crate) fn publish(&self, change: TreeChange<S::Key, S::Data>) {
        self.changes.emit(&change);
    }

    /// Drops every cached row and iterator cursor.
    pub(crate) fn reset(&mut self) {
        self.state.reset();
    }

    pub fn len(&self) -> usize {
        self.state.cache.len()
    }

    pub fn rows(&self) -> &[Row<S::Key, S::Data>] {
        self.state.cache.rows()
    }

    pub fn row(&self, index: usize) -> Option<&Row<S::Key, S::Data>> {
        self.state.cache.get(index)
    }

    pub fn index_of(&self, key: &S::Key) -> Option<usize> {
        self.state.cache.index_of(key)
    }

    /// Number of cached rows below the row for `key`.
    pub fn descendant_count(&self, key: &S::Key) -> Option<usize> {
        self.state
            .cache
            .index_of(key)
            .map(|i| self.state.cache.descendant_count(i))
    }

    /// Whether all children of `key` (`None` = the root) are cached.
    pub fn is_done(&self, key: Option<&S::Key>) -> bool {
        self.state.not_done.is_done(key)
    }

    /// Total number of rows, known once the whole expanded tree has been fetched.
    pub fn total_size(&self) -> Option<usize> {
        self.state
            .not_done
            .is_done(None)
            .then(|| self.state.cache.len())
    }

    pub fn is_empty(&self) -> Emptiness {
        if !self.state.cache.is_empty() {
            Emptiness::No
        } else if self.state.not_done.is_done(None) {
            Emptiness::Yes
        } else {
            Emptiness::Unknown
        }
    }

    pub fn capability(&self, name: CapabilityName) -> Option<Capability> {
        match name {
            CapabilityName::FetchByOffset => Some(Capability::FetchByOffset {
                implementation: OffsetImplementation::RandomAccess,
                caching: Caching::VisitedByIterator,
            }),
            CapabilityName::FetchFirst => Some(Capability::FetchFirst {
                iteration_speed: IterationSpeed::Delayed,
            }),
            CapabilityName::FetchByKeys => Some(Capability::FetchByKeys {
                caching: Caching::VisitedByIterator,
            }),
            CapabilityName::Sort | CapabilityName::Filter => None,
        }
    }

    /// Returns the payloads for `keys`: cached rows first, the rest in one source request.
    pub async fn fetch_by_keys(
        &self,
        keys: &[S::Key],
    ) -> Result<KeyMap<S::Key, S::Data>, S::Error> {
        let mut found = KeyMap::new();
        let mut missing = Vec::new();
        for key in keys {
            match self.state.cache.index_of(key).and_then(|i| self.state.cache.get(i)) {
                Some(row) => {
                    found.insert(key.clone(), row.data.clone());
                }
                None => missing.push(key.clone()),
            }
        }
        if !missing.is_empty() {
            ftrace!(missing = missing.len(), "fetch_by_keys: delegating");
            let items = self
                .source
                .fetch_by_keys(&missing)
                .await
                .map_err(Error::Source)?;
            for item in items {
                found.insert(item.key, item.data);
            }
        }
        Ok(found)
    }

    /// Returns the subset of `keys` that exist, consulting the source only for uncached keys.
    pub async fn contains_keys(&self, keys: &[S::Key]) -> Result<KeySet<S::Key>, S::Error> {
        let found = self.fetch_by_keys(keys).await?;
        Ok(keys
            .iter()
            .filter(|k| found.contains_key(*k))
            .cloned()
            .collect())
    }

    /// Starts a new iteration over the flat list at offset 0.
    pub fn open_iterator(&mut self) -> IteratorId {
        self.state.cursors.register()
    }

    pub fn close_iterator(&mut self, id: IteratorId) -> bool {
        self.state.cursors.release(id)
    }

    /// Number of open iterators.
    pub fn iterator_count(&self) -> usize {
        self.state.cursors.len()
    }

    /// Current read offset of an iterator; it moves when rows are spliced before it.
    pub fn iterator_offset(&self, id: IteratorId) -> Option<usize> {
        self.state.cursors.offset(id)
    }

    /// Returns the next `page_size` rows for the iterator and advances it past them.
    pub async fn next_page(&mut self, id: IteratorId) -> Result<Window<S::Key, S::Data>, S::Error> {
        let offset = self
            .state
            .cursors
            .offset(id)
            .ok_or(Error::UnknownIterator(id))?;
        let window = self
            .fetch_window(offset, FetchSize::Count(self.options.page_size.max(1)))
            .await?;
        self.state
            .cursors
            .set_offset(id, window.offset + window.rows.len());
        Ok(window)
    }
}

impl<S: TreeSource + core::fmt::Debug> core::fmt::Debug for TreeFlattener<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("TreeFlattener")
            .field("source", &self.source)
            .field("options", &self.options)
            .field("expanded", &self.expanded)
            .field("rows", &self.state.cache.len())
            .field("root_done", &self.state.not_done.is_done(None))
            .finish()
    }
}
