use crate::ExpansionSet;
use crate::key::TreeKey;

/// Configuration for [`crate::TreeFlattener`].
#[derive(Clone, Debug)]
pub struct FlattenerOptions<K: TreeKey> {
    /// Rows fetched per expansion and per iterator page.
    pub page_size: usize,

    /// Initially expanded nodes.
    pub expanded: ExpansionSet<K>,

    /// Upper bound on reconciliation passes over held additions.
    ///
    /// Additions that are still not insertable when the bound is hit (or when a pass makes no
    /// progress) are dropped; the fetch walk picks them up later if they belong to fetched scope.
    pub max_reconcile_passes: usize,
}

impl<K: TreeKey> FlattenerOptions<K> {
    pub fn new() -> Self {
        Self {
            page_size: 25,
            expanded: ExpansionSet::none(),
            max_reconcile_passes: 16,
        }
    }

    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    pub fn with_expanded(mut self, expanded: ExpansionSet<K>) -> Self {
        self.expanded = expanded;
        self
    }

    pub fn with_max_reconcile_passes(mut self, passes: usize) -> Self {
        self.max_reconcile_passes = passes.max(1);
        self
    }
}

impl<K: TreeKey> Default for FlattenerOptions<K> {
    fn default() -> Self {
        Self::new()
    }
}
