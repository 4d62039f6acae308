use alloc::sync::Arc;
use alloc::vec::Vec;
use core::cmp::Ordering;
use core::future::Future;

use crate::Item;
use crate::key::TreeKey;

/// Orders two payloads; used to place added rows among already cached siblings.
pub type SortComparator<D> = Arc<dyn Fn(&D, &D) -> Ordering + Send + Sync>;

/// Decides whether a payload is visible under the active filter.
pub type FilterPredicate<D> = Arc<dyn Fn(&D) -> bool + Send + Sync>;

/// Sort and filter criteria forwarded to the source.
///
/// The engine does not sort or filter fetched pages itself; it hands the criteria to
/// [`TreeSource::fetch_by_offset`] and only evaluates them when reconciling added rows.
/// Criteria are compared by identity (`Arc::ptr_eq`), so keep the same `Arc`s to avoid a reset.
pub struct Criteria<D> {
    pub sort: Option<SortComparator<D>>,
    pub filter: Option<FilterPredicate<D>>,
}

impl<D> Criteria<D> {
    pub fn new() -> Self {
        Self {
            sort: None,
            filter: None,
        }
    }

    pub fn with_sort(mut self, sort: impl Fn(&D, &D) -> Ordering + Send + Sync + 'static) -> Self {
        self.sort = Some(Arc::new(sort));
        self
    }

    pub fn with_filter(mut self, filter: impl Fn(&D) -> bool + Send + Sync + 'static) -> Self {
        self.filter = Some(Arc::new(filter));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.sort.is_none() && self.filter.is_none()
    }

    /// Identity comparison of both criteria.
    pub fn same_as(&self, other: &Self) -> bool {
        fn same<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
            match (a, b) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
        }
        same(&self.sort, &other.sort) && same(&self.filter, &other.filter)
    }

    pub(crate) fn accepts(&self, data: &D) -> bool {
        self.filter.as_ref().is_none_or(|f| f(data))
    }
}

impl<D> Default for Criteria<D> {
    fn default() -> Self {
        Self::new()
    }
}

impl<D> Clone for Criteria<D> {
    fn clone(&self) -> Self {
        Self {
            sort: self.sort.clone(),
            filter: self.filter.clone(),
        }
    }
}

impl<D> core::fmt::Debug for Criteria<D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Criteria")
            .field("sort", &self.sort.as_ref().map(|_| ".."))
            .field("filter", &self.filter.as_ref().map(|_| ".."))
            .finish()
    }
}

/// What the source knows about a node's children.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Children {
    /// No child provider: the node is a leaf.
    None,
    /// A child provider exists but has no rows.
    Empty,
    NonEmpty,
    /// A child provider exists; emptiness is only known after fetching.
    Unknown,
}

impl Children {
    pub fn is_leaf(self) -> bool {
        matches!(self, Self::None)
    }

    /// Whether fetching children could return rows.
    pub fn may_have_rows(self) -> bool {
        matches!(self, Self::NonEmpty | Self::Unknown)
    }
}

/// A paged request for the children of `parent` (`None` = top-level rows).
#[derive(Debug)]
pub struct OffsetRequest<'a, K, D> {
    pub parent: Option<&'a K>,
    pub offset: usize,
    pub size: usize,
    pub criteria: &'a Criteria<D>,
}

impl<K, D> Clone for OffsetRequest<'_, K, D> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K, D> Copy for OffsetRequest<'_, K, D> {}

/// One page of children. `done` means no children exist past this page.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Page<K, D> {
    pub rows: Vec<Item<K, D>>,
    pub done: bool,
}

/// The hierarchical data source the engine flattens.
///
/// The engine never mutates the source; it only reads pages and keyed rows from it. Source
/// mutations are reported back through [`crate::TreeFlattener::handle_event`].
pub trait TreeSource {
    type Key: TreeKey;
    type Data: Clone;
    type Error;

    /// Fetches up to `request.size` children of `request.parent`, starting at `request.offset`,
    /// sorted and filtered according to `request.criteria`.
    fn fetch_by_offset(
        &self,
        request: OffsetRequest<'_, Self::Key, Self::Data>,
    ) -> impl Future<Output = Result<Page<Self::Key, Self::Data>, Self::Error>>;

    /// Fetches the rows for `keys`; unknown keys are simply absent from the result.
    fn fetch_by_keys(
        &self,
        keys: &[Self::Key],
    ) -> impl Future<Output = Result<Vec<Item<Self::Key, Self::Data>>, Self::Error>>;

    fn children(&self, key: &Self::Key) -> Children;
}
