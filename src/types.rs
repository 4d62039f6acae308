use alloc::vec::Vec;

/// A row of the flattened tree: one materialized node plus its tree metadata.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Row<K, D> {
    pub key: K,
    /// Owning node, `None` for top-level rows.
    pub parent_key: Option<K>,
    /// Position among the cached siblings (0-based, contiguous).
    pub index_from_parent: usize,
    /// `0` for top-level rows.
    pub tree_depth: usize,
    /// True when the source reports no children for this key at all.
    pub is_leaf: bool,
    pub data: D,
}

/// A keyed payload as returned by a [`crate::TreeSource`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Item<K, D> {
    pub key: K,
    pub data: D,
}

impl<K, D> Item<K, D> {
    pub fn new(key: K, data: D) -> Self {
        Self { key, data }
    }
}

/// How many rows a window request asks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FetchSize {
    Count(usize),
    /// Everything reachable from the offset on; forces the whole expanded tree to be fetched.
    All,
}

/// A slice of the flat list returned to consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Window<K, D> {
    pub offset: usize,
    pub rows: Vec<Row<K, D>>,
    /// No rows exist past this window.
    pub done: bool,
}

impl<K, D> Window<K, D> {
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.rows.iter().map(|r| &r.key)
    }
}

/// Tri-state answer for emptiness questions that may not be known without fetching.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Emptiness {
    Yes,
    No,
    Unknown,
}

/// Handle of a consumer iterating the flat list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct IteratorId(pub(crate) u64);

/// Handle of a registered listener.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ListenerId(pub(crate) u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum CapabilityName {
    FetchByOffset,
    FetchFirst,
    FetchByKeys,
    Sort,
    Filter,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum OffsetImplementation {
    RandomAccess,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Caching {
    /// Rows already handed out by an iterator or window request are served from memory.
    VisitedByIterator,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum IterationSpeed {
    /// Pages may require several source round trips (one per walked subtree).
    Delayed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Capability {
    FetchByOffset {
        implementation: OffsetImplementation,
        caching: Caching,
    },
    FetchFirst {
        iteration_speed: IterationSpeed,
    },
    FetchByKeys {
        caching: Caching,
    },
}
