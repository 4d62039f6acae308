#[cfg(not(feature = "std"))]
use alloc::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "std")]
use std::collections::{HashMap, HashSet};

/// Key → value map used for key lookups (cache index, fetched rows).
#[cfg(feature = "std")]
pub type KeyMap<K, V> = HashMap<K, V>;
#[cfg(not(feature = "std"))]
pub type KeyMap<K, V> = BTreeMap<K, V>;

/// Set of keys (expansion membership, not-done registry).
#[cfg(feature = "std")]
pub type KeySet<K> = HashSet<K>;
#[cfg(not(feature = "std"))]
pub type KeySet<K> = BTreeSet<K>;

/// Requirements for a node key.
///
/// Keys are opaque to the engine: it only clones, compares and hashes them. With `std` this is
/// `Hash + Eq`, without it `Ord`, so the engine can pick a matching map implementation.
#[cfg(feature = "std")]
pub trait TreeKey: core::hash::Hash + Eq + Clone + core::fmt::Debug {}
#[cfg(feature = "std")]
impl<K: core::hash::Hash + Eq + Clone + core::fmt::Debug> TreeKey for K {}

#[cfg(not(feature = "std"))]
pub trait TreeKey: Ord + Clone + core::fmt::Debug {}
#[cfg(not(feature = "std"))]
impl<K: Ord + Clone + core::fmt::Debug> TreeKey for K {}
