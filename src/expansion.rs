use alloc::vec::Vec;

use crate::key::{KeySet, TreeKey};

/// Which nodes are expanded.
///
/// `Explicit` lists the expanded keys; `Complement` expands everything except the listed keys.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExpansionSet<K: TreeKey> {
    Explicit(KeySet<K>),
    Complement(KeySet<K>),
}

impl<K: TreeKey> ExpansionSet<K> {
    /// Nothing expanded.
    pub fn none() -> Self {
        Self::Explicit(KeySet::new())
    }

    /// Everything expanded.
    pub fn all() -> Self {
        Self::Complement(KeySet::new())
    }

    pub fn explicit(keys: impl IntoIterator<Item = K>) -> Self {
        Self::Explicit(keys.into_iter().collect())
    }

    pub fn all_except(keys: impl IntoIterator<Item = K>) -> Self {
        Self::Complement(keys.into_iter().collect())
    }

    pub fn contains(&self, key: &K) -> bool {
        match self {
            Self::Explicit(keys) => keys.contains(key),
            Self::Complement(deleted) => !deleted.contains(key),
        }
    }

    /// Returns a copy with `key` expanded.
    pub fn with(&self, key: K) -> Self {
        let mut next = self.clone();
        match &mut next {
            Self::Explicit(keys) => {
                keys.insert(key);
            }
            Self::Complement(deleted) => {
                deleted.remove(&key);
            }
        }
        next
    }

    /// Returns a copy with `key` collapsed.
    pub fn without(&self, key: &K) -> Self {
        let mut next = self.clone();
        match &mut next {
            Self::Explicit(keys) => {
                keys.remove(key);
            }
            Self::Complement(deleted) => {
                deleted.insert(key.clone());
            }
        }
        next
    }

    /// Computes the keys that changed state between `self` (old) and `next`.
    pub fn diff(&self, next: &Self) -> ExpansionDiff<K> {
        match (self, next) {
            (Self::Explicit(old), Self::Explicit(new)) => ExpansionDiff::Incremental {
                to_expand: new.difference(old).cloned().collect(),
                to_collapse: old.difference(new).cloned().collect(),
            },
            (Self::Complement(old), Self::Complement(new)) => ExpansionDiff::Incremental {
                to_expand: old.difference(new).cloned().collect(),
                to_collapse: new.difference(old).cloned().collect(),
            },
            _ => ExpansionDiff::Incompatible,
        }
    }
}

impl<K: TreeKey> Default for ExpansionSet<K> {
    fn default() -> Self {
        Self::none()
    }
}

/// Result of diffing two expansion sets.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExpansionDiff<K> {
    Incremental {
        to_expand: Vec<K>,
        to_collapse: Vec<K>,
    },
    /// The representations differ; no incremental diff is possible.
    Incompatible,
}

/// Progress of a [`crate::TreeFlattener::set_expanded`] call, delivered to expansion listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ExpansionStatus {
    Started,
    Settled,
    Failed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ExpandedNotice<K: TreeKey> {
    pub value: ExpansionSet<K>,
    pub status: ExpansionStatus,
}
