use alloc::vec::Vec;

use crate::Row;

/// Where an added row goes among its siblings.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InsertPosition<K> {
    /// No ordering signal; the row is appended once the parent is fully fetched.
    Unspecified,
    /// Target sibling index under the parent.
    Index(usize),
    /// Insert right before this sibling.
    Before(K),
}

/// A row the source added.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Addition<K, D> {
    pub key: K,
    pub parent_key: Option<K>,
    pub data: D,
    pub position: InsertPosition<K>,
}

/// A row whose payload the source replaced.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Update<K, D> {
    pub key: K,
    pub data: D,
}

/// A batch of source mutations. Applied as removals, then additions, then updates.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Mutation<K, D> {
    pub removed: Vec<K>,
    pub added: Vec<Addition<K, D>>,
    pub updated: Vec<Update<K, D>>,
}

impl<K, D> Default for Mutation<K, D> {
    fn default() -> Self {
        Self {
            removed: Vec::new(),
            added: Vec::new(),
            updated: Vec::new(),
        }
    }
}

impl<K, D> Mutation<K, D> {
    pub fn is_empty(&self) -> bool {
        self.removed.is_empty() && self.added.is_empty() && self.updated.is_empty()
    }

    pub fn with_removed(mut self, key: K) -> Self {
        self.removed.push(key);
        self
    }

    pub fn with_added(
        mut self,
        key: K,
        parent_key: Option<K>,
        data: D,
        position: InsertPosition<K>,
    ) -> Self {
        self.added.push(Addition {
            key,
            parent_key,
            data,
            position,
        });
        self
    }

    pub fn with_updated(mut self, key: K, data: D) -> Self {
        self.updated.push(Update { key, data });
        self
    }
}

/// Which part of the data a refresh invalidates.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RefreshScope<K> {
    All,
    Keys(Vec<K>),
}

/// A notification emitted by the source.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SourceEvent<K, D> {
    Mutate(Mutation<K, D>),
    Refresh(RefreshScope<K>),
}

/// A single splice of the flat list, with the flat index at the time it happened.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RowChange<K, D> {
    Removed { index: usize, row: Row<K, D> },
    Added { index: usize, row: Row<K, D> },
    Updated { index: usize, row: Row<K, D> },
}

impl<K, D> RowChange<K, D> {
    pub fn index(&self) -> usize {
        match self {
            Self::Removed { index, .. } | Self::Added { index, .. } | Self::Updated { index, .. } => {
                *index
            }
        }
    }

    pub fn row(&self) -> &Row<K, D> {
        match self {
            Self::Removed { row, .. } | Self::Added { row, .. } | Self::Updated { row, .. } => row,
        }
    }
}

/// Splices applied to the flat list, in order.
///
/// Replaying `changes` on a mirror of the previous flat list reproduces the current row order.
/// Sibling renumbering of rows that were not themselves spliced is not recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FlatMutation<K, D> {
    pub changes: Vec<RowChange<K, D>>,
}

impl<K, D> Default for FlatMutation<K, D> {
    fn default() -> Self {
        Self {
            changes: Vec::new(),
        }
    }
}

impl<K, D> FlatMutation<K, D> {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn added(&self) -> impl Iterator<Item = (usize, &Row<K, D>)> {
        self.changes.iter().filter_map(|c| match c {
            RowChange::Added { index, row } => Some((*index, row)),
            _ => None,
        })
    }

    pub fn removed(&self) -> impl Iterator<Item = (usize, &Row<K, D>)> {
        self.changes.iter().filter_map(|c| match c {
            RowChange::Removed { index, row } => Some((*index, row)),
            _ => None,
        })
    }

    pub fn updated(&self) -> impl Iterator<Item = (usize, &Row<K, D>)> {
        self.changes.iter().filter_map(|c| match c {
            RowChange::Updated { index, row } => Some((*index, row)),
            _ => None,
        })
    }

    /// Applies the recorded splices to a mirror of the flat list.
    pub fn replay(&self, rows: &mut Vec<Row<K, D>>)
    where
        K: Clone,
        D: Clone,
    {
        for change in &self.changes {
            match change {
                RowChange::Removed { index, .. } => {
                    if *index < rows.len() {
                        rows.remove(*index);
                    }
                }
                RowChange::Added { index, row } => {
                    let index = (*index).min(rows.len());
                    rows.insert(index, row.clone());
                }
                RowChange::Updated { index, row } => {
                    if let Some(slot) = rows.get_mut(*index) {
                        *slot = row.clone();
                    }
                }
            }
        }
    }
}

/// A notification emitted to the engine's consumers.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TreeChange<K, D> {
    Mutate(FlatMutation<K, D>),
    Refresh(RefreshScope<K>),
}
