use alloc::collections::BTreeMap;

use crate::IteratorId;

/// Per-consumer read cursors over the flat list.
///
/// Every row insertion/removal must be reported individually, in splice order, so a cursor past
/// the splice point moves by exactly the number of rows spliced before it.
#[derive(Clone, Debug, Default)]
pub(crate) struct OffsetTracker {
    next_id: u64,
    offsets: BTreeMap<IteratorId, usize>,
}

impl OffsetTracker {
    pub(crate) fn register(&mut self) -> IteratorId {
        let id = IteratorId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.offsets.insert(id, 0);
        id
    }

    pub(crate) fn release(&mut self, id: IteratorId) -> bool {
        self.offsets.remove(&id).is_some()
    }

    pub(crate) fn offset(&self, id: IteratorId) -> Option<usize> {
        self.offsets.get(&id).copied()
    }

    pub(crate) fn set_offset(&mut self, id: IteratorId, offset: usize) {
        if let Some(slot) = self.offsets.get_mut(&id) {
            *slot = offset;
        }
    }

    pub(crate) fn on_insert_at(&mut self, index: usize) {
        for offset in self.offsets.values_mut() {
            if index < *offset {
                *offset += 1;
            }
        }
    }

    pub(crate) fn on_remove_at(&mut self, index: usize) {
        for offset in self.offsets.values_mut() {
            if index < *offset {
                *offset -= 1;
            }
        }
    }

    /// Drops every cursor; their handles become unknown.
    pub(crate) fn invalidate_all(&mut self) {
        self.offsets.clear();
    }

    pub(crate) fn len(&self) -> usize {
        self.offsets.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cursors_shift_only_for_splices_strictly_before_them() {
        let mut t = OffsetTracker::default();
        let a = t.register();
        let b = t.register();
        t.set_offset(a, 3);
        t.set_offset(b, 1);

        t.on_insert_at(1);
        assert_eq!(t.offset(a), Some(4));
        assert_eq!(t.offset(b), Some(1));

        t.on_remove_at(0);
        assert_eq!(t.offset(a), Some(3));
        assert_eq!(t.offset(b), Some(0));

        assert!(t.release(b));
        assert!(!t.release(b));
        assert_eq!(t.len(), 1);

        t.invalidate_all();
        assert_eq!(t.offset(a), None);
    }
}
