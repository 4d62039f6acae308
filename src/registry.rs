use crate::key::{KeySet, TreeKey};

/// Tracks which nodes (and the virtual root) may still have unfetched children.
///
/// A key absent from the registry is done. The root starts out not-done: nothing has been
/// fetched yet.
#[derive(Clone, Debug)]
pub(crate) struct NotDoneRegistry<K> {
    root: bool,
    keys: KeySet<K>,
}

impl<K: TreeKey> NotDoneRegistry<K> {
    pub(crate) fn new() -> Self {
        Self {
            root: true,
            keys: KeySet::new(),
        }
    }

    pub(crate) fn mark_not_done(&mut self, key: Option<&K>) {
        match key {
            Some(key) => {
                self.keys.insert(key.clone());
            }
            None => self.root = true,
        }
    }

    pub(crate) fn mark_done(&mut self, key: Option<&K>) {
        match key {
            Some(key) => {
                self.keys.remove(key);
            }
            None => self.root = false,
        }
    }

    pub(crate) fn is_done(&self, key: Option<&K>) -> bool {
        match key {
            Some(key) => !self.keys.contains(key),
            None => !self.root,
        }
    }

    /// Forgets a key that left the cache (collapse/removal).
    pub(crate) fn forget(&mut self, key: &K) {
        self.keys.remove(key);
    }

    pub(crate) fn reset(&mut self) {
        self.root = true;
        self.keys.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_starts_not_done_and_keys_start_done() {
        let mut r = NotDoneRegistry::<u32>::new();
        assert!(!r.is_done(None));
        assert!(r.is_done(Some(&1)));

        r.mark_not_done(Some(&1));
        r.mark_done(None);
        assert!(r.is_done(None));
        assert!(!r.is_done(Some(&1)));

        r.forget(&1);
        assert!(r.is_done(Some(&1)));

        r.mark_not_done(Some(&2));
        r.reset();
        assert!(!r.is_done(None));
        assert!(r.is_done(Some(&2)));
    }
}
