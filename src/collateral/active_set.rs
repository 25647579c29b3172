use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::types::BatchId;

/// dense list of active batch ids with a position index, so that
/// membership checks, inserts and removals are all O(1)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ActiveSet {
    ids: Vec<BatchId>,
    positions: HashMap<BatchId, usize>,
}

impl ActiveSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, id: BatchId) -> bool {
        self.positions.contains_key(&id)
    }

    /// returns false if already present
    pub fn insert(&mut self, id: BatchId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.positions.insert(id, self.ids.len());
        self.ids.push(id);
        true
    }

    /// swap the target with the last element, fix the moved element's
    /// position, truncate. returns false if absent
    pub fn remove(&mut self, id: BatchId) -> bool {
        let Some(index) = self.positions.remove(&id) else {
            return false;
        };

        let last = self.ids.len() - 1;
        if index != last {
            let moved = self.ids[last];
            self.ids.swap(index, last);
            self.positions.insert(moved, index);
        }
        self.ids.pop();
        true
    }

    /// current members; order is insertion order perturbed by swap-removes
    pub fn as_slice(&self) -> &[BatchId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    #[test]
    fn test_swap_remove_middle() {
        let mut set = ActiveSet::new();
        for i in 1..=3 {
            set.insert(BatchId(i));
        }

        assert!(set.remove(BatchId(2)));
        assert_eq!(set.as_slice(), &[BatchId(1), BatchId(3)]);
        assert!(set.contains(BatchId(3)));
        assert!(!set.contains(BatchId(2)));

        // moved element keeps a valid position
        assert!(set.remove(BatchId(3)));
        assert_eq!(set.as_slice(), &[BatchId(1)]);
    }

    #[test]
    fn test_remove_last_and_absent() {
        let mut set = ActiveSet::new();
        set.insert(BatchId(1));
        set.insert(BatchId(2));

        assert!(set.remove(BatchId(2)));
        assert!(!set.remove(BatchId(2)));
        assert!(!set.remove(BatchId(99)));
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_duplicate_insert_ignored() {
        let mut set = ActiveSet::new();
        assert!(set.insert(BatchId(5)));
        assert!(!set.insert(BatchId(5)));
        assert_eq!(set.len(), 1);
    }

    proptest! {
        #[test]
        fn property_matches_reference_set(ops in proptest::collection::vec((any::<bool>(), 1u64..20), 0..200)) {
            let mut set = ActiveSet::new();
            let mut reference = BTreeSet::new();

            for (insert, id) in ops {
                if insert {
                    prop_assert_eq!(set.insert(BatchId(id)), reference.insert(id));
                } else {
                    prop_assert_eq!(set.remove(BatchId(id)), reference.remove(&id));
                }
            }

            let members: BTreeSet<u64> = set.as_slice().iter().map(|b| b.0).collect();
            prop_assert_eq!(members, reference.clone());
            prop_assert_eq!(set.len(), reference.len());
            for (index, id) in set.as_slice().iter().enumerate() {
                prop_assert_eq!(set.positions.get(id).copied(), Some(index));
            }
        }
    }
}
