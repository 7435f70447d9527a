//! Pending-id sets for the crawl.

use std::collections::{BTreeSet, HashMap};

use tabletop_catalog::CatalogId;

/// Ids queued for a fetch-or-skip decision in the current pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Frontier {
    ids: BTreeSet<CatalogId>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an id. Returns false if it was already queued.
    pub fn insert(&mut self, id: CatalogId) -> bool {
        self.ids.insert(id)
    }

    pub fn contains(&self, id: CatalogId) -> bool {
        self.ids.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    /// Move the contents out, leaving this frontier empty.
    pub fn take(&mut self) -> Frontier {
        std::mem::take(self)
    }

    pub fn iter(&self) -> impl Iterator<Item = CatalogId> + '_ {
        self.ids.iter().copied()
    }

    /// Consume the frontier into a work order: ids absent from `known` first,
    /// then known ids. Each group is in ascending id order.
    pub fn partition_unknown<V>(self, known: &HashMap<CatalogId, V>) -> Vec<CatalogId> {
        let (unknown, seen): (Vec<_>, Vec<_>) =
            self.ids.into_iter().partition(|id| !known.contains_key(id));
        let mut order = unknown;
        order.extend(seen);
        order
    }
}

impl Extend<CatalogId> for Frontier {
    fn extend<I: IntoIterator<Item = CatalogId>>(&mut self, iter: I) {
        self.ids.extend(iter);
    }
}

impl FromIterator<CatalogId> for Frontier {
    fn from_iter<I: IntoIterator<Item = CatalogId>>(iter: I) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insert_deduplicates() {
        let mut frontier = Frontier::new();
        assert!(frontier.insert(5));
        assert!(!frontier.insert(5));
        assert_eq!(frontier.len(), 1);
    }

    #[test]
    fn unknown_ids_come_first() {
        let frontier: Frontier = [9, 2, 7, 4, 1].into_iter().collect();
        let known: HashMap<CatalogId, ()> = [(2, ()), (9, ())].into_iter().collect();
        assert_eq!(frontier.partition_unknown(&known), vec![1, 4, 7, 2, 9]);
    }

    #[test]
    fn take_leaves_empty() {
        let mut frontier: Frontier = [1, 2].into_iter().collect();
        let taken = frontier.take();
        assert!(frontier.is_empty());
        assert_eq!(taken.iter().collect::<Vec<_>>(), vec![1, 2]);
    }
}
