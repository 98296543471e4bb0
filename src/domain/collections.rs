use std::cmp::Ordering;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::item::{Identified, ItemId};

/// Direction of a presentation ordering
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

pub type Comparator<T> = Arc<dyn Fn(&T, &T) -> Ordering + Send + Sync>;

#[derive(Clone)]
struct ActiveSort<T> {
    comparator: Comparator<T>,
    order: SortOrder,
}

/// An ordered set of feed items with automatic deduplication
///
/// Provides O(1) duplicate checking based on [`ItemId`] while preserving
/// first-insertion order. A presentation ordering installed with
/// [`DedupSet::sort_by`] only affects [`DedupSet::snapshot`]; the insertion
/// order underneath is kept for later merges.
#[derive(Clone)]
pub struct DedupSet<T> {
    items: Vec<T>,
    item_ids: HashSet<ItemId>,
    sort: Option<ActiveSort<T>>,
}

impl<T: Identified> DedupSet<T> {
    /// Creates a new empty set
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            item_ids: HashSet::new(),
            sort: None,
        }
    }

    /// Creates a new set with the specified capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            items: Vec::with_capacity(capacity),
            item_ids: HashSet::with_capacity(capacity),
            sort: None,
        }
    }

    /// Inserts an item (ignores duplicates)
    /// Returns: true if the item was actually inserted, false if it was a duplicate
    pub fn insert(&mut self, item: T) -> bool {
        if self.item_ids.insert(item.id().clone()) {
            self.items.push(item);
            true
        } else {
            false
        }
    }

    /// Appends every unseen item of a page in input order.
    /// Already-seen ids are dropped, never merged field-by-field.
    /// Returns the number of newly added items.
    pub fn merge_page<I>(&mut self, page: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        page.into_iter()
            .map(|item| self.insert(item))
            .filter(|inserted| *inserted)
            .count()
    }

    /// Clears the set, then merges the given page
    pub fn replace<I>(&mut self, page: I) -> usize
    where
        I: IntoIterator<Item = T>,
    {
        self.items.clear();
        self.item_ids.clear();
        self.merge_page(page)
    }

    /// Replaces an item in place with the result of `patch`.
    /// Returns false (and does nothing) if the id is unknown.
    pub fn update_by_id<F>(&mut self, id: &ItemId, patch: F) -> bool
    where
        F: FnOnce(&T) -> T,
    {
        let Some(slot) = self.items.iter_mut().find(|item| item.id() == id) else {
            return false;
        };

        let patched = patch(slot);
        debug_assert_eq!(patched.id(), id, "a patch must not change the item id");
        *slot = patched;
        true
    }

    /// Removes an item and forgets its id so it can be merged again later
    pub fn remove_by_id(&mut self, id: &ItemId) -> Option<T> {
        if !self.item_ids.remove(id) {
            return None;
        }
        let position = self.items.iter().position(|item| item.id() == id)?;
        let removed = self.items.remove(position);
        debug_assert_eq!(self.items.len(), self.item_ids.len());
        Some(removed)
    }

    /// Applies `patch` to every item, keeping positions.
    /// `patch` returns `None` for items it leaves alone.
    /// Returns the previous versions of the items that changed.
    pub fn update_all<F>(&mut self, mut patch: F) -> Vec<T>
    where
        F: FnMut(&T) -> Option<T>,
    {
        let mut previous = Vec::new();
        for slot in self.items.iter_mut() {
            if let Some(patched) = patch(slot) {
                debug_assert_eq!(patched.id(), slot.id(), "a patch must not change the item id");
                previous.push(std::mem::replace(slot, patched));
            }
        }
        previous
    }

    /// Removes every item matching `predicate`.
    /// Returns the removed items with their insertion positions, ascending.
    pub fn remove_where<F>(&mut self, mut predicate: F) -> Vec<(usize, T)>
    where
        F: FnMut(&T) -> bool,
    {
        let mut removed = Vec::new();
        let mut kept = Vec::with_capacity(self.items.len());
        for (index, item) in self.items.drain(..).enumerate() {
            if predicate(&item) {
                removed.push((index, item));
            } else {
                kept.push(item);
            }
        }
        self.items = kept;
        for (_, item) in &removed {
            self.item_ids.remove(item.id());
        }
        removed
    }

    /// Puts back items taken out by [`DedupSet::remove_where`].
    /// Ids that were merged again in the meantime are skipped.
    pub fn restore_removed(&mut self, removed: Vec<(usize, T)>) {
        for (index, item) in removed {
            if self.item_ids.insert(item.id().clone()) {
                let index = index.min(self.items.len());
                self.items.insert(index, item);
            }
        }
    }

    /// Installs a presentation ordering used by [`DedupSet::snapshot`]
    pub fn sort_by<F>(&mut self, comparator: F, order: SortOrder)
    where
        F: Fn(&T, &T) -> Ordering + Send + Sync + 'static,
    {
        self.sort = Some(ActiveSort {
            comparator: Arc::new(comparator),
            order,
        });
    }

    /// Drops the presentation ordering, snapshots follow insertion order again
    pub fn clear_sort(&mut self) {
        self.sort = None;
    }

    pub fn sort_order(&self) -> Option<SortOrder> {
        self.sort.as_ref().map(|sort| sort.order)
    }

    /// Current ordered view for rendering
    pub fn snapshot(&self) -> Vec<&T> {
        let mut view: Vec<&T> = self.items.iter().collect();
        if let Some(sort) = &self.sort {
            // sort_by is stable: ties keep insertion order in both directions
            view.sort_by(|a, b| match sort.order {
                SortOrder::Asc => (sort.comparator)(a, b),
                SortOrder::Desc => (sort.comparator)(b, a),
            });
        }
        view
    }

    /// Checks if an id is contained in the set
    pub fn contains(&self, id: &ItemId) -> bool {
        self.item_ids.contains(id)
    }

    pub fn get(&self, id: &ItemId) -> Option<&T> {
        if !self.contains(id) {
            return None;
        }
        self.items.iter().find(|item| item.id() == id)
    }

    /// Items in first-insertion order, regardless of any active ordering
    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Clears all items (the active ordering is kept)
    pub fn clear(&mut self) {
        self.items.clear();
        self.item_ids.clear();
    }
}

// === Standard library trait implementations ===

impl<T: Identified> Default for DedupSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: fmt::Debug> fmt::Debug for DedupSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DedupSet")
            .field("items", &self.items)
            .field("sort", &self.sort.as_ref().map(|sort| sort.order))
            .finish()
    }
}

impl<T> fmt::Display for DedupSet<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DedupSet[{} items]", self.items.len())
    }
}

impl<T: Identified> FromIterator<T> for DedupSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        let mut set = Self::new();
        set.merge_page(iter);
        set
    }
}

impl<T: Identified> Extend<T> for DedupSet<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iter: I) {
        self.merge_page(iter);
    }
}

impl<'a, T> IntoIterator for &'a DedupSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;

    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Entry {
        id: ItemId,
        label: String,
        score: u32,
    }

    impl Identified for Entry {
        fn id(&self) -> &ItemId {
            &self.id
        }
    }

    fn entry(id: u64, label: &str) -> Entry {
        Entry {
            id: ItemId::from(id),
            label: label.to_string(),
            score: 0,
        }
    }

    fn scored(id: u64, score: u32) -> Entry {
        Entry {
            score,
            ..entry(id, "scored")
        }
    }

    fn ids(set: &DedupSet<Entry>) -> Vec<String> {
        set.snapshot().iter().map(|e| e.id.to_string()).collect()
    }

    #[test]
    fn test_new_collection_is_empty() {
        let set = DedupSet::<Entry>::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
        assert!(set.snapshot().is_empty());
    }

    #[test]
    fn test_merge_empty_page_is_noop() {
        let mut set = DedupSet::new();
        set.merge_page(vec![entry(1, "a")]);

        assert_eq!(set.merge_page(Vec::<Entry>::new()), 0);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_merge_page_counts_only_new_items() {
        let mut set = DedupSet::new();
        assert_eq!(set.merge_page((1..=10).map(|i| entry(i, "first"))), 10);
        assert_eq!(set.merge_page((8..=15).map(|i| entry(i, "second"))), 5);

        assert_eq!(set.len(), 15);
        let expected: Vec<String> = (1..=15).map(|i| i.to_string()).collect();
        assert_eq!(ids(&set), expected);
    }

    #[test]
    fn test_duplicate_does_not_overwrite_existing_entry() {
        let mut set = DedupSet::new();
        set.merge_page(vec![entry(1, "original")]);

        assert_eq!(set.merge_page(vec![entry(1, "newer")]), 0);
        assert_eq!(set.get(&ItemId::from(1u64)).map(|e| e.label.as_str()), Some("original"));
    }

    #[test]
    fn test_fully_repeated_page_adds_nothing() {
        let mut set = DedupSet::new();
        set.merge_page((1..=3).map(|i| entry(i, "x")));
        assert_eq!(set.merge_page((1..=3).map(|i| entry(i, "x"))), 0);
    }

    #[test]
    fn test_replace_clears_seen_ids() {
        let mut set = DedupSet::new();
        set.merge_page((1..=3).map(|i| entry(i, "old")));

        assert_eq!(set.replace(vec![entry(3, "new"), entry(4, "new")]), 2);
        assert_eq!(ids(&set), vec!["3", "4"]);
        assert!(!set.contains(&ItemId::from(1u64)));

        assert_eq!(set.replace(Vec::new()), 0);
        assert!(set.is_empty());
    }

    #[test]
    fn test_update_by_id_keeps_position() {
        let mut set: DedupSet<Entry> = (1..=3).map(|i| entry(i, "x")).collect();

        let updated = set.update_by_id(&ItemId::from(2u64), |e| Entry {
            label: "patched".to_string(),
            ..e.clone()
        });

        assert!(updated);
        assert_eq!(ids(&set), vec!["1", "2", "3"]);
        assert_eq!(set.as_slice()[1].label, "patched");
    }

    #[test]
    fn test_update_unknown_id_is_silent() {
        let mut set: DedupSet<Entry> = (1..=2).map(|i| entry(i, "x")).collect();
        let before = set.as_slice().to_vec();

        assert!(!set.update_by_id(&ItemId::from(9u64), |e| e.clone()));
        assert_eq!(set.as_slice(), before.as_slice());
    }

    #[test]
    fn test_remove_by_id_allows_remerge() {
        let mut set: DedupSet<Entry> = (1..=3).map(|i| entry(i, "x")).collect();

        let removed = set.remove_by_id(&ItemId::from(2u64));
        assert_eq!(removed.map(|e| e.id), Some(ItemId::from(2u64)));
        assert_eq!(ids(&set), vec!["1", "3"]);
        assert!(set.remove_by_id(&ItemId::from(2u64)).is_none());

        assert_eq!(set.merge_page(vec![entry(2, "back")]), 1);
        assert_eq!(ids(&set), vec!["1", "3", "2"]);
    }

    #[test]
    fn test_update_all_returns_previous_versions() {
        let mut set = DedupSet::new();
        set.merge_page(vec![scored(1, 0), scored(2, 5), scored(3, 0)]);

        let previous = set.update_all(|e| (e.score == 0).then(|| Entry { score: 9, ..e.clone() }));

        let scores: Vec<u32> = set.as_slice().iter().map(|e| e.score).collect();
        assert_eq!(scores, vec![9, 5, 9]);
        assert_eq!(previous, vec![scored(1, 0), scored(3, 0)]);
    }

    #[test]
    fn test_remove_where_and_restore() {
        let mut set: DedupSet<Entry> = (1..=5).map(|i| scored(i, (i % 2) as u32)).collect();

        let removed = set.remove_where(|e| e.score == 1);
        assert_eq!(ids(&set), vec!["2", "4"]);
        assert!(!set.contains(&ItemId::from(3u64)));
        let positions: Vec<usize> = removed.iter().map(|(index, _)| *index).collect();
        assert_eq!(positions, vec![0, 2, 4]);

        set.restore_removed(removed);
        assert_eq!(ids(&set), vec!["1", "2", "3", "4", "5"]);
        assert_eq!(set.len(), 5);
    }

    #[test]
    fn test_restore_skips_remerged_ids() {
        let mut set: DedupSet<Entry> = (1..=3).map(|i| entry(i, "old")).collect();
        let removed = set.remove_where(|e| e.id.as_str() != "2");

        set.merge_page(vec![entry(3, "fresh")]);
        set.restore_removed(removed);

        assert_eq!(ids(&set), vec!["1", "2", "3"]);
        assert_eq!(set.get(&ItemId::from(3u64)).map(|e| e.label.as_str()), Some("fresh"));
    }

    #[test]
    fn test_sort_by_is_presentation_only() {
        let mut set = DedupSet::new();
        set.merge_page(vec![scored(1, 30), scored(2, 10), scored(3, 20)]);

        set.sort_by(|a, b| a.score.cmp(&b.score), SortOrder::Asc);
        assert_eq!(ids(&set), vec!["2", "3", "1"]);

        set.sort_by(|a, b| a.score.cmp(&b.score), SortOrder::Desc);
        assert_eq!(ids(&set), vec!["1", "3", "2"]);

        // Insertion order underneath is untouched
        let insertion: Vec<&str> = set.as_slice().iter().map(|e| e.id.as_str()).collect();
        assert_eq!(insertion, vec!["1", "2", "3"]);

        // Later merges are placed by the same ordering
        set.merge_page(vec![scored(4, 25)]);
        assert_eq!(ids(&set), vec!["1", "4", "3", "2"]);

        set.clear_sort();
        assert_eq!(ids(&set), vec!["1", "2", "3", "4"]);
    }

    #[test]
    fn test_sort_ties_keep_insertion_order() {
        let mut set = DedupSet::new();
        set.merge_page(vec![scored(1, 5), scored(2, 5), scored(3, 1)]);

        set.sort_by(|a, b| a.score.cmp(&b.score), SortOrder::Desc);
        assert_eq!(ids(&set), vec!["1", "2", "3"]);
    }

    #[test]
    fn test_standard_traits() {
        let mut set: DedupSet<Entry> = vec![entry(1, "a"), entry(1, "b")].into_iter().collect();
        assert_eq!(set.len(), 1);

        set.extend(vec![entry(2, "c")]);
        assert_eq!(set.len(), 2);
        assert_eq!((&set).into_iter().count(), 2);
        assert!(format!("{set}").contains("2 items"));
    }

    proptest! {
        #[test]
        fn prop_merges_never_hold_duplicate_ids(
            pages in prop::collection::vec(prop::collection::vec(0u64..40, 0..12), 0..8)
        ) {
            let mut set = DedupSet::new();
            for page in pages {
                set.merge_page(page.into_iter().map(|i| entry(i, "p")));
            }

            let unique: HashSet<&ItemId> = set.as_slice().iter().map(|e| &e.id).collect();
            prop_assert_eq!(unique.len(), set.len());
        }

        #[test]
        fn prop_first_seen_order_is_stable(
            pages in prop::collection::vec(prop::collection::vec(0u64..40, 0..12), 1..8)
        ) {
            let mut set = DedupSet::new();
            let mut expected: Vec<u64> = Vec::new();
            for page in pages {
                for i in &page {
                    if !expected.contains(i) {
                        expected.push(*i);
                    }
                }
                set.merge_page(page.into_iter().map(|i| entry(i, "p")));

                let actual: Vec<String> = set.snapshot().iter().map(|e| e.id.to_string()).collect();
                let wanted: Vec<String> = expected.iter().map(|i| i.to_string()).collect();
                prop_assert_eq!(actual, wanted);
            }
        }
    }
}
