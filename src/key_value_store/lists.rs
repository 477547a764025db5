use std::collections::VecDeque;

use crate::key_value_store::{Entry, ExpiringMap};

/// Lists keyed by name. A list that becomes empty is removed, so an absent
/// key and an empty list are indistinguishable.
#[derive(Debug, Default)]
pub struct ListStore {
    map: ExpiringMap<VecDeque<String>>,
}

impl ListStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `items` in order and returns the new length.
    pub fn rpush(&mut self, key: &str, items: Vec<String>) -> usize {
        let list = self.list_mut_or_insert(key);
        list.extend(items);
        list.len()
    }

    /// Prepends `items` one at a time, so `LPUSH k a b c` leaves `c b a` at
    /// the head, and returns the new length.
    pub fn lpush(&mut self, key: &str, items: Vec<String>) -> usize {
        let list = self.list_mut_or_insert(key);

        for item in items {
            list.push_front(item);
        }

        list.len()
    }

    pub fn lrange(&mut self, key: &str, start: i64, end: i64) -> Vec<String> {
        let Some(entry) = self.map.get_mut(key) else {
            return Vec::new();
        };

        let Some((start, end)) = normalize_range(entry.value.len(), start, end) else {
            return Vec::new();
        };

        entry.value.range(start..=end).cloned().collect()
    }

    pub fn llen(&mut self, key: &str) -> usize {
        self.map.get_mut(key).map_or(0, |entry| entry.value.len())
    }

    pub fn lpop(&mut self, key: &str) -> Option<String> {
        self.lpop_many(key, 1).pop()
    }

    /// Pops up to `count` elements from the head.
    pub fn lpop_many(&mut self, key: &str, count: usize) -> Vec<String> {
        let Some(entry) = self.map.get_mut(key) else {
            return Vec::new();
        };

        let count = count.min(entry.value.len());
        let popped: Vec<String> = entry.value.drain(..count).collect();

        if entry.value.is_empty() {
            self.map.remove(key);
        }

        popped
    }

    fn list_mut_or_insert(&mut self, key: &str) -> &mut VecDeque<String> {
        &mut self
            .map
            .get_or_insert_with(key, || Entry::new(VecDeque::new(), None))
            .value
    }
}

/// Normalizes LRANGE indexes for a list of length `len`.
///
/// Negative indexes count from the end. Both ends are clamped to
/// `[0, len - 1]`; `None` means the range selects nothing.
fn normalize_range(len: usize, start_index: i64, end_index: i64) -> Option<(usize, usize)> {
    if len == 0 {
        return None;
    }

    let len = len as i64;
    let start = if start_index < 0 {
        (len + start_index).max(0)
    } else {
        start_index
    };
    let end = if end_index < 0 {
        (len + end_index).max(0)
    } else {
        end_index.min(len - 1)
    };

    if start >= len || start > end {
        return None;
    }

    Some((start as usize, end as usize))
}

#[cfg(test)]
mod tests {
    use super::{normalize_range, ListStore};

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|item| item.to_string()).collect()
    }

    #[test]
    fn test_normalize_range() {
        let test_cases = vec![
            (0, 2, Some((0, 2))),
            (1, 3, Some((1, 3))),
            (1, 1, Some((1, 1))),
            (2, 9, Some((2, 4))),
            (2, 1, None),
            (4, 4, Some((4, 4))),
            (5, 6, None),
            (-1, -1, Some((4, 4))),
            (-2, -1, Some((3, 4))),
            (-3, -1, Some((2, 4))),
            (-9, -2, Some((0, 3))),
            (-5, -3, Some((0, 2))),
            (-2, -10, None),
            (0, -10, Some((0, 0))),
        ];

        for (start_index, end_index, expected) in test_cases {
            assert_eq!(
                normalize_range(5, start_index, end_index),
                expected,
                "normalizing start index {} and end index {}",
                start_index,
                end_index
            );
        }

        assert_eq!(normalize_range(0, 0, -1), None);
    }

    #[test]
    fn test_push_order() {
        let mut store = ListStore::new();

        assert_eq!(store.rpush("right", strings(&["a", "b", "c"])), 3);
        assert_eq!(store.lpush("left", strings(&["a", "b", "c"])), 3);

        assert_eq!(store.lrange("right", 0, -1), strings(&["a", "b", "c"]));
        assert_eq!(store.lrange("left", 0, -1), strings(&["c", "b", "a"]));

        assert_eq!(store.lpush("left", strings(&["d"])), 4);
        assert_eq!(store.lrange("left", 0, 0), strings(&["d"]));
    }

    #[test]
    fn test_lpop_removes_drained_list() {
        let mut store = ListStore::new();
        store.rpush("fruits", strings(&["grape", "apple", "mango"]));

        assert_eq!(store.lpop("fruits"), Some("grape".into()));
        assert_eq!(store.llen("fruits"), 2);

        assert_eq!(store.lpop_many("fruits", 5), strings(&["apple", "mango"]));
        assert_eq!(store.llen("fruits"), 0);
        assert_eq!(store.lpop("fruits"), None);
        assert!(store.lpop_many("fruits", 2).is_empty());
        assert_eq!(store.map.len(), 0);
    }

    #[test]
    fn test_lrange_on_missing_key() {
        let mut store = ListStore::new();

        assert!(store.lrange("missing", 0, -1).is_empty());
        assert_eq!(store.llen("missing"), 0);
    }
}
