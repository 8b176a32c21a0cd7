use std::collections::VecDeque;

use foundation::ids::BuildingId;

pub const DEFAULT_HISTORY_CAPACITY: usize = 10;

/// Bounded most-recent-first list of building ids without duplicates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecentHistory {
    capacity: usize,
    entries: VecDeque<BuildingId>,
}

impl Default for RecentHistory {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
    }
}

impl RecentHistory {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: &BuildingId) -> bool {
        self.entries.contains(id)
    }

    /// Move `id` to the front, evicting the oldest entry past capacity.
    ///
    /// Returns `true` if the history changed.
    pub fn push(&mut self, id: BuildingId) -> bool {
        if self.capacity == 0 {
            return false;
        }
        if self.entries.front() == Some(&id) {
            return false;
        }
        self.entries.retain(|e| e != &id);
        self.entries.push_front(id);
        self.entries.truncate(self.capacity);
        true
    }

    pub fn remove(&mut self, id: &BuildingId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|e| e != id);
        before != self.entries.len()
    }

    /// Most recent first.
    pub fn iter(&self) -> impl Iterator<Item = &BuildingId> + '_ {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::RecentHistory;
    use foundation::ids::BuildingId;

    fn ids(h: &RecentHistory) -> Vec<&str> {
        h.iter().map(BuildingId::as_str).collect()
    }

    #[test]
    fn most_recent_first() {
        let mut h = RecentHistory::default();
        h.push("a".into());
        h.push("b".into());
        assert_eq!(ids(&h), vec!["b", "a"]);
    }

    #[test]
    fn repeated_push_moves_to_front_without_duplicates() {
        let mut h = RecentHistory::default();
        h.push("a".into());
        h.push("b".into());
        assert!(h.push("a".into()));
        assert!(!h.push("a".into()));
        assert_eq!(ids(&h), vec!["a", "b"]);
    }

    #[test]
    fn capacity_is_never_exceeded() {
        let mut h = RecentHistory::default();
        for i in 0..25 {
            h.push(BuildingId::new(format!("b{i}")));
            assert!(h.len() <= 10);
        }
        assert_eq!(h.len(), 10);
        assert_eq!(ids(&h)[0], "b24");
        assert_eq!(ids(&h)[9], "b15");
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut h = RecentHistory::with_capacity(0);
        assert!(!h.push("a".into()));
        assert!(h.is_empty());
    }
}
