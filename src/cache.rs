use std::collections::VecDeque;

/// A fixed size ring of the most recently read lines.
#[derive(Debug, Clone, Default)]
pub struct RecentLines {
    capacity: usize,
    entries: VecDeque<(usize, Vec<u8>)>,
}

impl RecentLines {
    #[inline]
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        }
    }

    #[inline]
    pub fn get(&self, line: usize) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(l, _)| *l == line)
            .map(|(_, data)| data.as_slice())
    }

    /// Stores `line`, evicting the oldest entry if the cache is full. Does nothing with a
    /// capacity of 0.
    pub fn push(&mut self, line: usize, data: &[u8]) {
        if self.capacity == 0 || self.get(line).is_some() {
            return;
        }

        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((line, data.to_vec()));
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled() {
        let mut cache = RecentLines::new(0);
        cache.push(0, b"zero");
        assert!(cache.is_empty());
        assert_eq!(cache.get(0), None);
    }

    #[test]
    fn test_evicts_oldest() {
        let mut cache = RecentLines::new(2);
        cache.push(0, b"zero");
        cache.push(1, b"one");
        cache.push(1, b"one");
        assert_eq!(cache.len(), 2);

        cache.push(2, b"two");
        assert_eq!(cache.get(0), None);
        assert_eq!(cache.get(1), Some(&b"one"[..]));
        assert_eq!(cache.get(2), Some(&b"two"[..]));

        cache.clear();
        assert!(cache.is_empty());
    }
}
