//! Memory Stream
//!
//! Bounded ring buffer of turn summaries. Oldest entries are evicted first.

use bevy_ecs::prelude::*;
use std::collections::VecDeque;

#[derive(Component, Debug, Clone, Default)]
pub struct MemoryStream {
    entries: VecDeque<String>,
    capacity: usize,
}

impl MemoryStream {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, entry: impl Into<String>) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(entry.into());
    }

    pub fn entries(&self) -> impl Iterator<Item = &String> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<String> {
        self.entries.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evicts_oldest() {
        let mut memory = MemoryStream::new(2);
        memory.push("turn 1");
        memory.push("turn 2");
        memory.push("turn 3");

        assert_eq!(memory.len(), 2);
        assert_eq!(memory.to_vec(), vec!["turn 2", "turn 3"]);
    }

    #[test]
    fn test_zero_capacity_stores_nothing() {
        let mut memory = MemoryStream::new(0);
        memory.push("turn 1");
        assert!(memory.is_empty());
    }
}
