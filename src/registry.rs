//! Ordered entity tables
//!
//! Insertion order is snapshot order, so tables only ever append (or prune
//! in place with `retain`).

use crate::engine::ObjectHandle;
use crate::entity::Tracked;

#[derive(Debug, Clone)]
pub struct Registry<T> {
    entries: Vec<T>,
}

impl<T> Default for Registry<T> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<T> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append and return the entry's position
    pub fn push(&mut self, entry: T) -> usize {
        self.entries.push(entry);
        self.entries.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.entries.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.entries.get_mut(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.entries.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut T> {
        self.entries.iter_mut()
    }

    /// Keep entries matching `keep`, preserving order
    pub fn retain(&mut self, keep: impl FnMut(&T) -> bool) {
        self.entries.retain(keep);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<T: Tracked> Registry<T> {
    pub fn find_by_object(&self, object: ObjectHandle) -> Option<&T> {
        self.entries.iter().find(|e| e.object() == Some(object))
    }

    pub fn find_by_object_mut(&mut self, object: ObjectHandle) -> Option<&mut T> {
        self.entries.iter_mut().find(|e| e.object() == Some(object))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Token(u64, Option<ObjectHandle>);

    impl Tracked for Token {
        fn object(&self) -> Option<ObjectHandle> {
            self.1
        }
    }

    #[test]
    fn test_push_preserves_insertion_order() {
        let mut registry = Registry::new();
        assert_eq!(registry.push(Token(3, None)), 0);
        assert_eq!(registry.push(Token(1, None)), 1);
        assert_eq!(registry.push(Token(2, None)), 2);
        let order: Vec<u64> = registry.iter().map(|t| t.0).collect();
        assert_eq!(order, vec![3, 1, 2]);
    }

    #[test]
    fn test_retain_keeps_relative_order() {
        let mut registry = Registry::new();
        for i in 0..6 {
            registry.push(Token(i, Some(ObjectHandle(i))));
        }
        registry.retain(|t| t.0 % 2 == 0);
        let order: Vec<u64> = registry.iter().map(|t| t.0).collect();
        assert_eq!(order, vec![0, 2, 4]);
    }

    #[test]
    fn test_find_by_object() {
        let mut registry = Registry::new();
        registry.push(Token(1, Some(ObjectHandle(10))));
        registry.push(Token(2, None));

        assert_eq!(registry.find_by_object(ObjectHandle(10)).map(|t| t.0), Some(1));
        assert!(registry.find_by_object(ObjectHandle(11)).is_none());

        registry.find_by_object_mut(ObjectHandle(10)).unwrap().1 = None;
        assert!(registry.find_by_object(ObjectHandle(10)).is_none());
    }
}
