use std::ops::{Index, IndexMut};

use serde::Serialize;

/// Stable handle into an [`Arena`]. Cross-links between the AST and the
/// symbol graph are stored as these ids and resolved through the owning
/// arena, so no owning reference cycles can form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct ArenaIndex {
    pub index: usize,
}

#[derive(Debug)]
pub struct Arena<T> {
    items: Vec<T>,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self {
            items: Vec::default(),
        }
    }
}

impl<T> Arena<T> {
    pub fn allocate(&mut self, item: T) -> ArenaIndex {
        self.items.push(item);
        ArenaIndex {
            index: self.items.len() - 1,
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: ArenaIndex) -> Option<&T> {
        self.items.get(index.index)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ArenaIndex, &T)> {
        self.items
            .iter()
            .enumerate()
            .map(|(index, item)| (ArenaIndex { index }, item))
    }
}

impl<T> Index<ArenaIndex> for Arena<T> {
    type Output = T;

    fn index(&self, index: ArenaIndex) -> &Self::Output {
        &self.items[index.index]
    }
}

impl<T> IndexMut<ArenaIndex> for Arena<T> {
    fn index_mut(&mut self, index: ArenaIndex) -> &mut Self::Output {
        &mut self.items[index.index]
    }
}
