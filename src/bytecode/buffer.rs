//! Growable backing storage for chunks and constant pools.

use std::ops::{Deref, Index};

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Capacity a buffer starts with on its first write.
pub const MIN_CAPACITY: usize = 8;

/// Next capacity for a buffer that is full at `capacity`.
pub fn grow_capacity(capacity: usize) -> usize {
    if capacity < MIN_CAPACITY {
        MIN_CAPACITY
    } else {
        capacity * 2
    }
}

/// An append-only sequence that grows by doubling.
///
/// The logical capacity is tracked explicitly so the growth policy stays
/// observable regardless of what the allocator hands back.
#[derive(Debug, Clone)]
pub struct Buffer<T> {
    items: Vec<T>,
    capacity: usize,
}

impl<T> Buffer<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
            capacity: 0,
        }
    }

    /// Append an item, growing the storage when it is full.
    pub fn push(&mut self, item: T) {
        if self.capacity < self.items.len() + 1 {
            self.capacity = grow_capacity(self.capacity);
            self.items.reserve_exact(self.capacity - self.items.len());
        }
        self.items.push(item);
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Release the storage and return to the empty state.
    pub fn clear(&mut self) {
        self.items = Vec::new();
        self.capacity = 0;
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }
}

impl<T> Default for Buffer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> From<Vec<T>> for Buffer<T> {
    fn from(items: Vec<T>) -> Self {
        let capacity = items.len();
        Self { items, capacity }
    }
}

impl<T> Deref for Buffer<T> {
    type Target = [T];

    fn deref(&self) -> &Self::Target {
        &self.items
    }
}

impl<T> Index<usize> for Buffer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        &self.items[index]
    }
}

impl<T: PartialEq> PartialEq for Buffer<T> {
    fn eq(&self, other: &Self) -> bool {
        self.items == other.items
    }
}

impl<T: Serialize> Serialize for Buffer<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.items.serialize(serializer)
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Buffer<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Vec::<T>::deserialize(deserializer).map(Buffer::from)
    }
}
