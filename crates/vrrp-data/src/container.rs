//! Append-only ordered container with describe support.
//!
//! Elements are released by `Drop` when the container is destroyed; types
//! that want to appear in a dump implement [`Describe`].

use std::ops::Index;
use thiserror::Error;
use tracing::info;

/// Returned by [`OrderedContainer::tail`] when nothing was appended yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("container is empty")]
pub struct EmptyContainer;

/// Receives dump output one line at a time.
pub trait DumpSink {
    fn line(&mut self, line: String);
}

/// Collects lines in memory.
impl DumpSink for Vec<String> {
    fn line(&mut self, line: String) {
        self.push(line);
    }
}

/// Forwards every line to the process log.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl DumpSink for TracingSink {
    fn line(&mut self, line: String) {
        info!(target: "vrrp_data::dump", "{}", line);
    }
}

/// Element-level description used by [`OrderedContainer::describe_all`].
pub trait Describe {
    fn describe(&self, sink: &mut dyn DumpSink);
}

/// Ordered sequence, appended at the tail only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedContainer<T> {
    items: Vec<T>,
}

impl<T> Default for OrderedContainer<T> {
    fn default() -> Self {
        Self { items: Vec::new() }
    }
}

impl<T> OrderedContainer<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an item after the current tail.
    pub fn append(&mut self, item: T) {
        self.items.push(item);
    }

    /// Most recently appended item.
    pub fn tail(&self) -> Result<&T, EmptyContainer> {
        self.items.last().ok_or(EmptyContainer)
    }

    pub fn tail_mut(&mut self) -> Result<&mut T, EmptyContainer> {
        self.items.last_mut().ok_or(EmptyContainer)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut T> {
        self.items.get_mut(index)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.items.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, T> {
        self.items.iter_mut()
    }

    pub fn as_slice(&self) -> &[T] {
        &self.items
    }

    /// Release every element in insertion order, then the container itself.
    ///
    /// Returns the number of elements released.
    pub fn destroy_all(self) -> usize {
        let count = self.items.len();
        for item in self.items {
            drop(item);
        }
        count
    }
}

impl<T: Describe> OrderedContainer<T> {
    /// Describe every element in insertion order.
    pub fn describe_all(&self, sink: &mut dyn DumpSink) {
        for item in &self.items {
            item.describe(sink);
        }
    }
}

impl<T> Index<usize> for OrderedContainer<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.items[index]
    }
}

impl<'a, T> IntoIterator for &'a OrderedContainer<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

impl<T> IntoIterator for OrderedContainer<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<T> FromIterator<T> for OrderedContainer<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self {
            items: iter.into_iter().collect(),
        }
    }
}

/// Destroy an optional container; an absent container releases nothing.
pub fn destroy_optional<T>(container: Option<OrderedContainer<T>>) -> usize {
    container.map_or(0, OrderedContainer::destroy_all)
}
