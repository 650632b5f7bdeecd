//! Flattening of mixed target/container storage into one logical index space.
//!
//! The collection keeps its entries in insertion order. Direct targets each
//! occupy one logical index; a container occupies as many indices as it
//! currently expands to, and an empty container occupies none. Containers
//! are expanded at most once per operation so a single `get`, `pop` or walk
//! sees a consistent view.

use crate::core::{Container, Target};
use crate::error::IndexError;
use crate::tags::TagExpr;
use std::fmt;
use std::sync::Arc;

/// One slot of a [`Collection`].
#[derive(Clone)]
pub enum Entry {
    Target(Arc<dyn Target>),
    Container(Arc<dyn Container>),
}

impl Entry {
    /// Expands the entry into the targets it contributes.
    pub fn expand(&self) -> Vec<Arc<dyn Target>> {
        match self {
            Self::Target(target) => vec![target.clone()],
            Self::Container(container) => container.targets(),
        }
    }

    fn logical_len(&self) -> usize {
        match self {
            Self::Target(_) => 1,
            Self::Container(container) => container.len(),
        }
    }
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Target(target) => f
                .debug_tuple("Target")
                .field(&target.service_name())
                .finish(),
            Self::Container(container) => f
                .debug_tuple("Container")
                .field(&container.len())
                .finish(),
        }
    }
}

/// An ordered sequence of direct targets and containers.
#[derive(Clone, Default, Debug)]
pub struct Collection {
    entries: Vec<Entry>,
}

impl Collection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entry: Entry) {
        self.entries.push(entry);
    }

    pub fn push_target(&mut self, target: Arc<dyn Target>) {
        self.entries.push(Entry::Target(target));
    }

    pub fn push_container(&mut self, container: Arc<dyn Container>) {
        self.entries.push(Entry::Container(container));
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// The raw entries, containers unexpanded.
    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    /// Number of logical targets; containers count as what they expand to.
    pub fn len(&self) -> usize {
        self.entries.iter().map(Entry::logical_len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns the target at logical position `index`.
    pub fn get(&self, index: usize) -> Result<Arc<dyn Target>, IndexError> {
        // `consumed` counts the logical targets that precede the current entry.
        let mut consumed = 0;
        for entry in &self.entries {
            match entry {
                Entry::Container(container) => {
                    let len = container.len();
                    if index < consumed + len {
                        return container.get(index - consumed);
                    }
                    consumed += len;
                }
                Entry::Target(target) => {
                    if index == consumed {
                        return Ok(target.clone());
                    }
                    consumed += 1;
                }
            }
        }
        Err(IndexError::OutOfRange {
            index,
            len: consumed,
        })
    }

    /// Removes and returns the target at logical position `index`.
    ///
    /// A target inside a container is removed through the container itself;
    /// the container entry stays in place even when it becomes empty.
    pub fn pop(&mut self, index: usize) -> Result<Arc<dyn Target>, IndexError> {
        let mut consumed = 0;
        let mut found = None;
        for (position, entry) in self.entries.iter().enumerate() {
            match entry {
                Entry::Container(container) => {
                    let len = container.len();
                    if index < consumed + len {
                        return container.pop(index - consumed);
                    }
                    consumed += len;
                }
                Entry::Target(_) => {
                    if index == consumed {
                        found = Some(position);
                        break;
                    }
                    consumed += 1;
                }
            }
        }

        match found.map(|position| self.entries.remove(position)) {
            Some(Entry::Target(target)) => Ok(target),
            _ => Err(IndexError::OutOfRange {
                index,
                len: consumed,
            }),
        }
    }

    /// Walks every logical target in order, expanding containers lazily.
    pub fn iter(&self) -> Targets<'_> {
        Targets {
            entries: self.entries.iter(),
            current: Vec::new().into_iter(),
        }
    }

    /// Lazily yields the targets whose tags satisfy `expr`.
    ///
    /// Each call starts a fresh walk, so the sequence can be restarted.
    pub fn find<'a>(&'a self, expr: &'a TagExpr) -> impl Iterator<Item = Arc<dyn Target>> + 'a {
        self.iter().filter(move |target| expr.matches(target.tags()))
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = Arc<dyn Target>;
    type IntoIter = Targets<'a>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Iterator over the flattened targets of a [`Collection`].
pub struct Targets<'a> {
    entries: std::slice::Iter<'a, Entry>,
    current: std::vec::IntoIter<Arc<dyn Target>>,
}

impl Iterator for Targets<'_> {
    type Item = Arc<dyn Target>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(target) = self.current.next() {
                return Some(target);
            }
            let entry = self.entries.next()?;
            self.current = entry.expand().into_iter();
        }
    }
}
