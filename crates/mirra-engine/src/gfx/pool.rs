use anyhow::{Context, Result};

use super::{Id, ResourceKind};

/// Slot storage for one kind of resource.
///
/// Resources are never removed individually; the whole pool is released at
/// teardown, after which every lookup fails.
#[derive(Debug)]
pub(crate) struct ResourcePool<T> {
    kind: ResourceKind,
    items: Vec<T>,
    released: bool,
}

impl<T> ResourcePool<T> {
    pub(crate) fn new(kind: ResourceKind) -> Self {
        Self {
            kind,
            items: Vec::new(),
            released: false,
        }
    }

    pub(crate) fn insert(&mut self, item: T) -> Result<Id> {
        anyhow::ensure!(!self.released, "{:?} pool already released", self.kind);
        let slot = u32::try_from(self.items.len()).context("resource pool exhausted")?;
        self.items.push(item);
        Ok(Id::new(self.kind, slot))
    }

    pub(crate) fn get(&self, id: Id) -> Result<&T> {
        anyhow::ensure!(
            id.kind() == self.kind,
            "expected a {:?} handle, got {id}",
            self.kind
        );
        anyhow::ensure!(!self.released, "{id} used after teardown");
        self.items
            .get(id.slot() as usize)
            .with_context(|| format!("unknown handle {id}"))
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.items.len()
    }

    /// Drops every resource and returns how many were held.
    pub(crate) fn release_all(&mut self) -> usize {
        let n = self.items.len();
        self.items.clear();
        self.released = true;
        n
    }
}
