//! Container implementations.

use crate::config::Asset;
use crate::core::{Container, Target};
use crate::error::IndexError;
use crate::registry::Registry;
use std::collections::HashSet;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{debug, info};

/// A named, in-memory group of already-built targets.
pub struct TargetGroup {
    name: String,
    targets: RwLock<Vec<Arc<dyn Target>>>,
}

impl TargetGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_targets(name, Vec::new())
    }

    pub fn with_targets(name: impl Into<String>, targets: Vec<Arc<dyn Target>>) -> Self {
        Self {
            name: name.into(),
            targets: RwLock::new(targets),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push(&self, target: Arc<dyn Target>) {
        self.targets
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(target);
    }
}

impl Container for TargetGroup {
    fn targets(&self) -> Vec<Arc<dyn Target>> {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn len(&self) -> usize {
        self.targets
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    fn pop(&self, index: usize) -> Result<Arc<dyn Target>, IndexError> {
        let mut targets = self.targets.write().unwrap_or_else(PoisonError::into_inner);
        if index >= targets.len() {
            return Err(IndexError::OutOfRange {
                index,
                len: targets.len(),
            });
        }
        debug!(group = %self.name, index, "Removing target from group");
        Ok(targets.remove(index))
    }
}

/// A group of descriptors resolved through a [`Registry`] the first time the
/// group is expanded.
///
/// Descriptors that fail to resolve are logged and left out. The resolved
/// targets are kept until [`DescriptorGroup::reload`] is called.
pub struct DescriptorGroup {
    name: String,
    descriptors: Vec<String>,
    tags: HashSet<String>,
    registry: Arc<Registry>,
    asset: Arc<Asset>,
    resolved: RwLock<Option<Vec<Arc<dyn Target>>>>,
}

impl DescriptorGroup {
    pub fn new(
        name: impl Into<String>,
        descriptors: Vec<String>,
        tags: HashSet<String>,
        registry: Arc<Registry>,
        asset: Arc<Asset>,
    ) -> Self {
        Self {
            name: name.into(),
            descriptors,
            tags,
            registry,
            asset,
            resolved: RwLock::new(None),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn descriptors(&self) -> &[String] {
        &self.descriptors
    }

    /// Whether the descriptors have been resolved yet.
    pub fn is_loaded(&self) -> bool {
        self.resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Forgets the resolved targets; the next expansion resolves again.
    pub fn reload(&self) {
        *self.resolved.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    fn resolve_all(&self) -> Vec<Arc<dyn Target>> {
        let targets: Vec<Arc<dyn Target>> = self
            .descriptors
            .iter()
            .filter_map(|input| {
                // Suppressed: a bad entry never prevents the rest of the group from loading.
                self.registry
                    .instantiate_str(input, self.tags.clone(), &self.asset, true)
                    .ok()
                    .flatten()
            })
            .collect();
        info!(
            group = %self.name,
            loaded = targets.len(),
            declared = self.descriptors.len(),
            "Resolved descriptor group"
        );
        targets
    }

    fn with_resolved<R>(&self, f: impl FnOnce(&mut Vec<Arc<dyn Target>>) -> R) -> R {
        let mut resolved = self.resolved.write().unwrap_or_else(PoisonError::into_inner);
        let targets = resolved.get_or_insert_with(|| self.resolve_all());
        f(targets)
    }
}

impl Container for DescriptorGroup {
    fn targets(&self) -> Vec<Arc<dyn Target>> {
        if let Some(targets) = self
            .resolved
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
        {
            return targets.clone();
        }
        self.with_resolved(|targets| targets.clone())
    }

    fn pop(&self, index: usize) -> Result<Arc<dyn Target>, IndexError> {
        self.with_resolved(|targets| {
            if index >= targets.len() {
                return Err(IndexError::OutOfRange {
                    index,
                    len: targets.len(),
                });
            }
            Ok(targets.remove(index))
        })
    }
}
