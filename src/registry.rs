//! Hierarchy registry: several independently rooted hierarchies side by side.
//!
//! A type may be declared in more than one hierarchy (one parent per forest).
//! It then has one tag per forest, and every query names the forest it asks
//! about:
//!
//! ```text
//! forest A:  A ─┬─ B              forest D:  D ─┬─ E ── G ── H
//!               └─ C ── G ── H                  └─ F
//!
//! memberships("G") → [("A", 0b1111), ("D", 0b1101)]
//! ```

use std::collections::BTreeMap;

use crate::error::{HierarchyError, Malformed};
use crate::hierarchy::{Hierarchy, TypeDef};

/// Hierarchies keyed by root name.
#[derive(Clone, Debug, Default)]
pub struct Registry {
    hierarchies: BTreeMap<String, Hierarchy>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a built hierarchy. A second hierarchy with the same root is
    /// rejected.
    pub fn insert(&mut self, hierarchy: Hierarchy) -> Result<&Hierarchy, HierarchyError> {
        let root = hierarchy.root().name.clone();
        if self.hierarchies.contains_key(&root) {
            return Err(Malformed::DuplicateRoot(root).into());
        }
        tracing::debug!("Registered hierarchy `{}` ({} types)", root, hierarchy.len());
        Ok(self.hierarchies.entry(root).or_insert(hierarchy))
    }

    /// Build a hierarchy from `defs` and add it.
    pub fn build(&mut self, defs: &[TypeDef<'_>], width: u32) -> Result<&Hierarchy, HierarchyError> {
        self.insert(Hierarchy::build(defs, width)?)
    }

    /// Hierarchy rooted at `root`.
    #[inline]
    pub fn get(&self, root: &str) -> Option<&Hierarchy> {
        self.hierarchies.get(root)
    }

    pub fn get_mut(&mut self, root: &str) -> Option<&mut Hierarchy> {
        self.hierarchies.get_mut(root)
    }

    /// Root names, sorted.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.hierarchies.keys().map(String::as_str)
    }

    /// Number of hierarchies.
    #[inline]
    pub fn len(&self) -> usize {
        self.hierarchies.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.hierarchies.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Hierarchy)> {
        self.hierarchies.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Every `(root, tag)` pair for the type `name`, sorted by root.
    pub fn memberships(&self, name: &str) -> Vec<(&str, u64)> {
        self.iter()
            .filter_map(|(root, h)| h.tag_of(name).map(|tag| (root, tag)))
            .collect()
    }

    /// Check if `candidate` descends from (or is) `ancestor` in the forest
    /// rooted at `root`.
    ///
    /// Returns `None` if the forest or either name is unknown.
    pub fn is_descendant_of(&self, root: &str, candidate: &str, ancestor: &str) -> Option<bool> {
        self.get(root)?.is_descendant_of(candidate, ancestor)
    }

    /// Is an object carrying `tag` in forest `root` an instance of `name`?
    pub fn instance_of(&self, root: &str, tag: u64, name: &str) -> Option<bool> {
        self.get(root)?.instance_of(tag, name)
    }
}
