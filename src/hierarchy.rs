//! Runtime hierarchy: validation and tag allocation for one root.
//!
//! `hierarchy!` computes tags as associated constants at compile time. This
//! module does the same allocation from plain descriptors at run time, for
//! tooling, generated tables, and for checking the two against each other.
//!
//! ```text
//! TypeDef("A", None,      ["B", "C"])   ──►  A = 0b1
//! TypeDef("B", Some("A"), ["D"])        ──►  B = 0b101
//! TypeDef("C", Some("A"), [])           ──►  C = 0b111
//! TypeDef("D", Some("B"), [])           ──►  D = 0b1101
//! ```

use std::any::TypeId;
use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::cast::is_ancestor_tag;
use crate::encode::{child_tag_within, Step, MAX_WIDTH, ROOT_TAG};
use crate::error::{HierarchyError, Malformed};
use crate::layout::{bits_needed, field_width};

/// Declaration of one type: its parent (`None` for the root) and its ordered
/// children.
///
/// Both directions are given so that mismatches can be caught.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TypeDef<'a> {
    pub name: &'a str,
    pub parent: Option<&'a str>,
    pub children: &'a [&'a str],
}

impl<'a> TypeDef<'a> {
    pub const fn new(name: &'a str, parent: Option<&'a str>, children: &'a [&'a str]) -> Self {
        Self {
            name,
            parent,
            children,
        }
    }
}

/// An allocated type.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeEntry {
    pub name: String,
    pub parent: Option<String>,
    pub tag: u64,
    /// Distance from the root.
    pub depth: u8,
    /// 1-based position among the parent's children (0 for the root).
    pub position: u32,
}

/// Builder for [`Hierarchy`].
#[derive(Clone, Copy, Debug)]
pub struct HierarchyBuilder {
    width: u32,
}

impl Default for HierarchyBuilder {
    fn default() -> Self {
        Self { width: MAX_WIDTH }
    }
}

impl HierarchyBuilder {
    /// Tag width in bits (defaults to 64).
    pub fn width(mut self, width: u32) -> Self {
        self.width = width;
        self
    }

    pub fn build(self, defs: &[TypeDef<'_>]) -> Result<Hierarchy, HierarchyError> {
        Hierarchy::build(defs, self.width)
    }
}

/// One validated, fully allocated hierarchy.
///
/// Provides:
/// - Name ↔ tag lookup
/// - Ancestry tests by name or by raw tag
/// - Pre-order (DFS) iteration in declaration order
/// - A `TypeId` → tag table for types bound at run time
#[derive(Clone, Debug)]
pub struct Hierarchy {
    width: u32,
    /// Number of levels (1 = root only).
    tree_depth: usize,
    /// Pre-order, children in declaration order.
    entries: Vec<TypeEntry>,
    children: Vec<Vec<usize>>,
    name_to_idx: HashMap<String, usize>,
    tag_to_idx: HashMap<u64, usize>,
    dfs_order: Vec<u64>,
    types: HashMap<TypeId, usize>,
}

impl Hierarchy {
    pub fn builder() -> HierarchyBuilder {
        HierarchyBuilder::default()
    }

    /// Validate `defs` and allocate every tag within `width` bits.
    pub fn build(defs: &[TypeDef<'_>], width: u32) -> Result<Self, HierarchyError> {
        if width == 0 || width > MAX_WIDTH {
            return Err(Malformed::InvalidWidth(width).into());
        }

        // 1. Validate
        let index = Self::validate_defs(defs)?;

        // 2. Allocate, parent before children
        let root = defs
            .iter()
            .position(|d| d.parent.is_none())
            .ok_or(Malformed::NoRoot)?;
        let mut entries: Vec<TypeEntry> = Vec::with_capacity(defs.len());
        let mut children: Vec<Vec<usize>> = Vec::with_capacity(defs.len());
        let mut visited = vec![false; defs.len()];
        // (def index, parent entry index, step)
        let mut stack: Vec<(usize, Option<usize>, Step)> = vec![(root, None, Step::new(0, 0))];

        while let Some((def_idx, parent_idx, step)) = stack.pop() {
            let def = &defs[def_idx];
            if std::mem::replace(&mut visited[def_idx], true) {
                return Err(Malformed::Cycle(def.name.to_string()).into());
            }

            let (tag, depth) = match parent_idx {
                None => (ROOT_TAG, 0),
                Some(p) => {
                    let parent = &entries[p];
                    let tag = child_tag_within(parent.tag, step, width).ok_or_else(|| {
                        HierarchyError::Overflow {
                            root: defs[root].name.to_string(),
                            name: def.name.to_string(),
                            width,
                            needed: bits_needed(parent.tag) + field_width(step.siblings),
                        }
                    })?;
                    (tag, parent.depth + 1)
                }
            };
            tracing::debug!("Allocated tag {:#b} for `{}`", tag, def.name);

            let idx = entries.len();
            if let Some(p) = parent_idx {
                children[p].push(idx);
            }
            entries.push(TypeEntry {
                name: def.name.to_string(),
                parent: def.parent.map(str::to_string),
                tag,
                depth,
                position: step.position,
            });
            children.push(Vec::new());

            let siblings = def.children.len() as u32;
            for (i, child) in def.children.iter().enumerate().rev() {
                stack.push((index[child], Some(idx), Step::new(i as u32 + 1, siblings)));
            }
        }

        if let Some(unreached) = visited.iter().position(|v| !v) {
            return Err(Malformed::Cycle(defs[unreached].name.to_string()).into());
        }

        // 3. Build indices
        let name_to_idx = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.name.clone(), i))
            .collect();
        let tag_to_idx = entries.iter().enumerate().map(|(i, e)| (e.tag, i)).collect();
        let dfs_order = entries.iter().map(|e| e.tag).collect();
        let tree_depth = entries.iter().map(|e| e.depth as usize + 1).max().unwrap_or(0);

        tracing::info!(
            "Built hierarchy `{}`: {} types, {} levels, {}-bit tags",
            defs[root].name,
            entries.len(),
            tree_depth,
            width
        );

        Ok(Self {
            width,
            tree_depth,
            entries,
            children,
            name_to_idx,
            tag_to_idx,
            dfs_order,
            types: HashMap::new(),
        })
    }

    /// Checks every structural rule and returns name → def index.
    fn validate_defs<'a>(defs: &[TypeDef<'a>]) -> Result<HashMap<&'a str, usize>, Malformed> {
        let mut index: HashMap<&str, usize> = HashMap::with_capacity(defs.len());
        let mut root: Option<&str> = None;

        for (i, def) in defs.iter().enumerate() {
            if def.name.is_empty() {
                return Err(Malformed::EmptyName);
            }
            if index.insert(def.name, i).is_some() {
                return Err(Malformed::DuplicateType(def.name.to_string()));
            }
            if def.parent.is_none() {
                if let Some(first) = root {
                    return Err(Malformed::MultipleRoots {
                        first: first.to_string(),
                        second: def.name.to_string(),
                    });
                }
                root = Some(def.name);
            }
        }
        if root.is_none() {
            return Err(Malformed::NoRoot);
        }

        for def in defs {
            if let Some(parent) = def.parent {
                let Some(&p) = index.get(parent) else {
                    return Err(Malformed::UnknownType {
                        name: parent.to_string(),
                        referenced_by: def.name.to_string(),
                    });
                };
                if !defs[p].children.contains(&def.name) {
                    return Err(Malformed::NotListedByParent {
                        child: def.name.to_string(),
                        parent: parent.to_string(),
                    });
                }
            }

            let mut seen = HashSet::with_capacity(def.children.len());
            for &child in def.children {
                if !seen.insert(child) {
                    return Err(Malformed::DuplicateChild {
                        parent: def.name.to_string(),
                        child: child.to_string(),
                    });
                }
                let Some(&c) = index.get(child) else {
                    return Err(Malformed::UnknownType {
                        name: child.to_string(),
                        referenced_by: def.name.to_string(),
                    });
                };
                if defs[c].parent != Some(def.name) {
                    return Err(Malformed::ParentMismatch {
                        child: child.to_string(),
                        parent: def.name.to_string(),
                    });
                }
            }
        }

        Ok(index)
    }

    /// Tag width in bits.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// The root entry.
    #[inline]
    pub fn root(&self) -> &TypeEntry {
        &self.entries[0]
    }

    /// Number of levels (1 = root only).
    #[inline]
    pub fn tree_depth(&self) -> usize {
        self.tree_depth
    }

    /// Total number of types.
    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always `false`: a built hierarchy has at least its root.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// All entries in DFS order.
    #[inline]
    pub fn entries(&self) -> &[TypeEntry] {
        &self.entries
    }

    /// All tags in DFS order.
    #[inline]
    pub fn dfs_order(&self) -> &[u64] {
        &self.dfs_order
    }

    /// Name → tag
    #[inline]
    pub fn tag_of(&self, name: &str) -> Option<u64> {
        self.entry(name).map(|e| e.tag)
    }

    /// Tag → name
    #[inline]
    pub fn name_of(&self, tag: u64) -> Option<&str> {
        self.tag_to_idx
            .get(&tag)
            .map(|&i| self.entries[i].name.as_str())
    }

    #[inline]
    pub fn entry(&self, name: &str) -> Option<&TypeEntry> {
        self.name_to_idx.get(name).map(|&i| &self.entries[i])
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.name_to_idx.contains_key(name)
    }

    pub fn parent_of(&self, name: &str) -> Option<&str> {
        self.entry(name)?.parent.as_deref()
    }

    /// Direct children in declaration order.
    pub fn children_of(&self, name: &str) -> Option<impl Iterator<Item = &str>> {
        let idx = *self.name_to_idx.get(name)?;
        Some(
            self.children[idx]
                .iter()
                .map(|&c| self.entries[c].name.as_str()),
        )
    }

    /// Check if `candidate` is a descendant of (or equal to) `ancestor`.
    ///
    /// Returns `None` if either name is not in the hierarchy.
    ///
    /// ```text
    /// hierarchy.is_descendant_of("E", "D") → Some(true)
    /// hierarchy.is_descendant_of("E", "C") → Some(false)
    /// hierarchy.is_descendant_of("Unknown", "A") → None
    /// ```
    pub fn is_descendant_of(&self, candidate: &str, ancestor: &str) -> Option<bool> {
        Some(is_ancestor_tag(self.tag_of(candidate)?, self.tag_of(ancestor)?))
    }

    /// Is an object carrying `tag` an instance of `name`?
    ///
    /// Returns `None` if `name` is not in the hierarchy. `tag` must be a tag
    /// of this hierarchy.
    pub fn instance_of(&self, tag: u64, name: &str) -> Option<bool> {
        Some(is_ancestor_tag(tag, self.tag_of(name)?))
    }

    /// Names of `ancestor` and everything below it, in DFS order.
    ///
    /// Not O(1): scans all entries. Use [`is_descendant_of`](Self::is_descendant_of)
    /// for single checks.
    pub fn descendants_of(&self, ancestor: &str) -> Vec<&str> {
        let Some(target) = self.tag_of(ancestor) else {
            return Vec::new();
        };
        self.entries
            .iter()
            .filter(|e| is_ancestor_tag(e.tag, target))
            .map(|e| e.name.as_str())
            .collect()
    }

    /// Associate the Rust type `T` with the declared type `name`.
    ///
    /// Returns the bound tag, or `None` if `name` is not in the hierarchy.
    pub fn bind<T: 'static>(&mut self, name: &str) -> Option<u64> {
        let idx = *self.name_to_idx.get(name)?;
        self.types.insert(TypeId::of::<T>(), idx);
        Some(self.entries[idx].tag)
    }

    /// Tag of a type previously [`bind`](Self::bind)-ed.
    #[inline]
    pub fn tag_of_type<T: 'static>(&self) -> Option<u64> {
        self.types
            .get(&TypeId::of::<T>())
            .map(|&i| self.entries[i].tag)
    }
}

// =============================================================================
// Tests
// =============================================================================
