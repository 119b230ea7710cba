//! Lock file: the tags a previous build handed out.
//!
//! Tags follow from the shape of a hierarchy, so inserting a sibling before
//! an existing child, or growing a sibling group past a power of two, moves
//! tags that serialized data may already contain. The lock file makes such
//! moves visible.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tagcast::Registry;

/// `hierarchy.lock.toml` contents.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockFile {
    /// RFC 3339 timestamp of the last write
    pub generated_at: String,
    #[serde(default, rename = "entry")]
    pub entries: Vec<LockEntry>,
}

/// One locked `(root, type) → tag` assignment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LockEntry {
    pub root: String,
    pub name: String,
    /// Written as a binary string: TOML integers are signed 64-bit.
    #[serde(with = "binary_tag")]
    pub tag: u64,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
}

/// A locked tag that moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangedTag {
    pub root: String,
    pub name: String,
    pub locked: u64,
    pub current: u64,
}

/// Differences between a lock file and the current hierarchies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LockDiff {
    /// Locked, still declared, different tag
    pub changed: Vec<ChangedTag>,
    /// Locked and active, no longer declared
    pub removed: Vec<LockEntry>,
    /// Declared, not locked yet (or locked as deprecated and now back)
    pub added: Vec<LockEntry>,
}

impl LockDiff {
    pub fn is_empty(&self) -> bool {
        self.changed.is_empty() && self.removed.is_empty() && self.added.is_empty()
    }
}

impl LockFile {
    /// Lock every tag of `registry`.
    pub fn from_registry(registry: &Registry) -> Self {
        Self {
            generated_at: now(),
            entries: current_entries(registry),
        }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, LockFileError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| LockFileError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, LockFileError> {
        Ok(toml::from_str(content)?)
    }

    pub fn to_toml(&self) -> Result<String, LockFileError> {
        let body = toml::to_string_pretty(self)?;
        Ok(format!(
            "# Generated by tagcast-build. Commit this file.\n\
             # Delete it to accept tag changes (breaks previously serialized tags).\n\n{}",
            body
        ))
    }

    /// Write with a fresh `generated_at`.
    pub fn write_to_file(&mut self, path: impl AsRef<Path>) -> Result<(), LockFileError> {
        let path = path.as_ref();
        self.generated_at = now();
        std::fs::write(path, self.to_toml()?).map_err(|source| LockFileError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Entry for `name` in the hierarchy rooted at `root`.
    pub fn get(&self, root: &str, name: &str) -> Option<&LockEntry> {
        self.entries.iter().find(|e| e.root == root && e.name == name)
    }

    pub fn active_entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.entries.iter().filter(|e| !e.deprecated)
    }

    pub fn deprecated_entries(&self) -> impl Iterator<Item = &LockEntry> {
        self.entries.iter().filter(|e| e.deprecated)
    }

    /// Compare against the tags `registry` allocates now.
    pub fn diff(&self, registry: &Registry) -> LockDiff {
        let current = current_entries(registry);
        let current_tags: HashMap<(&str, &str), u64> = current
            .iter()
            .map(|e| ((e.root.as_str(), e.name.as_str()), e.tag))
            .collect();

        let mut diff = LockDiff::default();
        for locked in &self.entries {
            match current_tags.get(&(locked.root.as_str(), locked.name.as_str())) {
                Some(&tag) if tag != locked.tag => diff.changed.push(ChangedTag {
                    root: locked.root.clone(),
                    name: locked.name.clone(),
                    locked: locked.tag,
                    current: tag,
                }),
                Some(_) => {}
                None if !locked.deprecated => diff.removed.push(locked.clone()),
                None => {}
            }
        }
        for entry in current {
            let reactivated = self
                .get(&entry.root, &entry.name)
                .is_some_and(|locked| locked.deprecated && locked.tag == entry.tag);
            if reactivated || self.get(&entry.root, &entry.name).is_none() {
                diff.added.push(entry);
            }
        }
        diff
    }

    /// Mark a removed type deprecated instead of dropping it.
    pub fn mark_deprecated(&mut self, root: &str, name: &str) {
        if let Some(entry) = self
            .entries
            .iter_mut()
            .find(|e| e.root == root && e.name == name)
        {
            entry.deprecated = true;
        }
    }

    /// Insert or replace (and reactivate) the entry for `entry.root`/`entry.name`.
    pub fn upsert(&mut self, entry: LockEntry) {
        match self
            .entries
            .iter_mut()
            .find(|e| e.root == entry.root && e.name == entry.name)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
    }
}

/// Every `(root, type, tag)` of `registry`, roots sorted, types in DFS order.
fn current_entries(registry: &Registry) -> Vec<LockEntry> {
    registry
        .iter()
        .flat_map(|(root, h)| {
            h.entries().iter().map(move |e| LockEntry {
                root: root.to_string(),
                name: e.name.clone(),
                tag: e.tag,
                deprecated: false,
            })
        })
        .collect()
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true)
}

mod binary_tag {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(tag: &u64, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{:#b}", tag))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u64, D::Error> {
        let s = String::deserialize(deserializer)?;
        let digits = s
            .strip_prefix("0b")
            .ok_or_else(|| serde::de::Error::custom(format!("tag '{}' must start with 0b", s)))?;
        u64::from_str_radix(digits, 2).map_err(serde::de::Error::custom)
    }
}

/// Errors reading or writing the lock file.
#[derive(Debug, thiserror::Error)]
pub enum LockFileError {
    #[error("failed to access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
}
