//! TOML configuration parser for hierarchy.toml.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tagcast::{Hierarchy, HierarchyError, Malformed, Registry, TypeDef};

/// Behavior when a locked tag changed or its type was removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OnChange {
    /// Emit a build error (default, safest)
    #[default]
    Error,
    /// Emit a `cargo:warning`, keep removed types as `#[deprecated]`
    Warn,
}

/// Parsed hierarchy configuration.
#[derive(Debug, Clone)]
pub struct HierarchyConfig {
    /// Module name for the generated code
    pub module_name: String,
    /// Behavior when locked tags drift
    pub on_change: OnChange,
    /// Every declared type, keyed by name
    types: BTreeMap<String, TypeConfig>,
}

/// One `[types]` entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeConfig {
    /// One parent per hierarchy the type belongs to (empty for a root)
    pub parents: Vec<String>,
    /// Ordered children
    pub children: Vec<String>,
    /// Tag width (roots only)
    pub width: Option<u32>,
}

/// One root's share of the config, parents before children.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Forest {
    pub root: String,
    pub width: u32,
    pub types: Vec<ForestType>,
}

/// A type as seen from one forest: at most one parent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForestType {
    pub name: String,
    pub parent: Option<String>,
    pub children: Vec<String>,
}

/// Raw TOML structure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawHierarchyConfig {
    /// Optional module name (defaults to "tags")
    module_name: Option<String>,
    /// "error" (default) or "warn"
    on_change: Option<String>,
    types: BTreeMap<String, RawType>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawType {
    parent: Option<RawParents>,
    #[serde(default)]
    children: Vec<String>,
    width: Option<u32>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawParents {
    One(String),
    Many(Vec<String>),
}

const DEFAULT_WIDTH: u32 = 64;

impl HierarchyConfig {
    /// Parse from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_str(&content)
    }

    /// Parse from a TOML string.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        let raw: RawHierarchyConfig = toml::from_str(content)?;

        let module_name = raw.module_name.unwrap_or_else(|| "tags".to_string());
        validate_ident(&module_name)?;

        let on_change = match raw.on_change.as_deref() {
            None | Some("error") => OnChange::Error,
            Some("warn") => OnChange::Warn,
            Some(other) => {
                return Err(ConfigError::Validation(format!(
                    "invalid on_change value '{}': expected 'error' or 'warn'",
                    other
                )));
            }
        };

        let mut types = BTreeMap::new();
        for (name, raw) in raw.types {
            validate_ident(&name)?;
            let parents = match raw.parent {
                None => Vec::new(),
                Some(RawParents::One(p)) => vec![p],
                Some(RawParents::Many(ps)) => ps,
            };
            if parents.is_empty() {
                if let Some(width) = raw.width
                    && !matches!(width, 8 | 16 | 32 | 64)
                {
                    return Err(ConfigError::Validation(format!(
                        "root '{}' has width {}: expected 8, 16, 32 or 64",
                        name, width
                    )));
                }
            } else if raw.width.is_some() {
                return Err(ConfigError::Validation(format!(
                    "'{}' is not a root: only roots choose a tag width",
                    name
                )));
            }
            types.insert(
                name,
                TypeConfig {
                    parents,
                    children: raw.children,
                    width: raw.width,
                },
            );
        }

        let config = Self {
            module_name,
            on_change,
            types,
        };
        config.check_references()?;
        Ok(config)
    }

    /// Every parent and child name must be declared, and the two directions
    /// must agree.
    fn check_references(&self) -> Result<(), ConfigError> {
        for (name, ty) in &self.types {
            for parent in &ty.parents {
                let Some(p) = self.types.get(parent) else {
                    return Err(unknown(parent, name));
                };
                if !p.children.contains(name) {
                    return Err(HierarchyError::from(Malformed::NotListedByParent {
                        child: name.clone(),
                        parent: parent.clone(),
                    })
                    .into());
                }
            }
            for child in &ty.children {
                let Some(c) = self.types.get(child) else {
                    return Err(unknown(child, name));
                };
                if !c.parents.contains(name) {
                    return Err(HierarchyError::from(Malformed::ParentMismatch {
                        child: child.clone(),
                        parent: name.clone(),
                    })
                    .into());
                }
            }
        }
        Ok(())
    }

    /// Get a type by name.
    pub fn get(&self, name: &str) -> Option<&TypeConfig> {
        self.types.get(name)
    }

    /// All types, sorted by name.
    pub fn types(&self) -> impl Iterator<Item = (&str, &TypeConfig)> {
        self.types.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Get type count.
    pub fn len(&self) -> usize {
        self.types.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    /// Root names, sorted.
    pub fn roots(&self) -> impl Iterator<Item = &str> {
        self.types()
            .filter(|(_, t)| t.parents.is_empty())
            .map(|(name, _)| name)
    }

    /// Split the config into one forest per root by walking children lists.
    ///
    /// A type takes as its parent whichever of its declared parents first
    /// reaches it. A type claimed by two parents of one forest is left for
    /// [`Hierarchy::build`] to reject.
    pub fn forests(&self) -> Vec<Forest> {
        self.roots()
            .map(|root| {
                let mut types = Vec::new();
                let mut seen = HashSet::new();
                let mut queue = VecDeque::from([(root, None::<&str>)]);

                while let Some((name, via)) = queue.pop_front() {
                    if !seen.insert(name) {
                        continue;
                    }
                    let Some(ty) = self.types.get(name) else {
                        continue;
                    };
                    types.push(ForestType {
                        name: name.to_string(),
                        parent: via.map(str::to_string),
                        children: ty.children.clone(),
                    });
                    for child in &ty.children {
                        queue.push_back((child.as_str(), Some(name)));
                    }
                }

                Forest {
                    root: root.to_string(),
                    width: self.types[root].width.unwrap_or(DEFAULT_WIDTH),
                    types,
                }
            })
            .collect()
    }

    /// Validate and allocate every forest.
    pub fn registry(&self) -> Result<Registry, ConfigError> {
        let forests = self.forests();
        if forests.is_empty() && !self.is_empty() {
            return Err(HierarchyError::from(Malformed::NoRoot).into());
        }
        let mut registry = Registry::new();
        for forest in &forests {
            registry.insert(forest.build()?)?;
        }

        // A type no forest reaches sits on a parent cycle.
        for (name, _) in self.types() {
            if registry.memberships(name).is_empty() {
                return Err(HierarchyError::from(Malformed::Cycle(name.to_string())).into());
            }
        }
        Ok(registry)
    }
}

impl Forest {
    /// Borrowed descriptors for the core allocator.
    pub fn build(&self) -> Result<Hierarchy, HierarchyError> {
        let children: Vec<Vec<&str>> = self
            .types
            .iter()
            .map(|t| t.children.iter().map(String::as_str).collect())
            .collect();
        let defs: Vec<TypeDef<'_>> = self
            .types
            .iter()
            .zip(&children)
            .map(|(t, c)| TypeDef::new(&t.name, t.parent.as_deref(), c))
            .collect();
        Hierarchy::build(&defs, self.width)
    }
}

fn unknown(name: &str, referenced_by: &str) -> ConfigError {
    HierarchyError::from(Malformed::UnknownType {
        name: name.to_string(),
        referenced_by: referenced_by.to_string(),
    })
    .into()
}

/// Names become Rust identifiers in generated code.
fn validate_ident(name: &str) -> Result<(), ConfigError> {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return Err(ConfigError::Validation("empty name not allowed".into()));
    };
    if !first.is_alphabetic() && first != '_' {
        return Err(ConfigError::Validation(format!(
            "invalid name '{}': must start with letter or underscore",
            name
        )));
    }
    if let Some(c) = chars.find(|c| !c.is_alphanumeric() && *c != '_') {
        return Err(ConfigError::Validation(format!(
            "invalid name '{}': contains invalid character '{}'",
            name, c
        )));
    }
    Ok(())
}

/// Errors during config parsing.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation error: {0}")]
    Validation(String),

    #[error(transparent)]
    Hierarchy(#[from] HierarchyError),
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHAPES: &str = r#"
[types]
Shape = { width = 16, children = ["Circle", "Polygon"] }
Circle = { parent = "Shape" }
Polygon = { parent = "Shape", children = ["Triangle", "Square"] }
Triangle = { parent = "Polygon" }
Square = { parent = "Polygon" }
"#;

    #[test]
    fn parse_simple_config() {
        let config = HierarchyConfig::from_str(SHAPES).unwrap();

        assert_eq!(config.module_name, "tags");
        assert_eq!(config.on_change, OnChange::Error);
        assert_eq!(config.len(), 5);
        assert_eq!(config.roots().collect::<Vec<_>>(), ["Shape"]);

        let polygon = config.get("Polygon").unwrap();
        assert_eq!(polygon.parents, ["Shape"]);
        assert_eq!(polygon.children, ["Triangle", "Square"]);
        assert_eq!(polygon.width, None);
    }

    #[test]
    fn parse_with_module_name() {
        let toml = r#"
module_name = "shape_tags"

[types]
A = {}
"#;
        let config = HierarchyConfig::from_str(toml).unwrap();
        assert_eq!(config.module_name, "shape_tags");
    }

    #[test]
    fn forest_keeps_declared_child_order() {
        let config = HierarchyConfig::from_str(SHAPES).unwrap();
        let forests = config.forests();
        assert_eq!(forests.len(), 1);

        let forest = &forests[0];
        assert_eq!(forest.root, "Shape");
        assert_eq!(forest.width, 16);
        let names: Vec<_> = forest.types.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, ["Shape", "Circle", "Polygon", "Triangle", "Square"]);

        let hierarchy = forest.build().unwrap();
        assert_eq!(hierarchy.tag_of("Circle"), Some(0b101));
        assert_eq!(hierarchy.tag_of("Polygon"), Some(0b111));
        assert_eq!(hierarchy.tag_of("Square"), Some(0b11111));
    }

    #[test]
    fn multi_root_types_split_per_forest() {
        let toml = r#"
[types]
A = { width = 8, children = ["B", "C"] }
B = { parent = "A" }
C = { parent = "A", children = ["G"] }
D = { width = 8, children = ["E", "F"] }
E = { parent = "D", children = ["G"] }
F = { parent = "D" }
G = { parent = ["C", "E"], children = ["H"] }
H = { parent = "G" }
"#;
        let config = HierarchyConfig::from_str(toml).unwrap();
        let registry = config.registry().unwrap();

        assert_eq!(registry.memberships("G"), [("A", 0b1111u64), ("D", 0b1101u64)]);
        assert_eq!(registry.memberships("H"), [("A", 0b11111u64), ("D", 0b11101u64)]);
        assert_eq!(registry.get("A").unwrap().parent_of("G"), Some("C"));
        assert_eq!(registry.get("D").unwrap().parent_of("G"), Some("E"));
    }

    #[test]
    fn width_defaults_to_64() {
        let config = HierarchyConfig::from_str("[types]\nA = {}\n").unwrap();
        assert_eq!(config.forests()[0].width, 64);
    }

    #[test]
    fn rejects_width_on_non_root() {
        let toml = r#"
[types]
A = { children = ["B"] }
B = { parent = "A", width = 8 }
"#;
        let err = HierarchyConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("only roots"));
    }

    #[test]
    fn rejects_odd_width() {
        let toml = "[types]\nA = { width = 12 }\n";
        assert!(HierarchyConfig::from_str(toml).is_err());
    }

    #[test]
    fn rejects_unknown_references() {
        let toml = r#"
[types]
A = { children = ["Ghost"] }
"#;
        let err = HierarchyConfig::from_str(toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Hierarchy(HierarchyError::Malformed(Malformed::UnknownType { .. }))
        ));
    }

    #[test]
    fn rejects_parent_that_does_not_list_child() {
        let toml = r#"
[types]
A = {}
B = { parent = "A" }
"#;
        let err = HierarchyConfig::from_str(toml).unwrap_err();
        assert!(err.to_string().contains("does not list it"));
    }

    #[test]
    fn rejects_child_that_does_not_name_parent() {
        let toml = r#"
[types]
A = { children = ["B", "C"] }
B = { parent = "A", children = ["C"] }
C = { parent = "A" }
"#;
        let err = HierarchyConfig::from_str(toml).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Hierarchy(HierarchyError::Malformed(Malformed::ParentMismatch { .. }))
        ));

        // A root listed as someone's child.
        let toml = r#"
[types]
A = { children = ["D"] }
D = {}
"#;
        assert!(HierarchyConfig::from_str(toml).is_err());
    }

    #[test]
    fn rejects_child_claimed_twice_in_one_forest() {
        let toml = r#"
[types]
A = { children = ["B", "C"] }
B = { parent = "A", children = ["C"] }
C = { parent = ["A", "B"] }
"#;
        let config = HierarchyConfig::from_str(toml).unwrap();
        let err = config.registry().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Hierarchy(HierarchyError::Malformed(Malformed::ParentMismatch { .. }))
        ));
    }

    #[test]
    fn rejects_detached_cycle() {
        let toml = r#"
[types]
A = {}
X = { parent = "Y", children = ["Y"] }
Y = { parent = "X", children = ["X"] }
"#;
        let config = HierarchyConfig::from_str(toml).unwrap();
        let err = config.registry().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Hierarchy(HierarchyError::Malformed(Malformed::Cycle(_)))
        ));
    }

    #[test]
    fn overflow_is_reported() {
        let toml = r#"
[types]
A = { width = 8, children = ["B"] }
B = { parent = "A", children = ["C"] }
C = { parent = "B", children = ["D"] }
D = { parent = "C", children = ["E", "F", "G", "H", "I"] }
E = { parent = "D", children = ["J"] }
F = { parent = "D" }
G = { parent = "D" }
H = { parent = "D" }
I = { parent = "D" }
J = { parent = "E" }
"#;
        let config = HierarchyConfig::from_str(toml).unwrap();
        let err = config.registry().unwrap_err();
        assert!(matches!(err, ConfigError::Hierarchy(ref e) if e.is_overflow()));
    }

    #[test]
    fn rejects_invalid_names() {
        for case in ["1A", "A-B", "\"A B\""] {
            let toml = format!("[types]\n{} = {{}}\n", case);
            assert!(HierarchyConfig::from_str(&toml).is_err(), "Should reject: {}", case);
        }
    }

    #[test]
    fn on_change_defaults_to_error() {
        let config = HierarchyConfig::from_str("[types]\nA = {}\n").unwrap();
        assert_eq!(config.on_change, OnChange::Error);
    }

    #[test]
    fn on_change_warn() {
        let config = HierarchyConfig::from_str("on_change = \"warn\"\n[types]\nA = {}\n").unwrap();
        assert_eq!(config.on_change, OnChange::Warn);
    }

    #[test]
    fn on_change_invalid_value() {
        let err = HierarchyConfig::from_str("on_change = \"invalid\"\n[types]\nA = {}\n").unwrap_err();
        assert!(err.to_string().contains("invalid"));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(HierarchyConfig::from_str("[types]\nA = { kids = [] }\n").is_err());
    }
}
