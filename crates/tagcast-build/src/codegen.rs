//! Rust code generation: one module of tag constants per root.

use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;

use heck::{ToShoutySnakeCase, ToSnakeCase};
use tagcast::{Hierarchy, Registry};

use crate::lock::{LockEntry, LockFile};
use crate::GenerateError;

/// Generate the tag tables for every hierarchy of `registry`, plus
/// `#[deprecated]` constants for the lock file's deprecated entries.
///
/// ```ignore
/// pub mod tags {
///     pub mod shape {
///         pub const WIDTH: u32 = 16;
///         pub type Repr = u16;
///         pub const SHAPE: u64 = 0b1;
///         pub const CIRCLE: u64 = 0b101;
///         pub const DEFINITIONS: &[::tagcast::TypeDef<'static>] = &[ ... ];
///     }
/// }
/// ```
pub fn generate_code(
    module_name: &str,
    registry: &Registry,
    lock: &LockFile,
) -> Result<String, GenerateError> {
    let mut deprecated: BTreeMap<&str, Vec<&LockEntry>> = BTreeMap::new();
    for entry in lock.deprecated_entries() {
        deprecated.entry(entry.root.as_str()).or_default().push(entry);
    }

    let mut roots: Vec<&str> = registry.roots().collect();
    roots.extend(deprecated.keys().filter(|r| registry.get(r).is_none()));
    roots.sort_unstable();
    check_unique(roots.iter().map(|r| (r.to_snake_case(), *r)), "module")?;

    let mut code = String::new();
    code.push_str("// @generated by tagcast-build. Do not edit.\n\n");
    code.push_str("#[allow(dead_code)]\n");
    let _ = writeln!(code, "pub mod {} {{", module_name);

    for (i, root) in roots.iter().enumerate() {
        if i > 0 {
            code.push('\n');
        }
        let gone = deprecated.get(root).map(Vec::as_slice).unwrap_or_default();
        match registry.get(root) {
            Some(hierarchy) => write_root_module(&mut code, root, hierarchy, gone)?,
            None => write_removed_root_module(&mut code, root, gone)?,
        }
    }

    code.push_str("}\n");
    Ok(code)
}

fn write_root_module(
    code: &mut String,
    root: &str,
    hierarchy: &Hierarchy,
    deprecated: &[&LockEntry],
) -> Result<(), GenerateError> {
    let names = hierarchy
        .entries()
        .iter()
        .map(|e| e.name.as_str())
        .chain(deprecated.iter().map(|e| e.name.as_str()));
    check_unique(names.map(|n| (n.to_shouty_snake_case(), n)), "constant")?;

    let width = hierarchy.width();
    let _ = writeln!(code, "    /// Hierarchy rooted at `{}`.", root);
    let _ = writeln!(code, "    pub mod {} {{", root.to_snake_case());
    let _ = writeln!(code, "        pub const WIDTH: u32 = {};", width);
    let _ = writeln!(code, "        pub type Repr = {};", repr_for(width));
    code.push('\n');

    for entry in hierarchy.entries() {
        let _ = writeln!(
            code,
            "        pub const {}: u64 = {:#b};",
            entry.name.to_shouty_snake_case(),
            entry.tag
        );
    }
    write_deprecated(code, deprecated);

    code.push('\n');
    code.push_str("        pub const DEFINITIONS: &[::tagcast::TypeDef<'static>] = &[\n");
    for entry in hierarchy.entries() {
        let parent = match &entry.parent {
            Some(p) => format!("Some({:?})", p),
            None => "None".to_string(),
        };
        let children: Vec<String> = hierarchy
            .children_of(&entry.name)
            .into_iter()
            .flatten()
            .map(|c| format!("{:?}", c))
            .collect();
        let _ = writeln!(
            code,
            "            ::tagcast::TypeDef::new({:?}, {}, &[{}]),",
            entry.name,
            parent,
            children.join(", ")
        );
    }
    code.push_str("        ];\n");
    code.push_str("    }\n");
    Ok(())
}

/// A root that only survives in the lock file.
fn write_removed_root_module(
    code: &mut String,
    root: &str,
    deprecated: &[&LockEntry],
) -> Result<(), GenerateError> {
    check_unique(
        deprecated
            .iter()
            .map(|e| (e.name.to_shouty_snake_case(), e.name.as_str())),
        "constant",
    )?;
    let _ = writeln!(code, "    /// Hierarchy rooted at `{}` (removed).", root);
    let _ = writeln!(code, "    pub mod {} {{", root.to_snake_case());
    write_deprecated(code, deprecated);
    code.push_str("    }\n");
    Ok(())
}

fn write_deprecated(code: &mut String, deprecated: &[&LockEntry]) {
    for entry in deprecated {
        let _ = writeln!(
            code,
            "        #[deprecated(note = \"`{}` was removed from the hierarchy.\")]",
            entry.name
        );
        let _ = writeln!(
            code,
            "        pub const {}: u64 = {:#b};",
            entry.name.to_shouty_snake_case(),
            entry.tag
        );
    }
}

/// Smallest unsigned integer holding `width` bits.
fn repr_for(width: u32) -> &'static str {
    match width {
        0..=8 => "u8",
        9..=16 => "u16",
        17..=32 => "u32",
        _ => "u64",
    }
}

/// Two declared names that map to the same Rust identifier.
fn check_unique<'a>(
    idents: impl Iterator<Item = (String, &'a str)>,
    what: &str,
) -> Result<(), GenerateError> {
    let mut seen: HashMap<String, &str> = HashMap::new();
    for (ident, name) in idents {
        if let Some(first) = seen.insert(ident.clone(), name) {
            return Err(GenerateError::NameClash(format!(
                "'{}' and '{}' both become {} `{}`",
                first, name, what, ident
            )));
        }
    }
    Ok(())
}
