//! Build-time utilities for tagcast.
//!
//! This crate provides tools for:
//! - Parsing `hierarchy.toml` files that declare one or more type hierarchies
//! - Managing `hierarchy.lock.toml` lock files so tags never move silently
//! - Generating Rust modules of tag constants
//!
//! # Usage in build.rs
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     println!("cargo:rerun-if-changed=hierarchy.toml");
//!     let out = std::path::Path::new(&std::env::var("OUT_DIR").unwrap()).join("tags.rs");
//!     tagcast_build::generate("hierarchy.toml", out).expect("failed to generate tags");
//! }
//! ```
//!
//! # hierarchy.toml
//!
//! ```toml
//! module_name = "tags"     # optional, default "tags"
//! on_change = "error"      # or "warn"
//!
//! [types]
//! Shape = { width = 16, children = ["Circle", "Polygon"] }
//! Circle = { parent = "Shape" }
//! Polygon = { parent = "Shape", children = ["Square"] }
//! Square = { parent = "Polygon" }
//! ```
//!
//! A type with several parents (one per hierarchy) lists them all:
//! `G = { parent = ["C", "E"] }`.
//!
//! # Lock file
//!
//! - First build: writes every `(root, type, tag)` to the lock file
//! - Later builds: a moved tag or a removed type is a build error (default),
//!   or a `cargo:warning` with `on_change = "warn"`; removed types then stay
//!   as `#[deprecated]` constants
//! - New types are appended to the lock
//!
//! To accept moved tags on purpose, delete the lock file and rebuild.

mod codegen;
mod lock;
mod toml_parser;

pub use codegen::generate_code;
pub use lock::{ChangedTag, LockDiff, LockEntry, LockFile, LockFileError};
pub use toml_parser::{ConfigError, Forest, ForestType, HierarchyConfig, OnChange, TypeConfig};

use std::path::Path;

/// Main entry point for build.rs integration.
///
/// The lock file sits next to the config: `hierarchy.toml` locks into
/// `hierarchy.lock.toml`.
pub fn generate(
    config_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let config_path = config_path.as_ref();
    let lock_path = config_path.with_extension("lock.toml");
    generate_with_lock(config_path, &lock_path, output_path)
}

/// Generate with explicit lock file path.
pub fn generate_with_lock(
    config_path: impl AsRef<Path>,
    lock_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> Result<(), GenerateError> {
    let config_path = config_path.as_ref();
    let lock_path = lock_path.as_ref();
    let output_path = output_path.as_ref();

    let config = HierarchyConfig::from_file(config_path)?;
    let registry = config.registry()?;

    let mut lock = if lock_path.exists() {
        let mut lock = LockFile::from_file(lock_path)?;
        let diff = lock.diff(&registry);
        apply_diff(&mut lock, diff, config.on_change)?;
        lock
    } else {
        tracing::info!("creating lock file {}", lock_path.display());
        LockFile::from_registry(&registry)
    };

    lock.write_to_file(lock_path)?;

    let code = generate_code(&config.module_name, &registry, &lock)?;
    std::fs::write(output_path, code)?;
    Ok(())
}

fn apply_diff(lock: &mut LockFile, diff: LockDiff, on_change: OnChange) -> Result<(), GenerateError> {
    if !diff.changed.is_empty() || !diff.removed.is_empty() {
        match on_change {
            OnChange::Error => return Err(GenerateError::LockMismatch(format_lock_error(&diff))),
            OnChange::Warn => {
                for moved in &diff.changed {
                    println!(
                        "cargo:warning=tagcast: tag of '{}' in '{}' moved from {:#b} to {:#b}",
                        moved.name, moved.root, moved.locked, moved.current
                    );
                    tracing::warn!(
                        "tag of {} in {} moved from {:#b} to {:#b}",
                        moved.name,
                        moved.root,
                        moved.locked,
                        moved.current
                    );
                    lock.upsert(LockEntry {
                        root: moved.root.clone(),
                        name: moved.name.clone(),
                        tag: moved.current,
                        deprecated: false,
                    });
                }
                for removed in &diff.removed {
                    println!(
                        "cargo:warning=tagcast: '{}' was removed from '{}' and is now deprecated",
                        removed.name, removed.root
                    );
                    tracing::warn!("{} removed from {}, deprecating", removed.name, removed.root);
                    lock.mark_deprecated(&removed.root, &removed.name);
                }
            }
        }
    }

    for entry in diff.added {
        tracing::debug!("locking {} in {} as {:#b}", entry.name, entry.root, entry.tag);
        lock.upsert(entry);
    }
    Ok(())
}

fn format_lock_error(diff: &LockDiff) -> String {
    let mut msg = String::from("tagcast: lock file mismatch!\n");
    if !diff.changed.is_empty() {
        msg.push_str("\n  Tags that moved:\n");
        for moved in &diff.changed {
            msg.push_str(&format!(
                "    - {} in {}: {:#b} -> {:#b}\n",
                moved.name, moved.root, moved.locked, moved.current
            ));
        }
    }
    if !diff.removed.is_empty() {
        msg.push_str("\n  Missing in hierarchy.toml (existed in lock):\n");
        for removed in &diff.removed {
            msg.push_str(&format!("    - {} in {}\n", removed.name, removed.root));
        }
    }
    msg.push_str("\n  To fix:\n");
    msg.push_str("    1. Restore the previous hierarchy shape (append new children last), OR\n");
    msg.push_str("    2. Set `on_change = \"warn\"` in hierarchy.toml, OR\n");
    msg.push_str("    3. Delete the lock file to regenerate (BREAKING CHANGE!)\n");
    msg
}

/// Errors that can occur during generation.
#[derive(Debug, thiserror::Error)]
pub enum GenerateError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("lock file error: {0}")]
    Lock(#[from] LockFileError),

    /// Locked tags moved or locked types disappeared
    #[error("{0}")]
    LockMismatch(String),

    /// Two declared names become the same Rust identifier
    #[error("name clash: {0}")]
    NameClash(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
