//! Tag allocation: const functions that stack position fields into tags.
//!
//! The root's tag is the single bit `1`. Each child takes its parent's tag and
//! prefixes its own marker-tagged position field above it:
//!
//! ```text
//! A = 0b1
//! ├── B = 0b10 << 1 | A = 0b101
//! │   └── D = 0b1 << 3 | B = 0b1101
//! └── C = 0b11 << 1 | A = 0b111
//! ```
//!
//! Because a child only ever adds bits above its parent's tag, every ancestor's
//! tag survives unchanged in the low bits of every descendant's tag.
//!
//! All functions are `const` so `hierarchy!` can compute every tag at compile
//! time; the runtime [`Hierarchy`](crate::Hierarchy) uses the same functions.

use crate::layout::{bits_needed, corrected_position, field_width};

/// Tag of every hierarchy root.
pub const ROOT_TAG: u64 = 1;

/// Maximum tag width (the widest supported representation is `u64`).
pub const MAX_WIDTH: u32 = 64;

/// One step down a hierarchy: a child's 1-based position among its siblings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Step {
    /// 1-based position in the parent's ordered children list.
    pub position: u32,
    /// Number of children the parent declares.
    pub siblings: u32,
}

impl Step {
    pub const fn new(position: u32, siblings: u32) -> Self {
        Self { position, siblings }
    }
}

/// Tag of the child described by `step` under a parent tagged `parent`.
///
/// The field is shifted above the parent's highest bit. Every tag of a sibling
/// group has the same bit length, so the parent's own bit length is also the
/// width of its widest sibling.
///
/// Returns `None` if the tag would not fit in 64 bits.
#[inline]
pub const fn child_tag(parent: u64, step: Step) -> Option<u64> {
    let shift = bits_needed(parent);
    let field = corrected_position(step.position, step.siblings);
    if shift + bits_needed(field) > MAX_WIDTH {
        return None;
    }
    Some((field << shift) | parent)
}

/// Like [`child_tag`], but also rejects tags wider than `width` bits.
#[inline]
pub const fn child_tag_within(parent: u64, step: Step, width: u32) -> Option<u64> {
    match child_tag(parent, step) {
        Some(tag) if fits(tag, width) => Some(tag),
        _ => None,
    }
}

/// Does `tag` fit in a `width`-bit representation?
#[inline]
pub const fn fits(tag: u64, width: u32) -> bool {
    bits_needed(tag) <= width
}

/// Tag of the node reached from the root by following `steps`.
///
/// An empty path is the root itself.
pub const fn path_tag(steps: &[Step]) -> Option<u64> {
    let mut tag = ROOT_TAG;
    let mut i = 0;
    while i < steps.len() {
        tag = match child_tag(tag, steps[i]) {
            Some(tag) => tag,
            None => return None,
        };
        i += 1;
    }
    Some(tag)
}

/// Bits needed by the tag at the end of `steps`: one root bit plus one field
/// per level.
pub const fn required_width(steps: &[Step]) -> u32 {
    let mut width = 1;
    let mut i = 0;
    while i < steps.len() {
        width += field_width(steps[i].siblings);
        i += 1;
    }
    width
}
