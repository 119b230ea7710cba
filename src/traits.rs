//! Declaration contracts.
//!
//! - [`Root`]: the type at the top of a hierarchy; it owns the [`TagStore`].
//! - [`Extends`]: a struct embeds a parent struct at a known offset.
//! - [`Node`]: a type's place in one hierarchy, with its constant tag.
//!
//! `#[derive(Object)]` implements `Root` and `Extends`; `hierarchy!`
//! implements `Node`. Hand-written impls must uphold the safety contracts,
//! because the casts in [`cast`](crate::cast) trust them to compute addresses.

use crate::repr::TagRepr;
use crate::store::TagStore;

/// The top of a hierarchy.
///
/// # Safety
///
/// `tag_store` must return the store embedded in `self`, never one borrowed
/// from another value.
pub unsafe trait Root: Sized + 'static {
    /// Tag width of this hierarchy.
    type Repr: TagRepr;

    fn tag_store(&self) -> &TagStore<Self::Repr>;
}

/// A struct that embeds a `P` as one of its fields.
///
/// # Safety
///
/// `OFFSET` must be the byte offset of that `P` field inside `Self`. The field
/// must not be movable out of `Self` or replaceable through `&mut` by code
/// outside the defining module (`#[derive(Object)]` keeps it private and adds
/// a `Drop` impl).
pub unsafe trait Extends<P>: Sized {
    const OFFSET: usize;
}

/// A declared member of the hierarchy rooted at `R`.
///
/// # Safety
///
/// - `ROOT_OFFSET` is the byte offset of the `R` subobject inside `Self`.
/// - `TAG` is the allocated tag of `Self` in `R`'s hierarchy: unique among the
///   hierarchy's nodes, and a low-order suffix of every descendant's `TAG`.
/// - For every descendant `U`, the `Self` subobject of a `U` sits at
///   `U::ROOT_OFFSET - Self::ROOT_OFFSET`.
/// - An `R` subobject carrying `TAG` is only ever found inside a `Self`: no
///   code may move it out, or swap or overwrite it (or any base between it and
///   `Self`) through `&mut`, while the enclosing `Self` is alive.
pub unsafe trait Node<R: Root>: Sized + 'static {
    /// Declared type name.
    const NAME: &'static str;

    /// Distance from the root (the root is 0).
    const DEPTH: u8;

    /// Constant tag, widened to `u64`.
    const TAG: u64;

    /// Byte offset of the `R` subobject.
    const ROOT_OFFSET: usize;
}
