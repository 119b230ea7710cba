//! Tag store: the one integer field a root embeds in every object.
//!
//! The store is written exactly once, when the object is built, with the tag
//! of the object's most-derived type. It has no setter and is neither `Clone`
//! nor `Copy`: a copied root would carry a descendant's tag without the
//! descendant around it.

use core::fmt;

use zerocopy::{FromBytes, IntoBytes};

use crate::repr::TagRepr;
use crate::traits::{Node, Root};

/// Per-object tag of one hierarchy.
#[repr(transparent)]
#[derive(PartialEq, Eq, Hash)]
pub struct TagStore<T: TagRepr> {
    tag: T,
}

impl<T: TagRepr> TagStore<T> {
    /// Store for a value whose most-derived type is `N` in the hierarchy of `R`.
    ///
    /// The width check happened when `N::TAG` was allocated, so the narrowing
    /// here never truncates.
    ///
    /// # Safety
    ///
    /// The returned store must end up in the `R` subobject of an `N` value
    /// (for `N == R`, in a standalone `R`). While the enclosing `N` is alive,
    /// that `R` subobject, and every base between it and the `N`, must stay
    /// in place: not moved out, and not swapped, replaced or overwritten
    /// through `&mut` (`mem::swap` of two bases inside the defining module
    /// included).
    #[inline]
    pub unsafe fn of<R, N>() -> Self
    where
        R: Root<Repr = T>,
        N: Node<R>,
    {
        Self {
            tag: T::from_u64(N::TAG),
        }
    }

    /// The stored tag.
    #[inline]
    pub fn get(&self) -> T {
        self.tag
    }

    /// The stored tag widened to `u64`.
    #[inline]
    pub fn to_u64(&self) -> u64 {
        self.tag.to_u64()
    }

    /// Native-endian view of the stored bytes.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        self.tag.as_bytes()
    }
}

impl<T: TagRepr> fmt::Debug for TagStore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TagStore({:#b})", self.tag)
    }
}

/// Read a little-endian tag from the front of `bytes`.
///
/// This is how a decoder learns the dynamic type of a serialized object before
/// choosing what to build. Returns `None` if `bytes` is too short.
pub fn peek_tag<T: TagRepr>(bytes: &[u8]) -> Option<T> {
    let (tag, _rest) = T::read_from_prefix(bytes).ok()?;
    Some(tag.from_le())
}

/// Append the little-endian encoding of `tag` to `out`.
pub fn write_tag<T: TagRepr>(tag: T, out: &mut Vec<u8>) {
    out.extend_from_slice(tag.to_le().as_bytes());
}
