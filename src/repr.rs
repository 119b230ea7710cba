//! Tag representations: the integer type a hierarchy stores its tags in.
//!
//! The width is chosen per root: a `TagStore<u8>` field makes an 8-bit
//! hierarchy, a `TagStore<u64>` field a 64-bit one. Tags are computed as `u64`
//! and narrowed once, after the allocator has proven they fit.

use core::fmt::{Binary, Debug};
use core::hash::Hash;

use zerocopy::{FromBytes, Immutable, IntoBytes, KnownLayout};

/// An unsigned integer usable as a tag store.
pub trait TagRepr:
    Copy
    + Eq
    + Ord
    + Hash
    + Debug
    + Binary
    + Send
    + Sync
    + FromBytes
    + IntoBytes
    + Immutable
    + KnownLayout
    + 'static
{
    /// Width in bits.
    const BITS: u32;

    /// Widen to `u64` (lossless).
    fn to_u64(self) -> u64;

    /// Narrow from `u64`.
    ///
    /// Only called on tags the allocator has checked against [`Self::BITS`].
    fn from_u64(tag: u64) -> Self;

    /// Convert from little-endian byte order to native.
    fn from_le(self) -> Self;

    /// Convert from native byte order to little-endian.
    fn to_le(self) -> Self;
}

macro_rules! impl_tag_repr {
    ($($ty:ty),* $(,)?) => {
        $(
            impl TagRepr for $ty {
                const BITS: u32 = <$ty>::BITS;

                #[inline]
                fn to_u64(self) -> u64 {
                    self as u64
                }

                #[inline]
                fn from_u64(tag: u64) -> Self {
                    debug_assert!(
                        crate::encode::fits(tag, Self::BITS),
                        "tag {:#b} does not fit in {} bits",
                        tag,
                        Self::BITS
                    );
                    tag as $ty
                }

                #[inline]
                fn from_le(self) -> Self {
                    <$ty>::from_le(self)
                }

                #[inline]
                fn to_le(self) -> Self {
                    <$ty>::to_le(self)
                }
            }
        )*
    };
}

impl_tag_repr!(u8, u16, u32, u64);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn widths_match_integer_types() {
        assert_eq!(<u8 as TagRepr>::BITS, 8);
        assert_eq!(<u16 as TagRepr>::BITS, 16);
        assert_eq!(<u32 as TagRepr>::BITS, 32);
        assert_eq!(<u64 as TagRepr>::BITS, 64);
    }

    #[test]
    fn narrowing_preserves_fitting_tags() {
        assert_eq!(<u8 as TagRepr>::from_u64(0b1101).to_u64(), 0b1101);
        assert_eq!(<u16 as TagRepr>::from_u64(0b11001101101).to_u64(), 0b11001101101);
        assert_eq!(<u64 as TagRepr>::from_u64(u64::MAX).to_u64(), u64::MAX);
    }

    #[test]
    fn little_endian_round_trip() {
        let tag: u32 = 0b1001101;
        assert_eq!(TagRepr::from_le(TagRepr::to_le(tag)), tag);
    }
}
