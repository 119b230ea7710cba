//! Field layout: how a child's position among its siblings becomes a bit field.
//!
//! Every sibling group gets one field width. A field is the child's zero-based
//! position with a *stop marker* forced into its top bit:
//!
//! ```text
//! siblings = 3          zero-based   marker   field
//! ┌──────────┐          ──────────   ──────   ─────
//! │ E (pos 1)│  ──►        0b00   |  0b100  = 0b100
//! │ F (pos 2)│  ──►        0b01   |  0b100  = 0b101
//! │ G (pos 3)│  ──►        0b10   |  0b100  = 0b110
//! └──────────┘
//! ```
//!
//! The marker makes every field of a group the same width and never zero, so a
//! field can not be confused with "no field" once it is stacked on top of the
//! parent's tag. Position `0` is reserved for the root, which has no field.

/// Number of bits needed to represent `n`: the smallest `b` with `2^b > n`.
///
/// Computed by repeated halving. `bits_needed(0) == 0`.
#[inline]
pub const fn bits_needed(n: u64) -> u32 {
    let mut n = n;
    let mut bits = 0;
    while n != 0 {
        n >>= 1;
        bits += 1;
    }
    bits
}

/// The leading marker bit shared by every field of a group of `siblings` children.
///
/// It sits just above the bits needed for the largest zero-based position
/// (`siblings - 1`).
#[inline]
pub const fn stop_marker(siblings: u32) -> u64 {
    debug_assert!(siblings > 0, "a sibling group has at least one child");
    1u64 << bits_needed(siblings as u64 - 1)
}

/// Width in bits of the position field of a group of `siblings` children.
///
/// A group of one child still costs one bit (the marker alone).
#[inline]
pub const fn field_width(siblings: u32) -> u32 {
    if siblings == 0 {
        return 0;
    }
    bits_needed(siblings as u64 - 1) + 1
}

/// Marker-tagged field for the child at 1-based `position` among `siblings`.
///
/// `position == 0` means "root" and yields `0`: the root contributes no field.
#[inline]
pub const fn corrected_position(position: u32, siblings: u32) -> u64 {
    if position == 0 {
        return 0;
    }
    debug_assert!(position <= siblings, "position must be within the sibling group");
    (position as u64 - 1) | stop_marker(siblings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bits_needed_matches_bit_length() {
        assert_eq!(bits_needed(0), 0);
        assert_eq!(bits_needed(1), 1);
        assert_eq!(bits_needed(2), 2);
        assert_eq!(bits_needed(3), 2);
        assert_eq!(bits_needed(4), 3);
        assert_eq!(bits_needed(0b1101), 4);
        assert_eq!(bits_needed(u64::MAX), 64);

        for n in 1..4096u64 {
            assert_eq!(bits_needed(n), 64 - n.leading_zeros(), "n = {}", n);
        }
    }

    #[test]
    fn single_child_field_is_just_the_marker() {
        assert_eq!(stop_marker(1), 0b1);
        assert_eq!(corrected_position(1, 1), 0b1);
        assert_eq!(field_width(1), 1);
    }

    #[test]
    fn two_children_share_a_two_bit_field() {
        assert_eq!(corrected_position(1, 2), 0b10);
        assert_eq!(corrected_position(2, 2), 0b11);
        assert_eq!(field_width(2), 2);
    }

    #[test]
    fn three_children_need_three_bits() {
        assert_eq!(corrected_position(1, 3), 0b100);
        assert_eq!(corrected_position(2, 3), 0b101);
        assert_eq!(corrected_position(3, 3), 0b110);
        assert_eq!(field_width(3), 3);
    }

    #[test]
    fn five_children_need_four_bits() {
        let fields: Vec<u64> = (1..=5).map(|p| corrected_position(p, 5)).collect();
        assert_eq!(fields, vec![0b1000, 0b1001, 0b1010, 0b1011, 0b1100]);
        assert_eq!(field_width(5), 4);
    }

    #[test]
    fn root_has_no_field() {
        assert_eq!(corrected_position(0, 0), 0);
        assert_eq!(field_width(0), 0);
    }

    #[test]
    fn every_field_in_a_group_has_the_group_width() {
        for siblings in 1..=300u32 {
            let width = field_width(siblings);
            for position in 1..=siblings {
                let field = corrected_position(position, siblings);
                assert_eq!(
                    bits_needed(field),
                    width,
                    "position {} of {} has the wrong width",
                    position,
                    siblings
                );
            }
        }
    }

    #[test]
    fn fields_are_distinct_within_a_group() {
        let siblings = 17;
        let mut seen = std::collections::HashSet::new();
        for position in 1..=siblings {
            assert!(seen.insert(corrected_position(position, siblings)));
        }
    }
}
