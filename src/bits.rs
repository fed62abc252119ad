//! Bit-scan primitives the size-class mapper and segregation map are built on.
//!
//! Every function here lowers to a single hardware instruction (`bsf`/`bsr`,
//! `clz`/`ctz`, ...) via the standard library's `leading_zeros`/`trailing_zeros`,
//! so all three are O(1) regardless of which bits are set.

/// Index of the highest set bit, i.e. `floor(log2(x))`.
///
/// # Panics
///
/// Panics if `x == 0` (there is no highest set bit).
#[inline]
pub fn floor_log2(x: usize) -> u32 {
  debug_assert_ne!(x, 0, "floor_log2(0) is undefined");
  usize::BITS - 1 - x.leading_zeros()
}

/// Same as `find_first_set` but over a `u32`, used for the per-FL
/// second-level bitmaps.
#[inline]
pub fn find_first_set32(x: u32) -> Option<u32> {
  if x == 0 { None } else { Some(x.trailing_zeros()) }
}

#[cfg(test)]
mod tests {
  use super::*;

  /// Index of the lowest set bit ("find first set"), or `None` if `x == 0`.
  /// No production call site needs the `usize` width; kept here to pin down
  /// `find_first_set32`'s behaviour against its natural-width counterpart.
  fn find_first_set(x: usize) -> Option<u32> {
    if x == 0 { None } else { Some(x.trailing_zeros()) }
  }

  /// Index of the highest set bit ("find last set"), or `None` if `x == 0`.
  fn find_last_set(x: usize) -> Option<u32> {
    if x == 0 { None } else { Some(floor_log2(x)) }
  }

  #[test]
  fn floor_log2_powers_of_two() {
    for shift in 0..usize::BITS {
      assert_eq!(floor_log2(1usize << shift), shift);
    }
  }

  #[test]
  fn floor_log2_between_powers() {
    assert_eq!(floor_log2(5), 2);
    assert_eq!(floor_log2(1023), 9);
    assert_eq!(floor_log2(1024), 10);
  }

  #[test]
  fn find_first_set_basic() {
    assert_eq!(find_first_set(0), None);
    assert_eq!(find_first_set(0b1000), Some(3));
    assert_eq!(find_first_set(0b1010), Some(1));
  }

  #[test]
  fn find_last_set_basic() {
    assert_eq!(find_last_set(0), None);
    assert_eq!(find_last_set(0b1000), Some(3));
    assert_eq!(find_last_set(0b1011), Some(3));
  }

  #[test]
  fn find_first_set32_basic() {
    assert_eq!(find_first_set32(0), None);
    assert_eq!(find_first_set32(0b0110_0000), Some(5));
  }
}
