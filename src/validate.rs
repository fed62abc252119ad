//! Debug-only invariant validator. Each engine owns the physical-chain
//! walk, since INT and EXT navigate neighbours differently; this module
//! holds what both share: the enable gate and the bitmap/head-map
//! cross-check.
//!
//! Named findings rather than formatted strings so tests can match on them
//! directly, in the style of `debug_assert_eq!`'s use throughout
//! `yvt-rlsf`'s `Tlsf` methods.

use crate::segmap::{Bitmaps, FreeLink, SegMap};
use crate::size_class::{FL_COUNT, MBS, SLI_COUNT};

/// Whether the invariant walk should run: always in debug builds, and in
/// release builds only when the `checked` feature is enabled.
#[inline]
pub fn enabled() -> bool {
  cfg!(debug_assertions) || cfg!(feature = "checked")
}

#[derive(Debug, PartialEq, Eq)]
pub enum Violation {
  /// A block's length isn't a multiple of `MBS`, or is smaller than it.
  BadLength { addr: usize, length: usize },
  /// `l2_free[fl][sl]` disagrees with whether `map[fl][sl]` has a head.
  BitmapMismatch { fl: usize, sl: usize },
  /// `l1_free[fl]` disagrees with whether any `l2_free[fl][*]` is set.
  FlBitmapMismatch { fl: usize },
  /// `next(prev(b)) != b` (or the symmetric check on `prev(next(b))`).
  PhysicalLinkBroken { addr: usize },
  /// Two physically adjacent blocks are both free.
  AdjacentFreeBlocks { addr: usize },
}

#[inline]
pub fn check_length(addr: usize, length: usize) -> Option<Violation> {
  if length < MBS || length % MBS != 0 {
    Some(Violation::BadLength { addr, length })
  } else {
    None
  }
}

/// A cell's bitmap bit must be set iff its list head is non-null, and an
/// `fl` bitmap bit must be set iff any of its `sl` bits are.
pub fn check_bitmap_matches_heads<T: FreeLink>(bitmaps: &Bitmaps, map: &SegMap<T>) -> Option<Violation> {
  for fl in 0..FL_COUNT {
    let mut any_sl_set = false;
    for sl in 0..SLI_COUNT {
      let sl_set = bitmaps.is_set(fl, sl);
      if sl_set != map.head((fl, sl)).is_some() {
        return Some(Violation::BitmapMismatch { fl, sl });
      }
      any_sl_set |= sl_set;
    }
    if bitmaps.is_fl_set(fl) != any_sl_set {
      return Some(Violation::FlBitmapMismatch { fl });
    }
  }
  None
}
