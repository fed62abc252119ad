//! First-level / second-level size-class mapping.
//!
//! A request size is translated into an `(fl, sl)` cell index. `fl` is a
//! power-of-two band (`[2^fl, 2^(fl+1))`); `sl` subdivides that band into
//! [`SLI_COUNT`] equal sub-bands.

use crate::bits::floor_log2;

/// Machine word size, in bytes.
pub const WORD_SIZE: usize = std::mem::size_of::<usize>();

/// Minimum block size: every block's length is a multiple of this and at
/// least this large. Chosen as four words so a free block always has room
/// for the two free-list link fields in addition to the base header
/// (see `crate::block::int_block`).
pub const MBS: usize = 4 * WORD_SIZE;

/// Number of second-level sub-bands per first-level band. `SLI_SHIFT` is the
/// number of high bits of the in-band offset used as the `sl` index.
pub const SLI_SHIFT: u32 = 5;
pub const SLI_COUNT: usize = 1 << SLI_SHIFT;

/// `floor(log2(MBS))`: the smallest `fl` any in-range size can map to. On a
/// 64-bit target `MBS` is 32 and this is 5 (equal to [`SLI_SHIFT`]); on a
/// 32-bit target `MBS` is 16 and this is 4, one less than `SLI_SHIFT`. The
/// mapping functions below handle both cases, following the general
/// construction in `yvt-rlsf`'s `Tlsf::map_floor`/`map_ceil`.
pub const MIN_FL: u32 = MBS.trailing_zeros();

/// Number of first-level bands this allocator tracks, starting at
/// [`MIN_FL`]. Bounds the largest representable block at
/// `2^(MIN_FL + FL_COUNT) - 1`, comfortably above any size budget a single
/// contiguous extent is likely to need while keeping the head map small.
pub const FL_COUNT: usize = 32;

/// `(fl, sl)` index pair identifying a segregation-list cell. `fl` here is
/// already offset by [`MIN_FL`] (i.e. it indexes directly into the head
/// map), not the raw `floor(log2(size))` exponent.
pub type Cell = (usize, usize);

/// Maps `size` (already a multiple of [`MBS`] and `>= MBS`) down to the cell
/// whose size range contains it, used when inserting an existing free
/// block into the map, where rounding must not change which cell the block
/// lands in. Mirrors `yvt-rlsf`'s `Tlsf::map_floor`.
#[inline]
pub fn map_floor(size: usize) -> Option<Cell> {
  debug_assert!(size >= MBS);
  debug_assert_eq!(size % MBS, 0);

  let fl = usize::BITS - MIN_FL - 1 - size.leading_zeros();

  let sl = if MIN_FL < SLI_SHIFT && fl < SLI_SHIFT - MIN_FL {
    size << ((SLI_SHIFT - MIN_FL) - fl)
  } else {
    size >> (fl + MIN_FL - SLI_SHIFT)
  };

  if fl as usize >= FL_COUNT {
    return None;
  }
  Some((fl as usize, sl & (SLI_COUNT - 1)))
}

/// Rounds `size` up to the next size class and maps it, guaranteeing that
/// any block found in the resulting cell is `>= size`. This is the mapping
/// used when *searching* for a block to satisfy a request.
/// Mirrors `yvt-rlsf`'s `Tlsf::map_ceil`.
#[inline]
pub fn map_ceil(size: usize) -> Option<Cell> {
  debug_assert!(size >= MBS);
  debug_assert_eq!(size % MBS, 0);

  let mut fl = usize::BITS - MIN_FL - 1 - size.leading_zeros();

  let sl = if MIN_FL < SLI_SHIFT && fl < SLI_SHIFT - MIN_FL {
    size << ((SLI_SHIFT - MIN_FL) - fl)
  } else {
    let shift = fl + MIN_FL - SLI_SHIFT;
    let mut sl = size >> shift;
    // Round up: if the shift threw away any set bits, bump to the next sl.
    sl += (sl << shift != size) as usize;
    // sl may have overflowed into the next fl band.
    fl += (sl >> (SLI_SHIFT + 1)) as u32;
    sl
  };

  if fl as usize >= FL_COUNT {
    return None;
  }
  Some((fl as usize, sl & (SLI_COUNT - 1)))
}

/// Rounds a raw request (not yet a multiple of `MBS`) up to a valid block
/// length: at least `MBS`, and a multiple of `MBS`.
#[inline]
pub fn round_request(n: usize) -> Option<usize> {
  let n = n.max(1);
  let n = n.checked_add(MBS - 1)?;
  Some((n & !(MBS - 1)).max(MBS))
}

/// Rounds `n` down to the nearest multiple of `MBS` (possibly 0).
#[inline]
pub fn round_down_to_mbs(n: usize) -> usize {
  (n / MBS) * MBS
}

/// Largest block length representable by this map: one past the top of the
/// highest FL band. Extents larger than this are clamped at construction
/// time (see `int_engine`/`ext_engine`), the same way `yvt-rlsf` bounds a
/// single chunk via `Tlsf::MAX_POOL_SIZE`.
pub const MAX_BLOCK_LEN: usize = {
  let shift = MIN_FL + FL_COUNT as u32;
  if shift >= usize::BITS {
    usize::MAX - MBS + 1
  } else {
    (1usize << shift) - MBS
  }
};

/// Inverse of the rounding step in [`map_ceil`], used by `avail_space` to
/// recover a guaranteed-satisfiable request size from a block length found
/// in the highest non-empty cell.
#[inline]
pub fn largest_guaranteed_request(block_len: usize) -> usize {
  if block_len < MBS {
    return 0;
  }
  let fl = floor_log2(block_len);
  let shift = fl.saturating_sub(SLI_SHIFT);
  let rounded = ((block_len + 1 + MBS - 1) & !(MBS - 1)).saturating_sub(MBS);
  rounded.saturating_sub(1usize << shift)
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn min_fl_matches_mbs() {
    assert_eq!(1usize << MIN_FL, MBS);
  }

  #[test]
  fn map_floor_smallest_size_is_cell_zero() {
    assert_eq!(map_floor(MBS), Some((0, 0)));
  }

  #[test]
  fn map_floor_monotonic_fl() {
    let mut last_fl = 0usize;
    let mut size = MBS;
    for _ in 0..8 {
      let (fl, _) = map_floor(size).unwrap();
      assert!(fl >= last_fl);
      last_fl = fl;
      size *= 2;
    }
  }

  #[test]
  fn map_floor_sl_cycles_through_all_subbands() {
    // Within one FL band, sl should take every value 0..SLI_COUNT exactly
    // once as size sweeps the band.
    let fl_exp = MIN_FL + 3;
    let band_base = 1usize << fl_exp;
    let step = band_base >> SLI_SHIFT;
    let mut seen = std::collections::HashSet::new();
    for sl in 0..SLI_COUNT {
      let size = band_base + sl * step;
      let size = size - (size % MBS).min(0); // already MBS-aligned for fl_exp >= MIN_FL+log2(SLI_COUNT)
      let (_, sl_got) = map_floor(size).unwrap();
      seen.insert(sl_got);
    }
    assert_eq!(seen.len(), SLI_COUNT);
  }

  #[test]
  fn map_ceil_never_undershoots() {
    for n in 1..4000usize {
      let req = round_request(n).unwrap();
      let (fl, sl) = map_ceil(req).unwrap();
      let cell_min = cell_min_size(fl, sl);
      assert!(cell_min >= req, "cell_min={cell_min} < req={req} fl={fl} sl={sl}");
    }
  }

  #[test]
  fn map_ceil_is_tight() {
    // map_ceil should never jump more than one size class ahead of the
    // tightest cell that could hold `req`.
    for n in (1..4000usize).step_by(7) {
      let req = round_request(n).unwrap();
      let (fl, sl) = map_ceil(req).unwrap();
      let (fl0, sl0) = map_floor(req).unwrap();
      assert!((fl, sl) >= (fl0, sl0));
    }
  }

  #[test]
  fn round_request_respects_mbs() {
    assert_eq!(round_request(0), Some(MBS));
    assert_eq!(round_request(1), Some(MBS));
    assert_eq!(round_request(MBS), Some(MBS));
    assert_eq!(round_request(MBS + 1), Some(2 * MBS));
  }

  /// Recovers the real `fl` exponent (as used in the `2^fl` size band) from
  /// a cell's `fl` index. No production call site needs this, only this
  /// test helper.
  fn fl_exponent(fl_index: usize) -> u32 {
    fl_index as u32 + MIN_FL
  }

  /// Smallest block length that maps to cell `(fl, sl)` via `map_floor`.
  fn cell_min_size(fl: usize, sl: usize) -> usize {
    let fl_exp = fl_exponent(fl);
    let band_base = 1usize << fl_exp;
    if fl_exp >= SLI_SHIFT {
      band_base + (sl << (fl_exp - SLI_SHIFT))
    } else {
      band_base
    }
  }
}
