//! Block header backends.
//!
//! Two independently specialised implementations of the block concept:
//! [`int_block`] embeds its header inside the managed extent and chains
//! physical neighbours by a predecessor pointer plus address arithmetic;
//! [`ext_block`] keeps its header as a side record in a doubly linked
//! physical-order list and never touches the managed extent. Both
//! implement [`crate::segmap::FreeLink`] so they share one
//! [`crate::segmap::SegMap`] implementation.

pub mod ext_block;
pub mod int_block;

/// Packs a block length and its free flag into one word: the low bit of
/// the length is free because every length is a multiple of `MBS >= 2`.
#[inline]
pub fn pack(length: usize, free: bool) -> usize {
  debug_assert_eq!(length & 1, 0, "block length must be even to pack a free bit");
  length | (free as usize)
}

#[inline]
pub fn unpack_length(word: usize) -> usize {
  word & !1
}

#[inline]
pub fn unpack_free(word: usize) -> bool {
  word & 1 != 0
}
