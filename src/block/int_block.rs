//! INT-mode block header: embedded in the managed extent, chained by a
//! physical-predecessor pointer, with free-list links that overlap payload
//! memory.
//!
//! Grounded in `yvt-rlsf`'s `BlockHdr`/`FreeBlockHdr` split
//! (`examples/other_examples/f641e9a8_yvt-rlsf__src-tlsf.rs.rs`): a common
//! header embedded at the front of every block, and a free-only extension
//! that overlays what would otherwise be payload bytes. Unlike rlsf, there
//! is no `SIZE_LAST_IN_POOL` bit here. The engine already knows the
//! extent's bounds, so "is this the last block" is answered by comparing
//! the computed successor address against `base + size` rather than by a
//! header flag.

use std::ptr::NonNull;

use crate::block::{pack, unpack_free, unpack_length};
use crate::segmap::FreeLink;

/// Header present at the start of every INT block, used or free.
#[repr(C)]
#[derive(Debug)]
pub struct BlockHdr {
  /// Length of the block, header excluded, with the free flag packed into
  /// bit 0 (see `crate::block::{pack, unpack_length, unpack_free}`).
  size_and_flag: usize,
  prev_phys: Option<NonNull<BlockHdr>>,
}

/// A free block's header: the common header plus the two free-list links,
/// which overlap the block's payload while it is free.
#[repr(C)]
#[derive(Debug)]
pub struct FreeBlockHdr {
  pub common: BlockHdr,
  next_free: Option<NonNull<FreeBlockHdr>>,
  prev_free: Option<NonNull<FreeBlockHdr>>,
}

/// Size of the header every block pays, used or free.
pub const HEADER_LEN: usize = std::mem::size_of::<BlockHdr>();

unsafe impl FreeLink for FreeBlockHdr {
  fn free_next(&self) -> Option<NonNull<Self>> {
    self.next_free
  }
  fn set_free_next(&mut self, next: Option<NonNull<Self>>) {
    self.next_free = next;
  }
  fn free_prev(&self) -> Option<NonNull<Self>> {
    self.prev_free
  }
  fn set_free_prev(&mut self, prev: Option<NonNull<Self>>) {
    self.prev_free = prev;
  }
}

impl BlockHdr {
  #[inline]
  pub fn length(&self) -> usize {
    unpack_length(self.size_and_flag)
  }

  #[inline]
  pub fn is_free(&self) -> bool {
    unpack_free(self.size_and_flag)
  }

  #[inline]
  pub fn set_length_and_free(&mut self, length: usize, free: bool) {
    self.size_and_flag = pack(length, free);
  }

  #[inline]
  pub fn prev_phys(&self) -> Option<NonNull<BlockHdr>> {
    self.prev_phys
  }

  #[inline]
  pub fn set_prev_phys(&mut self, prev: Option<NonNull<BlockHdr>>) {
    self.prev_phys = prev;
  }

  /// Start of this block's payload, immediately after the header.
  #[inline]
  pub fn payload(&self) -> NonNull<u8> {
    unsafe { NonNull::new_unchecked((self as *const Self as *mut u8).add(HEADER_LEN)) }
  }

  /// Recovers the header from a payload pointer previously returned by
  /// [`Self::payload`].
  ///
  /// # Safety
  ///
  /// `payload` must have been produced by [`Self::payload`] on a live
  /// `BlockHdr`.
  #[inline]
  pub unsafe fn from_payload(payload: NonNull<u8>) -> NonNull<BlockHdr> {
    NonNull::new_unchecked(payload.as_ptr().sub(HEADER_LEN)).cast()
  }

  /// The physical successor's header address, computed purely by address
  /// arithmetic: `block_start + header_len + length`. Returns `None` if
  /// that address is at or past `extent_end` (this is the last block).
  #[inline]
  pub fn next_phys(&self, extent_end: usize) -> Option<NonNull<BlockHdr>> {
    let next_addr = self as *const Self as usize + HEADER_LEN + self.length();
    if next_addr >= extent_end {
      None
    } else {
      Some(unsafe { NonNull::new_unchecked(next_addr as *mut BlockHdr) })
    }
  }
}

impl FreeBlockHdr {
  #[inline]
  pub fn as_common(this: NonNull<Self>) -> NonNull<BlockHdr> {
    this.cast()
  }

  /// # Safety
  ///
  /// `common` must point at a block header whose `is_free()` is true and
  /// whose payload is large enough to hold the two free-list link fields
  /// (guaranteed by `MBS >= 2 * size_of::<usize>()`).
  #[inline]
  pub unsafe fn from_common(common: NonNull<BlockHdr>) -> NonNull<Self> {
    common.cast()
  }
}

/// Writes the initial header for a freshly carved-out block at `start`,
/// wiring `prev_phys` and marking it allocated (the caller inserts it into
/// the segregation map separately if it should be free).
///
/// # Safety
///
/// `start` must be valid for `HEADER_LEN + length` bytes and not aliased.
pub unsafe fn init_block(
  start: NonNull<u8>,
  length: usize,
  prev_phys: Option<NonNull<BlockHdr>>,
  free: bool,
) -> NonNull<BlockHdr> {
  let mut hdr: NonNull<BlockHdr> = start.cast();
  hdr.as_mut().size_and_flag = pack(length, free);
  hdr.as_mut().prev_phys = prev_phys;
  hdr
}
