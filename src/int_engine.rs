//! INT-mode allocator engine: `create`/`alloc`/`free`/`unused_space`/
//! `avail_space` over [`crate::block::int_block`] headers.
//!
//! The split/coalesce sequencing mirrors `yvt-rlsf`'s `Tlsf::{allocate,
//! deallocate}` (`examples/other_examples/f641e9a8_yvt-rlsf__src-tlsf.rs.rs`):
//! deallocate merges with the physical successor first (recording which
//! block needs its `prev_phys` patched at the end), then with the
//! predecessor (which may reassign the merged block's identity to the
//! predecessor's address), and only then writes the final free header and
//! re-links it, so a block's identity-after-coalescing is resolved before
//! any neighbour's `prev_phys` is touched.

use std::ptr::NonNull;

use crate::block::int_block::{self, BlockHdr, FreeBlockHdr, HEADER_LEN};
use crate::handle::BlockHandle;
use crate::segmap::SegMap;
use crate::size_class::{
  largest_guaranteed_request, map_ceil, map_floor, round_down_to_mbs, round_request, MAX_BLOCK_LEN,
  MBS,
};

pub struct IntEngine {
  base: NonNull<u8>,
  size: usize,
  free_bytes: usize,
  map: SegMap<FreeBlockHdr>,
  /// Whether a block was constructed at `base` by `create`. Stable for the
  /// engine's lifetime, by the same argument as `ExtEngine::first`: block 0
  /// has no predecessor, so it can never be absorbed during coalescing.
  has_block: bool,
}

impl IntEngine {
  /// Builds the initial state: one free block spanning as much of the
  /// extent as fits the size-class map. `base` and `size` are assumed
  /// already validated by the caller (`Tlsf::create`).
  pub fn create(base: NonNull<u8>, size: usize) -> Self {
    let mut map = SegMap::new();
    let avail = size.saturating_sub(HEADER_LEN);
    let length = round_down_to_mbs(avail).min(MAX_BLOCK_LEN);

    let mut free_bytes = 0;
    let mut has_block = false;
    if length >= MBS {
      unsafe {
        let hdr = int_block::init_block(base, length, None, true);
        let cell = map_floor(length).expect("length is within the representable range");
        map.insert(FreeBlockHdr::from_common(hdr), cell);
      }
      free_bytes = length;
      has_block = true;
    }

    Self { base, size, free_bytes, map, has_block }
  }

  #[inline]
  fn extent_end(&self) -> usize {
    self.base.as_ptr() as usize + self.size
  }

  pub fn unused_space(&self) -> usize {
    self.free_bytes
  }

  pub fn avail_space(&self) -> usize {
    let Some(cell) = self.map.bitmaps().highest() else {
      return 0;
    };
    let head = self.map.head(cell).expect("bitmap reports cell non-empty");
    let len = unsafe { FreeBlockHdr::as_common(head).as_ref().length() };
    largest_guaranteed_request(len)
  }

  /// Rounds the request, locates a cell, removes its head block, and splits
  /// off the remainder if one is worth keeping.
  fn take_block(&mut self, n: usize) -> Option<(NonNull<BlockHdr>, usize)> {
    let req = round_request(n)?;
    let target = map_ceil(req)?;
    let cell = self.map.bitmaps().locate(target)?;
    let free_hdr = unsafe { self.map.remove_head(cell) }.expect("locate guarantees non-empty cell");
    let common = FreeBlockHdr::as_common(free_hdr);
    let length = unsafe { common.as_ref().length() };
    self.free_bytes -= length;

    let mut common = common;
    if length - req >= MBS + HEADER_LEN {
      unsafe { self.split(common, length, req) };
      Some((common, req))
    } else {
      unsafe { common.as_mut().set_length_and_free(length, false) };
      Some((common, length))
    }
  }

  /// Shrinks `common` to `req` bytes and inserts a new free remainder block
  /// after it.
  ///
  /// # Safety
  ///
  /// `common` must currently describe a block of length `old_length` not
  /// yet marked used.
  unsafe fn split(&mut self, mut common: NonNull<BlockHdr>, old_length: usize, req: usize) {
    let extent_end = self.extent_end();
    let old_successor = common.as_ref().next_phys(extent_end);

    let remainder_len = old_length - HEADER_LEN - req;
    let child_start =
      NonNull::new_unchecked((common.as_ptr() as *mut u8).add(HEADER_LEN + req));
    let child = int_block::init_block(child_start, remainder_len, Some(common), true);

    if let Some(mut succ) = old_successor {
      succ.as_mut().set_prev_phys(Some(child));
    }

    common.as_mut().set_length_and_free(req, false);

    let cell = map_floor(remainder_len).expect("remainder length is within the representable range");
    self.map.insert(FreeBlockHdr::from_common(child), cell);
    self.free_bytes += remainder_len;
  }

  pub fn alloc(&mut self, n: usize) -> Option<NonNull<u8>> {
    let (common, _) = self.take_block(n)?;
    self.debug_validate();
    Some(unsafe { common.as_ref().payload() })
  }

  pub fn ext_alloc(&mut self, n: usize) -> Option<BlockHandle> {
    let (common, _) = self.take_block(n)?;
    self.debug_validate();
    Some(BlockHandle::from_raw(common))
  }

  /// Panics with a named [`crate::validate::Violation`] if an invariant
  /// walk is enabled and fails. A no-op otherwise.
  fn debug_validate(&self) {
    if crate::validate::enabled() {
      if let Err(v) = self.validate() {
        panic!("TLSF invariant violation: {v:?}");
      }
    }
  }

  /// Merges `block` with any free physical neighbours, sequenced as
  /// described at the top of this file.
  unsafe fn free_common(&mut self, mut block: NonNull<BlockHdr>) {
    if crate::validate::enabled() && block.as_ref().is_free() {
      panic!("double free detected");
    }
    let extent_end = self.extent_end();
    let mut length = block.as_ref().length();

    let new_next = match block.as_ref().next_phys(extent_end) {
      Some(next) if next.as_ref().is_free() => {
        let next_len = next.as_ref().length();
        let cell = map_floor(next_len).expect("free block length is in-range");
        self.map.unlink(FreeBlockHdr::from_common(next), cell);
        self.free_bytes -= next_len;
        length += HEADER_LEN + next_len;
        next.as_ref().next_phys(extent_end)
      }
      other => other,
    };

    if let Some(prev) = block.as_ref().prev_phys() {
      if prev.as_ref().is_free() {
        let prev_len = prev.as_ref().length();
        let cell = map_floor(prev_len).expect("free block length is in-range");
        self.map.unlink(FreeBlockHdr::from_common(prev), cell);
        self.free_bytes -= prev_len;
        length += HEADER_LEN + prev_len;
        block = prev;
      }
    }

    block.as_mut().set_length_and_free(length, true);
    let cell = map_floor(length).expect("merged length is in-range");
    self.map.insert(FreeBlockHdr::from_common(block), cell);
    self.free_bytes += length;

    if let Some(mut new_next) = new_next {
      new_next.as_mut().set_prev_phys(Some(block));
    }
  }

  /// # Safety
  ///
  /// `p` must have been returned by [`Self::alloc`] on this engine and not
  /// yet freed.
  pub unsafe fn free(&mut self, p: NonNull<u8>) {
    let block = BlockHdr::from_payload(p);
    self.free_common(block);
    self.debug_validate();
  }

  /// # Safety
  ///
  /// `handle` must have been returned by [`Self::ext_alloc`] on this engine
  /// and not yet freed.
  pub unsafe fn ext_free(&mut self, handle: BlockHandle) {
    let block: NonNull<BlockHdr> = handle.as_raw();
    self.free_common(block);
    self.debug_validate();
  }

  pub fn ext_getaddr(&self, handle: BlockHandle) -> (usize, usize) {
    let block: NonNull<BlockHdr> = handle.as_raw();
    let offset = block.as_ptr() as usize - self.base.as_ptr() as usize;
    let length = unsafe { block.as_ref().length() };
    (offset, length)
  }

  /// Walks the physical chain from block 0 and cross-checks it against the
  /// segregation map. Only called when `validate::enabled()`.
  pub(crate) fn validate(&self) -> Result<(), crate::validate::Violation> {
    use crate::validate::{check_bitmap_matches_heads, check_length, Violation};

    if let Some(v) = check_bitmap_matches_heads(self.map.bitmaps(), &self.map) {
      return Err(v);
    }

    if !self.has_block {
      return Ok(());
    }

    let extent_end = self.extent_end();
    let mut cursor: NonNull<BlockHdr> = self.base.cast();
    let mut prev_was_free = false;
    loop {
      let addr = cursor.as_ptr() as usize;
      let (length, free) = unsafe { (cursor.as_ref().length(), cursor.as_ref().is_free()) };
      if let Some(v) = check_length(addr, length) {
        return Err(v);
      }
      if free && prev_was_free {
        return Err(Violation::AdjacentFreeBlocks { addr });
      }

      let next = unsafe { cursor.as_ref().next_phys(extent_end) };
      if let Some(next) = next {
        let next_prev = unsafe { next.as_ref().prev_phys() };
        if next_prev != Some(cursor) {
          return Err(Violation::PhysicalLinkBroken { addr });
        }
      }

      prev_was_free = free;
      match next {
        Some(next) => cursor = next,
        None => break,
      }
    }

    Ok(())
  }

  #[cfg(any(test, feature = "checked"))]
  pub(crate) fn base(&self) -> NonNull<u8> {
    self.base
  }

  #[cfg(any(test, feature = "checked"))]
  pub(crate) fn size(&self) -> usize {
    self.size
  }
}
