//! EXT-mode allocator engine: same split/coalesce discipline as
//! [`crate::int_engine`], but operating on [`crate::block::ext_block`]
//! side records threaded through a physical-order doubly linked list
//! instead of address arithmetic over an embedded header.

use std::ptr::NonNull;

use crate::block::ext_block::{self, BlockHdr};
use crate::handle::BlockHandle;
use crate::segmap::SegMap;
use crate::size_class::{
  largest_guaranteed_request, map_ceil, map_floor, round_down_to_mbs, round_request, MAX_BLOCK_LEN,
  MBS,
};

pub struct ExtEngine {
  base: NonNull<u8>,
  size: usize,
  free_bytes: usize,
  map: SegMap<BlockHdr>,
  /// Head of the physical-order list. Stable for the engine's lifetime:
  /// the first record's `phys_prev` is always `None`, so it can never be
  /// absorbed into a predecessor during coalescing (coalescing only ever
  /// reassigns a block's identity to its predecessor's). Used by `Drop` to
  /// walk and release every record regardless of free/used state.
  first: Option<NonNull<BlockHdr>>,
}

impl ExtEngine {
  pub fn create(base: NonNull<u8>, size: usize) -> Self {
    let mut map = SegMap::new();
    let length = round_down_to_mbs(size).min(MAX_BLOCK_LEN);

    let mut free_bytes = 0;
    let mut first = None;
    if length >= MBS {
      unsafe {
        let record = ext_block::alloc_record(0, length, true, None, None);
        let cell = map_floor(length).expect("length is within the representable range");
        map.insert(record, cell);
        first = Some(record);
      }
      free_bytes = length;
    }

    Self { base, size, free_bytes, map, first }
  }

  pub fn unused_space(&self) -> usize {
    self.free_bytes
  }

  pub fn avail_space(&self) -> usize {
    let Some(cell) = self.map.bitmaps().highest() else {
      return 0;
    };
    let head = self.map.head(cell).expect("bitmap reports cell non-empty");
    let len = unsafe { head.as_ref().length() };
    largest_guaranteed_request(len)
  }

  fn take_block(&mut self, n: usize) -> Option<NonNull<BlockHdr>> {
    let req = round_request(n)?;
    let target = map_ceil(req)?;
    let cell = self.map.bitmaps().locate(target)?;
    let mut record = unsafe { self.map.remove_head(cell) }.expect("locate guarantees non-empty cell");
    let length = unsafe { record.as_ref().length() };
    self.free_bytes -= length;

    if length - req >= MBS {
      unsafe { self.split(record, length, req) };
    } else {
      unsafe { record.as_mut().set_length_and_free(length, false) };
    }
    Some(record)
  }

  /// Unlike INT, an EXT split carries no header cost against the parent:
  /// the new record lives entirely off to the side, so the only threshold
  /// is that the remainder itself reaches `MBS`.
  unsafe fn split(&mut self, mut record: NonNull<BlockHdr>, old_length: usize, req: usize) {
    let old_addr = record.as_ref().addr();
    let old_next = record.as_ref().phys_next();
    let remainder_len = old_length - req;

    let child = ext_block::alloc_record(old_addr + req, remainder_len, true, Some(record), old_next);
    record.as_mut().set_phys_next(Some(child));
    record.as_mut().set_length_and_free(req, false);

    let cell = map_floor(remainder_len).expect("remainder length is within the representable range");
    self.map.insert(child, cell);
    self.free_bytes += remainder_len;
  }

  pub fn ext_alloc(&mut self, n: usize) -> Option<BlockHandle> {
    let record = self.take_block(n)?;
    self.debug_validate();
    Some(BlockHandle::from_raw(record))
  }

  /// # Safety
  ///
  /// `handle` must have been returned by [`Self::ext_alloc`] on this engine
  /// and not yet freed.
  pub unsafe fn ext_free(&mut self, handle: BlockHandle) {
    let mut block: NonNull<BlockHdr> = handle.as_raw();
    if crate::validate::enabled() && block.as_ref().is_free() {
      panic!("double free detected");
    }
    let mut length = block.as_ref().length();

    let new_next = match block.as_ref().phys_next() {
      Some(next) if next.as_ref().is_free() => {
        let next_len = next.as_ref().length();
        let cell = map_floor(next_len).expect("free record length is in-range");
        self.map.unlink(next, cell);
        self.free_bytes -= next_len;
        length += next_len;
        let after = next.as_ref().phys_next();
        block.as_mut().set_phys_next(after);
        ext_block::free_record(next);
        after
      }
      other => other,
    };

    let merged_into_prev = block.as_ref().phys_prev().is_some_and(|prev| prev.as_ref().is_free());

    if merged_into_prev {
      let mut prev = block.as_ref().phys_prev().unwrap();
      let prev_len = prev.as_ref().length();
      let cell = map_floor(prev_len).expect("free record length is in-range");
      self.map.unlink(prev, cell);
      self.free_bytes -= prev_len;
      length += prev_len;

      prev.as_mut().set_length_and_free(length, true);
      prev.as_mut().set_phys_next(new_next);
      if let Some(mut new_next) = new_next {
        new_next.as_mut().set_phys_prev(Some(prev));
      }
      let cell = map_floor(length).expect("merged length is in-range");
      self.map.insert(prev, cell);
      self.free_bytes += length;
      ext_block::free_record(block);
    } else {
      block.as_mut().set_length_and_free(length, true);
      if let Some(mut new_next) = new_next {
        new_next.as_mut().set_phys_prev(Some(block));
      }
      let cell = map_floor(length).expect("merged length is in-range");
      self.map.insert(block, cell);
      self.free_bytes += length;
    }

    self.debug_validate();
  }

  pub fn ext_getaddr(&self, handle: BlockHandle) -> (usize, usize) {
    let block: NonNull<BlockHdr> = handle.as_raw();
    unsafe { (block.as_ref().addr(), block.as_ref().length()) }
  }

  /// Walks the physical chain from `first` and cross-checks it against the
  /// segregation map. Only called when `validate::enabled()`.
  pub(crate) fn validate(&self) -> Result<(), crate::validate::Violation> {
    use crate::validate::{check_bitmap_matches_heads, check_length, Violation};

    if let Some(v) = check_bitmap_matches_heads(self.map.bitmaps(), &self.map) {
      return Err(v);
    }

    let mut cursor = self.first;
    let mut prev_was_free = false;
    while let Some(record) = cursor {
      let addr = unsafe { record.as_ref().addr() };
      let (length, free) = unsafe { (record.as_ref().length(), record.as_ref().is_free()) };
      if let Some(v) = check_length(addr, length) {
        return Err(v);
      }
      if free && prev_was_free {
        return Err(Violation::AdjacentFreeBlocks { addr });
      }

      let next = unsafe { record.as_ref().phys_next() };
      if let Some(next) = next {
        let next_prev = unsafe { next.as_ref().phys_prev() };
        if next_prev != Some(record) {
          return Err(Violation::PhysicalLinkBroken { addr });
        }
      }

      prev_was_free = free;
      cursor = next;
    }

    Ok(())
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

  #[cfg(any(test, feature = "checked"))]
  pub(crate) fn base(&self) -> NonNull<u8> {
    self.base
  }

  #[cfg(any(test, feature = "checked"))]
  pub(crate) fn size(&self) -> usize {
    self.size
  }
}

impl Drop for ExtEngine {
  /// Releases every remaining side record, free or still allocated, by
  /// walking the physical-order list from `first`. A record the caller
  /// never freed is released here too, the same way dropping a `Vec`
  /// drops elements the caller never removed.
  fn drop(&mut self) {
    let mut cursor = self.first;
    while let Some(record) = cursor {
      cursor = unsafe { record.as_ref().phys_next() };
      unsafe { ext_block::free_record(record) };
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn new_engine(len: usize) -> ExtEngine {
    // EXT mode never reads or writes the extent itself, so tests that don't
    // exercise `base()`/`size()` directly can use a dangling placeholder.
    ExtEngine::create(NonNull::dangling(), len)
  }

  #[test]
  fn create_yields_one_free_block() {
    let engine = new_engine(4096);
    assert_eq!(engine.unused_space(), round_down_to_mbs(4096));
  }

  #[test]
  fn alloc_then_free_restores_unused_space() {
    let mut engine = new_engine(4096);
    let before = engine.unused_space();
    let h = engine.ext_alloc(64).expect("alloc should succeed");
    assert!(engine.unused_space() < before);
    unsafe { engine.ext_free(h) };
    assert_eq!(engine.unused_space(), before);
  }

  #[test]
  fn getaddr_offsets_strictly_increase() {
    let mut engine = new_engine(4096);
    let a = engine.ext_alloc(32).unwrap();
    let b = engine.ext_alloc(32).unwrap();
    let (addr_a, _) = engine.ext_getaddr(a);
    let (addr_b, _) = engine.ext_getaddr(b);
    assert!(addr_b > addr_a);
  }

  #[test]
  fn coalesce_a_b_c_then_free_b_a_c_restores_initial_extent() {
    let mut engine = new_engine(4096);
    let before = engine.unused_space();
    let a = engine.ext_alloc(64).unwrap();
    let b = engine.ext_alloc(64).unwrap();
    let c = engine.ext_alloc(64).unwrap();
    unsafe {
      engine.ext_free(b);
      engine.ext_free(a);
      engine.ext_free(c);
    }
    assert_eq!(engine.unused_space(), before);
  }
}
