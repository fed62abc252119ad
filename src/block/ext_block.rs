//! EXT-mode block header: a side record in a doubly linked physical-order
//! list, carrying a base-relative address. The managed extent itself is
//! opaque to the allocator, only these records are read or written.
//!
//! Grounded in the Agnaji `MultiPoolTLSF` header
//! (`examples/other_examples/c5bcefcc_CodingRays-Agnaji__src-utils-tlsf.rs.rs`),
//! which keeps `size`/`prev_physical`/`next_physical`/`prev_free`/`next_free`
//! in a record separate from the memory it describes, and on
//! `liliilli-rust_tlsf_alloc`'s `BlockHeader`
//! (`examples/other_examples/9106c188_liliilli-rust_tlsf_alloc__src-structs.rs.rs`),
//! which packs a free bit into a `stored_size` field the same way this
//! module's `pack`/`unpack_length`/`unpack_free` do. Records are
//! heap-allocated one at a time via `Box`, which is the hosted equivalent
//! of those crates' page-pooled header allocators: a single extent's
//! worth of splits is bounded, so a dedicated slab/pool allocator for them
//! would add complexity without changing the asymptotics `Box` already
//! gives for free.

use std::ptr::NonNull;

use crate::block::{pack, unpack_free, unpack_length};
use crate::segmap::FreeLink;

#[derive(Debug)]
pub struct BlockHdr {
  /// Base-relative offset of the region this record describes.
  addr: usize,
  /// Length of the region with the free flag packed into bit 0, exactly as
  /// in INT mode.
  size_and_flag: usize,
  phys_prev: Option<NonNull<BlockHdr>>,
  phys_next: Option<NonNull<BlockHdr>>,
  free_next: Option<NonNull<BlockHdr>>,
  free_prev: Option<NonNull<BlockHdr>>,
}

unsafe impl FreeLink for BlockHdr {
  fn free_next(&self) -> Option<NonNull<Self>> {
    self.free_next
  }
  fn set_free_next(&mut self, next: Option<NonNull<Self>>) {
    self.free_next = next;
  }
  fn free_prev(&self) -> Option<NonNull<Self>> {
    self.free_prev
  }
  fn set_free_prev(&mut self, prev: Option<NonNull<Self>>) {
    self.free_prev = prev;
  }
}

impl BlockHdr {
  #[inline]
  pub fn addr(&self) -> usize {
    self.addr
  }

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
  pub fn phys_prev(&self) -> Option<NonNull<BlockHdr>> {
    self.phys_prev
  }

  #[inline]
  pub fn phys_next(&self) -> Option<NonNull<BlockHdr>> {
    self.phys_next
  }

  #[inline]
  pub fn set_phys_prev(&mut self, prev: Option<NonNull<BlockHdr>>) {
    self.phys_prev = prev;
  }

  #[inline]
  pub fn set_phys_next(&mut self, next: Option<NonNull<BlockHdr>>) {
    self.phys_next = next;
  }
}

/// Allocates a new side record from the ambient global allocator and
/// splices it immediately after `parent` in the physical-order list.
/// `parent` is `None` only when creating the very first block for an
/// extent.
///
/// # Safety
///
/// If `parent` is `Some`, it must be a live record owned by the same
/// engine, and the caller is responsible for updating `parent`'s own
/// `phys_next` afterwards (this function only wires the new record's
/// neighbours and the old successor's `phys_prev`).
pub unsafe fn alloc_record(
  addr: usize,
  length: usize,
  free: bool,
  parent: Option<NonNull<BlockHdr>>,
  old_next: Option<NonNull<BlockHdr>>,
) -> NonNull<BlockHdr> {
  let record = BlockHdr {
    addr,
    size_and_flag: pack(length, free),
    phys_prev: parent,
    phys_next: old_next,
    free_next: None,
    free_prev: None,
  };
  let mut ptr = NonNull::new_unchecked(Box::into_raw(Box::new(record)));
  if let Some(mut old_next) = old_next {
    old_next.as_mut().phys_prev = Some(ptr);
  }
  ptr.as_mut().phys_prev = parent;
  ptr
}

/// Releases a side record back to the ambient global allocator.
///
/// # Safety
///
/// `record` must have been produced by [`alloc_record`] and not already
/// freed, and must already be unlinked from both the physical-order list
/// and any segregation list.
pub unsafe fn free_record(record: NonNull<BlockHdr>) {
  drop(Box::from_raw(record.as_ptr()));
}
