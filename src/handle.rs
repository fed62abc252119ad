//! The opaque handle type shared by both engines' `ext_alloc`/`ext_free`.

use std::ptr::NonNull;

/// Handle to a block allocated via `Tlsf::ext_alloc`, in either mode.
///
/// A handle is only meaningful to the `Tlsf` that produced it: passing one
/// to a different allocator, or to the allocator after it has been
/// destroyed, is a programming error caught by `debug_assert!` where
/// practical and otherwise undefined behaviour.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHandle(NonNull<u8>);

impl BlockHandle {
  #[inline]
  pub(crate) fn from_raw<T>(ptr: NonNull<T>) -> Self {
    Self(ptr.cast())
  }

  #[inline]
  pub(crate) fn as_raw<T>(self) -> NonNull<T> {
    self.0.cast()
  }
}
