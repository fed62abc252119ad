//! # tlsf - Two-Level Segregated Fit allocator
//!
//! A constant worst-case time dynamic storage allocator, suitable for
//! real-time and interactive systems, over a single contiguous extent the
//! caller supplies at construction time.
//!
//! ## Overview
//!
//! TLSF classifies free blocks into a 2-D grid of size classes: a coarse
//! power-of-two first-level band, subdivided into equal second-level
//! sub-bands, and tracks which cells are non-empty with a pair of
//! bitmaps:
//!
//! ```text
//!   First level (one bit per power-of-two band)
//!   ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!   │ 0  │ 0  │ 1  │ 0  │ 0  │ 0  │ 0  │ 0  │   fl_bitmap
//!   └────┴────┴────┴──┬─┴────┴────┴────┴────┘
//!                      │
//!   Second level        ▼ (32 sub-bands per fl, by default)
//!   ┌────┬────┬────┬────┬────┬────┬────┬────┐
//!   │ 0  │ 0  │ 1  │ 0  │ 0  │ 0  │ 0  │ 0  │   sl_bitmap[2]
//!   └────┴────┴────┴──┬─┴────┴────┴────┴────┘
//!                      │
//!                      ▼
//!               head of a doubly linked
//!               free list for that cell
//! ```
//!
//! Both allocation and deallocation locate or update a cell in O(1): two
//! bit-scans, a list-head read, and a constant number of pointer writes,
//! independent of how many blocks are currently live.
//!
//! ## Two header backends
//!
//! - [`Mode::Int`]: the block header is embedded in the managed extent
//!   itself, chained by a physical-predecessor pointer. `alloc`/`free`
//!   hand back and accept raw payload addresses.
//! - [`Mode::Ext`]: the header is a side record the allocator keeps in its
//!   own heap; the managed extent is never read or written. `ext_alloc`/
//!   `ext_free` hand back and accept an opaque [`BlockHandle`] instead, and
//!   `ext_getaddr` recovers the base-relative offset and length.
//!
//! `ext_alloc`/`ext_free`/`ext_getaddr` work in either mode; `alloc`/`free`
//! only in [`Mode::Int`].
//!
//! ## Crate structure
//!
//! ```text
//!   tlsf
//!   ├── bits          - bit-scan primitives (floor_log2, find_first_set32)
//!   ├── align         - alignment macros (align!, align_to!)
//!   ├── size_class    - (fl, sl) mapping and request rounding
//!   ├── segmap        - bitmaps + 2-D free-list head map, shared by both engines
//!   ├── block
//!   │   ├── int_block - embedded header, physical-predecessor chaining
//!   │   └── ext_block - side-record header, physical-order doubly linked list
//!   ├── handle        - the opaque BlockHandle type
//!   ├── int_engine     - create/alloc/free/unused_space/avail_space for Mode::Int
//!   ├── ext_engine     - the same operations for Mode::Ext
//!   ├── validate       - debug-only invariant walker
//!   ├── diagnostics    - optional println!-based state snapshot
//!   └── tlsf           - the public Tlsf/Mode facade
//! ```
//!
//! ## Quick start
//!
//! ```rust
//! use std::ptr::NonNull;
//! use tlsf::{Mode, Tlsf};
//!
//! let mut storage = vec![0u8; 4096];
//! let base = NonNull::new(storage.as_mut_ptr()).unwrap();
//! let mut heap = Tlsf::create(base, storage.len(), Mode::Int).unwrap();
//!
//! let p = heap.alloc(128).expect("allocation should succeed");
//! unsafe {
//!     *p.as_ptr() = 0xA5;
//!     heap.free(p);
//! }
//! ```
//!
//! ## Concurrency
//!
//! `Tlsf` is single-threaded and non-reentrant: every mutating operation
//! takes `&mut self`, and there is no internal locking. Callers needing
//! concurrent access must serialise with an external mutex covering the
//! whole allocator.
//!
//! ## Safety
//!
//! This crate manages raw memory directly. `alloc`/`free`/`ext_free` are
//! `unsafe` where misuse (double-free, a pointer not owned by this
//! allocator) cannot be ruled out by the type system; such misuse is
//! caught by `debug_assert!` in debug builds (or with the `checked`
//! feature enabled) and is undefined behaviour otherwise.

mod align;
mod bits;
mod block;
pub mod diagnostics;
mod ext_engine;
mod handle;
mod int_engine;
mod segmap;
mod size_class;
mod tlsf;
mod validate;

pub use handle::BlockHandle;
pub use tlsf::{Mode, Tlsf};
