//! Property-based tests over the Invariants and Laws described for this
//! allocator: saturation round-trip, conservation under interleaving,
//! no-overlap between live allocations, and at-least-requested sizing.

use std::ptr::NonNull;

use quickcheck_macros::quickcheck;
use tlsf::{Mode, Tlsf};

const EXTENT: usize = 1 << 16;

fn new_heap(mode: Mode) -> (Vec<u8>, Tlsf) {
  let mut buf = vec![0u8; EXTENT];
  let base = NonNull::new(buf.as_mut_ptr()).unwrap();
  let heap = Tlsf::create(base, EXTENT, mode).expect("EXTENT is word-aligned-backed");
  (buf, heap)
}

/// Saturation round-trip: allocate a fixed size until exhaustion, then free
/// everything, and `unused_space` must return to exactly its post-`create`
/// value.
#[quickcheck]
fn saturation_round_trip(size: usize) -> bool {
  let size = size % 512 + 1;
  let (_buf, mut heap) = new_heap(Mode::Int);
  let baseline = heap.unused_space();

  let mut live = Vec::new();
  while let Some(p) = heap.alloc(size) {
    live.push(p);
  }
  for p in live {
    unsafe { heap.free(p) };
  }

  heap.unused_space() == baseline
}

/// Conservation: any interleaving of allocs and frees that ends with every
/// allocation freed restores `unused_space` to its post-`create` value.
#[quickcheck]
fn conservation_under_interleaving(ops: Vec<u8>) -> bool {
  let (_buf, mut heap) = new_heap(Mode::Int);
  let baseline = heap.unused_space();

  let mut live: Vec<NonNull<u8>> = Vec::new();
  for op in ops {
    if live.is_empty() || op % 2 == 0 {
      let size = (op as usize % 256) + 1;
      if let Some(p) = heap.alloc(size) {
        live.push(p);
      }
    } else {
      let idx = op as usize % live.len();
      let p = live.swap_remove(idx);
      unsafe { heap.free(p) };
    }
  }
  for p in live {
    unsafe { heap.free(p) };
  }

  heap.unused_space() == baseline
}

/// No-overlap: the `[addr, addr+length)` ranges of concurrently allocated
/// blocks never intersect, in either mode.
#[quickcheck]
fn no_overlap(sizes: Vec<u8>, ext: bool) -> bool {
  let mode = if ext { Mode::Ext } else { Mode::Int };
  let (_buf, mut heap) = new_heap(mode);

  let mut live = Vec::new();
  for s in sizes {
    let n = (s as usize % 200) + 1;
    if let Some(h) = heap.ext_alloc(n) {
      live.push(h);
    }
  }

  let mut ranges: Vec<(usize, usize)> =
    live.iter().map(|h| { let (addr, len) = heap.ext_getaddr(*h); (addr, addr + len) }).collect();
  ranges.sort_unstable();
  let disjoint = ranges.windows(2).all(|w| w[0].1 <= w[1].0);

  for h in live {
    unsafe { heap.ext_free(h) };
  }
  disjoint
}

/// At-least-requested: every successful `alloc(n)` returns a region whose
/// full `n` bytes are writable.
#[quickcheck]
fn at_least_requested(n: usize) -> bool {
  let n = n % 4096 + 1;
  let (_buf, mut heap) = new_heap(Mode::Int);
  match heap.alloc(n) {
    Some(p) => {
      unsafe { std::ptr::write_bytes(p.as_ptr(), 0xAA, n) };
      true
    }
    None => true,
  }
}
