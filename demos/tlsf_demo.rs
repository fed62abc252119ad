use std::io::Read;
use std::ptr::NonNull;

use tlsf::{Mode, Tlsf};

/// Waits until the user presses ENTER.
/// Useful when you want to inspect memory state with tools like `pmap`,
/// `htop`, `gdb`, or just visually track how allocations change.
fn block_until_enter_pressed() {
  println!("\n>>> Press ENTER to continue...");
  let _ = std::io::stdin().bytes().next();
}

fn main() {
  // A fixed 256 KiB extent backs the whole allocator. Unlike a bump
  // allocator there's no program break to watch: every allocation and
  // free happens inside this one buffer.
  let mut storage = vec![0u8; 256 * 1024];
  let base = NonNull::new(storage.as_mut_ptr()).unwrap();
  let mut heap = Tlsf::create(base, storage.len(), Mode::Int).expect("base is word-aligned");

  tlsf::diagnostics::describe("start", &heap);
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 1) Allocate space for a u32.
  // --------------------------------------------------------------------
  let first_block = heap.alloc(4).expect("allocation should succeed");
  println!("\n[1] Allocate u32 at {:?}", first_block);
  unsafe {
    (first_block.as_ptr() as *mut u32).write(0xDEADBEEF);
    println!("[1] Value written = 0x{:X}", (first_block.as_ptr() as *mut u32).read());
  }
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 2) Allocate 12 bytes, showing reuse of whatever remainder split off
  //    from step 1.
  // --------------------------------------------------------------------
  let second_block = heap.alloc(12).expect("allocation should succeed");
  println!("\n[2] Allocate [u8; 12] at {:?}", second_block);
  unsafe { std::ptr::write_bytes(second_block.as_ptr(), 0xAB, 12) };
  println!("[2] Initialized second block with 0xAB");
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 3) Free the first block, then immediately ask for a small block: a
  //    TLSF allocator reuses free blocks through its segregation map
  //    instead of only ever growing.
  // --------------------------------------------------------------------
  unsafe { heap.free(first_block) };
  println!("\n[3] Freed first_block at {:?}", first_block);
  let third_block = heap.alloc(2).expect("allocation should succeed");
  println!(
    "[3] third_block == first_block? {}",
    if third_block == first_block { "yes, reused the freed block" } else { "no, allocated elsewhere" }
  );
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 4) Allocate via the handle-based API, which works in both Int and Ext
  //    mode, then recover its base-relative offset and length.
  // --------------------------------------------------------------------
  let handle = heap.ext_alloc(64).expect("allocation should succeed");
  let (offset, length) = heap.ext_getaddr(handle);
  println!("\n[4] ext_alloc(64) -> offset = {offset}, length = {length}");
  unsafe { heap.ext_free(handle) };
  block_until_enter_pressed();

  // --------------------------------------------------------------------
  // 5) Drain the extent entirely and observe avail_space reach zero.
  // --------------------------------------------------------------------
  println!("\n[5] Draining remaining space...");
  let mut count = 0;
  while heap.alloc(64).is_some() {
    count += 1;
  }
  println!("[5] Allocated {count} more 64-byte blocks before exhaustion");
  tlsf::diagnostics::describe("5", &heap);

  println!("\n[6] End of example. `heap` drops here, releasing its backing storage.");
}
