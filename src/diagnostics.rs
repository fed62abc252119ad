//! Optional plain-text diagnostic helper, in the style of the teacher
//! crate's `print_alloc`: a `println!`-based helper that is always
//! compiled and never called unless the caller opts in, rather than a
//! `log`/`tracing` facade wired into the allocator's hot path.

use crate::tlsf::Tlsf;

/// Prints a one-line snapshot of `t`'s current mode and space usage,
/// labelled with `context`.
pub fn describe(context: &str, t: &Tlsf) {
  println!(
    "[{}] mode = {:?}, unused = {} bytes, largest available = {} bytes",
    context,
    t.mode(),
    t.unused_space(),
    t.avail_space()
  );
}
