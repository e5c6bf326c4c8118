//! Small helpers shared across modules: the seeded 32-bit hash used by the
//! bloom filter and byte-string escaping for log output.

mod escape;
mod hash;

#[cfg(test)]
mod tests;

pub use escape::{EscapedBytes, consume_decimal_number, escape_bytes};
pub use hash::hash;
