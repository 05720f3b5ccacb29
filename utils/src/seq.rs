//! Signed-difference comparison for wrapping 32-bit sequence numbers and timestamps.
//!
//! `sn`, `ts`, and `una` all wrap at `u32::MAX`. Comparing them with plain
//! `<`/`>` breaks the instant a conversation runs long enough to wrap, so
//! every comparison in this crate is centralized here and goes through a
//! signed difference instead.

/// Returns `a - b` as a signed distance: negative means `a` precedes `b`.
#[inline]
pub fn diff(a: u32, b: u32) -> i32 {
	a.wrapping_sub(b) as i32
}

/// Whether `a` is strictly before `b`, respecting wraparound.
#[inline]
pub fn before(a: u32, b: u32) -> bool {
	diff(a, b) < 0
}

/// The later (wrap-aware) of two sequence numbers or timestamps.
#[inline]
pub fn later(a: u32, b: u32) -> u32 {
	if before(a, b) {
		b
	} else {
		a
	}
}
