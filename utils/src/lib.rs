/// Utilities for storing integer-like data in different byteorders.
pub mod endian;
/// Error-handling utilities.
pub mod error;
/// Sequence-number and timestamp arithmetic that is correct across 32-bit wraparound.
pub mod seq;
