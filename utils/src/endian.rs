//! Typed little-endian integer wrappers for hand-packed wire headers.
//!
//! The wire format in this repository is always little-endian, so unlike a
//! general-purpose byteorder crate we only need one direction: a value on
//! the wire, and its native-endian counterpart once read. Wrapping the wire
//! representation in its own type (rather than passing raw `[u8; N]` around)
//! keeps callers from accidentally comparing or arithmetic-ing on
//! not-yet-swapped bytes.

macro_rules! define_le {
	( $( $name:ident($int:ty) )* ) => {
		$(
			#[doc = concat!("A `", stringify!($int), "` stored on the wire in little-endian byteorder.")]
			#[derive(Clone, Copy, Default, PartialEq, Eq)]
			#[repr(transparent)]
			pub struct $name([u8; core::mem::size_of::<$int>()]);

			impl $name {
				/// Reads the native-endian value out of the wire representation.
				#[inline]
				pub fn get(self) -> $int {
					<$int>::from_le_bytes(self.0)
				}

				/// Returns the raw wire bytes.
				#[inline]
				pub fn to_bytes(self) -> [u8; core::mem::size_of::<$int>()] {
					self.0
				}

				/// Builds a wire representation directly from its raw bytes.
				#[inline]
				pub fn from_bytes(bytes: [u8; core::mem::size_of::<$int>()]) -> Self {
					Self(bytes)
				}
			}

			impl From<$int> for $name {
				#[inline]
				fn from(value: $int) -> Self {
					Self(value.to_le_bytes())
				}
			}

			impl core::fmt::Debug for $name {
				fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
					self.get().fmt(f)
				}
			}
		)*
	};
}

define_le!(u16le(u16) u32le(u32));

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn round_trips_through_wire_bytes() {
		let v: u32le = 0xdead_beefu32.into();
		assert_eq!(v.to_bytes(), 0xdead_beefu32.to_le_bytes());
		assert_eq!(v.get(), 0xdead_beef);
	}
}
