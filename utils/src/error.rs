#[doc(hidden)]
pub trait Ext<T, E> {
	fn ok_or(self, f: impl FnOnce(E)) -> Option<T>;
}

impl<T, E> Ext<T, E> for result::Result<T, E> {
	fn ok_or(self, f: impl FnOnce(E)) -> Option<T> {
		match self {
			Ok(v) => Some(v),
			Err(e) => {
				f(e);
				None
			}
		}
	}
}

pub type Result<T = (), E = ()> = result::Result<T, E>;

use core::result;

pub use Ext as _;
