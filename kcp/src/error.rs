use thiserror::Error;

/// Failure outcomes of the four engine operations (`send`, `recv`, `input`).
///
/// None of these abort the engine: every variant is local to the call that
/// raised it, and the engine remains fully usable afterwards.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum Error {
	/// `input` was given bytes that do not parse as one or more segments for this conversation.
	/// The remainder of the offending datagram is discarded; engine state is untouched.
	#[error("malformed or foreign-conversation datagram")]
	InvalidWire,

	/// `recv` was called but the receive queue does not yet hold a complete message.
	#[error("no complete message is ready")]
	WouldBlock,

	/// `recv`'s buffer is smaller than the next complete message. The message stays queued.
	#[error("caller's buffer ({have} bytes) is smaller than the next message ({need} bytes)")]
	BufferTooSmall { need: usize, have: usize },

	/// `send`'s input is larger than `rcv_wnd * mss`, the most the peer's window could ever admit.
	#[error("message of {len} bytes can never fit the peer's window ({limit} bytes)")]
	SendTooLarge { len: usize, limit: usize },

	/// `send` was given an empty message; there is nothing meaningful to fragment or deliver.
	#[error("cannot send a zero-byte message")]
	EmptySend,
}
