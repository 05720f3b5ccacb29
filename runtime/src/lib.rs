use std::io::{self, ErrorKind};
use std::net::{SocketAddr, UdpSocket};
use std::time::Duration;

use utils::error::*;

mod rt;
pub mod logger;
pub mod time;

pub use rt::{install as install_signal_handlers, shutdown_requested};

#[cfg(target_family = "unix")]
mod sys {
	use std::os::fd::{AsRawFd, RawFd};

	pub use libc::{poll, pollfd as Poll, POLLERR, POLLIN, POLLNVAL};

	pub fn as_raw(socket: &std::net::UdpSocket) -> RawFd {
		socket.as_raw_fd()
	}
}

#[cfg(target_family = "windows")]
mod sys {
	use std::os::windows::io::AsRawSocket;

	pub use windows_sys::Win32::Networking::WinSock::{
		WSAPoll as poll, POLLERR, POLLNVAL, POLLRDNORM as POLLIN, SOCKET as RawFd, WSAPOLLFD as Poll,
	};

	pub fn as_raw(socket: &std::net::UdpSocket) -> RawFd {
		socket.as_raw_socket() as _
	}
}

use sys::*;

fn as_timeout(t: Option<Duration>) -> i32 {
	t.and_then(|d| d.as_millis().try_into().ok()).unwrap_or(-1)
}

/// A non-blocking UDP datagram socket paired with a `poll(2)`-based readiness wait, matching the
/// "blocking/non-blocking datagram socket with a poll/wait primitive" collaborator in the transport's design.
pub struct Socket {
	inner: UdpSocket,
}

impl Socket {
	/// Binds a non-blocking UDP socket to `addr`.
	pub fn bind(addr: SocketAddr) -> Result<Self> {
		let inner = UdpSocket::bind(addr).map_err(|err| log::error!("Failed to bind UDP socket on {addr}: {err}"))?;

		inner
			.set_nonblocking(true)
			.map_err(|err| log::error!("Failed to set socket non-blocking: {err}"))?;

		Ok(Self { inner })
	}

	/// Sends one datagram to `to`. Never blocks; a datagram that the kernel would reject with
	/// `EWOULDBLOCK` is simply dropped, mirroring the UDP substrate's best-effort delivery.
	pub fn send_to(&self, buf: &[u8], to: SocketAddr) -> Result {
		match self.inner.send_to(buf, to) {
			Ok(n) if n == buf.len() => Ok(()),
			Ok(n) => {
				log::error!("Only sent {n}/{} bytes to {to}", buf.len());
				Err(())
			}
			Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(()),
			Err(err) => {
				log::error!("Failed to send datagram to {to}: {err}");
				Err(())
			}
		}
	}

	/// Reads one datagram into `buf` if one is waiting. Returns `None` without blocking if none is ready.
	pub fn recv_from(&self, buf: &mut [u8]) -> Result<Option<(usize, SocketAddr)>> {
		match self.inner.recv_from(buf) {
			Ok(hit) => Ok(Some(hit)),
			Err(err) if err.kind() == ErrorKind::WouldBlock => Ok(None),
			Err(err) => {
				log::error!("Failed to read from socket: {err}");
				Err(())
			}
		}
	}

	/// Blocks (up to `timeout`, or forever if `None`) until the socket has a datagram waiting.
	/// Returns whether it became readable; `false` means the timeout elapsed first.
	pub fn wait_readable(&self, timeout: Option<Duration>) -> Result<bool> {
		let mut fd = Poll { fd: as_raw(&self.inner), events: POLLIN, revents: 0 };

		let ret = unsafe { poll(&mut fd, 1, as_timeout(timeout)) };

		if ret < 0 {
			log::error!("poll() failed: {}", io::Error::last_os_error());
			return Err(());
		}

		if ret == 0 {
			return Ok(false);
		}

		if fd.revents & POLLERR != 0 || fd.revents & POLLNVAL != 0 {
			log::error!("Socket error while polling");
			return Err(());
		}

		Ok(fd.revents & POLLIN != 0)
	}
}
