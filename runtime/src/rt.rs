use std::sync::atomic::{AtomicBool, Ordering};

static SHUTDOWN: AtomicBool = AtomicBool::new(false);

/// Whether a shutdown signal has been observed since [`install`] was called.
pub fn shutdown_requested() -> bool {
	SHUTDOWN.load(Ordering::Relaxed)
}

/// Installs the signal handlers described by the demo driver's CLI contract:
/// SIGINT, SIGTERM, SIGQUIT, SIGABRT, and SIGPWR request a clean shutdown;
/// SIGHUP and SIGPIPE are ignored so a dropped controlling terminal or a
/// write to a closed socket never kills the process outright.
pub fn install() {
	if let Err(err) = ctrlc::set_handler(|| SHUTDOWN.store(true, Ordering::Relaxed)) {
		log::error!("Failed to install Ctrl+C handler: {err}");
	}

	#[cfg(unix)]
	unix::install();
}

#[cfg(unix)]
mod unix {
	use std::sync::atomic::Ordering;

	use libc::{SIG_IGN, SIGABRT, SIGHUP, SIGPIPE, SIGPWR, SIGQUIT, SIGTERM};

	use super::SHUTDOWN;

	extern "C" fn request_shutdown(_: libc::c_int) {
		SHUTDOWN.store(true, Ordering::Relaxed);
	}

	pub fn install() {
		// SAFETY: `request_shutdown` only touches a static atomic, which is signal-safe.
		unsafe {
			for sig in [SIGTERM, SIGQUIT, SIGABRT, SIGPWR] {
				if libc::signal(sig, request_shutdown as libc::sighandler_t) == libc::SIG_ERR {
					log::error!("Failed to install handler for signal {sig}");
				}
			}

			for sig in [SIGHUP, SIGPIPE] {
				if libc::signal(sig, SIG_IGN) == libc::SIG_ERR {
					log::error!("Failed to ignore signal {sig}");
				}
			}
		}
	}
}
