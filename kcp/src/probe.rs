use utils::seq;

const INITIAL_WAIT: u32 = 7_000;
const MAX_WAIT: u32 = 120_000;

/// Tracks the zero-remote-window probe backoff: when the peer last advertised a full window,
/// this does nothing; once it advertises zero, probes go out at an exponentially growing
/// interval until a nonzero window is seen again.
#[derive(Debug, Clone, Default)]
pub struct Probe {
	/// Time of the next scheduled `WIN_ASK`, if the remote window is currently known to be zero.
	next: Option<u32>,
	wait: u32,
	/// Set by an incoming `WIN_ASK`; the next flush must answer with a `WIN_TELL`.
	reply_pending: bool,
}

impl Probe {
	/// Called whenever the remote window is learned (from any segment's `wnd` field, or a `WIN_TELL`).
	pub fn on_remote_wnd(&mut self, rmt_wnd: u32, now: u32) {
		if rmt_wnd > 0 {
			self.next = None;
			self.wait = 0;
		} else if self.next.is_none() {
			self.wait = INITIAL_WAIT;
			self.next = Some(now + self.wait);
		}
	}

	pub fn on_win_ask(&mut self) {
		self.reply_pending = true;
	}

	/// Whether a probe is due; if so, advances the backoff and returns `true` so the caller emits one `WIN_ASK`.
	pub fn should_probe(&mut self, now: u32) -> bool {
		let Some(next) = self.next else { return false };

		if seq::before(now, next) {
			return false;
		}

		self.wait = (self.wait + self.wait / 2).min(MAX_WAIT);
		self.next = Some(now + self.wait);

		true
	}

	/// Whether a `WIN_TELL` reply is owed; clears the flag if so.
	pub fn take_reply_pending(&mut self) -> bool {
		std::mem::take(&mut self.reply_pending)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn no_probe_while_remote_window_nonzero() {
		let mut p = Probe::default();
		p.on_remote_wnd(32, 0);
		assert!(!p.should_probe(1_000_000));
	}

	#[test]
	fn schedules_first_probe_at_7s() {
		let mut p = Probe::default();
		p.on_remote_wnd(0, 0);
		assert!(!p.should_probe(6_999));
		assert!(p.should_probe(7_000));
	}

	#[test]
	fn backoff_grows_by_half_and_caps() {
		let mut p = Probe::default();
		p.on_remote_wnd(0, 0);
		assert!(p.should_probe(7_000));
		// wait is now 7000 * 1.5 = 10500
		assert!(!p.should_probe(7_000 + 10_499));
		assert!(p.should_probe(7_000 + 10_500));
	}

	#[test]
	fn clears_on_nonzero_window() {
		let mut p = Probe::default();
		p.on_remote_wnd(0, 0);
		p.on_remote_wnd(10, 100);
		assert!(!p.should_probe(1_000_000));
	}
}
