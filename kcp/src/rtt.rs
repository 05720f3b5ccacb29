/// Retransmission timeout ceiling; no RTO is ever allowed to grow past this.
pub const RTO_MAX: u32 = 60_000;

/// Smoothed-RTT / RTO estimator, following the Jacobson/Karn algorithm.
///
/// This tracks only the shared smoothed baseline (`rx_rto`, returned by [`rto`](Estimator::rto))
/// that newly-admitted segments start from. Each segment's own `rto` then grows independently via
/// [`backoff`](Estimator::backoff) as it times out; the estimator never mutates a segment's value
/// itself, so one segment's backoff can't bleed into another's.
#[derive(Debug, Clone)]
pub struct Estimator {
	srtt: Option<i32>,
	rttvar: i32,
	rto: u32,
	min_rto: u32,
}

impl Estimator {
	pub fn new(min_rto: u32) -> Self {
		Self { srtt: None, rttvar: 0, rto: min_rto, min_rto }
	}

	/// The current smoothed baseline RTO (`rx_rto`), used to seed newly-admitted segments.
	pub fn rto(&self) -> u32 {
		self.rto
	}

	/// Updates the RTO floor, e.g. when `nodelay` is toggled at runtime.
	pub fn set_min_rto(&mut self, min_rto: u32) {
		self.min_rto = min_rto;
	}

	/// Folds one round-trip-time sample (ms) into the estimator and recomputes the baseline `rto`.
	///
	/// Per Karn's rule, callers must never feed a sample measured against a
	/// retransmitted segment — only the first transmission's timestamp may be used.
	pub fn sample(&mut self, rtt: i32, interval: u32) {
		let rtt = rtt.max(0);

		match self.srtt {
			None => {
				self.srtt = Some(rtt);
				self.rttvar = rtt / 2;
			}
			Some(srtt) => {
				let delta = (rtt - srtt).abs();
				self.rttvar = (3 * self.rttvar + delta) / 4;
				self.srtt = Some((7 * srtt + rtt) / 8).map(|s| s.max(1));
			}
		}

		let srtt = self.srtt.unwrap_or(1).max(1) as u32;
		let rttvar = self.rttvar.max(0) as u32;

		self.rto = (srtt + interval.max(4 * rttvar)).clamp(self.min_rto, RTO_MAX);
	}

	/// Computes the next RTO for a segment whose own current value is `rto`, after it timed out.
	///
	/// Takes and returns the segment's own `rto` rather than touching the estimator's shared
	/// baseline, so two segments timing out in the same tick back off independently instead of
	/// compounding off each other. In `nodelay` mode the backoff is the gentler
	/// `rto + max(rto, rx_rto)/2` rather than a hard doubling, trading a slower climb under
	/// sustained loss for lower latency recovery.
	pub fn backoff(&self, rto: u32, nodelay: bool) -> u32 {
		let next = if nodelay { rto + rto.max(self.rto) / 2 } else { rto * 2 };

		next.min(RTO_MAX)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn first_sample_seeds_srtt_and_half_rttvar() {
		let mut est = Estimator::new(100);
		est.sample(40, 100);
		assert_eq!(est.srtt, Some(40));
		assert_eq!(est.rttvar, 20);
	}

	#[test]
	fn rto_never_drops_below_min() {
		let mut est = Estimator::new(100);
		est.sample(1, 10);
		assert!(est.rto() >= 100);
	}

	#[test]
	fn backoff_doubles_without_nodelay() {
		let mut est = Estimator::new(100);
		est.sample(40, 100);
		let segment_rto = est.rto();
		assert_eq!(est.backoff(segment_rto, false), (segment_rto * 2).min(RTO_MAX));
	}

	#[test]
	fn backoff_clamps_to_rto_max() {
		let est = Estimator::new(100);
		assert_eq!(est.backoff(RTO_MAX - 1, false), RTO_MAX);
	}

	#[test]
	fn backoff_does_not_mutate_shared_baseline() {
		let est = Estimator::new(100);
		let baseline_before = est.rto();
		est.backoff(100, false);
		est.backoff(100, false);
		assert_eq!(est.rto(), baseline_before, "backoff must not touch the shared estimator state");
	}

	#[test]
	fn two_segments_back_off_independently() {
		let est = Estimator::new(100);
		// Two segments admitted with the same baseline rto, timing out in the same tick.
		let a = est.backoff(100, false);
		let b = est.backoff(100, false);
		assert_eq!(a, b, "neither segment's backoff should see the other's result");
	}
}
