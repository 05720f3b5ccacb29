/// Header overhead subtracted from `mtu` to get the maximum segment payload (`mss`).
pub const OVERHEAD: usize = crate::segment::HEADER_LEN;

pub const DEFAULT_MTU: usize = 1400;
pub const DEFAULT_SND_WND: u32 = 32;
pub const DEFAULT_RCV_WND: u32 = 128;
pub const DEFAULT_INTERVAL: u32 = 100;

const INTERVAL_MIN: u32 = 10;
const INTERVAL_MAX: u32 = 5000;

/// Tunable parameters of the engine, with the defaults documented in the transport's design.
#[derive(Debug, Clone)]
pub struct Config {
	mtu: usize,
	snd_wnd: u32,
	rcv_wnd: u32,
	nodelay: bool,
	interval: u32,
	fastresend_threshold: u32,
	no_cwnd: bool,
	stream: bool,
}

impl Default for Config {
	fn default() -> Self {
		Self {
			mtu: DEFAULT_MTU,
			snd_wnd: DEFAULT_SND_WND,
			rcv_wnd: DEFAULT_RCV_WND,
			nodelay: false,
			interval: DEFAULT_INTERVAL,
			fastresend_threshold: 0,
			no_cwnd: false,
			stream: false,
		}
	}
}

impl Config {
	pub fn mtu(&self) -> usize {
		self.mtu
	}

	/// Maximum segment payload: `mtu - 24`.
	pub fn mss(&self) -> usize {
		self.mtu - OVERHEAD
	}

	pub fn snd_wnd(&self) -> u32 {
		self.snd_wnd
	}

	pub fn rcv_wnd(&self) -> u32 {
		self.rcv_wnd
	}

	pub fn nodelay(&self) -> bool {
		self.nodelay
	}

	pub fn interval(&self) -> u32 {
		self.interval
	}

	pub fn fastresend_threshold(&self) -> u32 {
		self.fastresend_threshold
	}

	pub fn no_cwnd(&self) -> bool {
		self.no_cwnd
	}

	pub fn stream(&self) -> bool {
		self.stream
	}

	/// The minimum RTO floor: 30ms under `nodelay`, 100ms otherwise.
	pub fn min_rto(&self) -> u32 {
		if self.nodelay {
			30
		} else {
			100
		}
	}

	pub fn set_mtu(&mut self, mtu: usize) {
		assert!(mtu > OVERHEAD, "mtu must leave room for the {OVERHEAD}-byte header");
		self.mtu = mtu;
	}

	pub fn set_wndsize(&mut self, snd: u32, rcv: u32) {
		if snd > 0 {
			self.snd_wnd = snd;
		}

		if rcv > 0 {
			self.rcv_wnd = rcv;
		}
	}

	pub fn set_nodelay(&mut self, nodelay: bool, interval: u32, fastresend_threshold: u32, no_cwnd: bool) {
		self.nodelay = nodelay;
		self.interval = interval.clamp(INTERVAL_MIN, INTERVAL_MAX);
		self.fastresend_threshold = fastresend_threshold;
		self.no_cwnd = no_cwnd;
	}

	pub fn set_stream(&mut self, stream: bool) {
		self.stream = stream;
	}
}
