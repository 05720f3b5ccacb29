use std::collections::VecDeque;

use utils::seq;

use crate::config::Config;
use crate::congestion::Congestion;
use crate::error::Error;
use crate::probe::Probe;
use crate::rtt::Estimator;
use crate::segment::{Cmd, Segment};

/// A single ARQ conversation: fragmentation, retransmission, ACKs, congestion and flow control,
/// and zero-window probing, all driven entirely by the caller.
///
/// Nothing here touches a socket or a clock. The caller feeds inbound datagrams to [`input`],
/// drains outbound ones through the closure given to [`set_output`], and calls [`update`]
/// (or consults [`check`] to know when) on whatever schedule its own runtime provides.
///
/// [`input`]: Engine::input
/// [`set_output`]: Engine::set_output
/// [`update`]: Engine::update
/// [`check`]: Engine::check
pub struct Engine {
	conv: u32,
	config: Config,

	snd_una: u32,
	snd_nxt: u32,
	rcv_nxt: u32,

	snd_queue: VecDeque<Segment>,
	snd_buf: VecDeque<Segment>,
	rcv_buf: VecDeque<Segment>,
	rcv_queue: VecDeque<Segment>,

	/// `(sn, ts)` pairs awaiting an outgoing ACK.
	ack_list: VecDeque<(u32, u32)>,

	rmt_wnd: u32,
	congestion: Congestion,
	probe: Probe,
	rtt: Estimator,

	/// Time of the next scheduled flush; `None` until the first [`update`](Engine::update) call.
	ts_flush: Option<u32>,
	/// The most recent `now` seen by `update`, used by `input` and by the parameterless `flush`.
	current: u32,

	output: Option<Box<dyn FnMut(&[u8])>>,
}

impl Engine {
	/// Creates an engine for conversation `conv` with default tuning.
	pub fn new(conv: u32) -> Self {
		Self::with_config(conv, Config::default())
	}

	/// Creates an engine for conversation `conv` with caller-supplied tuning.
	pub fn with_config(conv: u32, config: Config) -> Self {
		let min_rto = config.min_rto();
		// Assume the peer's window looks like our own default until a segment says otherwise;
		// this avoids spurious zero-window probing before the first datagram arrives.
		let rmt_wnd = config.rcv_wnd();

		Self {
			conv,
			snd_una: 0,
			snd_nxt: 0,
			rcv_nxt: 0,
			snd_queue: VecDeque::new(),
			snd_buf: VecDeque::new(),
			rcv_buf: VecDeque::new(),
			rcv_queue: VecDeque::new(),
			ack_list: VecDeque::new(),
			rmt_wnd,
			congestion: Congestion::new(config.mss() as u32),
			probe: Probe::default(),
			rtt: Estimator::new(min_rto),
			ts_flush: None,
			current: 0,
			output: None,
			config,
		}
	}

	/// Installs the closure that receives each outgoing datagram, already batched to `mtu`.
	pub fn set_output(&mut self, f: impl FnMut(&[u8]) + 'static) {
		self.output = Some(Box::new(f));
	}

	pub fn set_mtu(&mut self, mtu: usize) {
		self.config.set_mtu(mtu);
	}

	pub fn set_wndsize(&mut self, snd: u32, rcv: u32) {
		self.config.set_wndsize(snd, rcv);
	}

	pub fn set_nodelay(&mut self, nodelay: bool, interval: u32, fastresend_threshold: u32, no_cwnd: bool) {
		self.config.set_nodelay(nodelay, interval, fastresend_threshold, no_cwnd);
		self.rtt.set_min_rto(self.config.min_rto());
	}

	pub fn set_stream(&mut self, stream: bool) {
		self.config.set_stream(stream);
	}

	/// Queues `data` for delivery, fragmenting it across as many segments as `mss` requires.
	///
	/// Rejects a message that could never fit the peer's window even when fully drained, and
	/// rejects an empty message outright since there is nothing to deliver.
	pub fn send(&mut self, data: &[u8]) -> Result<(), Error> {
		if data.is_empty() {
			return Err(Error::EmptySend);
		}

		let mss = self.config.mss();
		let limit = self.config.rcv_wnd() as usize * mss;
		if data.len() > limit {
			return Err(Error::SendTooLarge { len: data.len(), limit });
		}

		let mut data = data;

		if self.config.stream() {
			if let Some(last) = self.snd_queue.back_mut() {
				if last.payload.len() < mss {
					let room = mss - last.payload.len();
					let take = room.min(data.len());
					last.payload.extend_from_slice(&data[..take]);
					data = &data[take..];
				}
			}
		}

		if data.is_empty() {
			return Ok(());
		}

		let count = (data.len() + mss - 1) / mss;
		for i in 0..count {
			let start = i * mss;
			let end = ((i + 1) * mss).min(data.len());

			let mut seg = Segment::new(self.conv, Cmd::Data, 0, 0, 0);
			seg.payload = data[start..end].to_vec();
			// In stream mode byte order is the only guarantee, so every segment is independently
			// deliverable; otherwise the last segment of the message carries frg == 0.
			seg.frg = if self.config.stream() { 0 } else { (count - i - 1) as u8 };
			self.snd_queue.push_back(seg);
		}

		Ok(())
	}

	/// The byte length of the next complete message waiting in the receive queue, if any.
	pub fn peek_size(&self) -> Option<usize> {
		self.complete_len()
	}

	/// Copies the next complete message into `buf`, returning its length.
	///
	/// Leaves the message queued if `buf` is too small to hold it.
	pub fn recv(&mut self, buf: &mut [u8]) -> Result<usize, Error> {
		let need = self.complete_len().ok_or(Error::WouldBlock)?;

		if buf.len() < need {
			return Err(Error::BufferTooSmall { need, have: buf.len() });
		}

		let mut written = 0;
		loop {
			let seg = self.rcv_queue.pop_front().expect("complete_len guarantees a full run is queued");
			buf[written..written + seg.payload.len()].copy_from_slice(&seg.payload);
			written += seg.payload.len();

			if seg.frg == 0 {
				break;
			}
		}

		// Popping from the queue may have freed room for segments still waiting in the buffer.
		self.reassemble();

		Ok(written)
	}

	fn complete_len(&self) -> Option<usize> {
		let mut total = 0;
		for seg in &self.rcv_queue {
			total += seg.payload.len();
			if seg.frg == 0 {
				return Some(total);
			}
		}
		None
	}

	/// Feeds one inbound datagram, which may hold several concatenated segments.
	///
	/// Segments are processed in order up to the first malformed one; anything decoded before
	/// that point has already taken effect, matching a transport that can't un-receive bytes.
	pub fn input(&mut self, data: &[u8]) -> Result<(), Error> {
		let prev_una = self.snd_una;
		let mut buf = data;

		while !buf.is_empty() {
			let (seg, rest) = Segment::decode(buf, self.conv).map_err(|err| {
				log::warn!("conv={}: discarding malformed datagram tail ({} bytes)", self.conv, buf.len());
				err
			})?;
			buf = rest;

			self.remove_una(seg.una);

			// Every segment carries the sender's current receive window; the dedicated WIN_TELL
			// reply exists only for the case where there is no other segment to carry it on.
			self.rmt_wnd = seg.wnd as u32;
			self.probe.on_remote_wnd(self.rmt_wnd, self.current);

			match seg.cmd {
				Cmd::Data => self.handle_data(seg),
				Cmd::Ack => self.handle_ack(seg.sn, seg.ts, self.current),
				Cmd::WinAsk => self.probe.on_win_ask(),
				Cmd::WinTell => {}
			}
		}

		if seq::before(prev_una, self.snd_una) {
			self.congestion.on_ack_advance(self.rmt_wnd, self.config.mss() as u32);
		}

		Ok(())
	}

	fn handle_data(&mut self, seg: Segment) {
		self.ack_list.push_back((seg.sn, seg.ts));

		let window_end = self.rcv_nxt.wrapping_add(self.config.rcv_wnd());
		if seq::before(seg.sn, self.rcv_nxt) || !seq::before(seg.sn, window_end) {
			return;
		}

		let pos = self.rcv_buf.iter().position(|s| !seq::before(s.sn, seg.sn));
		match pos {
			Some(i) if self.rcv_buf[i].sn == seg.sn => {} // duplicate, drop
			Some(i) => self.rcv_buf.insert(i, seg),
			None => self.rcv_buf.push_back(seg),
		}

		self.reassemble();
	}

	fn reassemble(&mut self) {
		while (self.rcv_queue.len() as u32) < self.config.rcv_wnd() {
			match self.rcv_buf.front() {
				Some(seg) if seg.sn == self.rcv_nxt => {
					let seg = self.rcv_buf.pop_front().expect("front just matched");
					self.rcv_nxt = self.rcv_nxt.wrapping_add(1);
					self.rcv_queue.push_back(seg);
				}
				_ => break,
			}
		}
	}

	fn handle_ack(&mut self, ack_sn: u32, ack_ts: u32, now: u32) {
		// Karn's rule: an RTT sample is only trustworthy if the acked segment was sent exactly once.
		if let Some(seg) = self.snd_buf.iter().find(|s| s.sn == ack_sn) {
			if seg.xmit == 1 {
				let rtt = seq::diff(now, ack_ts);
				self.rtt.sample(rtt, self.config.interval());
			}
		}

		self.snd_buf.retain(|s| s.sn != ack_sn);
		self.recompute_snd_una();

		for seg in self.snd_buf.iter_mut() {
			if seq::before(seg.sn, ack_sn) {
				seg.fastack += 1;
			}
		}
	}

	fn remove_una(&mut self, una: u32) {
		let before = self.snd_buf.len();
		self.snd_buf.retain(|s| !seq::before(s.sn, una));
		if self.snd_buf.len() != before {
			self.recompute_snd_una();
		}
	}

	fn recompute_snd_una(&mut self) {
		self.snd_una = self.snd_buf.front().map(|s| s.sn).unwrap_or(self.snd_nxt);
	}

	fn advertised_wnd(&self) -> u16 {
		(self.config.rcv_wnd() as usize).saturating_sub(self.rcv_queue.len()) as u16
	}

	fn effective_window(&self) -> u32 {
		let cwnd = if self.config.no_cwnd() { u32::MAX } else { self.congestion.cwnd() };
		self.config.snd_wnd().min(self.rmt_wnd).min(cwnd)
	}

	/// The current congestion window, in segments. Exposed for observability; `no_cwnd` bypasses
	/// it in `effective_window` but does not stop it from tracking loss events.
	pub fn cwnd(&self) -> u32 {
		self.congestion.cwnd()
	}

	/// The current slow-start threshold, in segments.
	pub fn ssthresh(&self) -> u32 {
		self.congestion.ssthresh()
	}

	/// The absolute time of the next event this engine cares about: the next scheduled flush, or
	/// the earliest retransmit deadline in the send buffer, whichever comes first.
	///
	/// Callers driving their own event loop can sleep until this time instead of polling `update`
	/// on a fixed tick.
	pub fn check(&self, now: u32) -> u32 {
		let mut next = self.ts_flush.unwrap_or(now);

		for seg in &self.snd_buf {
			if seq::before(seg.resendts, next) {
				next = seg.resendts;
			}
		}

		next
	}

	/// Advances the engine's clock to `now`, flushing if a flush is due.
	///
	/// Must be called regularly (every `interval` ms or so) for retransmission and ACKs to make
	/// progress; `check` reports exactly how regularly.
	pub fn update(&mut self, now: u32) {
		self.current = now;

		let due = match self.ts_flush {
			None => true,
			Some(ts_flush) => !seq::before(now, ts_flush),
		};

		if due {
			self.do_flush(now);
		}
	}

	/// Forces immediate emission of any pending ACKs, probes, and deliverable data, using the
	/// time of the most recent `update` call.
	pub fn flush(&mut self) {
		let now = self.current;
		self.do_flush(now);
	}

	fn do_flush(&mut self, now: u32) {
		let mtu = self.config.mtu();
		let mut output = self.output.take();
		let mut batch = Vec::with_capacity(mtu);

		// 1. Acknowledge everything received since the last flush.
		let acks = std::mem::take(&mut self.ack_list);
		for (sn, ts) in acks {
			let mut seg = Segment::new(self.conv, Cmd::Ack, sn, self.rcv_nxt, ts);
			seg.wnd = self.advertised_wnd();
			batch_push(&mut output, &mut batch, mtu, &seg);
		}

		// 2. Answer a pending probe, and issue our own if the peer's window is still zero.
		if self.probe.take_reply_pending() {
			let mut seg = Segment::new(self.conv, Cmd::WinTell, 0, self.rcv_nxt, now);
			seg.wnd = self.advertised_wnd();
			batch_push(&mut output, &mut batch, mtu, &seg);
		}
		if self.probe.should_probe(now) {
			log::trace!("conv={}: peer window still zero, sending WIN_ASK", self.conv);
			let mut seg = Segment::new(self.conv, Cmd::WinAsk, 0, self.rcv_nxt, now);
			seg.wnd = self.advertised_wnd();
			batch_push(&mut output, &mut batch, mtu, &seg);
		}

		// 3. Admit as much of the send queue as the window allows.
		let cwnd_eff = self.effective_window();
		while !self.snd_queue.is_empty() && seq::diff(self.snd_nxt, self.snd_una) < cwnd_eff as i32 {
			let mut seg = self.snd_queue.pop_front().expect("loop guard checked non-empty");
			seg.sn = self.snd_nxt;
			self.snd_nxt = self.snd_nxt.wrapping_add(1);
			seg.rto = self.rtt.rto();
			seg.resendts = now + seg.rto + self.config.min_rto();
			seg.xmit = 0;
			self.snd_buf.push_back(seg);
		}

		// 4. Decide which buffered segments go out this tick: new, timed out, or fast-retransmitted.
		let fastresend = self.config.fastresend_threshold();
		let nodelay = self.config.nodelay();
		let inflight = self.snd_buf.len() as u32;
		let mss = self.config.mss() as u32;
		let wnd = self.advertised_wnd();
		let rcv_nxt = self.rcv_nxt;

		for seg in self.snd_buf.iter_mut() {
			let mut send_now = false;

			if seg.xmit == 0 {
				send_now = true;
			} else if !seq::before(now, seg.resendts) {
				log::debug!("conv={}: sn={} timed out after {} transmit(s), backing off", self.conv, seg.sn, seg.xmit);
				seg.rto = self.rtt.backoff(seg.rto, nodelay);
				seg.resendts = now + seg.rto;
				self.congestion.on_timeout(mss);
				send_now = true;
			} else if fastresend > 0 && seg.fastack >= fastresend {
				log::debug!("conv={}: sn={} fast-retransmitted after {} skipped acks", self.conv, seg.sn, seg.fastack);
				seg.fastack = 0;
				seg.resendts = now + seg.rto;
				self.congestion.on_fast_retransmit(inflight, fastresend, mss);
				send_now = true;
			}

			if send_now {
				seg.xmit += 1;
				seg.ts = now;
				seg.wnd = wnd;
				seg.una = rcv_nxt;
				batch_push(&mut output, &mut batch, mtu, seg);
			}
		}

		if !batch.is_empty() {
			if let Some(f) = output.as_mut() {
				f(&batch);
			}
		}

		self.output = output;
		self.ts_flush = Some(now + self.config.interval());
	}
}

fn batch_push(output: &mut Option<Box<dyn FnMut(&[u8])>>, batch: &mut Vec<u8>, mtu: usize, seg: &Segment) {
	if !batch.is_empty() && batch.len() + seg.encoded_len() > mtu {
		if let Some(f) = output.as_mut() {
			f(batch);
		}
		batch.clear();
	}
	seg.encode(batch);
}
