use utils::endian::{u16le, u32le};

use crate::error::Error;

/// Size in bytes of the fixed wire header that precedes every segment's payload.
pub const HEADER_LEN: usize = 24;

/// The four segment kinds that appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cmd {
	/// Carries application payload.
	Data = 81,
	/// Acknowledges a single `sn`.
	Ack = 82,
	/// Asks the peer to report its current receive window (zero-window probe).
	WinAsk = 83,
	/// Reports the sender's current receive window, in reply to `WinAsk`.
	WinTell = 84,
}

impl TryFrom<u8> for Cmd {
	type Error = ();

	fn try_from(value: u8) -> Result<Self, ()> {
		match value {
			81 => Ok(Cmd::Data),
			82 => Ok(Cmd::Ack),
			83 => Ok(Cmd::WinAsk),
			84 => Ok(Cmd::WinTell),
			_ => Err(()),
		}
	}
}

/// The unit of both wire transmission and internal bookkeeping.
///
/// Fields above the line are carried on the wire; fields below are local
/// retransmission bookkeeping that never leaves the process.
#[derive(Debug, Clone)]
pub struct Segment {
	pub conv: u32,
	pub cmd: Cmd,
	/// Fragment index: N more fragments follow; 0 marks the last fragment of a message.
	pub frg: u8,
	/// Sender's advertised receive window at the moment of transmission.
	pub wnd: u16,
	/// Sender's timestamp (ms) at transmit time; echoed unchanged by ACKs for RTT sampling.
	pub ts: u32,
	pub sn: u32,
	/// Cumulative-ACK boundary: every `sn` less than this is acknowledged.
	pub una: u32,
	pub payload: Vec<u8>,

	/// Next scheduled retransmit time, in send-buffer segments only.
	pub resendts: u32,
	/// Current RTO backing this segment's retransmit schedule.
	pub rto: u32,
	/// Count of out-of-order ACKs that have skipped over this `sn`.
	pub fastack: u32,
	/// Number of times this segment has been transmitted.
	pub xmit: u32,
}

impl Segment {
	/// Builds a segment carrying no retransmission state, as returned by `input` parsing.
	pub fn new(conv: u32, cmd: Cmd, sn: u32, una: u32, ts: u32) -> Self {
		Self {
			conv,
			cmd,
			frg: 0,
			wnd: 0,
			ts,
			sn,
			una,
			payload: Vec::new(),
			resendts: 0,
			rto: 0,
			fastack: 0,
			xmit: 0,
		}
	}

	/// Encoded size of this segment: header plus payload.
	pub fn encoded_len(&self) -> usize {
		HEADER_LEN + self.payload.len()
	}

	/// Appends this segment's wire encoding to `out`.
	pub fn encode(&self, out: &mut Vec<u8>) {
		out.extend_from_slice(&u32le::from(self.conv).to_bytes());
		out.push(self.cmd as u8);
		out.push(self.frg);
		out.extend_from_slice(&u16le::from(self.wnd).to_bytes());
		out.extend_from_slice(&u32le::from(self.ts).to_bytes());
		out.extend_from_slice(&u32le::from(self.sn).to_bytes());
		out.extend_from_slice(&u32le::from(self.una).to_bytes());
		out.extend_from_slice(&u32le::from(self.payload.len() as u32).to_bytes());
		out.extend_from_slice(&self.payload);
	}

	/// Decodes one segment from the front of `buf`, returning it along with the unconsumed remainder.
	///
	/// `conv` is the engine's own conversation id: segments carrying any other value are rejected,
	/// since they belong to a different conversation sharing the same socket.
	pub fn decode(buf: &[u8], conv: u32) -> Result<(Segment, &[u8]), Error> {
		if buf.len() < HEADER_LEN {
			return Err(Error::InvalidWire);
		}

		let (header, rest) = buf.split_at(HEADER_LEN);

		let seg_conv = u32::from_le_bytes(header[0..4].try_into().unwrap());
		let cmd = header[4];
		let frg = header[5];
		let wnd = u16::from_le_bytes(header[6..8].try_into().unwrap());
		let ts = u32::from_le_bytes(header[8..12].try_into().unwrap());
		let sn = u32::from_le_bytes(header[12..16].try_into().unwrap());
		let una = u32::from_le_bytes(header[16..20].try_into().unwrap());
		let len = u32::from_le_bytes(header[20..24].try_into().unwrap());

		if seg_conv != conv {
			return Err(Error::InvalidWire);
		}

		let cmd = Cmd::try_from(cmd).map_err(|_| Error::InvalidWire)?;

		let len = len as usize;

		if len > rest.len() {
			return Err(Error::InvalidWire);
		}

		let (payload, rest) = rest.split_at(len);

		let seg = Segment {
			conv: seg_conv,
			cmd,
			frg,
			wnd,
			ts,
			sn,
			una,
			payload: payload.to_vec(),
			resendts: 0,
			rto: 0,
			fastack: 0,
			xmit: 0,
		};

		Ok((seg, rest))
	}
}
