//! `./driver <local_port> <peer_ip:peer_port> <send_count>`
//!
//! Sends `send_count` numbered messages to the peer and prints every message it receives back,
//! until a signal requests shutdown. Intentionally drops every fourth inbound datagram so the
//! engine's retransmission path gets exercised over a real (if loopback) socket.

use std::net::SocketAddr;
use std::rc::Rc;
use std::time::Duration;

use kcp::Engine;
use runtime::{logger, time};

/// Conversation id for this demo; a real peer negotiates this out of band.
const CONV: u32 = 0x4b43_5031; // "KCP1"

fn main() -> std::process::ExitCode {
	logger::init();
	runtime::install_signal_handlers();

	let args: Vec<String> = std::env::args().collect();
	let (local_port, peer, send_count) = match parse_args(&args) {
		Some(parsed) => parsed,
		None => {
			log::error!("usage: {} <local_port> <peer_ip:peer_port> <send_count>", args.first().map(String::as_str).unwrap_or("driver"));
			return std::process::ExitCode::FAILURE;
		}
	};

	let local_addr: SocketAddr = match format!("0.0.0.0:{local_port}").parse() {
		Ok(addr) => addr,
		Err(err) => {
			log::error!("Invalid local port {local_port}: {err}");
			return std::process::ExitCode::FAILURE;
		}
	};

	let socket = match runtime::Socket::bind(local_addr) {
		Ok(socket) => Rc::new(socket),
		Err(()) => return std::process::ExitCode::FAILURE,
	};

	let mut engine = Engine::new(CONV);
	{
		let socket = socket.clone();
		engine.set_output(move |datagram| {
			let _ = socket.send_to(datagram, peer);
		});
	}

	for i in 0..send_count {
		let payload = format!("message {i}");
		if let Err(err) = engine.send(payload.as_bytes()) {
			log::error!("Failed to queue {payload:?}: {err}");
		}
	}

	run(&mut engine, &socket)
}

fn run(engine: &mut Engine, socket: &runtime::Socket) -> std::process::ExitCode {
	let mut recv_buf = vec![0u8; 64 * 1024];
	let mut inbound = [0u8; 64 * 1024];
	let mut dropped_every_fourth = 0u32;

	while !runtime::shutdown_requested() {
		let now = time::now_ms();
		engine.update(now);

		while let Ok(n) = engine.recv(&mut recv_buf) {
			log::info!("received: {}", String::from_utf8_lossy(&recv_buf[..n]));
		}

		let deadline = engine.check(now);
		let timeout = Duration::from_millis(deadline.saturating_sub(now) as u64);

		match socket.wait_readable(Some(timeout)) {
			Ok(true) => {}
			Ok(false) => continue,
			Err(()) => break,
		}

		loop {
			match socket.recv_from(&mut inbound) {
				Ok(Some((n, _from))) => {
					dropped_every_fourth += 1;
					if dropped_every_fourth % 4 == 0 {
						log::debug!("harness: dropping inbound datagram #{dropped_every_fourth}");
						continue;
					}
					if let Err(err) = engine.input(&inbound[..n]) {
						log::warn!("Discarding malformed datagram: {err}");
					}
				}
				Ok(None) => break,
				Err(()) => return std::process::ExitCode::FAILURE,
			}
		}
	}

	log::info!("shutting down");
	std::process::ExitCode::SUCCESS
}

fn parse_args(args: &[String]) -> Option<(u16, SocketAddr, usize)> {
	use utils::error::Ext;

	let local_port: u16 = args.get(1)?.parse().ok_or(|err| log::error!("invalid local_port: {err}"))?;
	let peer: SocketAddr = args.get(2)?.parse().ok_or(|err| log::error!("invalid peer address: {err}"))?;
	let send_count: usize = args.get(3)?.parse().ok_or(|err| log::error!("invalid send_count: {err}"))?;
	Some((local_port, peer, send_count))
}
