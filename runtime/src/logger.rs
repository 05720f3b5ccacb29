use std::time::SystemTime;

use log::Level;
use nu_ansi_term::ansi::RESET;
use nu_ansi_term::{Color, Style};

pub struct Logger;

impl log::Log for Logger {
	fn enabled(&self, _: &log::Metadata) -> bool {
		true
	}

	fn log(&self, record: &log::Record) {
		let time = humantime::format_rfc3339_nanos(SystemTime::now());

		let dim = Style::new().dimmed().prefix();

		eprintln!(
			"{dim}{time}{RESET} {}{:5}{RESET} {}{}{RESET}{dim}:{RESET} {}",
			match record.level() {
				Level::Trace => Color::Purple,
				Level::Debug => Color::Blue,
				Level::Info => Color::Green,
				Level::Warn => Color::Yellow,
				Level::Error => Color::Red,
			}
			.bold()
			.prefix(),
			record.level(),
			Style::new().bold().prefix(),
			record.target(),
			record.args()
		);
	}

	fn flush(&self) {}
}

/// Installs [`Logger`] as the global logger, with the level read from `RUST_LOG` (defaulting to `info`).
pub fn init() {
	let level = std::env::var("RUST_LOG")
		.ok()
		.and_then(|s| s.parse().ok())
		.unwrap_or(log::LevelFilter::Info);

	log::set_max_level(level);

	if log::set_logger(&Logger).is_err() {
		log::warn!("Logger has already been initialised");
	}
}
