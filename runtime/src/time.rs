use std::sync::OnceLock;
use std::time::Instant;

static START: OnceLock<Instant> = OnceLock::new();

/// The monotonic millisecond clock fed to the engine's `update`/`check` calls.
///
/// Milliseconds since the first call to `now_ms` in this process. Wraps the
/// same way the wire `ts` field does; callers should never need more than 32
/// bits of range from this, and the protocol's own wraparound handling
/// (`utils::seq`) takes care of the rest.
pub fn now_ms() -> u32 {
	let start = START.get_or_init(Instant::now);
	start.elapsed().as_millis() as u32
}
