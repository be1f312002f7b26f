//! Injectable time sources used for token expiry decisions.

// self
use crate::_prelude::*;

/// Source of "now" for expiry checks and timestamps.
pub trait Clock
where
	Self: Send + Sync,
{
	/// Returns the current instant.
	fn now(&self) -> OffsetDateTime;
}

/// Wall clock backed by [`OffsetDateTime::now_utc`].
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;
impl Clock for SystemClock {
	fn now(&self) -> OffsetDateTime {
		OffsetDateTime::now_utc()
	}
}

/// Manually driven clock for tests and demos.
#[derive(Debug)]
pub struct ManualClock(Mutex<OffsetDateTime>);
impl ManualClock {
	/// Creates a clock frozen at the provided instant.
	pub fn new(instant: OffsetDateTime) -> Self {
		Self(Mutex::new(instant))
	}

	/// Creates a clock frozen at the Unix epoch (`t = 0`).
	pub fn at_epoch() -> Self {
		Self::new(OffsetDateTime::UNIX_EPOCH)
	}

	/// Moves the clock forward (or backward, for negative durations).
	pub fn advance(&self, delta: Duration) {
		let mut guard = self.0.lock();

		*guard += delta;
	}

	/// Jumps the clock to an absolute instant.
	pub fn set(&self, instant: OffsetDateTime) {
		*self.0.lock() = instant;
	}
}
impl Clock for ManualClock {
	fn now(&self) -> OffsetDateTime {
		*self.0.lock()
	}
}

/// Milliseconds since the Unix epoch, saturating at the `i64` bounds.
pub fn epoch_millis(instant: OffsetDateTime) -> i64 {
	let millis = instant.unix_timestamp_nanos() / 1_000_000;

	i64::try_from(millis).unwrap_or(if millis.is_negative() { i64::MIN } else { i64::MAX })
}

/// Instant for a millisecond Unix timestamp, clamped to the range `time` can represent.
pub fn from_epoch_millis(millis: i64) -> OffsetDateTime {
	OffsetDateTime::from_unix_timestamp_nanos(i128::from(millis) * 1_000_000).unwrap_or(
		if millis.is_negative() { OffsetDateTime::UNIX_EPOCH } else { max_instant() },
	)
}

fn max_instant() -> OffsetDateTime {
	time::PrimitiveDateTime::MAX.assume_utc()
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn manual_clock_advances_in_place() {
		let clock = ManualClock::at_epoch();

		assert_eq!(epoch_millis(clock.now()), 0);

		clock.advance(Duration::milliseconds(3_360_001));

		assert_eq!(epoch_millis(clock.now()), 3_360_001);

		clock.set(macros::datetime!(2025-01-01 00:00 UTC));

		assert_eq!(clock.now(), macros::datetime!(2025-01-01 00:00 UTC));
	}

	#[test]
	fn epoch_millis_truncates_sub_millisecond_precision() {
		let instant = OffsetDateTime::UNIX_EPOCH + Duration::nanoseconds(1_999_999);

		assert_eq!(epoch_millis(instant), 1);
		assert_eq!(from_epoch_millis(1_500), OffsetDateTime::UNIX_EPOCH + Duration::milliseconds(1_500));
	}
}
