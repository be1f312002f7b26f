// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for webhook deliveries.
#[derive(Debug, Default)]
pub struct DeliveryMetrics {
	sends: AtomicU64,
	successes: AtomicU64,
	failures: AtomicU64,
	auth_retries: AtomicU64,
}
impl DeliveryMetrics {
	/// Returns the number of HTTP requests sent to delivery endpoints.
	pub fn sends(&self) -> u64 {
		self.sends.load(Ordering::Relaxed)
	}

	/// Returns the number of deliveries that ended with a `2xx`.
	pub fn successes(&self) -> u64 {
		self.successes.load(Ordering::Relaxed)
	}

	/// Returns the number of deliveries that ended without a `2xx`.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	/// Returns the number of 401-triggered refresh-and-retry cycles.
	pub fn auth_retries(&self) -> u64 {
		self.auth_retries.load(Ordering::Relaxed)
	}

	pub(crate) fn record_send(&self) {
		self.sends.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_success(&self) {
		self.successes.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_auth_retry(&self) {
		self.auth_retries.fetch_add(1, Ordering::Relaxed);
	}
}
