//! Append-only operational log written by the relay.
//!
//! Entries mirror a spreadsheet row: timestamp, status, operation, message, and an optional
//! trace. Sinks only receive entries; nothing in the crate reads them back.

// self
use crate::_prelude::*;

/// Entry count above which [`MemoryLogSink::prune`] trims the log.
pub const PRUNE_THRESHOLD: usize = 100;
/// Number of oldest entries removed by one prune.
pub const PRUNE_BATCH: usize = 50;

/// Outcome recorded by a [`LogEntry`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum LogStatus {
	/// The operation completed.
	Success,
	/// The operation failed.
	Error,
}
impl LogStatus {
	/// Returns the uppercase label written to sinks.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Success => "SUCCESS",
			Self::Error => "ERROR",
		}
	}
}
impl Display for LogStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// One log row.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogEntry {
	/// Time the entry was produced.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
	/// Outcome.
	pub status: LogStatus,
	/// Operation name, e.g. `on_form_submit`.
	pub operation: String,
	/// Human-readable message.
	pub message: String,
	/// Cause chain for failures, one cause per line.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub trace: Option<String>,
}
impl LogEntry {
	/// Builds a success entry.
	pub fn success(
		timestamp: OffsetDateTime,
		operation: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			timestamp,
			status: LogStatus::Success,
			operation: operation.into(),
			message: message.into(),
			trace: None,
		}
	}

	/// Builds an error entry carrying a plain message.
	pub fn error(
		timestamp: OffsetDateTime,
		operation: impl Into<String>,
		message: impl Into<String>,
	) -> Self {
		Self {
			timestamp,
			status: LogStatus::Error,
			operation: operation.into(),
			message: message.into(),
			trace: None,
		}
	}

	/// Builds an error entry from `error`, recording its source chain as the trace.
	pub fn failure(
		timestamp: OffsetDateTime,
		operation: impl Into<String>,
		error: &(dyn StdError + 'static),
	) -> Self {
		let mut causes = Vec::new();
		let mut source = error.source();

		while let Some(cause) = source {
			causes.push(cause.to_string());
			source = cause.source();
		}

		let mut entry = Self::error(timestamp, operation, error.to_string());

		if !causes.is_empty() {
			entry.trace = Some(causes.join("\n"));
		}

		entry
	}
}

/// Destination for relay log entries.
pub trait LogSink
where
	Self: Send + Sync,
{
	/// Appends `entry`. Sinks must not fail the caller.
	fn record(&self, entry: LogEntry);
}

/// Sink that discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopLogSink;
impl LogSink for NoopLogSink {
	fn record(&self, _: LogEntry) {}
}

/// In-memory sink, mostly useful for tests and embedding hosts that flush entries elsewhere.
#[derive(Clone, Debug, Default)]
pub struct MemoryLogSink(Arc<Mutex<Vec<LogEntry>>>);
impl MemoryLogSink {
	/// Returns a copy of the retained entries, oldest first.
	pub fn entries(&self) -> Vec<LogEntry> {
		self.0.lock().clone()
	}

	/// Number of retained entries.
	pub fn len(&self) -> usize {
		self.0.lock().len()
	}

	/// Returns `true` when no entries are retained.
	pub fn is_empty(&self) -> bool {
		self.0.lock().is_empty()
	}

	/// Drops the oldest [`PRUNE_BATCH`] entries once more than [`PRUNE_THRESHOLD`] are held.
	///
	/// Returns the number of removed entries.
	pub fn prune(&self) -> usize {
		let mut entries = self.0.lock();

		if entries.len() <= PRUNE_THRESHOLD {
			return 0;
		}

		entries.drain(..PRUNE_BATCH);

		PRUNE_BATCH
	}
}
impl LogSink for MemoryLogSink {
	fn record(&self, entry: LogEntry) {
		self.0.lock().push(entry);
	}
}

/// Sink that forwards entries to `tracing`.
#[cfg(feature = "tracing")]
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingLogSink;
#[cfg(feature = "tracing")]
impl LogSink for TracingLogSink {
	fn record(&self, entry: LogEntry) {
		let LogEntry { timestamp, status, operation, message, trace } = entry;

		match status {
			LogStatus::Success => tracing::info!(
				target: "form_relay::log",
				%timestamp,
				status = status.as_str(),
				operation = operation.as_str(),
				"{message}"
			),
			LogStatus::Error => tracing::error!(
				target: "form_relay::log",
				%timestamp,
				status = status.as_str(),
				operation = operation.as_str(),
				trace = trace.as_deref().unwrap_or_default(),
				"{message}"
			),
		}
	}
}
impl<T> LogSink for Arc<T>
where
	T: ?Sized + LogSink,
{
	fn record(&self, entry: LogEntry) {
		(**self).record(entry);
	}
}
