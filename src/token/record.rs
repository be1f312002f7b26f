//! Immutable token record and its usability rules.

// self
use crate::{_prelude::*, clock, token::TokenSecret};

/// Safety margin subtracted from a token's expiry before it stops being reused.
pub const DEFAULT_BUFFER: Duration = Duration::minutes(5);

/// Lifecycle status for a stored token record.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenStatus {
	/// Token has not reached its expiry instant.
	Active,
	/// Token reached or passed its expiry instant.
	Expired,
}
impl TokenStatus {
	/// Returns a stable label suitable for display.
	pub const fn as_str(self) -> &'static str {
		match self {
			TokenStatus::Active => "active",
			TokenStatus::Expired => "expired",
		}
	}
}
impl Display for TokenStatus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Bearer token cached between deliveries.
///
/// Records are replaced wholesale on every refresh and never mutated in place.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenRecord {
	/// Bearer token value; callers must avoid logging it.
	pub value: TokenSecret,
	/// Issuance instant in Unix milliseconds.
	pub issued_at_epoch_ms: i64,
	/// Expiry instant in Unix milliseconds; always `issued_at_epoch_ms + lifetime`.
	pub expires_at_epoch_ms: i64,
}
impl TokenRecord {
	/// Builds a record issued at `issued_at` that lives for `lifetime_secs` seconds.
	pub fn issued(value: impl Into<String>, issued_at: OffsetDateTime, lifetime_secs: i64) -> Self {
		let issued_at_epoch_ms = clock::epoch_millis(issued_at);
		let expires_at_epoch_ms =
			issued_at_epoch_ms.saturating_add(lifetime_secs.saturating_mul(1_000));

		Self { value: TokenSecret::new(value), issued_at_epoch_ms, expires_at_epoch_ms }
	}

	/// Expiry as an [`OffsetDateTime`].
	pub fn expires_at(&self) -> OffsetDateTime {
		clock::from_epoch_millis(self.expires_at_epoch_ms)
	}

	/// Issuance instant as an [`OffsetDateTime`].
	pub fn issued_at(&self) -> OffsetDateTime {
		clock::from_epoch_millis(self.issued_at_epoch_ms)
	}

	/// Returns `true` while `now < expires_at - buffer`.
	pub fn is_usable_at(&self, now: OffsetDateTime, buffer: Duration) -> bool {
		let buffer_ms = i64::try_from(buffer.whole_milliseconds()).unwrap_or(i64::MAX);

		clock::epoch_millis(now) < self.expires_at_epoch_ms.saturating_sub(buffer_ms)
	}

	/// Computes the lifecycle status at a given instant.
	pub fn status_at(&self, now: OffsetDateTime) -> TokenStatus {
		if clock::epoch_millis(now) >= self.expires_at_epoch_ms {
			TokenStatus::Expired
		} else {
			TokenStatus::Active
		}
	}

	/// Time left before expiry; zero once expired.
	pub fn remaining_at(&self, now: OffsetDateTime) -> Duration {
		let remaining = self.expires_at_epoch_ms.saturating_sub(clock::epoch_millis(now));

		Duration::milliseconds(remaining.max(0))
	}
}
impl Debug for TokenRecord {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenRecord")
			.field("value", &"<redacted>")
			.field("issued_at_epoch_ms", &self.issued_at_epoch_ms)
			.field("expires_at_epoch_ms", &self.expires_at_epoch_ms)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn at(ms: i64) -> OffsetDateTime {
		OffsetDateTime::UNIX_EPOCH + Duration::milliseconds(ms)
	}

	#[test]
	fn expiry_is_issuance_plus_lifetime() {
		let record = TokenRecord::issued("abc", at(1_234), 3_600);

		assert_eq!(record.issued_at_epoch_ms, 1_234);
		assert_eq!(record.expires_at_epoch_ms, 1_234 + 3_600_000);
		assert_eq!(record.expires_at(), at(3_601_234));
	}

	#[test]
	fn usability_honors_buffer_boundary() {
		let record = TokenRecord::issued("abc", at(0), 3_600);

		assert!(record.is_usable_at(at(3_000_000), DEFAULT_BUFFER));
		assert!(record.is_usable_at(at(3_299_999), DEFAULT_BUFFER));
		assert!(!record.is_usable_at(at(3_300_000), DEFAULT_BUFFER));
		assert!(!record.is_usable_at(at(3_360_001), DEFAULT_BUFFER));
		assert!(record.is_usable_at(at(3_599_999), Duration::ZERO));
	}

	#[test]
	fn zero_lifetime_is_never_usable() {
		let record = TokenRecord::issued("short", at(10), 0);

		assert!(!record.is_usable_at(at(10), Duration::ZERO));
		assert_eq!(record.status_at(at(10)), TokenStatus::Expired);
	}

	#[test]
	fn status_and_remaining_track_expiry() {
		let record = TokenRecord::issued("abc", at(0), 60);

		assert_eq!(record.status_at(at(59_999)), TokenStatus::Active);
		assert_eq!(record.remaining_at(at(30_000)), Duration::seconds(30));
		assert_eq!(record.status_at(at(60_000)), TokenStatus::Expired);
		assert_eq!(record.remaining_at(at(90_000)), Duration::ZERO);
	}

	#[test]
	fn serde_round_trip_preserves_value_and_expiry() {
		let record = TokenRecord::issued("eyJhbGciOi.payload.sig", at(42), 900);
		let json = serde_json::to_string(&record).expect("Token record should serialize.");

		assert!(json.contains("\"expiresAtEpochMs\":900042"));

		let decoded: TokenRecord =
			serde_json::from_str(&json).expect("Token record should deserialize.");

		assert_eq!(decoded.value.expose(), "eyJhbGciOi.payload.sig");
		assert_eq!(decoded.expires_at_epoch_ms, record.expires_at_epoch_ms);
		assert!(!format!("{decoded:?}").contains("payload"));
	}
}
