//! Wire payloads sent to the delivery and test endpoints.

// crates.io
use rand::Rng;
use time::{PrimitiveDateTime, UtcOffset};
// self
use crate::{_prelude::*, adapter::Answer, clock};

const ID_PREFIX: &str = "response";
const ID_SUFFIX_LEN: usize = 9;
const BASE36: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const CONNECTION_TEST_MESSAGE: &str = "Form relay connection test";

time::serde::format_description!(
	test_time_format,
	PrimitiveDateTime,
	"[year]-[month]-[day] [hour]:[minute]:[second]"
);

/// Best-effort unique identifier for a submission: `response_<epochMs>_<9 base36 chars>`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(String);
impl SubmissionId {
	/// Generates an identifier from `now` and a random suffix.
	pub fn generate(now: OffsetDateTime) -> Self {
		Self::generate_with(now, &mut rand::rng())
	}

	/// Generates an identifier drawing the suffix from `rng`.
	pub fn generate_with<R>(now: OffsetDateTime, rng: &mut R) -> Self
	where
		R: Rng,
	{
		let suffix = (0..ID_SUFFIX_LEN)
			.map(|_| BASE36[rng.random_range(0..BASE36.len())] as char)
			.collect::<String>();

		Self(format!("{ID_PREFIX}_{}_{suffix}", clock::epoch_millis(now)))
	}

	/// Identifier text.
	pub fn as_str(&self) -> &str {
		&self.0
	}
}
impl Display for SubmissionId {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.0)
	}
}

/// Application document POSTed to the delivery endpoint.
///
/// Well-known applicant fields default to empty strings when no alias matched. `form_data`
/// and `form_data_order` always hold the same set of titles.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationPayload {
	/// Configured form identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub form_id: Option<String>,
	/// Applicant name.
	pub applicant_name: String,
	/// Applicant email.
	pub applicant_email: String,
	/// Generated submission identifier.
	pub form_response_id: SubmissionId,
	/// Submission time.
	#[serde(with = "time::serde::rfc3339")]
	pub submission_timestamp: OffsetDateTime,
	/// School or university.
	pub school: String,
	/// Department.
	pub department: String,
	/// Academic year.
	pub grade: String,
	/// Major status.
	pub major: String,
	/// Phone number.
	pub phone_number: String,
	/// Non-empty answers keyed by question title.
	pub form_data: BTreeMap<String, Answer>,
	/// Question titles in submission order.
	pub form_data_order: Vec<String>,
}

/// Payload sent to the test endpoint by the connection check.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionTestPayload {
	/// Fixed human-readable marker.
	pub message: String,
	/// Time the check ran.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
	/// Configured form identifier.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub form_id: Option<String>,
	/// Sender metadata.
	pub test_data: TestData,
}

/// Sender metadata attached to [`ConnectionTestPayload`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestData {
	/// Version of the relay that produced the payload.
	pub script_version: String,
	/// Time the check ran, formatted as `YYYY-MM-DD hh:mm:ss` (UTC).
	#[serde(with = "test_time_format")]
	pub test_time: PrimitiveDateTime,
}

/// Builds the connection-check payload for `form_id` at `now`.
pub fn connection_test_payload(form_id: Option<&str>, now: OffsetDateTime) -> ConnectionTestPayload {
	let now = now.to_offset(UtcOffset::UTC);

	ConnectionTestPayload {
		message: CONNECTION_TEST_MESSAGE.into(),
		timestamp: now,
		form_id: form_id.map(Into::into),
		test_data: TestData {
			script_version: format!("{} v{}", env!("CARGO_PKG_NAME"), env!("CARGO_PKG_VERSION")),
			test_time: PrimitiveDateTime::new(now.date(), now.time()),
		},
	}
}
