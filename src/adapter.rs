//! Translation of form-submission events into delivery payloads.
//!
//! The adapter is a thin boundary: it drops empty answers, records question order, lifts a
//! handful of well-known applicant fields by title alias, and stamps a submission identifier.

mod aliases;
mod payload;

pub use aliases::*;
pub use payload::*;

// self
use crate::_prelude::*;

/// One answer as produced by the form host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
	/// Free text or a single choice.
	Text(String),
	/// Checkbox-style multiple choices.
	Choices(Vec<String>),
	/// Grid answers, one row per entry.
	Grid(Vec<Vec<String>>),
}
impl Answer {
	/// Returns `true` when the answer carries no value.
	pub fn is_empty(&self) -> bool {
		match self {
			Self::Text(text) => text.is_empty(),
			Self::Choices(choices) => choices.is_empty(),
			Self::Grid(rows) => rows.iter().all(Vec::is_empty),
		}
	}

	/// Flattens the answer into a single display string.
	pub fn to_text(&self) -> String {
		match self {
			Self::Text(text) => text.clone(),
			Self::Choices(choices) => choices.join(", "),
			Self::Grid(rows) =>
				rows.iter().map(|row| row.join(", ")).collect::<Vec<_>>().join("; "),
		}
	}
}
impl From<&str> for Answer {
	fn from(value: &str) -> Self {
		Self::Text(value.into())
	}
}
impl From<String> for Answer {
	fn from(value: String) -> Self {
		Self::Text(value)
	}
}
impl From<Vec<String>> for Answer {
	fn from(value: Vec<String>) -> Self {
		Self::Choices(value)
	}
}

/// Answer to a single question.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemResponse {
	/// Question title.
	pub title: String,
	/// Raw answer, if any.
	#[serde(default)]
	pub answer: Option<Answer>,
}
impl ItemResponse {
	/// Creates an item response.
	pub fn new(title: impl Into<String>, answer: impl Into<Answer>) -> Self {
		Self { title: title.into(), answer: Some(answer.into()) }
	}

	/// Creates an unanswered item.
	pub fn unanswered(title: impl Into<String>) -> Self {
		Self { title: title.into(), answer: None }
	}
}

/// Form-submission event delivered by the host.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSubmission {
	/// Answers in question order.
	pub items: Vec<ItemResponse>,
	/// Time the respondent submitted.
	#[serde(with = "time::serde::rfc3339")]
	pub timestamp: OffsetDateTime,
	/// Email collected by the host, if the form records it.
	#[serde(default)]
	pub respondent_email: Option<String>,
}

/// Builds [`ApplicationPayload`] values from submissions.
#[derive(Clone, Debug, Default)]
pub struct EventAdapter {
	form_id: Option<String>,
	aliases: FieldAliases,
}
impl EventAdapter {
	/// Creates an adapter stamping `form_id` onto every payload.
	pub fn new(form_id: Option<String>) -> Self {
		Self { form_id, aliases: FieldAliases::default() }
	}

	/// Replaces the alias table.
	pub fn with_aliases(mut self, aliases: FieldAliases) -> Self {
		self.aliases = aliases;

		self
	}

	/// Alias table in effect.
	pub fn aliases(&self) -> &FieldAliases {
		&self.aliases
	}

	/// Converts `submission` into a payload, generating a fresh identifier at `now`.
	pub fn adapt(&self, submission: &FormSubmission, now: OffsetDateTime) -> ApplicationPayload {
		self.adapt_with_id(submission, SubmissionId::generate(now))
	}

	/// Converts `submission` into a payload using a caller-supplied identifier.
	pub fn adapt_with_id(&self, submission: &FormSubmission, id: SubmissionId) -> ApplicationPayload {
		let mut form_data = BTreeMap::new();
		let mut form_data_order = Vec::new();

		for item in &submission.items {
			let Some(answer) = item.answer.as_ref().filter(|answer| !answer.is_empty()) else {
				continue;
			};

			if form_data.insert(item.title.clone(), answer.clone()).is_none() {
				form_data_order.push(item.title.clone());
			}
		}

		let lookup = |field| self.lookup(&form_data, field);
		let respondent_email =
			submission.respondent_email.as_deref().filter(|email| !email.is_empty());
		let applicant_email = respondent_email
			.map(ToOwned::to_owned)
			.unwrap_or_else(|| lookup(KnownField::Email));

		ApplicationPayload {
			form_id: self.form_id.clone(),
			applicant_name: lookup(KnownField::Name),
			applicant_email,
			form_response_id: id,
			submission_timestamp: submission.timestamp,
			school: lookup(KnownField::School),
			department: lookup(KnownField::Department),
			grade: lookup(KnownField::Grade),
			major: lookup(KnownField::Major),
			phone_number: lookup(KnownField::Phone),
			form_data,
			form_data_order,
		}
	}

	fn lookup(&self, form_data: &BTreeMap<String, Answer>, field: KnownField) -> String {
		self.aliases
			.get(field)
			.iter()
			.find_map(|alias| form_data.get(alias))
			.map(Answer::to_text)
			.unwrap_or_default()
	}
}
