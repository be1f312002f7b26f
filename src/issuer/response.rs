//! Token exchange response parsing.

// self
use crate::{_prelude::*, error::MalformedResponseError};

/// Access token plus declared lifetime extracted from an exchange response.
#[derive(Clone, PartialEq, Eq)]
pub(crate) struct IssuedToken {
	pub(crate) access_token: String,
	pub(crate) expires_in: i64,
}
impl Debug for IssuedToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IssuedToken")
			.field("access_token", &"<redacted>")
			.field("expires_in", &self.expires_in)
			.finish()
	}
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TokenFields {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
}
impl TokenFields {
	fn has_token(&self) -> bool {
		self.access_token.as_deref().is_some_and(|token| !token.is_empty())
	}
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Envelope {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	expires_in: Option<i64>,
	#[serde(default)]
	data: Option<serde_json::Value>,
}

/// Parses a 200 exchange body.
///
/// A non-empty top-level `accessToken` wins; otherwise the `data` wrapper is consulted. The
/// lifetime is read from whichever object supplied the token.
pub(crate) fn parse_exchange_body(body: &str) -> Result<IssuedToken, MalformedResponseError> {
	let mut deserializer = serde_json::Deserializer::from_str(body);
	let envelope: Envelope = serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| MalformedResponseError::InvalidJson { source })?;
	let top = TokenFields { access_token: envelope.access_token, expires_in: envelope.expires_in };
	let fields = if top.has_token() {
		top
	} else {
		match envelope.data {
			Some(data) => serde_path_to_error::deserialize(data)
				.map_err(|source| MalformedResponseError::InvalidData { source })?,
			None => TokenFields::default(),
		}
	};

	if !fields.has_token() {
		return Err(MalformedResponseError::MissingAccessToken);
	}

	let expires_in = fields.expires_in.ok_or(MalformedResponseError::MissingExpiresIn)?;

	if expires_in < 0 {
		return Err(MalformedResponseError::NegativeExpiresIn { value: expires_in });
	}

	Ok(IssuedToken { access_token: fields.access_token.unwrap_or_default(), expires_in })
}
