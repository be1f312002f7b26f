//! Static credential exchanged for short-lived bearer tokens.

// self
use crate::{_prelude::*, token::TokenSecret};

/// Purpose tag sent with every exchange request.
pub const WEBHOOK_PURPOSE: &str = "webhook";

/// Shared secret plus fixed purpose tag presented to the token exchange.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Credential {
	/// Shared API key; redacted in `Debug`/`Display`.
	pub api_key: TokenSecret,
	/// Purpose tag attached to the exchange request.
	pub purpose: &'static str,
}
impl Credential {
	/// Builds a credential for the webhook purpose.
	pub fn webhook(api_key: impl Into<String>) -> Self {
		Self { api_key: TokenSecret::new(api_key), purpose: WEBHOOK_PURPOSE }
	}

	/// Wire representation of the exchange request body.
	pub(crate) fn exchange_request(&self) -> ExchangeRequest<'_> {
		ExchangeRequest { api_key: self.api_key.expose(), purpose: self.purpose }
	}
}

/// JSON body posted to the token exchange.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct ExchangeRequest<'a> {
	pub(crate) api_key: &'a str,
	pub(crate) purpose: &'a str,
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn exchange_request_uses_camel_case_keys() {
		let credential = Credential::webhook("relay-key");
		let body = serde_json::to_value(credential.exchange_request())
			.expect("Exchange request should serialize to JSON.");

		assert_eq!(body, serde_json::json!({ "apiKey": "relay-key", "purpose": "webhook" }));
		assert!(!format!("{credential:?}").contains("relay-key"));
	}
}
