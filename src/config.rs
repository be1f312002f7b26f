//! Validated relay configuration.
//!
//! A [`RelayConfig`] only exists once its API key and endpoints passed validation, so the
//! relay never starts an exchange without the values it depends on.

mod builder;

pub use builder::RelayConfigBuilder;

// std
use std::{fs, path::Path};
// self
use crate::{
	_prelude::*,
	error::ConfigError,
	token::{Credential, TokenSecret},
};

const DELIVERY_SEGMENT: &str = "/receive";
const TEST_SEGMENT: &str = "/test";

/// Endpoints, credential, and form metadata used by the relay.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RelayConfig {
	api_key: TokenSecret,
	token_exchange_url: Url,
	delivery_url: Url,
	test_url: Url,
	form_id: Option<String>,
}
impl RelayConfig {
	/// Starts building a configuration.
	pub fn builder() -> RelayConfigBuilder {
		RelayConfigBuilder::default()
	}

	/// Parses and validates a JSON document shaped like
	/// `{apiKey, jwtExchangeUrl, deliveryUrl, testUrl?, formId?}`.
	pub fn from_json_slice(bytes: &[u8]) -> Result<Self, ConfigError> {
		let mut deserializer = serde_json::Deserializer::from_slice(bytes);
		let builder: RelayConfigBuilder = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::Parse { source })?;

		builder.build()
	}

	/// Reads, parses, and validates a JSON configuration file.
	pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
		let path = path.as_ref();
		let bytes = fs::read(path)
			.map_err(|source| ConfigError::Read { path: path.display().to_string(), source })?;

		Self::from_json_slice(&bytes)
	}

	/// Shared API key.
	pub fn api_key(&self) -> &TokenSecret {
		&self.api_key
	}

	/// Credential presented to the token exchange.
	pub fn credential(&self) -> Credential {
		Credential::webhook(self.api_key.expose())
	}

	/// Token exchange endpoint.
	pub fn token_exchange_url(&self) -> &Url {
		&self.token_exchange_url
	}

	/// Delivery endpoint for application payloads.
	pub fn delivery_url(&self) -> &Url {
		&self.delivery_url
	}

	/// Connection-check endpoint.
	pub fn test_url(&self) -> &Url {
		&self.test_url
	}

	/// Form identifier stamped onto payloads.
	pub fn form_id(&self) -> Option<&str> {
		self.form_id.as_deref()
	}

	/// Replaces the delivery endpoint and re-derives the test endpoint from it.
	pub fn with_delivery_url(mut self, url: Url) -> Self {
		self.test_url = Self::derive_test_url(&url);
		self.delivery_url = url;

		self
	}

	/// Returns `true` when switching to `other` invalidates tokens issued under `self`.
	pub fn changes_token_identity(&self, other: &Self) -> bool {
		self.api_key != other.api_key || self.token_exchange_url != other.token_exchange_url
	}

	fn derive_test_url(delivery_url: &Url) -> Url {
		let mut test_url = delivery_url.clone();
		let path = delivery_url.path().replacen(DELIVERY_SEGMENT, TEST_SEGMENT, 1);

		test_url.set_path(&path);

		test_url
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const FULL: &str = r#"{
		"apiKey": "relay-key",
		"jwtExchangeUrl": "https://api.example.com/api/admin/token/exchange",
		"deliveryUrl": "https://api.example.com/api/webhook/applications/receive",
		"testUrl": "https://api.example.com/api/webhook/applications/ping",
		"formId": "form-1"
	}"#;

	#[test]
	fn json_document_loads() {
		let config = RelayConfig::from_json_slice(FULL.as_bytes()).expect("Config should load.");

		assert_eq!(config.api_key().expose(), "relay-key");
		assert_eq!(config.token_exchange_url().path(), "/api/admin/token/exchange");
		assert_eq!(config.test_url().path(), "/api/webhook/applications/ping");
		assert_eq!(config.form_id(), Some("form-1"));
		assert!(!format!("{config:?}").contains("relay-key"));
	}

	#[test]
	fn missing_or_blank_fields_are_rejected() {
		let blank_key = br#"{
			"apiKey": "  ",
			"jwtExchangeUrl": "https://a/token",
			"deliveryUrl": "https://a/receive"
		}"#;
		let err = RelayConfig::from_json_slice(blank_key)
			.expect_err("Blank apiKey should be rejected.");

		assert!(matches!(err, ConfigError::MissingField { field: "apiKey" }));

		let err = RelayConfig::builder()
			.api_key("k")
			.delivery_url("https://a/receive")
			.build()
			.expect_err("Missing exchange URL should be rejected.");

		assert!(matches!(err, ConfigError::MissingField { field: "jwtExchangeUrl" }));
	}

	#[test]
	fn urls_are_validated() {
		let err = RelayConfig::builder()
			.api_key("k")
			.token_exchange_url("not a url")
			.delivery_url("https://a/receive")
			.build()
			.expect_err("Invalid URL should be rejected.");

		assert!(matches!(err, ConfigError::InvalidUrl { field: "jwtExchangeUrl", .. }));

		let err = RelayConfig::builder()
			.api_key("k")
			.token_exchange_url("https://a/token")
			.delivery_url("ftp://a/receive")
			.build()
			.expect_err("Non-HTTP scheme should be rejected.");

		assert!(matches!(err, ConfigError::UnsupportedScheme { field: "deliveryUrl", .. }));
	}

	#[test]
	fn parse_errors_carry_path() {
		let err = RelayConfig::from_json_slice(br#"{"apiKey":7}"#)
			.expect_err("Numeric apiKey should be rejected.");

		match err {
			ConfigError::Parse { source } => assert_eq!(source.path().to_string(), "apiKey"),
			other => panic!("Unexpected error variant: {other:?}."),
		}
	}

	#[test]
	fn test_url_derives_from_delivery_url() {
		let config = RelayConfig::builder()
			.api_key("k")
			.token_exchange_url("https://a/token")
			.delivery_url("https://a/api/receive")
			.build()
			.expect("Config without testUrl should build.");

		assert_eq!(config.test_url().as_str(), "https://a/api/test");

		let moved = config.with_delivery_url(
			Url::parse("https://b/hooks/receive/v2").expect("URL should parse."),
		);

		assert_eq!(moved.delivery_url().as_str(), "https://b/hooks/receive/v2");
		assert_eq!(moved.test_url().as_str(), "https://b/hooks/test/v2");
	}

	#[test]
	fn token_identity_tracks_key_and_exchange_url() {
		let base = RelayConfig::from_json_slice(FULL.as_bytes()).expect("Config should load.");
		let moved = base.clone().with_delivery_url(
			Url::parse("https://other.example.com/receive").expect("URL should parse."),
		);

		assert!(!base.changes_token_identity(&moved));

		let rekeyed = RelayConfig::builder()
			.api_key("another-key")
			.token_exchange_url(base.token_exchange_url().as_str())
			.delivery_url(base.delivery_url().as_str())
			.build()
			.expect("Config should build.");

		assert!(base.changes_token_identity(&rekeyed));
	}

	#[test]
	fn missing_file_reports_read_error() {
		let err = RelayConfig::from_file("/nonexistent/form-relay/config.json")
			.expect_err("Missing file should be rejected.");

		assert!(matches!(err, ConfigError::Read { .. }));
	}
}
