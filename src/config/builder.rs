// self
use crate::{_prelude::*, config::RelayConfig, error::ConfigError, token::TokenSecret};

/// Builder for [`RelayConfig`] values.
///
/// Every value is kept as raw text until [`RelayConfigBuilder::build`] validates it.
#[derive(Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelayConfigBuilder {
	/// Shared API key exchanged for bearer tokens.
	#[serde(default)]
	pub api_key: Option<String>,
	/// Token exchange endpoint.
	#[serde(default, rename = "jwtExchangeUrl")]
	pub token_exchange_url: Option<String>,
	/// Delivery endpoint for application payloads.
	#[serde(default)]
	pub delivery_url: Option<String>,
	/// Connection-check endpoint; derived from the delivery URL when absent.
	#[serde(default)]
	pub test_url: Option<String>,
	/// Form identifier stamped onto payloads.
	#[serde(default)]
	pub form_id: Option<String>,
}
impl RelayConfigBuilder {
	/// Sets the shared API key.
	pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
		self.api_key = Some(api_key.into());

		self
	}

	/// Sets the token exchange endpoint.
	pub fn token_exchange_url(mut self, url: impl Into<String>) -> Self {
		self.token_exchange_url = Some(url.into());

		self
	}

	/// Sets the delivery endpoint.
	pub fn delivery_url(mut self, url: impl Into<String>) -> Self {
		self.delivery_url = Some(url.into());

		self
	}

	/// Sets the connection-check endpoint.
	pub fn test_url(mut self, url: impl Into<String>) -> Self {
		self.test_url = Some(url.into());

		self
	}

	/// Sets the form identifier.
	pub fn form_id(mut self, form_id: impl Into<String>) -> Self {
		self.form_id = Some(form_id.into());

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<RelayConfig, ConfigError> {
		let api_key = required("apiKey", self.api_key)?;
		let token_exchange_url =
			parse_endpoint("jwtExchangeUrl", &required("jwtExchangeUrl", self.token_exchange_url)?)?;
		let delivery_url =
			parse_endpoint("deliveryUrl", &required("deliveryUrl", self.delivery_url)?)?;
		let test_url = match non_blank(self.test_url) {
			Some(raw) => parse_endpoint("testUrl", &raw)?,
			None => RelayConfig::derive_test_url(&delivery_url),
		};

		Ok(RelayConfig {
			api_key: TokenSecret::new(api_key),
			token_exchange_url,
			delivery_url,
			test_url,
			form_id: non_blank(self.form_id),
		})
	}
}
impl Debug for RelayConfigBuilder {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RelayConfigBuilder")
			.field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
			.field("token_exchange_url", &self.token_exchange_url)
			.field("delivery_url", &self.delivery_url)
			.field("test_url", &self.test_url)
			.field("form_id", &self.form_id)
			.finish()
	}
}

fn non_blank(value: Option<String>) -> Option<String> {
	value.filter(|v| !v.trim().is_empty())
}

fn required(field: &'static str, value: Option<String>) -> Result<String, ConfigError> {
	non_blank(value).ok_or(ConfigError::MissingField { field })
}

fn parse_endpoint(field: &'static str, raw: &str) -> Result<Url, ConfigError> {
	let url = Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source })?;

	match url.scheme() {
		"http" | "https" => Ok(url),
		_ => Err(ConfigError::UnsupportedScheme { field, url: url.to_string() }),
	}
}
