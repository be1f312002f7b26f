//! Relay-level error types shared across the issuer, stores, transports, and configuration.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical relay error exposed by public APIs.
///
/// Token acquisition failures surface through this type, while delivery failures are reported
/// as values inside [`DeliveryResult`](crate::delivery::DeliveryResult).
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem; callers must not proceed.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS) while calling the token exchange.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Token exchange responded with a non-200 status.
	#[error("Token exchange failed with HTTP {status}: {body}")]
	Issuance {
		/// HTTP status code returned by the exchange.
		status: u16,
		/// Raw response body returned by the exchange.
		body: String,
	},
	/// Token exchange responded with 200 but the body could not be interpreted.
	#[error(transparent)]
	MalformedResponse(#[from] MalformedResponseError),
	/// Outbound payload could not be encoded as JSON.
	#[error("Payload could not be encoded as JSON.")]
	Payload {
		/// Underlying encoding failure.
		#[source]
		source: serde_json::Error,
	},
}

/// Configuration and validation failures raised before any relay operation runs.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// A required configuration value is absent or blank.
	#[error("Missing required configuration value `{field}`.")]
	MissingField {
		/// Configuration key that was missing.
		field: &'static str,
	},
	/// A configured URL cannot be parsed.
	#[error("Configuration value `{field}` is not a valid URL.")]
	InvalidUrl {
		/// Configuration key holding the URL.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A configured URL uses a scheme other than HTTP(S).
	#[error("Configuration value `{field}` must use http or https: {url}.")]
	UnsupportedScheme {
		/// Configuration key holding the URL.
		field: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// Configuration file could not be read.
	#[error("Configuration file {path} could not be read.")]
	Read {
		/// Path that was being read.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Configuration document is not valid JSON for the expected shape.
	#[error("Configuration document is malformed.")]
	Parse {
		/// Structured parsing failure including the offending path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Shape problems found in a successful (HTTP 200) token exchange response.
#[derive(Debug, ThisError)]
pub enum MalformedResponseError {
	/// Response body is not JSON of the expected shape.
	#[error("Token exchange returned malformed JSON.")]
	InvalidJson {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// The `data` wrapper consulted for the token does not have the expected shape.
	#[error("Token exchange returned a malformed data wrapper.")]
	InvalidData {
		/// Structured parsing failure, with the path relative to `data`.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Neither the top-level object nor the `data` wrapper carried an access token.
	#[error("Token exchange response is missing accessToken.")]
	MissingAccessToken,
	/// The object carrying the access token has no lifetime.
	#[error("Token exchange response is missing expiresIn.")]
	MissingExpiresIn,
	/// The declared lifetime is negative.
	#[error("The expiresIn value must not be negative: {value}.")]
	NegativeExpiresIn {
		/// Lifetime in seconds as reported by the exchange.
		value: i64,
	},
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("{source}")]
	Network {
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error: {0}")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for TransportError {
	fn from(e: ReqwestError) -> Self {
		Self::network(e)
	}
}
