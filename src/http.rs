//! Transport primitives for the token exchange and webhook deliveries.
//!
//! The module exposes [`HttpTransport`] so downstream crates can plug in custom HTTP
//! clients (or scripted fakes in tests) while the issuer and delivery client keep
//! their classification logic transport-agnostic. Implementations only move bytes:
//! status interpretation stays with the callers.

// std
#[cfg(feature = "reqwest")] use std::ops::Deref;
// crates.io
#[cfg(feature = "reqwest")] use reqwest::header::CONTENT_TYPE;
// self
use crate::{_prelude::*, error::TransportError, token::TokenSecret};

/// Boxed future returned by [`HttpTransport::post_json`].
pub type HttpFuture<'a> =
	Pin<Box<dyn Future<Output = Result<HttpResponse, TransportError>> + 'a + Send>>;

/// Abstraction over HTTP stacks capable of POSTing JSON documents.
///
/// Implementations must be `Send + Sync + 'static` so a single transport can be shared by
/// the issuer and the delivery client behind an `Arc`. Any response that carries a status
/// code (including 4xx/5xx) must resolve to `Ok`; `Err` is reserved for failures where no
/// response was received.
pub trait HttpTransport
where
	Self: 'static + Send + Sync,
{
	/// Sends `request` and resolves to the raw status + body.
	fn post_json(&self, request: JsonRequest) -> HttpFuture<'_>;
}

/// Outbound JSON POST.
#[derive(Clone, Debug)]
pub struct JsonRequest {
	/// Target URL.
	pub url: Url,
	/// Bearer token placed in the `Authorization` header, if any.
	pub bearer: Option<TokenSecret>,
	/// Pre-encoded JSON body.
	pub body: Vec<u8>,
}
impl JsonRequest {
	/// Creates an unauthenticated request.
	pub fn new(url: Url, body: Vec<u8>) -> Self {
		Self { url, bearer: None, body }
	}

	/// Attaches a bearer token.
	pub fn with_bearer(mut self, token: TokenSecret) -> Self {
		self.bearer = Some(token);

		self
	}

	/// Returns the `Authorization` header value for this request.
	pub fn authorization(&self) -> Option<String> {
		self.bearer.as_ref().map(|token| format!("Bearer {}", token.expose()))
	}
}

/// Status code and body captured from an HTTP response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HttpResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response body decoded as text.
	pub body: String,
}
impl HttpResponse {
	/// Creates a response value.
	pub fn new(status: u16, body: impl Into<String>) -> Self {
		Self { status, body: body.into() }
	}

	/// Returns `true` for `2xx` statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}
}

/// Thin wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
///
/// No request deadline is imposed beyond what the wrapped client is configured with; pass a
/// custom client through [`ReqwestHttpClient::with_client`] to add timeouts.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
#[cfg(feature = "reqwest")]
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}
}
#[cfg(feature = "reqwest")]
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}
#[cfg(feature = "reqwest")]
impl HttpTransport for ReqwestHttpClient {
	fn post_json(&self, request: JsonRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			let JsonRequest { url, bearer, body } = request;
			let mut builder = self.0.post(url).header(CONTENT_TYPE, "application/json").body(body);

			if let Some(token) = bearer.as_ref() {
				builder = builder.bearer_auth(token.expose());
			}

			let response = builder.send().await?;
			let status = response.status().as_u16();
			let body = response.text().await?;

			Ok(HttpResponse { status, body })
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn authorization_header_uses_bearer_scheme() {
		let url = Url::parse("https://relay.example.com/receive").expect("URL should parse.");
		let request = JsonRequest::new(url, b"{}".to_vec());

		assert_eq!(request.authorization(), None);

		let request = request.with_bearer(TokenSecret::new("abc"));

		assert_eq!(request.authorization().as_deref(), Some("Bearer abc"));
		assert!(!format!("{request:?}").contains("abc"));
	}

	#[test]
	fn success_range_is_2xx_only() {
		assert!(HttpResponse::new(200, "").is_success());
		assert!(HttpResponse::new(299, "").is_success());
		assert!(!HttpResponse::new(199, "").is_success());
		assert!(!HttpResponse::new(300, "").is_success());
		assert!(!HttpResponse::new(401, "").is_success());
	}
}
