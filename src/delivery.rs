//! Authenticated webhook delivery with a bounded refresh-and-retry cycle on 401.
//!
//! [`DeliveryClient::deliver`] asks the issuer for a token, POSTs the JSON payload, and
//! classifies the response. A `401` triggers one forced refresh followed by an immediate
//! resend, up to `max_retries` times. Every other outcome, including transport failures,
//! is returned as a [`DeliveryResult`] value; only token acquisition failures are raised.

mod metrics;

pub use metrics::DeliveryMetrics;

// self
use crate::{
	_prelude::*,
	http::{HttpResponse, HttpTransport, JsonRequest},
	issuer::TokenIssuer,
	obs::{self, Operation, OperationSpan, Outcome},
};

/// Default number of 401-triggered retries.
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Reason a delivery did not succeed.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum DeliveryFailure {
	/// Endpoint answered with a non-`2xx` status (or kept answering 401).
	#[error("HTTP {status}: {body}")]
	Http {
		/// HTTP status code.
		status: u16,
		/// Response body.
		body: String,
	},
	/// No response was received.
	#[error("Network Error: {detail}")]
	Network {
		/// Transport-provided description of the failure.
		detail: String,
	},
}

/// Terminal outcome of one [`DeliveryClient::deliver`] call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeliveryResult {
	/// `true` iff the final response was `2xx`.
	pub success: bool,
	/// Status of the final response, when one was received.
	pub status_code: Option<u16>,
	/// Body of the final response, when one was received.
	pub body: Option<String>,
	/// Failure description for unsuccessful deliveries.
	pub error: Option<DeliveryFailure>,
	/// Number of HTTP sends performed (`1 ..= max_retries + 1`).
	pub attempts: u32,
}
impl DeliveryResult {
	fn delivered(response: HttpResponse, attempts: u32) -> Self {
		Self {
			success: true,
			status_code: Some(response.status),
			body: Some(response.body),
			error: None,
			attempts,
		}
	}

	fn rejected(response: HttpResponse, attempts: u32) -> Self {
		let error = DeliveryFailure::Http { status: response.status, body: response.body.clone() };

		Self {
			success: false,
			status_code: Some(response.status),
			body: Some(response.body),
			error: Some(error),
			attempts,
		}
	}

	fn network(detail: impl Display, attempts: u32) -> Self {
		Self {
			success: false,
			status_code: None,
			body: None,
			error: Some(DeliveryFailure::Network { detail: detail.to_string() }),
			attempts,
		}
	}

	/// Human-readable failure message, if the delivery failed.
	pub fn error_message(&self) -> Option<String> {
		self.error.as_ref().map(ToString::to_string)
	}
}

/// Sends JSON payloads with bearer tokens obtained from a shared [`TokenIssuer`].
pub struct DeliveryClient<C>
where
	C: ?Sized + HttpTransport,
{
	issuer: Arc<TokenIssuer<C>>,
	http_client: Arc<C>,
	max_retries: u32,
	metrics: Arc<DeliveryMetrics>,
}
impl<C> DeliveryClient<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a client that shares the issuer's transport.
	pub fn new(issuer: Arc<TokenIssuer<C>>) -> Self {
		let http_client = issuer.http_client().clone();

		Self { issuer, http_client, max_retries: DEFAULT_MAX_RETRIES, metrics: Default::default() }
	}

	/// Overrides the number of 401-triggered retries (defaults to two).
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self
	}

	/// Retry bound in effect.
	pub fn max_retries(&self) -> u32 {
		self.max_retries
	}

	/// Issuer used for token acquisition.
	pub fn issuer(&self) -> &Arc<TokenIssuer<C>> {
		&self.issuer
	}

	/// Delivery counters.
	pub fn metrics(&self) -> &DeliveryMetrics {
		&self.metrics
	}

	/// POSTs `payload` to `url` under a bearer token.
	///
	/// Returns `Err` only when a token cannot be acquired (initially or during a forced
	/// refresh) or the payload cannot be encoded. HTTP and transport outcomes are reported
	/// through the returned [`DeliveryResult`]. Retries are immediate and bounded by
	/// `max_retries`, each preceded by exactly one forced refresh.
	pub async fn deliver<P>(&self, payload: &P, url: &Url) -> Result<DeliveryResult>
	where
		P: ?Sized + Serialize,
	{
		const OPERATION: Operation = Operation::Deliver;

		let span = OperationSpan::new(OPERATION, "deliver");

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let body =
					serde_json::to_vec(payload).map_err(|source| Error::Payload { source })?;
				let mut attempt = 0;

				loop {
					let token = self.issuer.acquire(false).await?;
					let request = JsonRequest::new(url.clone(), body.clone()).with_bearer(token);

					self.metrics.record_send();

					let response = match self.http_client.post_json(request).await {
						Ok(response) => response,
						Err(e) => {
							obs::event!(warn, url = %url, error = %e, "Delivery transport failed.");

							return Ok(DeliveryResult::network(e, attempt + 1));
						},
					};

					obs::event!(debug, url = %url, status = response.status, "Delivery response received.");

					if response.is_success() {
						return Ok(DeliveryResult::delivered(response, attempt + 1));
					}
					if response.status == 401 && attempt < self.max_retries {
						attempt += 1;

						obs::event!(
							info,
							attempt,
							max_retries = self.max_retries,
							"Delivery rejected with 401; refreshing token and retrying."
						);
						self.metrics.record_auth_retry();
						self.issuer.acquire(true).await?;

						continue;
					}

					return Ok(DeliveryResult::rejected(response, attempt + 1));
				}
			})
			.await;

		match &result {
			Ok(outcome) if outcome.success => {
				self.metrics.record_success();
				obs::record_outcome(OPERATION, Outcome::Success);
			},
			_ => {
				self.metrics.record_failure();
				obs::record_outcome(OPERATION, Outcome::Failure);
			},
		}

		result
	}
}
impl<C> Debug for DeliveryClient<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("DeliveryClient")
			.field("issuer", &self.issuer)
			.field("max_retries", &self.max_retries)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn failure_messages_match_wire_format() {
		let http = DeliveryFailure::Http { status: 500, body: "boom".into() };
		let network = DeliveryFailure::Network { detail: "connection refused".into() };

		assert_eq!(http.to_string(), "HTTP 500: boom");
		assert_eq!(network.to_string(), "Network Error: connection refused");
	}

	#[test]
	fn result_constructors_fill_optional_fields() {
		let ok = DeliveryResult::delivered(HttpResponse::new(201, "created"), 1);

		assert!(ok.success);
		assert_eq!(ok.status_code, Some(201));
		assert_eq!(ok.error_message(), None);

		let rejected = DeliveryResult::rejected(HttpResponse::new(401, "expired"), 3);

		assert!(!rejected.success);
		assert_eq!(rejected.body.as_deref(), Some("expired"));
		assert_eq!(rejected.error_message().as_deref(), Some("HTTP 401: expired"));

		let network = DeliveryResult::network("timed out", 1);

		assert_eq!(network.status_code, None);
		assert_eq!(network.error_message().as_deref(), Some("Network Error: timed out"));
	}
}
