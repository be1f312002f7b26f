//! Token acquisition with a store-backed cache and on-demand refresh.
//!
//! [`TokenIssuer::acquire`] returns the cached bearer token while it stays usable
//! (`now < expires_at - buffer`) and otherwise exchanges the configured credential for a
//! fresh one. The store is only written after a successful exchange, so a failed refresh
//! never destroys a previously cached token.
//!
//! The check-then-persist sequence is not atomic. When several callers share an issuer,
//! two of them may both decide to refresh; each exchange is independent and the later
//! write simply wins. The relay handles events one at a time, so this race is tolerated
//! rather than guarded.

mod metrics;
mod response;

pub use metrics::IssuerMetrics;

// self
use crate::{
	_prelude::*,
	clock::Clock,
	http::{HttpTransport, JsonRequest},
	obs::{self, Operation, OperationSpan, Outcome},
	store::TokenStore,
	token::{Credential, DEFAULT_BUFFER, TokenRecord, TokenSecret},
};
#[cfg(feature = "reqwest")] use crate::{clock::SystemClock, http::ReqwestHttpClient};

#[cfg(feature = "reqwest")]
/// Issuer specialized for the crate's default reqwest transport.
pub type ReqwestTokenIssuer = TokenIssuer<ReqwestHttpClient>;

/// Exchanges a static credential for short-lived bearer tokens and caches them.
pub struct TokenIssuer<C>
where
	C: ?Sized + HttpTransport,
{
	http_client: Arc<C>,
	store: Arc<dyn TokenStore>,
	clock: Arc<dyn Clock>,
	credential: Credential,
	exchange_url: Url,
	buffer: Duration,
	metrics: Arc<IssuerMetrics>,
}
impl<C> TokenIssuer<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates an issuer that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn TokenStore>,
		clock: Arc<dyn Clock>,
		credential: Credential,
		exchange_url: Url,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			clock,
			credential,
			exchange_url,
			buffer: DEFAULT_BUFFER,
			metrics: Default::default(),
		}
	}

	/// Overrides the safety buffer subtracted from expiry (defaults to five minutes).
	pub fn with_buffer(mut self, buffer: Duration) -> Self {
		self.buffer = if buffer.is_negative() { Duration::ZERO } else { buffer };

		self
	}

	/// Safety buffer in effect.
	pub fn buffer(&self) -> Duration {
		self.buffer
	}

	/// Exchange endpoint this issuer calls.
	pub fn exchange_url(&self) -> &Url {
		&self.exchange_url
	}

	/// Transport shared with callers that need to send authenticated requests.
	pub fn http_client(&self) -> &Arc<C> {
		&self.http_client
	}

	/// Clock used for expiry decisions.
	pub fn clock(&self) -> &Arc<dyn Clock> {
		&self.clock
	}

	/// Acquisition counters.
	pub fn metrics(&self) -> &IssuerMetrics {
		&self.metrics
	}

	/// Returns a usable bearer token, exchanging the credential when needed.
	///
	/// With `force_refresh == false` a usable stored record is returned without any network
	/// call. Otherwise the exchange is called exactly once; non-200 responses surface as
	/// [`Error::Issuance`] and unparseable 200 responses as [`Error::MalformedResponse`].
	pub async fn acquire(&self, force_refresh: bool) -> Result<TokenSecret> {
		const OPERATION: Operation = Operation::AcquireToken;

		let span = OperationSpan::new(OPERATION, "acquire");

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let result = span
			.instrument(async move {
				let now = self.clock.now();

				if !force_refresh {
					let cached = <dyn TokenStore>::load(self.store.as_ref())
						.await?
						.filter(|record| record.is_usable_at(now, self.buffer));

					if let Some(current) = cached {
						self.metrics.record_cache_hit();
						obs::event!(
							debug,
							expires_at_epoch_ms = current.expires_at_epoch_ms,
							"Reusing cached token."
						);

						return Ok(current.value);
					}
				}

				obs::event!(info, force_refresh, "Exchanging credential for a new token.");

				let record = self.exchange(now).await?;

				<dyn TokenStore>::save(self.store.as_ref(), record.clone()).await?;
				obs::event!(
					info,
					expires_at_epoch_ms = record.expires_at_epoch_ms,
					"Issued new token."
				);

				Ok(record.value)
			})
			.await;

		match &result {
			Ok(_) => obs::record_outcome(OPERATION, Outcome::Success),
			Err(_e) => {
				self.metrics.record_failure();
				obs::record_outcome(OPERATION, Outcome::Failure);
				obs::event!(error, error = %_e, "Token acquisition failed.");
			},
		}

		result
	}

	/// Forces a new exchange regardless of cache state.
	pub async fn refresh(&self) -> Result<TokenSecret> {
		self.acquire(true).await
	}

	/// Returns the stored record without judging its usability.
	pub async fn current(&self) -> Result<Option<TokenRecord>> {
		Ok(<dyn TokenStore>::load(self.store.as_ref()).await?)
	}

	/// Drops the stored record so the next acquisition performs an exchange.
	pub async fn invalidate(&self) -> Result<()> {
		<dyn TokenStore>::clear(self.store.as_ref()).await?;
		obs::event!(info, "Cleared cached token.");

		Ok(())
	}

	async fn exchange(&self, now: OffsetDateTime) -> Result<TokenRecord> {
		let body = serde_json::to_vec(&self.credential.exchange_request())
			.map_err(|source| Error::Payload { source })?;
		let request = JsonRequest::new(self.exchange_url.clone(), body);

		self.metrics.record_exchange();

		let response = self.http_client.post_json(request).await?;

		if response.status != 200 {
			return Err(Error::Issuance { status: response.status, body: response.body });
		}

		let issued = response::parse_exchange_body(&response.body)?;

		Ok(TokenRecord::issued(issued.access_token, now, issued.expires_in))
	}
}
#[cfg(feature = "reqwest")]
impl TokenIssuer<ReqwestHttpClient> {
	/// Creates an issuer with its own reqwest transport and the system clock.
	pub fn new(store: Arc<dyn TokenStore>, credential: Credential, exchange_url: Url) -> Self {
		Self::with_http_client(
			store,
			Arc::new(SystemClock),
			credential,
			exchange_url,
			ReqwestHttpClient::default(),
		)
	}
}
impl<C> Debug for TokenIssuer<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenIssuer")
			.field("exchange_url", &self.exchange_url.as_str())
			.field("credential", &self.credential)
			.field("buffer", &self.buffer)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		clock::ManualClock,
		error::MalformedResponseError,
		http::{HttpFuture, HttpResponse},
		store::MemoryStore,
	};

	struct CannedTransport {
		response: HttpResponse,
		calls: Mutex<Vec<JsonRequest>>,
	}
	impl CannedTransport {
		fn new(status: u16, body: &str) -> Self {
			Self { response: HttpResponse::new(status, body), calls: Default::default() }
		}
	}
	impl HttpTransport for CannedTransport {
		fn post_json(&self, request: JsonRequest) -> HttpFuture<'_> {
			self.calls.lock().push(request);

			let response = self.response.clone();

			Box::pin(async move { Ok(response) })
		}
	}

	fn issuer(
		transport: CannedTransport,
	) -> (TokenIssuer<CannedTransport>, Arc<MemoryStore>, Arc<ManualClock>, Arc<CannedTransport>) {
		let store = Arc::new(MemoryStore::default());
		let clock = Arc::new(ManualClock::at_epoch());
		let transport = Arc::new(transport);
		let issuer = TokenIssuer::with_http_client(
			store.clone(),
			clock.clone(),
			Credential::webhook("unit-key"),
			Url::parse("https://relay.example.com/token/exchange").expect("URL should parse."),
			transport.clone(),
		);

		(issuer, store, clock, transport)
	}

	#[tokio::test]
	async fn exchange_posts_credential_and_caches_result() {
		let (issuer, store, clock, transport) =
			issuer(CannedTransport::new(200, r#"{"accessToken":"abc","expiresIn":3600}"#));
		let token = issuer.acquire(false).await.expect("Initial acquisition should succeed.");

		assert_eq!(token.expose(), "abc");

		clock.advance(Duration::minutes(50));

		let again = issuer.acquire(false).await.expect("Cached acquisition should succeed.");

		assert_eq!(again.expose(), "abc");
		assert_eq!(transport.calls.lock().len(), 1);
		assert_eq!(issuer.metrics().cache_hits(), 1);

		let sent = transport.calls.lock()[0].clone();
		let body: serde_json::Value =
			serde_json::from_slice(&sent.body).expect("Exchange body should be JSON.");

		assert_eq!(body, serde_json::json!({ "apiKey": "unit-key", "purpose": "webhook" }));
		assert!(sent.bearer.is_none());
		assert_eq!(
			store.snapshot().expect("Record should be stored.").expires_at_epoch_ms,
			3_600_000
		);
	}

	#[tokio::test]
	async fn malformed_body_leaves_store_untouched() {
		let (issuer, store, _clock, _transport) =
			issuer(CannedTransport::new(200, r#"{"expiresIn":3600}"#));
		let previous = TokenRecord::issued("stale", OffsetDateTime::UNIX_EPOCH, 1);

		store.save(previous.clone()).await.expect("Seeding the store should succeed.");

		let err = issuer.acquire(false).await.expect_err("Missing token should fail.");

		assert!(matches!(err, Error::MalformedResponse(MalformedResponseError::MissingAccessToken)));
		assert_eq!(store.snapshot(), Some(previous));
		assert_eq!(issuer.metrics().failures(), 1);
	}

	#[tokio::test]
	async fn buffer_override_changes_reuse_window() {
		let (issuer, _store, clock, transport) =
			issuer(CannedTransport::new(200, r#"{"accessToken":"abc","expiresIn":600}"#));
		let issuer = issuer.with_buffer(Duration::ZERO);

		issuer.acquire(false).await.expect("Initial acquisition should succeed.");
		clock.advance(Duration::seconds(599));
		issuer.acquire(false).await.expect("Acquisition inside lifetime should succeed.");

		assert_eq!(transport.calls.lock().len(), 1);

		clock.advance(Duration::seconds(1));
		issuer.acquire(false).await.expect("Acquisition at expiry should succeed.");

		assert_eq!(transport.calls.lock().len(), 2);
	}

	#[tokio::test]
	async fn zero_lifetime_token_is_never_reused() {
		let (issuer, store, _clock, transport) =
			issuer(CannedTransport::new(200, r#"{"accessToken":"once","expiresIn":0}"#));

		issuer.acquire(false).await.expect("Zero-lifetime token should be returned.");
		issuer.acquire(false).await.expect("Second acquisition should succeed.");

		assert_eq!(transport.calls.lock().len(), 2);
		assert_eq!(store.snapshot().expect("Record should be stored.").expires_at_epoch_ms, 0);
	}

	#[tokio::test]
	async fn invalidate_forces_next_exchange() {
		let (issuer, store, _clock, transport) =
			issuer(CannedTransport::new(200, r#"{"accessToken":"abc","expiresIn":3600}"#));

		issuer.acquire(false).await.expect("Initial acquisition should succeed.");
		issuer.invalidate().await.expect("Invalidation should succeed.");

		assert!(store.snapshot().is_none());
		assert!(issuer.current().await.expect("Current should succeed.").is_none());

		issuer.acquire(false).await.expect("Acquisition after invalidation should succeed.");

		assert_eq!(transport.calls.lock().len(), 2);
	}
}
