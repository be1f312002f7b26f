//! Event handlers that wire configuration, token issuance, delivery, and logging together.
//!
//! [`Relay`] is what a form host calls into. Handlers never panic and never return raw errors
//! for delivery problems: every outcome is written to the configured [`LogSink`] and reported
//! back as a value.

// self
use crate::{
	_prelude::*,
	adapter::{self, EventAdapter, FieldAliases, FormSubmission},
	clock::Clock,
	config::RelayConfig,
	delivery::{DEFAULT_MAX_RETRIES, DeliveryClient, DeliveryResult},
	http::HttpTransport,
	issuer::TokenIssuer,
	log::{LogEntry, LogSink},
	obs::{self, Operation, OperationSpan, Outcome},
	store::TokenStore,
	token::{DEFAULT_BUFFER, TokenSecret, TokenStatus},
};
#[cfg(feature = "reqwest")] use crate::{clock::SystemClock, http::ReqwestHttpClient};

const TOKEN_PREVIEW_CHARS: usize = 20;
const UNKNOWN_ERROR: &str = "Unknown error";

#[cfg(feature = "reqwest")]
/// Relay specialized for the crate's default reqwest transport.
pub type ReqwestRelay = Relay<ReqwestHttpClient>;

/// Result of a handler that performs a delivery.
#[derive(Debug)]
pub enum SubmissionOutcome {
	/// The endpoint accepted the payload.
	Delivered(DeliveryResult),
	/// The endpoint answered but did not accept the payload, or could not be reached.
	Rejected(DeliveryResult),
	/// No delivery was attempted to completion because a token could not be obtained.
	Aborted(Error),
}
impl SubmissionOutcome {
	/// Returns `true` for [`SubmissionOutcome::Delivered`].
	pub fn is_delivered(&self) -> bool {
		matches!(self, Self::Delivered(_))
	}

	/// Delivery result, when a delivery ran to completion.
	pub fn delivery(&self) -> Option<&DeliveryResult> {
		match self {
			Self::Delivered(result) | Self::Rejected(result) => Some(result),
			Self::Aborted(_) => None,
		}
	}

	/// Human-readable failure description, if any.
	pub fn error_message(&self) -> Option<String> {
		match self {
			Self::Delivered(_) => None,
			Self::Rejected(result) =>
				Some(result.error_message().unwrap_or_else(|| UNKNOWN_ERROR.into())),
			Self::Aborted(e) => Some(e.to_string()),
		}
	}
}

/// Step executed by [`Relay::run_diagnostics`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DiagnosticStage {
	/// Forced token exchange.
	TokenExchange,
	/// Authenticated call to the test endpoint.
	Connection,
}
impl DiagnosticStage {
	/// Returns a stable label suitable for display.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::TokenExchange => "token_exchange",
			Self::Connection => "connection",
		}
	}
}
impl Display for DiagnosticStage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome of one diagnostic step.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiagnosticStep {
	/// Step that ran.
	pub stage: DiagnosticStage,
	/// Whether the step passed.
	pub success: bool,
	/// Failure description for failed steps.
	pub detail: Option<String>,
}

/// Report produced by [`Relay::run_diagnostics`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Diagnostics {
	/// Steps in execution order; stops after the first failure.
	pub steps: Vec<DiagnosticStep>,
	/// `true` when every step ran and passed.
	pub success: bool,
}

/// Operator-facing summary of the cached token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TokenInfo {
	/// First characters of the token.
	pub preview: String,
	/// Expiry instant.
	pub expires_at: OffsetDateTime,
	/// Status at the time of the query (no buffer applied).
	pub status: TokenStatus,
	/// Whole minutes left before expiry; `None` once expired.
	pub remaining_minutes: Option<i64>,
}

/// Form-submission relay bound to one configuration.
pub struct Relay<C>
where
	C: ?Sized + HttpTransport,
{
	config: RelayConfig,
	store: Arc<dyn TokenStore>,
	clock: Arc<dyn Clock>,
	http_client: Arc<C>,
	sink: Arc<dyn LogSink>,
	adapter: EventAdapter,
	buffer: Duration,
	max_retries: u32,
	client: DeliveryClient<C>,
}
impl<C> Relay<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a relay that reuses the caller-provided transport.
	pub fn with_http_client(
		config: RelayConfig,
		store: Arc<dyn TokenStore>,
		clock: Arc<dyn Clock>,
		sink: Arc<dyn LogSink>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		let http_client = http_client.into();
		let adapter = EventAdapter::new(config.form_id().map(Into::into));
		let client = Self::build_client(
			&config,
			&store,
			&clock,
			&http_client,
			DEFAULT_BUFFER,
			DEFAULT_MAX_RETRIES,
		);

		Self {
			config,
			store,
			clock,
			http_client,
			sink,
			adapter,
			buffer: DEFAULT_BUFFER,
			max_retries: DEFAULT_MAX_RETRIES,
			client,
		}
	}

	/// Replaces the question-title aliases used to lift applicant fields.
	pub fn with_aliases(mut self, aliases: FieldAliases) -> Self {
		self.adapter = self.adapter.with_aliases(aliases);

		self
	}

	/// Overrides the number of 401-triggered retries.
	pub fn with_max_retries(mut self, max_retries: u32) -> Self {
		self.max_retries = max_retries;

		self.rebuild()
	}

	/// Overrides the token expiry buffer.
	pub fn with_buffer(mut self, buffer: Duration) -> Self {
		self.buffer = buffer;

		self.rebuild()
	}

	/// Configuration in effect.
	pub fn config(&self) -> &RelayConfig {
		&self.config
	}

	/// Issuer backing the delivery client.
	pub fn issuer(&self) -> &Arc<TokenIssuer<C>> {
		self.client.issuer()
	}

	/// Delivery client used by the handlers.
	pub fn delivery_client(&self) -> &DeliveryClient<C> {
		&self.client
	}

	/// Adapter used by [`Relay::on_form_submit`].
	pub fn adapter(&self) -> &EventAdapter {
		&self.adapter
	}

	/// Adapts `submission`, delivers it to the configured endpoint, and logs the outcome.
	pub async fn on_form_submit(&self, submission: &FormSubmission) -> SubmissionOutcome {
		const OPERATION: Operation = Operation::FormSubmit;
		const LOG_OPERATION: &str = "on_form_submit";

		let span = OperationSpan::new(OPERATION, LOG_OPERATION);

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let outcome = span
			.instrument(async move {
				let payload = self.adapter.adapt(submission, self.clock.now());

				obs::event!(
					info,
					form_response_id = %payload.form_response_id,
					answers = payload.form_data_order.len(),
					"Relaying form submission."
				);

				let delivery = self.client.deliver(&payload, self.config.delivery_url()).await;
				let message =
					format!("Applicant: {} ({})", payload.applicant_name, payload.applicant_email);

				self.settle(LOG_OPERATION, delivery, message)
			})
			.await;

		Self::observe(OPERATION, &outcome);

		outcome
	}

	/// Sends the connection-check payload to the test endpoint and logs the outcome.
	pub async fn check_connection(&self) -> SubmissionOutcome {
		const OPERATION: Operation = Operation::ConnectionCheck;
		const LOG_OPERATION: &str = "check_connection";

		let span = OperationSpan::new(OPERATION, LOG_OPERATION);

		obs::record_outcome(OPERATION, Outcome::Attempt);

		let outcome = span
			.instrument(async move {
				let payload =
					adapter::connection_test_payload(self.config.form_id(), self.clock.now());
				let delivery = self.client.deliver(&payload, self.config.test_url()).await;

				self.settle(LOG_OPERATION, delivery, "Connection test succeeded.".into())
			})
			.await;

		Self::observe(OPERATION, &outcome);

		outcome
	}

	/// Forces a token exchange and logs the outcome.
	pub async fn verify_token_exchange(&self) -> Result<TokenSecret> {
		const LOG_OPERATION: &str = "verify_token_exchange";

		match self.issuer().refresh().await {
			Ok(token) => {
				self.sink.record(LogEntry::success(
					self.clock.now(),
					LOG_OPERATION,
					"Token exchange succeeded.",
				));

				Ok(token)
			},
			Err(e) => {
				self.sink.record(LogEntry::failure(self.clock.now(), LOG_OPERATION, &e));

				Err(e)
			},
		}
	}

	/// Runs the token exchange and then the connection check, stopping at the first failure.
	pub async fn run_diagnostics(&self) -> Diagnostics {
		let mut steps = Vec::with_capacity(2);

		if let Err(e) = self.verify_token_exchange().await {
			steps.push(DiagnosticStep {
				stage: DiagnosticStage::TokenExchange,
				success: false,
				detail: Some(e.to_string()),
			});

			return Diagnostics { steps, success: false };
		}

		steps.push(DiagnosticStep {
			stage: DiagnosticStage::TokenExchange,
			success: true,
			detail: None,
		});

		let connection = self.check_connection().await;
		let success = connection.is_delivered();

		steps.push(DiagnosticStep {
			stage: DiagnosticStage::Connection,
			success,
			detail: connection.error_message(),
		});

		Diagnostics { steps, success }
	}

	/// Summarizes the cached token, if one is stored.
	pub async fn token_info(&self) -> Result<Option<TokenInfo>> {
		let Some(record) = self.issuer().current().await? else {
			return Ok(None);
		};
		let now = self.clock.now();
		let status = record.status_at(now);
		let remaining_minutes = match status {
			TokenStatus::Active => Some(record.remaining_at(now).whole_minutes()),
			TokenStatus::Expired => None,
		};

		Ok(Some(TokenInfo {
			preview: record.value.preview(TOKEN_PREVIEW_CHARS),
			expires_at: record.expires_at(),
			status,
			remaining_minutes,
		}))
	}

	/// Drops the cached token so the next delivery performs a fresh exchange.
	pub async fn clear_token(&self) -> Result<()> {
		const LOG_OPERATION: &str = "clear_token";

		match self.issuer().invalidate().await {
			Ok(()) => {
				self.sink.record(LogEntry::success(
					self.clock.now(),
					LOG_OPERATION,
					"Cached token cleared.",
				));

				Ok(())
			},
			Err(e) => {
				self.sink.record(LogEntry::failure(self.clock.now(), LOG_OPERATION, &e));

				Err(e)
			},
		}
	}

	/// Switches to `config`, clearing the cached token when the credential or exchange changed.
	pub async fn reconfigure(&mut self, config: RelayConfig) -> Result<()> {
		const LOG_OPERATION: &str = "reconfigure";

		let identity_changed = self.config.changes_token_identity(&config);

		if identity_changed
			&& let Err(e) = <dyn TokenStore>::clear(self.store.as_ref()).await
		{
			let e = Error::from(e);

			self.sink.record(LogEntry::failure(self.clock.now(), LOG_OPERATION, &e));

			return Err(e);
		}

		self.adapter = EventAdapter::new(config.form_id().map(Into::into))
			.with_aliases(self.adapter.aliases().clone());
		self.config = config;
		self.client = Self::build_client(
			&self.config,
			&self.store,
			&self.clock,
			&self.http_client,
			self.buffer,
			self.max_retries,
		);

		let message = if identity_changed {
			"Configuration updated; cached token cleared."
		} else {
			"Configuration updated."
		};

		obs::event!(info, identity_changed, "Relay reconfigured.");
		self.sink.record(LogEntry::success(self.clock.now(), LOG_OPERATION, message));

		Ok(())
	}

	fn rebuild(mut self) -> Self {
		self.client = Self::build_client(
			&self.config,
			&self.store,
			&self.clock,
			&self.http_client,
			self.buffer,
			self.max_retries,
		);

		self
	}

	fn build_client(
		config: &RelayConfig,
		store: &Arc<dyn TokenStore>,
		clock: &Arc<dyn Clock>,
		http_client: &Arc<C>,
		buffer: Duration,
		max_retries: u32,
	) -> DeliveryClient<C> {
		let issuer = TokenIssuer::with_http_client(
			store.clone(),
			clock.clone(),
			config.credential(),
			config.token_exchange_url().clone(),
			http_client.clone(),
		)
		.with_buffer(buffer);

		DeliveryClient::new(Arc::new(issuer)).with_max_retries(max_retries)
	}

	fn settle(
		&self,
		operation: &'static str,
		delivery: Result<DeliveryResult>,
		success_message: String,
	) -> SubmissionOutcome {
		let now = self.clock.now();

		match delivery {
			Ok(result) if result.success => {
				self.sink.record(LogEntry::success(now, operation, success_message));

				SubmissionOutcome::Delivered(result)
			},
			Ok(result) => {
				let message = result.error_message().unwrap_or_else(|| UNKNOWN_ERROR.into());

				self.sink.record(LogEntry::error(now, operation, message));

				SubmissionOutcome::Rejected(result)
			},
			Err(e) => {
				self.sink.record(LogEntry::failure(now, operation, &e));

				SubmissionOutcome::Aborted(e)
			},
		}
	}

	fn observe(operation: Operation, outcome: &SubmissionOutcome) {
		let label = if outcome.is_delivered() { Outcome::Success } else { Outcome::Failure };

		obs::record_outcome(operation, label);

		if let Some(_message) = outcome.error_message() {
			obs::event!(warn, operation = %operation, error = %_message, "Relay handler failed.");
		}
	}
}
#[cfg(feature = "reqwest")]
impl Relay<ReqwestHttpClient> {
	/// Creates a relay with its own reqwest transport and the system clock.
	pub fn new(config: RelayConfig, store: Arc<dyn TokenStore>, sink: Arc<dyn LogSink>) -> Self {
		Self::with_http_client(
			config,
			store,
			Arc::new(SystemClock),
			sink,
			ReqwestHttpClient::default(),
		)
	}
}
impl<C> Debug for Relay<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Relay")
			.field("config", &self.config)
			.field("buffer", &self.buffer)
			.field("max_retries", &self.max_retries)
			.finish()
	}
}
