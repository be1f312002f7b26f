//! Demonstrates relaying form submissions through a mock webhook. The first submission is
//! rejected with 401 on every attempt and fails once its retries run out; after the mock is
//! replaced with one that accepts the bearer token, the second submission is delivered.

// std
use std::sync::Arc;
// crates.io
use color_eyre::{Result, eyre::eyre};
use httpmock::prelude::*;
use time::OffsetDateTime;
// self
use form_relay::{
	adapter::{FormSubmission, ItemResponse},
	clock::SystemClock,
	config::RelayConfig,
	http::ReqwestHttpClient,
	log::{LogSink, MemoryLogSink},
	relay::Relay,
	store::{MemoryStore, TokenStore},
};

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let exchange_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/admin/token/exchange");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"success":true,"data":{"accessToken":"demo-jwt","expiresIn":3600}}"#);
		})
		.await;
	let mut rejection = server
		.mock_async(|when, then| {
			when.method(POST).path("/api/webhook/applications/receive");
			then.status(401).body("token expired");
		})
		.await;
	let config = RelayConfig::from_json_slice(
		serde_json::json!({
			"apiKey": "demo-api-key",
			"jwtExchangeUrl": server.url("/api/admin/token/exchange"),
			"deliveryUrl": server.url("/api/webhook/applications/receive"),
			"formId": "demo-form"
		})
		.to_string()
		.as_bytes(),
	)?;
	let store: Arc<dyn TokenStore> = Arc::new(MemoryStore::default());
	let sink = MemoryLogSink::default();
	let relay = <Relay<ReqwestHttpClient>>::with_http_client(
		config,
		store,
		Arc::new(SystemClock),
		Arc::new(sink.clone()) as Arc<dyn LogSink>,
		ReqwestHttpClient::default(),
	)
	.with_max_retries(1);
	let submission = FormSubmission {
		items: vec![
			ItemResponse::new("이름", "Demo Applicant"),
			ItemResponse::new("이메일 주소", "demo@example.com"),
			ItemResponse::new("학년", "2"),
		],
		timestamp: OffsetDateTime::now_utc(),
		respondent_email: None,
	};
	let rejected = relay.on_form_submit(&submission).await;

	println!("First attempt: {:?}.", rejected.error_message());

	rejection.delete_async().await;

	let accept_mock = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/api/webhook/applications/receive")
				.header("authorization", "Bearer demo-jwt");
			then.status(201).body(r#"{"success":true}"#);
		})
		.await;
	let delivered = relay.on_form_submit(&submission).await;
	let result = delivered.delivery().ok_or_else(|| eyre!("Delivery did not run."))?;

	println!("Second attempt delivered after {} send(s).", result.attempts);

	for entry in sink.entries() {
		println!("{} {} {} {}", entry.timestamp, entry.status, entry.operation, entry.message);
	}

	exchange_mock.assert_calls_async(2).await;
	accept_mock.assert_calls_async(1).await;

	Ok(())
}
