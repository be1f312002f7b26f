// crates.io
use httpmock::prelude::*;
use serde_json::json;
// self
use form_relay::{
	_preludet::*,
	delivery::{DeliveryClient, DeliveryFailure},
	http::ReqwestHttpClient,
};

const API_KEY: &str = "relay-key";

async fn mock_exchange(server: &MockServer) -> httpmock::Mock<'_> {
	server
		.mock_async(|when, then| {
			when.method(POST).path("/token/exchange");
			then.status(200)
				.header("content-type", "application/json")
				.body(r#"{"accessToken":"jwt-1","expiresIn":3600}"#);
		})
		.await
}

fn build_client(server: &MockServer) -> DeliveryClient<ReqwestHttpClient> {
	let exchange_url =
		Url::parse(&server.url("/token/exchange")).expect("Mock exchange endpoint should parse.");
	let (issuer, _store, _clock) = build_reqwest_test_issuer(exchange_url, API_KEY);

	DeliveryClient::new(Arc::new(issuer))
}

fn receive_url(server: &MockServer) -> Url {
	Url::parse(&server.url("/receive")).expect("Mock delivery endpoint should parse.")
}

#[tokio::test]
async fn success_returns_immediately_with_bearer() {
	let server = MockServer::start_async().await;
	let exchange = mock_exchange(&server).await;
	let receive = server
		.mock_async(|when, then| {
			when.method(POST)
				.path("/receive")
				.header("authorization", "Bearer jwt-1")
				.json_body(json!({ "applicantName": "Kim" }));
			then.status(201).body(r#"{"id":1}"#);
		})
		.await;
	let client = build_client(&server);
	let result = client
		.deliver(&json!({ "applicantName": "Kim" }), &receive_url(&server))
		.await
		.expect("Delivery should not raise.");

	assert!(result.success);
	assert_eq!(result.status_code, Some(201));
	assert_eq!(result.body.as_deref(), Some(r#"{"id":1}"#));
	assert_eq!(result.attempts, 1);
	assert!(result.error.is_none());

	exchange.assert_calls_async(1).await;
	receive.assert_calls_async(1).await;

	assert_eq!(client.metrics().successes(), 1);
	assert_eq!(client.metrics().auth_retries(), 0);
}

#[tokio::test]
async fn persistent_401_exhausts_retries() {
	let server = MockServer::start_async().await;
	let exchange = mock_exchange(&server).await;
	let receive = server
		.mock_async(|when, then| {
			when.method(POST).path("/receive");
			then.status(401).body("token rejected");
		})
		.await;
	let client = build_client(&server);
	let result = client
		.deliver(&json!({}), &receive_url(&server))
		.await
		.expect("Delivery should not raise.");

	assert!(!result.success);
	assert_eq!(result.status_code, Some(401));
	assert_eq!(result.attempts, 3);
	assert_eq!(
		result.error,
		Some(DeliveryFailure::Http { status: 401, body: "token rejected".into() })
	);

	receive.assert_calls_async(3).await;
	exchange.assert_calls_async(3).await;

	assert_eq!(client.metrics().auth_retries(), 2);
	assert_eq!(client.metrics().failures(), 1);
}

#[tokio::test]
async fn server_error_is_not_retried() {
	let server = MockServer::start_async().await;
	let exchange = mock_exchange(&server).await;
	let receive = server
		.mock_async(|when, then| {
			when.method(POST).path("/receive");
			then.status(500).body("boom");
		})
		.await;
	let client = build_client(&server);
	let result = client
		.deliver(&json!({}), &receive_url(&server))
		.await
		.expect("Delivery should not raise.");

	assert!(!result.success);
	assert_eq!(result.attempts, 1);
	assert_eq!(result.error_message().as_deref(), Some("HTTP 500: boom"));

	receive.assert_calls_async(1).await;
	exchange.assert_calls_async(1).await;
}

#[tokio::test]
async fn unreachable_endpoint_reports_network_failure() {
	let server = MockServer::start_async().await;
	let exchange = mock_exchange(&server).await;
	let client = build_client(&server);
	let unreachable = Url::parse("http://127.0.0.1:1/receive").expect("URL should parse.");
	let result =
		client.deliver(&json!({}), &unreachable).await.expect("Delivery should not raise.");

	assert!(!result.success);
	assert_eq!(result.status_code, None);
	assert_eq!(result.body, None);
	assert_eq!(result.attempts, 1);
	assert!(matches!(result.error, Some(DeliveryFailure::Network { .. })));
	assert!(
		result
			.error_message()
			.expect("Network failure should carry a message.")
			.starts_with("Network Error: ")
	);

	exchange.assert_calls_async(1).await;
}

#[tokio::test]
async fn exchange_failure_raises_before_any_send() {
	let server = MockServer::start_async().await;
	let exchange = server
		.mock_async(|when, then| {
			when.method(POST).path("/token/exchange");
			then.status(403).body("forbidden");
		})
		.await;
	let receive = server
		.mock_async(|when, then| {
			when.method(POST).path("/receive");
			then.status(200);
		})
		.await;
	let client = build_client(&server);
	let err = client
		.deliver(&json!({}), &receive_url(&server))
		.await
		.expect_err("Token acquisition failure should raise.");

	assert!(matches!(err, Error::Issuance { status: 403, .. }));

	exchange.assert_calls_async(1).await;
	receive.assert_calls_async(0).await;
}
