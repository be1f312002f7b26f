//! Relay form submissions to a webhook endpoint, authenticating with a short-lived bearer token
//! that is cached, reused while valid, and transparently refreshed when the receiver rejects it.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod adapter;
pub mod clock;
pub mod config;
pub mod delivery;
pub mod error;
pub mod http;
pub mod issuer;
pub mod log;
pub mod obs;
pub mod relay;
pub mod store;
pub mod token;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
#[doc(hidden)]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		clock::{Clock, ManualClock},
		http::ReqwestHttpClient,
		issuer::TokenIssuer,
		store::{MemoryStore, TokenStore},
		token::Credential,
	};

	/// Issuer type alias used by reqwest-backed integration tests.
	pub type ReqwestTestIssuer = TokenIssuer<ReqwestHttpClient>;

	/// Builds a reqwest HTTP client for talking to the plain-HTTP `httpmock` servers used in
	/// tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.no_proxy()
			.build()
			.expect("Failed to build Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`TokenIssuer`] backed by an in-memory store and a manual clock pinned to
	/// the Unix epoch.
	pub fn build_reqwest_test_issuer(
		exchange_url: Url,
		api_key: &str,
	) -> (ReqwestTestIssuer, Arc<MemoryStore>, Arc<ManualClock>) {
		let store_backend = Arc::new(MemoryStore::default());
		let store: Arc<dyn TokenStore> = store_backend.clone();
		let clock_backend = Arc::new(ManualClock::at_epoch());
		let clock: Arc<dyn Clock> = clock_backend.clone();
		let issuer = TokenIssuer::with_http_client(
			store,
			clock,
			Credential::webhook(api_key),
			exchange_url,
			test_reqwest_http_client(),
		);

		(issuer, store_backend, clock_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::{BTreeMap, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
