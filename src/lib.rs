//! Authenticated Crowdlab REST client with password-grant token caching, tenant-scoped requests,
//! and single-retry 401 recovery.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod auth;
pub mod config;
pub mod envelope;
pub mod error;
pub mod fetch;
pub mod http;
pub mod issuer;
pub mod obs;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		auth::Credentials,
		config::FetcherConfig,
		fetch::AuthenticatedFetcher,
		http::ReqwestHttpClient,
		issuer::{PasswordGrantIssuer, TokenIssuer},
		store::{MemoryStore, TokenStore},
	};

	/// Fetcher type alias used by reqwest-backed integration tests.
	pub type ReqwestTestFetcher = AuthenticatedFetcher<ReqwestHttpClient>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Fixed credentials shared by the integration suites.
	pub fn test_credentials() -> Credentials {
		Credentials::new("test-client", "test-secret", "agent@crowdlab.test", "hunter2")
			.expect("Test credentials should be valid.")
	}

	/// Constructs an [`AuthenticatedFetcher`] backed by an in-memory store, the password-grant
	/// issuer, and the reqwest transport used across integration tests.
	pub fn build_reqwest_test_fetcher(
		config: FetcherConfig,
	) -> (ReqwestTestFetcher, Arc<MemoryStore>) {
		let store = Arc::new(MemoryStore::default());
		let fetcher = build_reqwest_test_fetcher_with_store(config, store.clone());

		(fetcher, store)
	}

	/// Same as [`build_reqwest_test_fetcher`] but with a caller-provided store backend.
	pub fn build_reqwest_test_fetcher_with_store(
		config: FetcherConfig,
		store: Arc<dyn TokenStore>,
	) -> ReqwestTestFetcher {
		let http_client = Arc::new(test_reqwest_http_client());
		let issuer: Arc<dyn TokenIssuer> = Arc::new(PasswordGrantIssuer::<ReqwestHttpClient>::new(
			&config,
			Arc::clone(&http_client),
		));

		AuthenticatedFetcher::with_http_client(
			config,
			test_credentials(),
			store,
			issuer,
			http_client,
		)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use {color_eyre as _, httpmock as _};
