//! Authenticated fetch orchestration.
//!
//! [`AuthenticatedFetcher`] resolves a bearer token (cached or freshly issued), injects the
//! tenant and authorization headers, sends the request, and unwraps the response envelope. A
//! 401 discards the rejected token and replays the request exactly once.

mod metrics;
pub mod request;

pub use metrics::FetchMetrics;
pub use request::*;

// crates.io
use oauth2::{AsyncHttpClient, HttpResponse, http::StatusCode};
// self
use crate::{
	_prelude::*,
	auth::{BearerToken, Credentials},
	config::FetcherConfig,
	envelope,
	http::{self, HttpTransport, ResponseMetadataSlot},
	issuer::TokenIssuer,
	obs::{self, OpKind, OpOutcome, OpSpan},
	store::TokenStore,
};
#[cfg(feature = "reqwest")] use crate::{http::ReqwestHttpClient, issuer::PasswordGrantIssuer};

#[cfg(feature = "reqwest")]
/// Fetcher specialized for the crate's default reqwest transport.
pub type ReqwestFetcher = AuthenticatedFetcher<ReqwestHttpClient>;

/// Pass of the fetch algorithm a request belongs to.
///
/// The tag is the only thing that distinguishes the replay from the first send, which bounds the
/// algorithm to two guarded requests per call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Attempt {
	/// First send of the caller's request.
	Initial,
	/// Replay after the first token was rejected.
	Retry,
}
impl Attempt {
	/// Returns a stable label suitable for span or log fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Attempt::Initial => "initial",
			Attempt::Retry => "retry",
		}
	}

	/// Pass to run after a 401, or `None` once the retry has been spent.
	pub const fn next(self) -> Option<Self> {
		match self {
			Attempt::Initial => Some(Attempt::Retry),
			Attempt::Retry => None,
		}
	}
}

enum AttemptOutcome {
	Completed(HttpResponse),
	Unauthorized(BearerToken),
}

/// Sends tenant-scoped, bearer-authorized requests to the Crowdlab REST API.
///
/// The fetcher owns the transport, token store, issuer, and credentials so callers only provide
/// an endpoint and request options. Token resolution and token invalidation are serialized, so
/// concurrent fetches against an empty store share a single issuance.
#[derive(Clone)]
pub struct AuthenticatedFetcher<C>
where
	C: ?Sized + HttpTransport,
{
	/// HTTP transport used for guarded requests.
	pub http_client: Arc<C>,
	/// Store holding the cached bearer token.
	pub store: Arc<dyn TokenStore>,
	/// Issuer consulted when the store is empty.
	pub issuer: Arc<dyn TokenIssuer>,
	/// Credentials handed to the issuer.
	pub credentials: Credentials,
	/// Base URL, tenant, and normalization settings.
	pub config: FetcherConfig,
	/// Shared counters for fetch outcomes.
	pub metrics: Arc<FetchMetrics>,
	token_guard: Arc<AsyncMutex<()>>,
}
impl<C> AuthenticatedFetcher<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates a fetcher from caller-provided collaborators.
	pub fn with_http_client(
		config: FetcherConfig,
		credentials: Credentials,
		store: Arc<dyn TokenStore>,
		issuer: Arc<dyn TokenIssuer>,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			issuer,
			credentials,
			config,
			metrics: Default::default(),
			token_guard: Default::default(),
		}
	}

	/// Sends a bodiless `GET` to `endpoint`.
	pub async fn get(&self, endpoint: &str) -> Result<NormalizedResponse> {
		self.fetch(endpoint, RequestOptions::get()).await
	}

	/// Sends `options` to `endpoint` with tenant and bearer headers attached.
	///
	/// # Errors
	///
	/// - [`Error::UnauthorizedRetryExhausted`] when the replay is rejected with 401 as well.
	/// - [`Error::HttpStatus`] for any other non-2xx status.
	/// - [`Error::Transport`] when no response was received.
	/// - [`Error::Issuance`] or [`Error::Storage`] when a token could not be obtained.
	/// - [`Error::Envelope`] when a 2xx body is not a single-key JSON object.
	pub async fn fetch(&self, endpoint: &str, options: RequestOptions) -> Result<NormalizedResponse> {
		const KIND: OpKind = OpKind::Fetch;

		let span = OpSpan::new(KIND, "fetch");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.metrics.record_attempt();

		let result = span.instrument(self.fetch_with_retry(endpoint, options)).await;

		match &result {
			Ok(_) => {
				obs::record_op_outcome(KIND, OpOutcome::Success);
				self.metrics.record_success();
			},
			Err(_) => {
				obs::record_op_outcome(KIND, OpOutcome::Failure);
				self.metrics.record_failure();
			},
		}

		result
	}

	/// Returns the cached token, issuing and saving a new one when the store is empty.
	pub async fn token(&self) -> Result<BearerToken> {
		let _singleflight = self.token_guard.lock().await;

		if let Some(token) = self.store.load().await? {
			return Ok(token);
		}

		let token = self.issue().await?;

		Ok(self.store.save(token).await?)
	}

	async fn fetch_with_retry(
		&self,
		endpoint: &str,
		options: RequestOptions,
	) -> Result<NormalizedResponse> {
		let url = self.config.endpoint_url(endpoint)?;
		let mut attempt = Attempt::Initial;

		loop {
			match self.send_authorized(&url, options.clone(), attempt).await? {
				AttemptOutcome::Completed(response) => return self.normalize(response),
				AttemptOutcome::Unauthorized(rejected) => {
					#[cfg(feature = "tracing")]
					tracing::warn!(
						endpoint = url.as_str(),
						attempt = attempt.as_str(),
						"Bearer token rejected with 401."
					);

					self.discard(&rejected).await?;

					match attempt.next() {
						Some(next) => {
							self.metrics.record_retry();

							attempt = next;
						},
						None => return Err(Error::UnauthorizedRetryExhausted),
					}
				},
			}
		}
	}

	async fn send_authorized(
		&self,
		url: &Url,
		mut options: RequestOptions,
		attempt: Attempt,
	) -> Result<AttemptOutcome> {
		let token = self.token().await?;

		options.authorize(&self.config.tenant, &token)?;

		let request = options.into_http_request(url)?;
		let handle = self.http_client.with_metadata(ResponseMetadataSlot::default());
		let response = handle
			.call(request)
			.await
			.map_err(|err| http::map_http_client_error(url.as_str(), err))?;
		let status = response.status();

		#[cfg(feature = "tracing")]
		tracing::debug!(
			endpoint = url.as_str(),
			attempt = attempt.as_str(),
			status = status.as_u16(),
			"Guarded request completed."
		);
		#[cfg(not(feature = "tracing"))]
		let _ = attempt;

		if status == StatusCode::UNAUTHORIZED {
			return Ok(AttemptOutcome::Unauthorized(token));
		}
		if !status.is_success() {
			return Err(Error::HttpStatus { status: status.as_u16() });
		}

		Ok(AttemptOutcome::Completed(response))
	}

	async fn issue(&self) -> Result<BearerToken> {
		const KIND: OpKind = OpKind::Issue;

		let span = OpSpan::new(KIND, "password_grant");

		obs::record_op_outcome(KIND, OpOutcome::Attempt);
		self.metrics.record_issuance();

		let result = span.instrument(self.issuer.issue(&self.credentials)).await;

		match &result {
			Ok(_) => obs::record_op_outcome(KIND, OpOutcome::Success),
			Err(_) => obs::record_op_outcome(KIND, OpOutcome::Failure),
		}

		Ok(result?)
	}

	/// Clears the store unless it already holds a token other than `rejected`.
	async fn discard(&self, rejected: &BearerToken) -> Result<()> {
		let _singleflight = self.token_guard.lock().await;

		match self.store.load().await? {
			// Another caller already replaced the rejected token.
			Some(current) if !current.same_secret(rejected) => Ok(()),
			_ => Ok(self.store.clear().await?),
		}
	}

	fn normalize(&self, response: HttpResponse) -> Result<NormalizedResponse> {
		let (parts, body) = response.into_parts();
		let mut payload = if body.iter().all(u8::is_ascii_whitespace) {
			serde_json::Value::Null
		} else {
			envelope::unwrap_single_key(&body)?
		};

		if self.config.camel_case_fields {
			payload = envelope::camel_case_keys(payload);
		}

		Ok(NormalizedResponse {
			status: parts.status,
			status_text: parts.status.canonical_reason().unwrap_or_default().to_owned(),
			headers: parts.headers,
			body: payload,
		})
	}
}
#[cfg(feature = "reqwest")]
impl AuthenticatedFetcher<ReqwestHttpClient> {
	/// Creates a fetcher backed by a default reqwest transport.
	///
	/// The password-grant issuer shares the same transport, so token exchanges and guarded
	/// requests reuse one connection pool.
	pub fn new(config: FetcherConfig, credentials: Credentials, store: Arc<dyn TokenStore>) -> Self {
		let http_client = Arc::new(ReqwestHttpClient::default());
		let issuer =
			Arc::new(PasswordGrantIssuer::<ReqwestHttpClient>::new(&config, Arc::clone(&http_client)));

		Self::with_http_client(config, credentials, store, issuer, http_client)
	}
}
impl<C> Debug for AuthenticatedFetcher<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AuthenticatedFetcher")
			.field("base_url", &self.config.base_url.as_str())
			.field("tenant", &self.config.tenant)
			.field("client_id", &self.credentials.client_id)
			.finish()
	}
}
