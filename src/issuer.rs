//! Token issuance through the OAuth 2.0 resource owner password grant.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId as OAuthClientId, ClientSecret, HttpClientError, RequestTokenError,
	ResourceOwnerPassword, ResourceOwnerUsername, TokenResponse, TokenUrl,
	basic::{BasicClient, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	auth::{BearerToken, Credentials},
	config::FetcherConfig,
	error::IssuanceError,
	http::{self, HttpTransport, ResponseMetadata, ResponseMetadataSlot},
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

/// Boxed future returned by [`TokenIssuer::issue`].
pub type IssueFuture<'a> =
	Pin<Box<dyn Future<Output = Result<BearerToken, IssuanceError>> + 'a + Send>>;

/// Exchanges credentials for a fresh bearer token.
///
/// Implementations perform exactly one network exchange per call and never retry; retry policy
/// belongs to the caller.
pub trait TokenIssuer
where
	Self: Send + Sync,
{
	/// Requests a new token for `credentials`.
	fn issue<'a>(&'a self, credentials: &'a Credentials) -> IssueFuture<'a>;
}

/// [`TokenIssuer`] that posts `grant_type=password` to the configured token endpoint.
///
/// Client credentials travel in the form body next to the resource owner's username and
/// password, which is what the Crowdlab backend expects.
pub struct PasswordGrantIssuer<C>
where
	C: ?Sized + HttpTransport,
{
	token_url: TokenUrl,
	http_client: Arc<C>,
}
impl<C> PasswordGrantIssuer<C>
where
	C: ?Sized + HttpTransport,
{
	/// Creates an issuer targeting `config.token_url` through the provided transport.
	pub fn new(config: &FetcherConfig, http_client: impl Into<Arc<C>>) -> Self {
		Self {
			token_url: TokenUrl::from_url(config.token_url.clone()),
			http_client: http_client.into(),
		}
	}

	/// Token endpoint this issuer posts to.
	pub fn token_url(&self) -> &Url {
		self.token_url.url()
	}
}
#[cfg(feature = "reqwest")]
impl PasswordGrantIssuer<ReqwestHttpClient> {
	/// Creates an issuer with its own default reqwest transport.
	pub fn with_default_client(config: &FetcherConfig) -> Self {
		Self::new(config, ReqwestHttpClient::default())
	}
}
impl<C> Debug for PasswordGrantIssuer<C>
where
	C: ?Sized + HttpTransport,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("PasswordGrantIssuer").field("token_url", &self.token_url.as_str()).finish()
	}
}
impl<C> TokenIssuer for PasswordGrantIssuer<C>
where
	C: ?Sized + HttpTransport,
{
	fn issue<'a>(&'a self, credentials: &'a Credentials) -> IssueFuture<'a> {
		let meta = ResponseMetadataSlot::default();

		Box::pin(async move {
			let instrumented = self.http_client.with_metadata(meta.clone());
			let client_id = OAuthClientId::new(credentials.client_id.to_string());
			let client_secret = ClientSecret::new(credentials.client_secret.expose().to_owned());
			let oauth_client = BasicClient::new(client_id)
				.set_client_secret(client_secret)
				.set_auth_type(AuthType::RequestBody)
				.set_token_uri(self.token_url.clone());
			let username = ResourceOwnerUsername::new(credentials.username.clone());
			let password = ResourceOwnerPassword::new(credentials.password.expose().to_owned());
			let response = oauth_client
				.exchange_password(&username, &password)
				.request_async(&instrumented)
				.await
				.map_err(|err| map_request_error(self.token_url.as_str(), meta.take(), err))?;

			Ok(BearerToken::new(response.access_token().secret().to_owned()))
		})
	}
}

fn map_request_error<E>(
	endpoint: &str,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
) -> IssuanceError
where
	E: 'static + Send + Sync + StdError,
{
	let status = meta.and_then(|value| value.status);

	match err {
		RequestTokenError::ServerResponse(response) => IssuanceError::Rejected {
			status,
			error: response.error().as_ref().to_owned(),
			description: response.error_description().cloned(),
		},
		RequestTokenError::Request(error) =>
			IssuanceError::Transport(http::map_http_client_error(endpoint, error)),
		RequestTokenError::Parse(source, _body) =>
			IssuanceError::MalformedResponse { status, source },
		RequestTokenError::Other(message) => IssuanceError::Unexpected { status, message },
	}
}
