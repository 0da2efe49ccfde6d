//! Request descriptors handed to the fetcher and the normalized responses it returns.

// crates.io
use oauth2::{
	HttpRequest,
	http::{
		HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::{BearerToken, TenantId},
	config::TENANT_HEADER,
	error::ConfigError,
};

/// Method, headers, and body of a guarded request.
///
/// The fetcher keeps the caller's original value and writes the tenant and authorization
/// headers into a copy, so a retry always starts from the unauthorized request.
#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
	/// HTTP method; defaults to `GET`.
	pub method: Method,
	/// Caller-supplied headers.
	pub headers: HeaderMap,
	/// Optional request body.
	pub body: Option<Vec<u8>>,
}
impl RequestOptions {
	/// Creates options for the provided method with no headers or body.
	pub fn new(method: Method) -> Self {
		Self { method, ..Default::default() }
	}

	/// Shorthand for a bodiless `GET`.
	pub fn get() -> Self {
		Self::new(Method::GET)
	}

	/// Inserts a header, replacing any previous value with the same name.
	pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Serializes `body` as JSON and sets the matching content type.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(ConfigError::RequestBody)?);
		self.headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

		Ok(self)
	}

	/// Writes the tenant and bearer authorization headers, overwriting caller values.
	pub fn authorize(&mut self, tenant: &TenantId, token: &BearerToken) -> Result<(), ConfigError> {
		let tenant_value = HeaderValue::from_str(tenant)
			.map_err(|_| ConfigError::InvalidHeaderValue { name: TENANT_HEADER })?;
		let mut authorization = HeaderValue::from_str(&token.authorization_value())
			.map_err(|_| ConfigError::InvalidHeaderValue { name: "authorization" })?;

		authorization.set_sensitive(true);

		self.headers.insert(HeaderName::from_static(TENANT_HEADER), tenant_value);
		self.headers.insert(AUTHORIZATION, authorization);

		Ok(())
	}

	pub(crate) fn into_http_request(self, url: &Url) -> Result<HttpRequest, ConfigError> {
		let mut request = Request::builder()
			.method(self.method)
			.uri(url.as_str())
			.body(self.body.unwrap_or_default())?;
		let headers = request.headers_mut();

		*headers = self.headers;
		headers.entry(ACCEPT).or_insert_with(|| HeaderValue::from_static("application/json"));

		Ok(request)
	}
}

/// Successful response with its single-key envelope removed.
#[derive(Clone, Debug)]
pub struct NormalizedResponse {
	/// Status returned by the endpoint.
	pub status: StatusCode,
	/// Canonical reason phrase for `status` (empty for unregistered codes).
	pub status_text: String,
	/// Response headers, unchanged.
	pub headers: HeaderMap,
	/// Payload found under the envelope's only key.
	pub body: Value,
}
impl NormalizedResponse {
	/// Deserializes the payload into `T`, reporting the path of the first mismatch.
	pub fn json<T>(&self) -> Result<T, serde_path_to_error::Error<serde_json::Error>>
	where
		T: DeserializeOwned,
	{
		serde_path_to_error::deserialize(&self.body)
	}
}
