//! Crate-level error types shared across the fetcher, issuer, and stores.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Variants stay distinct so a rendering layer can tell "unauthorized" apart from
/// "loading failed" without string matching.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Token exchange failed; no guarded request was attempted.
	#[error(transparent)]
	Issuance(#[from] IssuanceError),
	/// Transport failure (DNS, TCP, TLS) on the guarded request.
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Successful response whose body does not follow the single-key envelope.
	#[error(transparent)]
	Envelope(#[from] crate::envelope::EnvelopeError),
	/// Unwrapped payload does not match the requested type.
	#[error("Response payload does not match the expected shape.")]
	Decode(#[from] serde_path_to_error::Error<serde_json::Error>),

	/// Guarded endpoint answered with a non-2xx, non-401 status.
	#[error("Guarded endpoint responded with HTTP status {status}.")]
	HttpStatus {
		/// HTTP status code returned by the endpoint.
		status: u16,
	},
	/// Guarded endpoint answered 401 again after a freshly issued token was presented.
	#[error("Guarded endpoint rejected a freshly issued token as unauthorized.")]
	UnauthorizedRetryExhausted,
}
impl Error {
	/// Returns `true` when the failure means the caller is not authorized, either because the
	/// backend kept answering 401 or because the token endpoint rejected the credentials.
	///
	/// OAuth error bodies delivered with any other status (e.g., a 5xx) are treated as a server
	/// failure rather than a credential rejection.
	pub fn is_unauthorized(&self) -> bool {
		matches!(
			self,
			Self::UnauthorizedRetryExhausted
				| Self::Issuance(IssuanceError::Rejected { status: None | Some(400 | 401), .. })
		)
	}

	/// HTTP status code carried by the failure, when one was observed.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::HttpStatus { status } => Some(*status),
			Self::UnauthorizedRetryExhausted => Some(401),
			Self::Issuance(err) => err.status(),
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Base URL cannot be parsed.
	#[error("Base URL is invalid.")]
	InvalidBaseUrl {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Base URL uses a scheme other than HTTP(S).
	#[error("Base URL must use http or https: {url}.")]
	UnsupportedScheme {
		/// URL that failed validation.
		url: String,
	},
	/// Endpoint path cannot be joined onto the base URL.
	#[error("Endpoint `{endpoint}` cannot be resolved against the base URL.")]
	InvalidEndpoint {
		/// Endpoint path supplied by the caller.
		endpoint: String,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// A header value contains bytes that are not allowed on the wire.
	#[error("Header `{name}` has an invalid value.")]
	InvalidHeaderValue {
		/// Header name being populated.
		name: &'static str,
	},
	/// Request body could not be serialized to JSON.
	#[error("Request body could not be serialized to JSON.")]
	RequestBody(#[source] serde_json::Error),

	/// Identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// Credential source could not supply a required field.
	#[error("Credential `{field}` is missing from {source_name}.")]
	MissingCredential {
		/// Field that was absent or empty.
		field: &'static str,
		/// Human-readable description of the credential source.
		source_name: String,
	},
	/// Credential file could not be read.
	#[error("Credential file {path} could not be read.")]
	CredentialFileRead {
		/// Path of the credential file.
		path: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Credential file is not valid JSON or has unexpected field types.
	#[error("Credential file {path} is malformed.")]
	CredentialFileParse {
		/// Path of the credential file.
		path: String,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Token exchange failures raised by a [`TokenIssuer`](crate::issuer::TokenIssuer).
#[derive(Debug, ThisError)]
pub enum IssuanceError {
	/// Token endpoint returned an OAuth error body.
	#[error("Token endpoint rejected the credentials: {error}.")]
	Rejected {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// OAuth `error` code (e.g., `invalid_grant`).
		error: String,
		/// OAuth `error_description`, when supplied.
		description: Option<String>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned a malformed response.")]
	MalformedResponse {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Network failure while calling the token endpoint.
	#[error("Token endpoint could not be reached.")]
	Transport(#[source] TransportError),
	/// Anything else the OAuth client reported.
	#[error("Token endpoint returned an unexpected response: {message}.")]
	Unexpected {
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Message summarizing the failure.
		message: String,
	},
}
impl IssuanceError {
	/// HTTP status code observed on the token endpoint, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Rejected { status, .. }
			| Self::MalformedResponse { status, .. }
			| Self::Unexpected { status, .. } => *status,
			Self::Transport(_) => None,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling {endpoint}.")]
	Network {
		/// Endpoint being called when the failure occurred.
		endpoint: String,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Request could not be converted into the transport's native representation.
	#[error("Request for {endpoint} could not be built.")]
	Request {
		/// Endpoint being called when the failure occurred.
		endpoint: String,
		/// Underlying HTTP construction failure.
		#[source]
		source: oauth2::http::Error,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred while calling {endpoint}.")]
	Io {
		/// Endpoint being called when the failure occurred.
		endpoint: String,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Transport reported a failure without a structured error.
	#[error("HTTP client error occurred while calling {endpoint}: {message}.")]
	Other {
		/// Endpoint being called when the failure occurred.
		endpoint: String,
		/// Transport-supplied message.
		message: String,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: impl Into<String>,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint: endpoint.into(), source: Box::new(src) }
	}
}
