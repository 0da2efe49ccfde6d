//! Cached bearer token model.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Opaque bearer token issued by the password grant.
///
/// The backend never tells the client when a token expires; validity is only discovered when a
/// guarded request comes back 401. `issued_at` is kept for diagnostics and plays no part in cache
/// decisions.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BearerToken {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the token was received from the token endpoint.
	pub issued_at: OffsetDateTime,
}
impl BearerToken {
	/// Wraps a freshly issued access token, stamping `issued_at` with the current clock.
	pub fn new(access_token: impl Into<String>) -> Self {
		Self { access_token: TokenSecret::new(access_token), issued_at: OffsetDateTime::now_utc() }
	}

	/// Overrides the issued-at instant.
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = instant;

		self
	}

	/// Value for the `Authorization` header.
	pub fn authorization_value(&self) -> String {
		format!("Bearer {}", self.access_token.expose())
	}

	/// Returns `true` if both tokens carry the same secret, regardless of metadata.
	pub fn same_secret(&self, other: &Self) -> bool {
		self.access_token == other.access_token
	}
}
impl Debug for BearerToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("BearerToken")
			.field("access_token", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.finish()
	}
}
