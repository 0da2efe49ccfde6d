//! Single-slot token storage contracts and built-in backends.
//!
//! Every backend exposes one well-known slot, [`TOKEN_SLOT`], holding the serialized
//! [`BearerToken`]. Loading never fails on bad slot contents: a value that cannot be decoded is
//! reported as absent so the fetcher simply issues a new token.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::BearerToken};

/// Name of the slot holding the cached token.
pub const TOKEN_SLOT: &str = "crowdlab.token";

/// Boxed future returned by [`TokenStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Storage backend contract for the cached bearer token.
pub trait TokenStore
where
	Self: Send + Sync,
{
	/// Returns the cached token, or `None` when the slot is empty or holds an unreadable value.
	fn load(&self) -> StoreFuture<'_, Option<BearerToken>>;

	/// Replaces the cached token and hands the same token back to the caller.
	fn save(&self, token: BearerToken) -> StoreFuture<'_, BearerToken>;

	/// Empties the slot. Clearing an empty slot succeeds.
	fn clear(&self) -> StoreFuture<'_, ()>;
}

/// Error type produced by [`TokenStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}

/// Serializes a token into the slot representation.
pub fn encode_token(token: &BearerToken) -> Result<String, StoreError> {
	serde_json::to_string(token).map_err(|e| StoreError::Serialization {
		message: format!("Failed to serialize bearer token: {e}"),
	})
}

/// Decodes a slot value, treating anything unreadable as an empty slot.
pub fn decode_token(raw: &str) -> Option<BearerToken> {
	match serde_json::from_str::<BearerToken>(raw) {
		Ok(token) if !token.access_token.is_empty() => Some(token),
		Ok(_) => {
			#[cfg(feature = "tracing")]
			tracing::warn!(slot = TOKEN_SLOT, "Ignoring cached token with an empty secret.");

			None
		},
		Err(_e) => {
			#[cfg(feature = "tracing")]
			tracing::warn!(slot = TOKEN_SLOT, error = %_e, "Ignoring malformed cached token.");

			None
		},
	}
}
