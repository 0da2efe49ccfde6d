//! Thread-safe in-memory [`TokenStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::BearerToken,
	store::{self, StoreError, StoreFuture, TokenStore},
};

type Slot = Arc<RwLock<Option<String>>>;

/// Storage backend that keeps the serialized token in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(Slot);
impl MemoryStore {
	/// Creates a store whose slot already holds `raw`, e.g., a value carried over from another
	/// process. The value is decoded lazily on [`TokenStore::load`].
	pub fn from_raw(raw: impl Into<String>) -> Self {
		Self(Arc::new(RwLock::new(Some(raw.into()))))
	}

	fn load_now(slot: Slot) -> Option<BearerToken> {
		slot.read().as_deref().and_then(store::decode_token)
	}

	fn save_now(slot: Slot, token: BearerToken) -> Result<BearerToken, StoreError> {
		let raw = store::encode_token(&token)?;

		*slot.write() = Some(raw);

		Ok(token)
	}

	fn clear_now(slot: Slot) {
		slot.write().take();
	}
}
impl TokenStore for MemoryStore {
	fn load(&self) -> StoreFuture<'_, Option<BearerToken>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(Self::load_now(slot)) })
	}

	fn save(&self, token: BearerToken) -> StoreFuture<'_, BearerToken> {
		let slot = self.0.clone();

		Box::pin(async move { Self::save_now(slot, token) })
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		let slot = self.0.clone();

		Box::pin(async move {
			Self::clear_now(slot);

			Ok(())
		})
	}
}
