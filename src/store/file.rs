//! File-backed [`TokenStore`] that keeps the token across process restarts.
//!
//! The file holds a flat JSON object of slot name to serialized value, mirroring a browser's
//! local storage. Only [`TOKEN_SLOT`](crate::store::TOKEN_SLOT) is touched; other entries are
//! preserved verbatim.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// crates.io
use serde_json::Value;
// self
use crate::{
	_prelude::*,
	auth::BearerToken,
	store::{self, StoreError, StoreFuture, TOKEN_SLOT, TokenStore},
};

type Slots = BTreeMap<String, Value>;

/// Persists the token slot to a JSON file after each mutation.
///
/// The in-memory snapshot only changes once the new contents have been written, so a failed
/// write leaves both views on the previous state.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Slots>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Slots, StoreError> {
		if !path.exists() {
			return Ok(Slots::new());
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Slots::new());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, contents: &Slots) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(contents).map_err(|e| StoreError::Serialization {
				message: format!("Failed to serialize store snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| StoreError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| StoreError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| StoreError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| StoreError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl TokenStore for FileStore {
	fn load(&self) -> StoreFuture<'_, Option<BearerToken>> {
		Box::pin(async move {
			Ok(self
				.inner
				.read()
				.get(TOKEN_SLOT)
				.and_then(Value::as_str)
				.and_then(store::decode_token))
		})
	}

	fn save(&self, token: BearerToken) -> StoreFuture<'_, BearerToken> {
		Box::pin(async move {
			let raw = store::encode_token(&token)?;
			let mut guard = self.inner.write();
			let mut next = guard.clone();

			next.insert(TOKEN_SLOT.to_owned(), Value::String(raw));
			self.persist_locked(&next)?;

			*guard = next;

			Ok(token)
		})
	}

	fn clear(&self) -> StoreFuture<'_, ()> {
		Box::pin(async move {
			let mut guard = self.inner.write();

			if !guard.contains_key(TOKEN_SLOT) {
				return Ok(());
			}

			let mut next = guard.clone();

			next.remove(TOKEN_SLOT);
			self.persist_locked(&next)?;

			*guard = next;

			Ok(())
		})
	}
}
