//! Thread-safe in-memory [`CredentialStore`] implementation for local development and tests.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{CredentialRow, CredentialStore, StoreError, StoreFuture},
};

type StoreSlot = Arc<RwLock<Option<CredentialRow>>>;

/// Thread-safe storage backend that keeps the credential in-process.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore(StoreSlot);
impl MemoryStore {
	/// Returns the number of writes applied so far (0 when empty).
	pub fn revision(&self) -> u64 {
		self.0.read().as_ref().map_or(0, |row| row.revision)
	}

	fn upsert_now(slot: StoreSlot, candidate: Credential) -> Result<Credential, StoreError> {
		let mut guard = slot.write();
		let row = CredentialRow::next(guard.as_ref(), candidate);
		let stored = row.credential.clone();

		*guard = Some(row);

		Ok(stored)
	}

	fn get_now(slot: StoreSlot) -> Option<Credential> {
		slot.read().as_ref().map(|row| row.credential.clone())
	}
}
impl CredentialStore for MemoryStore {
	fn get_latest(&self) -> StoreFuture<'_, Option<Credential>> {
		let slot = self.0.clone();

		Box::pin(async move { Ok(Self::get_now(slot)) })
	}

	fn upsert(&self, candidate: Credential) -> StoreFuture<'_, Credential> {
		let slot = self.0.clone();

		Box::pin(async move { Self::upsert_now(slot, candidate) })
	}
}
