//! Storage contract and built-in backends for the singleton platform credential.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

// self
use crate::{_prelude::*, auth::Credential};

/// Boxed future returned by [`CredentialStore`] operations.
pub type StoreFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, StoreError>> + 'a + Send>>;

/// Persistence contract for the singleton credential record.
///
/// Implementations hold at most one record. [`upsert`](CredentialStore::upsert) creates it on
/// first use and afterwards replaces every field under a single write, so concurrent callers
/// never observe a mix of two credentials.
pub trait CredentialStore
where
	Self: Send + Sync,
{
	/// Fetches the stored credential, if any.
	fn get_latest(&self) -> StoreFuture<'_, Option<Credential>>;

	/// Inserts the credential if none exists, otherwise replaces the stored one in place.
	fn upsert(&self, candidate: Credential) -> StoreFuture<'_, Credential>;
}

/// Error type produced by [`CredentialStore`] implementations.
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

/// Fixed row identifier addressing the singleton record in persisted snapshots.
pub const CREDENTIAL_ROW_ID: u32 = 1;

/// On-disk shape of the singleton record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRow {
	/// Storage address; always [`CREDENTIAL_ROW_ID`].
	pub id: u32,
	/// Number of writes applied to the row, starting at 1 on creation.
	pub revision: u64,
	/// Stored credential.
	pub credential: Credential,
}
impl CredentialRow {
	/// Builds the row that results from upserting `candidate` over `current`.
	pub fn next(current: Option<&CredentialRow>, candidate: Credential) -> Self {
		let revision = current.map_or(1, |row| row.revision + 1);

		Self { id: CREDENTIAL_ROW_ID, revision, credential: candidate }
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn next_row_keeps_the_singleton_address() {
		let credential = Credential::builder()
			.access_token("a")
			.refresh_token("r")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Credential fixture should build.");
		let first = CredentialRow::next(None, credential.clone());
		let second = CredentialRow::next(Some(&first), credential);

		assert_eq!(first.id, CREDENTIAL_ROW_ID);
		assert_eq!(second.id, CREDENTIAL_ROW_ID);
		assert_eq!(first.revision, 1);
		assert_eq!(second.revision, 2);
	}

	#[test]
	fn store_error_messages_carry_the_payload() {
		let err = StoreError::Serialization { message: "bad json".into() };

		assert_eq!(err.to_string(), "Serialization error: bad json.");
	}
}
