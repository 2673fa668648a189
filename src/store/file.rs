//! File-backed [`CredentialStore`] for single-node deployments and CLI runs.

// std
use std::{
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	store::{CredentialRow, CredentialStore, StoreError, StoreFuture},
};

/// Persists the singleton credential row to a JSON file after each upsert.
///
/// The file is replaced through a temporary sibling and a rename, so a crash mid-write leaves
/// the previous record intact. The in-memory view only advances once the file write succeeds.
#[derive(Clone, Debug)]
pub struct FileStore {
	path: PathBuf,
	inner: Arc<RwLock<Option<CredentialRow>>>,
}
impl FileStore {
	/// Opens (or creates) a store at the provided path, eagerly loading an existing record.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let row = Self::load_row(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(row)) })
	}

	/// Location of the backing JSON file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	/// Returns the number of writes applied to the stored row (0 when empty).
	pub fn revision(&self) -> u64 {
		self.inner.read().as_ref().map_or(0, |row| row.revision)
	}

	fn load_row(path: &Path) -> Result<Option<CredentialRow>, StoreError> {
		if !path.exists() {
			return Ok(None);
		}

		let metadata = path.metadata().map_err(|e| StoreError::Backend {
			message: format!("Failed to inspect {}: {e}", path.display()),
		})?;

		if metadata.len() == 0 {
			return Ok(None);
		}

		let bytes = fs::read(path).map_err(|e| StoreError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;
		let row = serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})?;

		Ok(Some(row))
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| StoreError::Backend {
				message: format!("Failed to create store directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist(&self, row: &CredentialRow) -> Result<(), StoreError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized = serde_json::to_vec_pretty(row).map_err(|e| StoreError::Serialization {
			message: format!("Failed to serialize credential row: {e}"),
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
impl CredentialStore for FileStore {
	fn get_latest(&self) -> StoreFuture<'_, Option<Credential>> {
		Box::pin(async move { Ok(self.inner.read().as_ref().map(|row| row.credential.clone())) })
	}

	fn upsert(&self, candidate: Credential) -> StoreFuture<'_, Credential> {
		Box::pin(async move {
			let mut guard = self.inner.write();
			let row = CredentialRow::next(guard.as_ref(), candidate);

			self.persist(&row)?;

			let stored = row.credential.clone();

			*guard = Some(row);

			Ok(stored)
		})
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process};
	// crates.io
	use tokio::runtime::Runtime;
	// self
	use super::*;

	fn temp_path(label: &str) -> PathBuf {
		let unique = format!(
			"artist_sync_file_store_{label}_{}_{}.json",
			process::id(),
			OffsetDateTime::now_utc().unix_timestamp_nanos(),
		);

		env::temp_dir().join(unique)
	}

	fn build_credential(access: &str) -> Credential {
		Credential::builder()
			.access_token(access)
			.refresh_token(format!("{access}-refresh"))
			.expires_in(Duration::hours(1))
			.build()
			.expect("Failed to build file-store test credential.")
	}

	#[test]
	fn upsert_and_reload_round_trip() {
		let path = temp_path("round_trip");
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let credential = build_credential("access-1");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.upsert(credential.clone()))
			.expect("Failed to upsert fixture credential into file store.");
		drop(store);

		let reopened = FileStore::open(&path).expect("Failed to reopen file store.");
		let fetched = rt
			.block_on(reopened.get_latest())
			.expect("Failed to read credential from file store.")
			.expect("File store lost the credential after reopen.");

		assert_eq!(fetched, credential);
		assert_eq!(reopened.revision(), 1);

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn second_upsert_replaces_the_single_row() {
		let path = temp_path("replace");
		let store = FileStore::open(&path).expect("Failed to open file store.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		rt.block_on(store.upsert(build_credential("access-1")))
			.expect("First upsert should succeed.");
		rt.block_on(store.upsert(build_credential("access-2")))
			.expect("Second upsert should succeed.");

		let raw = fs::read_to_string(&path).expect("Snapshot file should be readable.");
		let row: CredentialRow =
			serde_json::from_str(&raw).expect("Snapshot should hold exactly one row object.");

		assert_eq!(row.id, crate::store::CREDENTIAL_ROW_ID);
		assert_eq!(row.revision, 2);
		assert_eq!(row.credential.access_token.expose(), "access-2");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn empty_file_opens_as_empty_store() {
		let path = temp_path("empty");

		File::create(&path).expect("Failed to create empty snapshot file.");

		let store = FileStore::open(&path).expect("Empty snapshot should open cleanly.");
		let rt = Runtime::new().expect("Failed to build Tokio runtime for file store test.");

		assert!(rt.block_on(store.get_latest()).expect("Read should succeed.").is_none());

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_file_surfaces_serialization_error() {
		let path = temp_path("corrupt");

		fs::write(&path, b"{not json").expect("Failed to write corrupt snapshot.");

		let err = FileStore::open(&path).expect_err("Corrupt snapshots should fail to open.");

		assert!(matches!(err, StoreError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary file store snapshot {}: {e}", path.display())
		});
	}
}
