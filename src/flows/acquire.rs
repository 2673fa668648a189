//! Client-credentials issuance for the very first credential.

// self
use crate::{
	_prelude::*,
	auth::Credential,
	flows::CredentialManager,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

impl CredentialManager {
	/// Performs the client-credentials grant and stores the result, replacing any stored
	/// credential.
	pub async fn acquire(&self) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Issue;

		let span = FlowSpan::new(KIND, "acquire");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _guard = self.refresh_guard.lock().await;

				self.issue_locked().await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Returns the stored credential, acquiring one first when the store is empty.
	///
	/// Concurrent callers on an empty store trigger a single grant exchange.
	pub async fn bootstrap(&self) -> Result<Credential> {
		if let Some(credential) = self.load().await? {
			return Ok(credential);
		}

		const KIND: FlowKind = FlowKind::Issue;

		let span = FlowSpan::new(KIND, "bootstrap");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _guard = self.refresh_guard.lock().await;

				match self.load().await? {
					Some(credential) => Ok(credential),
					None => self.issue_locked().await,
				}
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	async fn issue_locked(&self) -> Result<Credential> {
		let issued_at = OffsetDateTime::now_utc();
		let grant = self.issuer.issue_client_credentials(&self.client).await.inspect_err(|e| {
			tracing::warn!(error = %e, kind = e.kind(), "client-credentials grant failed");
		})?;
		let candidate = Credential::from_grant(grant, issued_at, None)?;
		let stored = self.persist(candidate).await?;

		tracing::info!(expires_at = %stored.access_token_expiry, "issued a new credential");

		Ok(stored)
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, store::MemoryStore};

	#[tokio::test]
	async fn bootstrap_issues_once_then_reuses() {
		let store = Arc::new(MemoryStore::default());
		let issuer = Arc::new(StubIssuer::granting(3600));
		let manager = CredentialManager::new(store.clone(), issuer.clone(), test_client_credentials());
		let first = manager.bootstrap().await.expect("Bootstrap should issue a credential.");
		let second = manager.bootstrap().await.expect("Bootstrap should reuse the credential.");

		assert_eq!(first, second);
		assert_eq!(first.access_token.expose(), "access-1");
		assert_eq!(issuer.issue_calls(), 1);
		assert_eq!(store.revision(), 1);
	}

	#[tokio::test]
	async fn acquire_replaces_the_stored_credential_in_place() {
		let (store, seeded) = seed_store("seed", "seed-refresh", Duration::hours(1)).await;
		let issuer = Arc::new(StubIssuer::granting(3600));
		let manager = CredentialManager::new(store.clone(), issuer.clone(), test_client_credentials());
		let acquired = manager.acquire().await.expect("Acquire should succeed.");

		assert_ne!(acquired, seeded);
		assert_eq!(store.revision(), 2);
		assert_eq!(manager.current().await.expect("Credential should be stored."), acquired);
	}

	#[tokio::test]
	async fn failed_issuance_leaves_store_empty() {
		let store = Arc::new(MemoryStore::default());
		let manager = CredentialManager::new(
			store.clone(),
			Arc::new(StubIssuer::rejecting(401)),
			test_client_credentials(),
		);
		let err = manager.bootstrap().await.expect_err("A rejected grant should fail bootstrap.");

		assert!(matches!(err, Error::AuthServer { status: 401, .. }));
		assert_eq!(store.revision(), 0);
	}
}
