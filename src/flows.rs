//! Credential lifecycle coordination shared by the refresh scheduler and the API client.

pub mod acquire;
pub mod refresh;

pub use refresh::*;

// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, Credential, CredentialState},
	issuer::TokenIssuer,
	store::CredentialStore,
};

/// Lookahead window that turns a valid credential into a near-expiry one.
pub const DEFAULT_EXPIRY_MARGIN: Duration = Duration::minutes(10);

/// Coordinates every read-check-refresh-persist sequence against the singleton credential.
///
/// The manager owns the store, the issuer, and the client credentials, plus one async guard
/// that serializes issuance and refresh. Both refresh triggers (the background scheduler and
/// the per-call freshness check) go through the same manager instance, so at most one grant
/// exchange is ever in flight. Callers that queue behind an in-flight refresh re-read the
/// stored credential once the guard is released instead of refreshing again.
#[derive(Clone)]
pub struct CredentialManager {
	/// Store holding the singleton credential.
	pub store: Arc<dyn CredentialStore>,
	/// Issuer performing the grant exchanges.
	pub issuer: Arc<dyn TokenIssuer>,
	/// Client credentials presented on every grant.
	pub client: ClientCredentials,
	/// Shared counters for refresh outcomes.
	pub refresh_metrics: Arc<RefreshMetrics>,
	expiry_margin: Duration,
	refresh_guard: Arc<AsyncMutex<()>>,
}
impl CredentialManager {
	/// Creates a manager using [`DEFAULT_EXPIRY_MARGIN`].
	pub fn new(
		store: Arc<dyn CredentialStore>,
		issuer: Arc<dyn TokenIssuer>,
		client: ClientCredentials,
	) -> Self {
		Self {
			store,
			issuer,
			client,
			refresh_metrics: Default::default(),
			expiry_margin: DEFAULT_EXPIRY_MARGIN,
			refresh_guard: Default::default(),
		}
	}

	/// Overrides the expiry margin; negative values clamp to zero.
	pub fn with_expiry_margin(mut self, margin: Duration) -> Self {
		self.expiry_margin = if margin.is_negative() { Duration::ZERO } else { margin };

		self
	}

	/// Lookahead window applied by freshness checks.
	pub fn expiry_margin(&self) -> Duration {
		self.expiry_margin
	}

	/// Returns the stored credential without taking the refresh guard.
	pub async fn current(&self) -> Result<Credential> {
		self.load().await?.ok_or(Error::TokenUnavailable)
	}

	/// Returns the lifecycle state of the stored credential at `now`.
	pub async fn state_at(&self, now: OffsetDateTime) -> Result<CredentialState> {
		Ok(self
			.load()
			.await?
			.map_or(CredentialState::Absent, |credential| credential.state_at(now, self.expiry_margin)))
	}

	async fn load(&self) -> Result<Option<Credential>> {
		self.store.get_latest().await.map_err(|e| {
			tracing::error!(error = %e, "failed to read the stored credential");

			Error::from(e)
		})
	}

	async fn persist(&self, candidate: Credential) -> Result<Credential> {
		self.store.upsert(candidate).await.map_err(|e| {
			tracing::error!(error = %e, "failed to persist the credential");

			Error::from(e)
		})
	}
}
impl Debug for CredentialManager {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("CredentialManager")
			.field("client", &self.client)
			.field("expiry_margin", &self.expiry_margin)
			.field("refresh_metrics", &self.refresh_metrics)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{_preludet::*, store::MemoryStore};

	fn manager_over(store: Arc<MemoryStore>) -> CredentialManager {
		CredentialManager::new(store, Arc::new(StubIssuer::granting(3600)), test_client_credentials())
	}

	#[tokio::test]
	async fn current_reports_missing_credentials() {
		let manager = manager_over(Arc::new(MemoryStore::default()));
		let err = manager.current().await.expect_err("An empty store has no current credential.");

		assert!(matches!(err, Error::TokenUnavailable));
		assert_eq!(
			manager.state_at(OffsetDateTime::now_utc()).await.expect("State read should succeed."),
			CredentialState::Absent
		);
	}

	#[tokio::test]
	async fn state_follows_the_configured_margin() {
		let (store, _) = seed_store("a", "r", Duration::minutes(20)).await;
		let manager = manager_over(store);
		let now = OffsetDateTime::now_utc();

		assert_eq!(
			manager.state_at(now).await.expect("State read should succeed."),
			CredentialState::Valid
		);

		let manager = manager.with_expiry_margin(Duration::minutes(30));

		assert_eq!(
			manager.state_at(now).await.expect("State read should succeed."),
			CredentialState::NearExpiry
		);
	}

	#[test]
	fn negative_margins_clamp_to_zero() {
		let manager = manager_over(Arc::new(MemoryStore::default()))
			.with_expiry_margin(Duration::minutes(-5));

		assert_eq!(manager.expiry_margin(), Duration::ZERO);
	}
}
