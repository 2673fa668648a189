//! Refresh-token rotation guarded by the manager's single refresh lock.
//!
//! [`CredentialManager::check_and_refresh`] is the one read-check-refresh-persist sequence used
//! by both the background scheduler and the API client. It takes the refresh guard, re-reads
//! the stored credential, and only exchanges the refresh token when the credential is inside
//! the expiry margin. A failed exchange or a failed write leaves the stored credential exactly
//! as it was.

mod metrics;

pub use metrics::RefreshMetrics;

// self
use crate::{
	_prelude::*,
	auth::Credential,
	flows::CredentialManager,
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Result of a freshness check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RefreshOutcome {
	/// No credential has been stored yet.
	Absent,
	/// Stored credential is outside the expiry margin and was left untouched.
	Fresh(Credential),
	/// Stored credential was rotated and persisted.
	Refreshed(Credential),
}
impl RefreshOutcome {
	/// Consumes the outcome and returns its credential, if any.
	pub fn into_credential(self) -> Option<Credential> {
		match self {
			Self::Absent => None,
			Self::Fresh(credential) | Self::Refreshed(credential) => Some(credential),
		}
	}
}

impl CredentialManager {
	/// Refreshes the stored credential when its access token expires within the margin of
	/// `now`.
	pub async fn check_and_refresh(&self, now: OffsetDateTime) -> Result<RefreshOutcome> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "check_and_refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _guard = self.refresh_guard.lock().await;
				let Some(current) = self.load().await? else {
					return Ok(RefreshOutcome::Absent);
				};
				let state = current.state_at(now, self.expiry_margin);

				if !state.needs_refresh() {
					self.refresh_metrics.record_reuse();

					return Ok(RefreshOutcome::Fresh(current));
				}

				tracing::debug!(state = state.as_str(), "credential needs refresh");

				self.rotate_locked(&current).await.map(RefreshOutcome::Refreshed)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	/// Returns a credential that is outside the expiry margin, refreshing it first if needed.
	pub async fn ensure_fresh(&self) -> Result<Credential> {
		self.check_and_refresh(OffsetDateTime::now_utc())
			.await?
			.into_credential()
			.ok_or(Error::TokenUnavailable)
	}

	/// Refreshes regardless of expiry after the platform rejected `rejected`.
	///
	/// When the stored access token already differs from the rejected one, another caller has
	/// rotated it in the meantime and the stored credential is returned without a new exchange.
	pub async fn force_refresh(&self, rejected: &Credential) -> Result<Credential> {
		const KIND: FlowKind = FlowKind::Refresh;

		let span = FlowSpan::new(KIND, "force_refresh");

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let _guard = self.refresh_guard.lock().await;
				let current = self.load().await?.ok_or(Error::TokenUnavailable)?;

				if current.access_token != rejected.access_token {
					self.refresh_metrics.record_reuse();

					return Ok(current);
				}

				self.rotate_locked(&current).await
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	async fn rotate_locked(&self, current: &Credential) -> Result<Credential> {
		self.refresh_metrics.record_attempt();

		let issued_at = OffsetDateTime::now_utc();
		let grant = match self.issuer.refresh(&self.client, current.refresh_token.expose()).await {
			Ok(grant) => grant,
			Err(e) => {
				self.refresh_metrics.record_failure();

				return Err(e);
			},
		};
		let candidate = Credential::from_grant(grant, issued_at, Some(&current.refresh_token))
			.map_err(|e| {
				self.refresh_metrics.record_failure();

				Error::from(e)
			})?;
		let stored = self.persist(candidate).await.inspect_err(|_| {
			self.refresh_metrics.record_failure();
		})?;

		self.refresh_metrics.record_success();

		tracing::info!(expires_at = %stored.access_token_expiry, "refreshed the credential");

		Ok(stored)
	}
}
