//! Runtime configuration and the wiring of stores, issuer, client, scheduler, and sync run.

mod builder;

pub use builder::*;

// std
use std::{env, path::PathBuf};
// self
use crate::{
	_prelude::*,
	api::ArtistApiClient,
	artist::ArtistRepository,
	auth::ClientCredentials,
	error::ConfigError,
	flows::CredentialManager,
	issuer::HttpTokenIssuer,
	scheduler::RefreshScheduler,
	store::{CredentialStore, FileStore, MemoryStore},
	sync::SyncOrchestrator,
};

/// Production token endpoint.
pub const DEFAULT_TOKEN_URL: &str = "https://api.soundcloud.com/oauth2/token";

const ENV_CLIENT_ID: &str = "ARTIST_SYNC_CLIENT_ID";
const ENV_CLIENT_SECRET: &str = "ARTIST_SYNC_CLIENT_SECRET";
const ENV_TOKEN_URL: &str = "ARTIST_SYNC_TOKEN_URL";
const ENV_API_URL: &str = "ARTIST_SYNC_API_URL";
const ENV_CREDENTIAL_PATH: &str = "ARTIST_SYNC_CREDENTIAL_PATH";
const ENV_TIMEOUT_SECS: &str = "ARTIST_SYNC_TIMEOUT_SECS";
const ENV_REFRESH_INTERVAL_SECS: &str = "ARTIST_SYNC_REFRESH_INTERVAL_SECS";
const ENV_EXPIRY_MARGIN_SECS: &str = "ARTIST_SYNC_EXPIRY_MARGIN_SECS";
const ENV_CONCURRENCY: &str = "ARTIST_SYNC_CONCURRENCY";

/// Validated settings for one deployment.
#[derive(Clone, Debug)]
pub struct SyncConfig {
	/// Client credentials presented to the token endpoint.
	pub client: ClientCredentials,
	/// Token endpoint URL.
	pub token_endpoint: Url,
	/// API base URL.
	pub api_base: Url,
	/// JSON snapshot path for the credential; in-memory when unset.
	pub credential_path: Option<PathBuf>,
	/// Bound applied to every outbound request.
	pub request_timeout: Duration,
	/// Interval between scheduler ticks.
	pub refresh_interval: Duration,
	/// Lookahead window for proactive refresh.
	pub expiry_margin: Duration,
	/// Consecutive scheduler failures before error-level logging.
	pub alert_threshold: u32,
	/// Artists synchronized in parallel.
	pub concurrency: usize,
}
impl SyncConfig {
	/// Returns a builder for the given client credentials.
	pub fn builder(
		client_id: impl Into<String>,
		client_secret: impl Into<String>,
	) -> SyncConfigBuilder {
		SyncConfigBuilder::new(client_id, client_secret)
	}

	/// Reads the configuration from `ARTIST_SYNC_*` environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|name| env::var(name).ok())
	}

	/// Reads the configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&'static str) -> Option<String>,
	{
		let required = |name: &'static str| {
			lookup(name).filter(|value| !value.is_empty()).ok_or(ConfigError::MissingVar { name })
		};
		let mut builder =
			SyncConfigBuilder::new(required(ENV_CLIENT_ID)?, required(ENV_CLIENT_SECRET)?);

		if let Some(raw) = lookup(ENV_TOKEN_URL) {
			builder = builder.token_endpoint(parse_endpoint("token", &raw)?);
		}
		if let Some(raw) = lookup(ENV_API_URL) {
			builder = builder.api_base(parse_endpoint("api", &raw)?);
		}
		if let Some(path) = lookup(ENV_CREDENTIAL_PATH).filter(|value| !value.is_empty()) {
			builder = builder.credential_path(path);
		}
		if let Some(secs) = parse_var::<i64, _>(&lookup, ENV_TIMEOUT_SECS)? {
			builder = builder.request_timeout(Duration::seconds(secs));
		}
		if let Some(secs) = parse_var::<i64, _>(&lookup, ENV_REFRESH_INTERVAL_SECS)? {
			builder = builder.refresh_interval(Duration::seconds(secs));
		}
		if let Some(secs) = parse_var::<i64, _>(&lookup, ENV_EXPIRY_MARGIN_SECS)? {
			builder = builder.expiry_margin(Duration::seconds(secs));
		}
		if let Some(concurrency) = parse_var::<usize, _>(&lookup, ENV_CONCURRENCY)? {
			builder = builder.concurrency(concurrency);
		}

		builder.build()
	}

	/// Opens the configured credential store.
	pub fn credential_store(&self) -> Result<Arc<dyn CredentialStore>> {
		let store: Arc<dyn CredentialStore> = match &self.credential_path {
			Some(path) => Arc::new(FileStore::open(path)?),
			None => Arc::new(MemoryStore::default()),
		};

		Ok(store)
	}

	/// Builds a credential manager over `store` backed by the HTTP token issuer.
	pub fn credential_manager(&self, store: Arc<dyn CredentialStore>) -> Result<CredentialManager> {
		let issuer = HttpTokenIssuer::new(self.token_endpoint.clone(), self.request_timeout)?;

		Ok(CredentialManager::new(store, Arc::new(issuer), self.client.clone())
			.with_expiry_margin(self.expiry_margin))
	}

	/// Builds the API client sharing `manager`.
	pub fn api_client(&self, manager: CredentialManager) -> Result<ArtistApiClient> {
		ArtistApiClient::new(manager, self.api_base.clone(), self.request_timeout)
	}

	/// Builds the refresh scheduler sharing `manager`.
	pub fn scheduler(&self, manager: CredentialManager) -> Result<RefreshScheduler, ConfigError> {
		Ok(RefreshScheduler::new(manager)
			.with_interval(self.refresh_interval)?
			.with_alert_threshold(self.alert_threshold))
	}

	/// Builds the sync orchestrator over `client` and `repository`.
	pub fn orchestrator(
		&self,
		client: ArtistApiClient,
		repository: Arc<dyn ArtistRepository>,
	) -> Result<SyncOrchestrator, ConfigError> {
		SyncOrchestrator::new(client, repository).with_concurrency(self.concurrency)
	}
}

fn parse_var<T, F>(lookup: &F, name: &'static str) -> Result<Option<T>, ConfigError>
where
	T: FromStr,
	F: Fn(&'static str) -> Option<String>,
{
	match lookup(name).filter(|value| !value.trim().is_empty()) {
		Some(raw) =>
			raw.trim().parse().map(Some).map_err(|_| ConfigError::InvalidVar { name, value: raw }),
		None => Ok(None),
	}
}
