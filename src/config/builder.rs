// std
use std::path::PathBuf;
// self
use crate::{
	_prelude::*,
	api::DEFAULT_API_BASE,
	auth::{ClientCredentials, TokenSecret},
	config::{DEFAULT_TOKEN_URL, SyncConfig},
	error::ConfigError,
	flows::DEFAULT_EXPIRY_MARGIN,
	http::DEFAULT_REQUEST_TIMEOUT,
	scheduler::{DEFAULT_ALERT_THRESHOLD, DEFAULT_REFRESH_INTERVAL},
};

/// Builder for [`SyncConfig`] values.
#[derive(Debug)]
pub struct SyncConfigBuilder {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret; redacted in `Debug` output.
	pub client_secret: TokenSecret,
	/// Token endpoint override.
	pub token_endpoint: Option<Url>,
	/// API base override.
	pub api_base: Option<Url>,
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
impl SyncConfigBuilder {
	/// Creates a builder seeded with the client credentials and default settings.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self {
			client_id: client_id.into(),
			client_secret: TokenSecret::new(client_secret),
			token_endpoint: None,
			api_base: None,
			credential_path: None,
			request_timeout: DEFAULT_REQUEST_TIMEOUT,
			refresh_interval: DEFAULT_REFRESH_INTERVAL,
			expiry_margin: DEFAULT_EXPIRY_MARGIN,
			alert_threshold: DEFAULT_ALERT_THRESHOLD,
			concurrency: 1,
		}
	}

	/// Sets the token endpoint.
	pub fn token_endpoint(mut self, url: Url) -> Self {
		self.token_endpoint = Some(url);

		self
	}

	/// Sets the API base URL.
	pub fn api_base(mut self, url: Url) -> Self {
		self.api_base = Some(url);

		self
	}

	/// Persists the credential to a JSON snapshot at `path`.
	pub fn credential_path(mut self, path: impl Into<PathBuf>) -> Self {
		self.credential_path = Some(path.into());

		self
	}

	/// Sets the request timeout.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.request_timeout = timeout;

		self
	}

	/// Sets the scheduler interval.
	pub fn refresh_interval(mut self, interval: Duration) -> Self {
		self.refresh_interval = interval;

		self
	}

	/// Sets the expiry margin.
	pub fn expiry_margin(mut self, margin: Duration) -> Self {
		self.expiry_margin = margin;

		self
	}

	/// Sets the scheduler alert threshold.
	pub fn alert_threshold(mut self, threshold: u32) -> Self {
		self.alert_threshold = threshold;

		self
	}

	/// Sets the sync concurrency.
	pub fn concurrency(mut self, concurrency: usize) -> Self {
		self.concurrency = concurrency;

		self
	}

	/// Consumes the builder and validates the resulting configuration.
	pub fn build(self) -> Result<SyncConfig, ConfigError> {
		let client = ClientCredentials::new(&self.client_id, self.client_secret.expose())?;
		let token_endpoint = match self.token_endpoint {
			Some(url) => url,
			None => parse_endpoint("token", DEFAULT_TOKEN_URL)?,
		};
		let api_base = match self.api_base {
			Some(url) => url,
			None => parse_endpoint("api", DEFAULT_API_BASE)?,
		};
		let config = SyncConfig {
			client,
			token_endpoint,
			api_base,
			credential_path: self.credential_path,
			request_timeout: self.request_timeout,
			refresh_interval: self.refresh_interval,
			expiry_margin: self.expiry_margin,
			alert_threshold: self.alert_threshold.max(1),
			concurrency: self.concurrency,
		};

		config.validate()?;

		Ok(config)
	}
}

impl SyncConfig {
	fn validate(&self) -> Result<(), ConfigError> {
		validate_endpoint("token", &self.token_endpoint)?;
		validate_endpoint("api", &self.api_base)?;
		validate_positive("request_timeout", self.request_timeout)?;
		validate_positive("refresh_interval", self.refresh_interval)?;

		if self.expiry_margin.is_negative() {
			return Err(ConfigError::NonPositiveDuration { setting: "expiry_margin" });
		}
		if self.concurrency == 0 {
			return Err(ConfigError::ZeroConcurrency);
		}

		Ok(())
	}
}

pub(crate) fn parse_endpoint(name: &'static str, raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidEndpoint { endpoint: name, source })
}

fn validate_endpoint(name: &'static str, url: &Url) -> Result<(), ConfigError> {
	match url.scheme() {
		"http" | "https" => Ok(()),
		_ => Err(ConfigError::UnsupportedScheme { endpoint: name, url: url.to_string() }),
	}
}

fn validate_positive(setting: &'static str, value: Duration) -> Result<(), ConfigError> {
	if value.is_positive() { Ok(()) } else { Err(ConfigError::NonPositiveDuration { setting }) }
}
