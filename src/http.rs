//! Transport primitives shared by the token issuer and the platform API client.
//!
//! Both callers go through [`ReqwestHttpClient`], a thin wrapper over [`ReqwestClient`] that
//! keeps timeout and redirect settings in one place. Token requests use a client that never
//! follows redirects, while the API client follows them because the platform answers
//! `/resolve` with a redirect to the canonical resource.

// std
use std::ops::Deref;
// crates.io
use reqwest::{
	ClientBuilder,
	header::{HeaderMap, RETRY_AFTER},
	redirect::Policy,
};
use time::format_description::well_known::Rfc2822;
// self
use crate::{_prelude::*, error::ConfigError};

/// Default bound applied to every outbound request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::seconds(10);

const API_MAX_REDIRECTS: usize = 5;

/// Wrapper around [`ReqwestClient`] so shared HTTP behavior lives in one place.
#[derive(Clone, Debug, Default)]
pub struct ReqwestHttpClient(pub ReqwestClient);
impl ReqwestHttpClient {
	/// Wraps an existing reqwest [`ReqwestClient`].
	pub fn with_client(client: ReqwestClient) -> Self {
		Self(client)
	}

	/// Builds a client for the token endpoint: bounded timeout, redirects disabled.
	pub fn for_token_endpoint(timeout: Duration) -> Result<Self, ConfigError> {
		Self::token_endpoint_from(ReqwestClient::builder(), timeout)
	}

	/// Applies the token endpoint policy to a caller-prepared builder (custom TLS roots, proxies).
	pub fn token_endpoint_from(
		builder: ClientBuilder,
		timeout: Duration,
	) -> Result<Self, ConfigError> {
		Self::build(builder, timeout, Policy::none())
	}

	/// Builds a client for platform API calls: bounded timeout, limited redirect following.
	pub fn for_api(timeout: Duration) -> Result<Self, ConfigError> {
		Self::api_from(ReqwestClient::builder(), timeout)
	}

	/// Applies the API policy to a caller-prepared builder.
	pub fn api_from(builder: ClientBuilder, timeout: Duration) -> Result<Self, ConfigError> {
		Self::build(builder, timeout, Policy::limited(API_MAX_REDIRECTS))
	}

	fn build(
		builder: ClientBuilder,
		timeout: Duration,
		redirect: Policy,
	) -> Result<Self, ConfigError> {
		let client = builder
			.timeout(timeout.unsigned_abs())
			.redirect(redirect)
			.build()
			.map_err(ConfigError::http_client_build)?;

		Ok(Self(client))
	}
}
impl AsRef<ReqwestClient> for ReqwestHttpClient {
	fn as_ref(&self) -> &ReqwestClient {
		&self.0
	}
}
impl Deref for ReqwestHttpClient {
	type Target = ReqwestClient;

	fn deref(&self) -> &Self::Target {
		&self.0
	}
}

/// Parses a `Retry-After` header expressed either in seconds or as an HTTP date.
pub(crate) fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
	let value = headers.get(RETRY_AFTER)?;
	let raw = value.to_str().ok()?.trim();

	if let Ok(secs) = raw.parse::<i64>() {
		return Some(Duration::seconds(secs));
	}
	if let Ok(moment) = OffsetDateTime::parse(raw, &Rfc2822) {
		let delta = moment - OffsetDateTime::now_utc();

		if delta.is_positive() {
			return Some(delta);
		}
	}

	None
}

/// Truncates a response body so it can be embedded in error messages.
pub(crate) fn body_preview(bytes: &[u8]) -> String {
	const LIMIT: usize = 256;

	let text = String::from_utf8_lossy(bytes);

	if text.chars().count() <= LIMIT {
		return text.into_owned();
	}

	let mut buf: String = text.chars().take(LIMIT).collect();

	buf.push('…');

	buf
}
