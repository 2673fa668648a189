//! Authorized lookups of artist profiles on the platform.
//!
//! [`ArtistApiClient`] checks credential freshness before every call through the shared
//! [`CredentialManager`], then sends `Authorization: OAuth <token>`. A 401 triggers exactly one
//! forced refresh and one retry of the same request; the refresh guard is never held across the
//! lookup itself.

// crates.io
use reqwest::header::{ACCEPT, AUTHORIZATION, HeaderMap};
// self
use crate::{
	_prelude::*,
	auth::Credential,
	error::{self, ConfigError, TransportError},
	flows::CredentialManager,
	http::{self, ReqwestHttpClient},
	obs::{self, FlowKind, FlowOutcome, FlowSpan},
};

/// Production API base.
pub const DEFAULT_API_BASE: &str = "https://api.soundcloud.com";

const RESOLVE_ENDPOINT: &str = "resolve";
const USERS_ENDPOINT: &str = "users";
const JSON_ACCEPT: &str = "application/json; charset=utf-8";

/// Profile fields returned by the resolve and user endpoints.
///
/// Everything but the identifier may be absent or `null` upstream.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalArtistSnapshot {
	/// Platform user identifier.
	#[serde(rename = "id")]
	pub external_id: u64,
	/// Account handle.
	#[serde(default)]
	pub username: Option<String>,
	/// Display name.
	#[serde(default)]
	pub full_name: Option<String>,
	/// Given name.
	#[serde(default)]
	pub first_name: Option<String>,
	/// Family name.
	#[serde(default)]
	pub last_name: Option<String>,
	/// Avatar image URL.
	#[serde(default)]
	pub avatar_url: Option<String>,
	/// City.
	#[serde(default)]
	pub city: Option<String>,
	/// Country.
	#[serde(default)]
	pub country: Option<String>,
	/// Profile description.
	#[serde(default)]
	pub description: Option<String>,
	/// Profile slug on the platform.
	#[serde(default)]
	pub permalink: Option<String>,
}

enum Reply {
	Body(Vec<u8>),
	Unauthorized,
}

/// Client for the platform's artist lookups.
#[derive(Clone, Debug)]
pub struct ArtistApiClient {
	manager: CredentialManager,
	http_client: ReqwestHttpClient,
	base_url: Url,
}
impl ArtistApiClient {
	/// Creates a client with its own redirect-following transport bounded by `timeout`.
	pub fn new(manager: CredentialManager, base_url: Url, timeout: Duration) -> Result<Self> {
		let http_client = ReqwestHttpClient::for_api(timeout)?;

		Ok(Self::with_http_client(manager, base_url, http_client))
	}

	/// Creates a client that reuses the caller-provided transport.
	pub fn with_http_client(
		manager: CredentialManager,
		mut base_url: Url,
		http_client: ReqwestHttpClient,
	) -> Self {
		if !base_url.path().ends_with('/') {
			let path = format!("{}/", base_url.path());

			base_url.set_path(&path);
		}

		Self { manager, http_client, base_url }
	}

	/// Resolves a profile URL such as `https://soundcloud.com/<slug>` into its snapshot.
	pub async fn fetch_by_permalink(&self, permalink: &str) -> Result<ExternalArtistSnapshot> {
		let mut url = self.endpoint(RESOLVE_ENDPOINT, RESOLVE_ENDPOINT)?;

		url.query_pairs_mut().append_pair("url", permalink);

		self.fetch(RESOLVE_ENDPOINT, url, permalink).await
	}

	/// Fetches a profile by its platform identifier.
	pub async fn fetch_by_id(&self, id: u64) -> Result<ExternalArtistSnapshot> {
		let url = self.endpoint(USERS_ENDPOINT, &format!("{USERS_ENDPOINT}/{id}"))?;

		self.fetch(USERS_ENDPOINT, url, &id.to_string()).await
	}

	fn endpoint(&self, label: &'static str, path: &str) -> Result<Url> {
		self.base_url
			.join(path)
			.map_err(|source| ConfigError::InvalidEndpoint { endpoint: label, source }.into())
	}

	async fn fetch(
		&self,
		endpoint: &'static str,
		url: Url,
		resource: &str,
	) -> Result<ExternalArtistSnapshot> {
		const KIND: FlowKind = FlowKind::Resolve;

		let span = FlowSpan::new(KIND, endpoint);

		obs::record_flow_outcome(KIND, FlowOutcome::Attempt);

		let result = span
			.instrument(async move {
				let credential = self.manager.ensure_fresh().await?;
				let body = match self.send(endpoint, &url, &credential, resource).await? {
					Reply::Body(body) => body,
					Reply::Unauthorized => {
						tracing::warn!(endpoint, "access token rejected; forcing one refresh");

						let refreshed = self.manager.force_refresh(&credential).await?;

						match self.send(endpoint, &url, &refreshed, resource).await? {
							Reply::Body(body) => body,
							Reply::Unauthorized => return Err(Error::Unauthorized),
						}
					},
				};
				let snapshot: ExternalArtistSnapshot = error::decode_json(endpoint, &body)?;

				Ok(snapshot)
			})
			.await;

		obs::record_result(KIND, &result);

		result
	}

	async fn send(
		&self,
		endpoint: &'static str,
		url: &Url,
		credential: &Credential,
		resource: &str,
	) -> Result<Reply> {
		let response = self
			.http_client
			.get(url.clone())
			.header(ACCEPT, JSON_ACCEPT)
			.header(AUTHORIZATION, format!("OAuth {}", credential.access_token.expose()))
			.send()
			.await
			.map_err(|e| TransportError::from_reqwest(endpoint, e))?;
		let status = response.status();

		if status == StatusCode::UNAUTHORIZED {
			return Ok(Reply::Unauthorized);
		}
		if !status.is_success() {
			return Err(map_status(status, response.headers(), resource));
		}

		let body = response.bytes().await.map_err(|e| TransportError::from_reqwest(endpoint, e))?;

		Ok(Reply::Body(body.to_vec()))
	}
}

fn map_status(status: StatusCode, headers: &HeaderMap, resource: &str) -> Error {
	match status {
		StatusCode::NOT_FOUND => Error::NotFound { resource: resource.to_owned() },
		StatusCode::TOO_MANY_REQUESTS =>
			Error::RateLimited { retry_after: http::parse_retry_after(headers) },
		_ => Error::UnexpectedStatus { status: status.as_u16() },
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use reqwest::header::{HeaderValue, RETRY_AFTER};
	// self
	use super::*;
	use crate::{_preludet::*, store::MemoryStore};

	fn client_with_base(base: &str) -> ArtistApiClient {
		let manager = CredentialManager::new(
			Arc::new(MemoryStore::default()),
			Arc::new(StubIssuer::granting(3600)),
			test_client_credentials(),
		);

		ArtistApiClient::with_http_client(
			manager,
			Url::parse(base).expect("Test base URL should parse."),
			ReqwestHttpClient::default(),
		)
	}

	#[test]
	fn endpoints_join_under_the_base_path() {
		let client = client_with_base("https://api.example.com/v1");
		let users = client.endpoint(USERS_ENDPOINT, "users/42").expect("Users URL should join.");

		assert_eq!(users.as_str(), "https://api.example.com/v1/users/42");

		let mut resolve =
			client.endpoint(RESOLVE_ENDPOINT, RESOLVE_ENDPOINT).expect("Resolve URL should join.");

		resolve.query_pairs_mut().append_pair("url", "https://soundcloud.com/x y");

		assert_eq!(
			resolve.as_str(),
			"https://api.example.com/v1/resolve?url=https%3A%2F%2Fsoundcloud.com%2Fx+y"
		);
	}

	#[test]
	fn statuses_map_to_error_variants() {
		let mut headers = HeaderMap::new();

		assert!(matches!(
			map_status(StatusCode::NOT_FOUND, &headers, "x"),
			Error::NotFound { resource } if resource == "x"
		));

		headers.insert(RETRY_AFTER, HeaderValue::from_static("7"));

		assert!(matches!(
			map_status(StatusCode::TOO_MANY_REQUESTS, &headers, "x"),
			Error::RateLimited { retry_after: Some(delay) } if delay == Duration::seconds(7)
		));
		assert!(matches!(
			map_status(StatusCode::BAD_GATEWAY, &headers, "x"),
			Error::UnexpectedStatus { status: 502 }
		));
	}

	#[test]
	fn snapshots_tolerate_nulls_and_missing_fields() {
		let snapshot: ExternalArtistSnapshot =
			serde_json::from_str(r#"{"id":7,"username":"x","city":null,"extra":true}"#)
				.expect("Sparse payloads should decode.");

		assert_eq!(snapshot.external_id, 7);
		assert_eq!(snapshot.username.as_deref(), Some("x"));
		assert!(snapshot.city.is_none());
		assert!(snapshot.permalink.is_none());
	}
}
