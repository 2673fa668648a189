//! Keep local artist records in sync with a music platform.
//!
//! The crate persists a single OAuth credential, refreshes it from a background scheduler and
//! from every API call without ever running two refreshes at once, and merges resolved profiles
//! into local artists while tolerating per-artist failures.

#![deny(clippy::all)]
#![warn(missing_docs, unused_crate_dependencies)]

pub mod api;
pub mod artist;
pub mod auth;
pub mod config;
pub mod error;
pub mod flows;
pub mod http;
pub mod issuer;
pub mod obs;
pub mod scheduler;
pub mod store;
pub mod sync;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::{
		collections::VecDeque,
		sync::atomic::{AtomicUsize, Ordering},
	};
	// self
	use crate::{
		api::ArtistApiClient,
		auth::{ClientCredentials, Credential, TokenSecret},
		flows::CredentialManager,
		http::ReqwestHttpClient,
		issuer::{GrantResponse, HttpTokenIssuer, IssuerFuture, TokenIssuer},
		store::{CredentialStore, MemoryStore},
	};

	/// Client identifier used by test fixtures.
	pub const TEST_CLIENT_ID: &str = "client-sync";
	/// Client secret used by test fixtures.
	pub const TEST_CLIENT_SECRET: &str = "secret-sync";

	/// Timeout used by test transports.
	pub const TEST_REQUEST_TIMEOUT: Duration = Duration::seconds(5);

	/// Returns a reqwest builder that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn insecure_client_builder() -> reqwest::ClientBuilder {
		ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
	}

	/// Builds an API transport (limited redirects) over the insecure test builder.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		ReqwestHttpClient::api_from(insecure_client_builder(), TEST_REQUEST_TIMEOUT)
			.expect("Failed to build insecure Reqwest client for tests.")
	}

	/// Builds a token endpoint transport (no redirects, `timeout` bound) over the insecure test
	/// builder.
	pub fn test_token_http_client(timeout: Duration) -> ReqwestHttpClient {
		ReqwestHttpClient::token_endpoint_from(insecure_client_builder(), timeout)
			.expect("Failed to build insecure token endpoint client for tests.")
	}

	/// Returns the client credentials shared by test fixtures.
	pub fn test_client_credentials() -> ClientCredentials {
		ClientCredentials::new(TEST_CLIENT_ID, TEST_CLIENT_SECRET)
			.expect("Test client credentials should be valid.")
	}

	/// Builds a credential whose access token expires `expires_in` from now.
	pub fn credential_expiring_in(access: &str, refresh: &str, expires_in: Duration) -> Credential {
		let expiry = OffsetDateTime::now_utc() + expires_in;

		Credential::builder()
			.access_token(access)
			.refresh_token(refresh)
			.access_token_expiry(expiry)
			.refresh_token_expiry(expiry)
			.build()
			.expect("Credential fixture should build successfully.")
	}

	/// Seeds a memory store with a credential expiring `expires_in` from now.
	pub async fn seed_store(
		access: &str,
		refresh: &str,
		expires_in: Duration,
	) -> (Arc<MemoryStore>, Credential) {
		let store = Arc::new(MemoryStore::default());
		let credential = credential_expiring_in(access, refresh, expires_in);
		let stored =
			store.upsert(credential).await.expect("Failed to seed credential into the store.");

		(store, stored)
	}

	/// Builds a manager over `store` that mints tokens through `issuer`.
	pub fn stub_manager(
		store: Arc<dyn CredentialStore>,
		issuer: Arc<dyn TokenIssuer>,
	) -> CredentialManager {
		CredentialManager::new(store, issuer, test_client_credentials())
	}

	/// Builds an HTTP token issuer posting to `token_url` with the insecure test transport.
	pub fn mock_token_issuer(token_url: &str) -> HttpTokenIssuer {
		mock_token_issuer_with_timeout(token_url, TEST_REQUEST_TIMEOUT)
	}

	/// Same as [`mock_token_issuer`] with a caller-chosen request timeout.
	pub fn mock_token_issuer_with_timeout(token_url: &str, timeout: Duration) -> HttpTokenIssuer {
		let endpoint = Url::parse(token_url).expect("Mock token URL should parse.");

		HttpTokenIssuer::with_http_client(endpoint, test_token_http_client(timeout))
	}

	/// Builds an API client against a mock server base URL.
	pub fn mock_api_client(manager: CredentialManager, base_url: &str) -> ArtistApiClient {
		let base = Url::parse(base_url).expect("Mock API base URL should parse.");

		ArtistApiClient::with_http_client(manager, base, test_reqwest_http_client())
	}

	/// Scripted reply produced by [`StubIssuer`].
	#[derive(Clone, Debug)]
	pub enum StubReply {
		/// Mint `access-<n>`/`refresh-<n>` with the given lifetime in seconds.
		Grant {
			/// Lifetime reported as `expires_in`.
			expires_in: i64,
		},
		/// Fail with [`Error::AuthServer`] using the given status.
		Reject {
			/// HTTP status reported by the fake token endpoint.
			status: u16,
		},
	}

	/// Counting [`TokenIssuer`] double.
	///
	/// Replies are consumed from a script; once it is exhausted the fallback reply repeats.
	#[derive(Debug)]
	pub struct StubIssuer {
		script: Mutex<VecDeque<StubReply>>,
		fallback: StubReply,
		delay: Option<std::time::Duration>,
		minted: AtomicUsize,
		issue_calls: AtomicUsize,
		refresh_calls: AtomicUsize,
		refresh_tokens_seen: Mutex<Vec<String>>,
	}
	impl StubIssuer {
		/// Issuer that always grants tokens valid for `expires_in` seconds.
		pub fn granting(expires_in: i64) -> Self {
			Self::with_fallback(StubReply::Grant { expires_in })
		}

		/// Issuer that always rejects with `status`.
		pub fn rejecting(status: u16) -> Self {
			Self::with_fallback(StubReply::Reject { status })
		}

		fn with_fallback(fallback: StubReply) -> Self {
			Self {
				script: Mutex::new(VecDeque::new()),
				fallback,
				delay: None,
				minted: AtomicUsize::new(0),
				issue_calls: AtomicUsize::new(0),
				refresh_calls: AtomicUsize::new(0),
				refresh_tokens_seen: Mutex::new(Vec::new()),
			}
		}

		/// Queues replies consumed before the fallback applies.
		pub fn with_script(self, replies: impl IntoIterator<Item = StubReply>) -> Self {
			self.script.lock().extend(replies);

			self
		}

		/// Delays every reply so concurrent callers overlap.
		pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
			self.delay = Some(delay);

			self
		}

		/// Number of client-credentials grants requested.
		pub fn issue_calls(&self) -> usize {
			self.issue_calls.load(Ordering::SeqCst)
		}

		/// Number of refresh grants requested.
		pub fn refresh_calls(&self) -> usize {
			self.refresh_calls.load(Ordering::SeqCst)
		}

		/// Refresh tokens presented to the issuer, in call order.
		pub fn refresh_tokens_seen(&self) -> Vec<String> {
			self.refresh_tokens_seen.lock().clone()
		}

		async fn reply(&self) -> Result<GrantResponse> {
			if let Some(delay) = self.delay {
				tokio::time::sleep(delay).await;
			}

			let reply = self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone());

			match reply {
				StubReply::Grant { expires_in } => {
					let n = self.minted.fetch_add(1, Ordering::SeqCst) + 1;

					Ok(GrantResponse {
						access_token: TokenSecret::new(format!("access-{n}")),
						refresh_token: Some(TokenSecret::new(format!("refresh-{n}"))),
						expires_in,
						scope: None,
					})
				},
				StubReply::Reject { status } =>
					Err(Error::AuthServer { status, message: "stub rejection".into() }),
			}
		}
	}
	impl TokenIssuer for StubIssuer {
		fn issue_client_credentials<'a>(
			&'a self,
			_client: &'a ClientCredentials,
		) -> IssuerFuture<'a> {
			Box::pin(async move {
				self.issue_calls.fetch_add(1, Ordering::SeqCst);

				self.reply().await
			})
		}

		fn refresh<'a>(
			&'a self,
			_client: &'a ClientCredentials,
			refresh_token: &'a str,
		) -> IssuerFuture<'a> {
			Box::pin(async move {
				self.refresh_calls.fetch_add(1, Ordering::SeqCst);
				self.refresh_tokens_seen.lock().push(refresh_token.to_owned());

				self.reply().await
			})
		}
	}
}

mod _prelude {
	pub use std::{
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::{Mutex, RwLock};
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError, StatusCode};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

pub use reqwest;
pub use url;
#[cfg(test)] use {artist_sync as _, color_eyre as _, httpmock as _, tracing_subscriber as _};
