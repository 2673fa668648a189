//! OAuth 2.0 grant exchanges against the platform token endpoint.
//!
//! [`TokenIssuer`] is the only seam through which credentials are minted. The HTTP
//! implementation posts a form-encoded body with `client_id`/`client_secret` in the request
//! body, bounds every call with the client timeout, and never retries; retry policy belongs to
//! the callers (the refresh scheduler retries on its next tick).

// crates.io
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use url::form_urlencoded::Serializer;
// self
use crate::{
	_prelude::*,
	auth::{ClientCredentials, TokenSecret},
	error::{self, TransportError},
	http::{self, ReqwestHttpClient},
};

/// Boxed future returned by [`TokenIssuer`] operations.
pub type IssuerFuture<'a> = Pin<Box<dyn Future<Output = Result<GrantResponse>> + 'a + Send>>;

const TOKEN_ENDPOINT: &str = "token";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";
const JSON_ACCEPT: &str = "application/json";

/// Grant types sent as `grant_type`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrantType {
	/// Client Credentials grant for app-only tokens.
	ClientCredentials,
	/// Refresh Token grant rotating an existing pair.
	RefreshToken,
}
impl GrantType {
	/// Returns the RFC 6749 identifier for the grant type.
	pub const fn as_str(self) -> &'static str {
		match self {
			GrantType::ClientCredentials => "client_credentials",
			GrantType::RefreshToken => "refresh_token",
		}
	}
}
impl Display for GrantType {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Successful token endpoint payload.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrantResponse {
	/// Newly minted access token.
	pub access_token: TokenSecret,
	/// Newly minted refresh token; providers may omit it on refresh.
	#[serde(default)]
	pub refresh_token: Option<TokenSecret>,
	/// Access token lifetime in seconds.
	pub expires_in: i64,
	/// Granted scope string, if reported.
	#[serde(default)]
	pub scope: Option<String>,
}

/// Performs the two grant exchanges used by the credential lifecycle.
pub trait TokenIssuer
where
	Self: Send + Sync,
{
	/// Exchanges the client credentials for a fresh token pair.
	fn issue_client_credentials<'a>(&'a self, client: &'a ClientCredentials) -> IssuerFuture<'a>;

	/// Exchanges a refresh token for a rotated token pair.
	fn refresh<'a>(
		&'a self,
		client: &'a ClientCredentials,
		refresh_token: &'a str,
	) -> IssuerFuture<'a>;
}

#[derive(Debug, Default, Deserialize)]
struct OAuthErrorBody {
	#[serde(default)]
	error: Option<String>,
	#[serde(default)]
	error_description: Option<String>,
}

/// [`TokenIssuer`] backed by reqwest and a fixed token endpoint.
#[derive(Clone, Debug)]
pub struct HttpTokenIssuer {
	http_client: ReqwestHttpClient,
	token_endpoint: Url,
}
impl HttpTokenIssuer {
	/// Creates an issuer that reuses the caller-provided transport.
	pub fn with_http_client(token_endpoint: Url, http_client: ReqwestHttpClient) -> Self {
		Self { http_client, token_endpoint }
	}

	/// Creates an issuer with its own no-redirect transport bounded by `timeout`.
	pub fn new(token_endpoint: Url, timeout: Duration) -> Result<Self> {
		let http_client = ReqwestHttpClient::for_token_endpoint(timeout)?;

		Ok(Self::with_http_client(token_endpoint, http_client))
	}

	async fn exchange(
		&self,
		grant: GrantType,
		client: &ClientCredentials,
		refresh_token: Option<&str>,
	) -> Result<GrantResponse> {
		// The serializer is not `Send`; it must be dropped before the first await.
		let body = {
			let mut form = Serializer::new(String::new());

			form.append_pair("grant_type", grant.as_str())
				.append_pair("client_id", client.client_id.as_ref())
				.append_pair("client_secret", client.client_secret.expose());

			if let Some(refresh_token) = refresh_token {
				form.append_pair("refresh_token", refresh_token);
			}

			form.finish()
		};
		let response = self
			.http_client
			.post(self.token_endpoint.clone())
			.header(CONTENT_TYPE, FORM_CONTENT_TYPE)
			.header(ACCEPT, JSON_ACCEPT)
			.body(body)
			.send()
			.await
			.map_err(|e| TransportError::from_reqwest(TOKEN_ENDPOINT, e))?;
		let status = response.status();
		let body =
			response.bytes().await.map_err(|e| TransportError::from_reqwest(TOKEN_ENDPOINT, e))?;

		if !status.is_success() {
			tracing::debug!(
				grant = grant.as_str(),
				status = status.as_u16(),
				"token endpoint rejected grant"
			);

			return Err(Error::AuthServer {
				status: status.as_u16(),
				message: describe_rejection(&body),
			});
		}

		let grant_response: GrantResponse = error::decode_json(TOKEN_ENDPOINT, &body)?;

		Ok(grant_response)
	}
}
impl TokenIssuer for HttpTokenIssuer {
	fn issue_client_credentials<'a>(&'a self, client: &'a ClientCredentials) -> IssuerFuture<'a> {
		Box::pin(self.exchange(GrantType::ClientCredentials, client, None))
	}

	fn refresh<'a>(
		&'a self,
		client: &'a ClientCredentials,
		refresh_token: &'a str,
	) -> IssuerFuture<'a> {
		Box::pin(self.exchange(GrantType::RefreshToken, client, Some(refresh_token)))
	}
}

fn describe_rejection(body: &[u8]) -> String {
	let parsed = serde_json::from_slice::<OAuthErrorBody>(body).unwrap_or_default();

	match (parsed.error, parsed.error_description) {
		(Some(error), Some(description)) => format!("{error} ({description})"),
		(Some(error), None) => error,
		(None, Some(description)) => description,
		(None, None) if body.is_empty() => "empty response body".into(),
		(None, None) => http::body_preview(body),
	}
}
