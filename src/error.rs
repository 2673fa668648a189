//! Crate-level error types shared across the store, issuer, client, and sync layers.

// self
use crate::_prelude::*;

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Storage-layer failure.
	#[error("{0}")]
	Storage(
		#[from]
		#[source]
		crate::store::StoreError,
	),
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Transport failure (DNS, TCP, TLS, timeout).
	#[error(transparent)]
	Transport(#[from] TransportError),
	/// Response body could not be decoded.
	#[error(transparent)]
	Decode(#[from] DecodeError),

	/// Authorization server answered a grant request with a non-success status.
	#[error("Authorization server rejected the request with status {status}: {message}.")]
	AuthServer {
		/// HTTP status code returned by the token endpoint.
		status: u16,
		/// OAuth error fields or a body preview.
		message: String,
	},
	/// No credential exists yet; the client-credentials grant has never succeeded.
	#[error("No credential is available; the client-credentials grant has not been performed.")]
	TokenUnavailable,
	/// Platform rejected the access token even after a forced refresh.
	#[error("Platform rejected the access token.")]
	Unauthorized,
	/// Platform has no resource for the request.
	#[error("Platform has no resource for {resource}.")]
	NotFound {
		/// Permalink or identifier that failed to resolve.
		resource: String,
	},
	/// Platform throttled the request.
	#[error("Platform rate limited the request.")]
	RateLimited {
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Platform returned a status the client has no mapping for.
	#[error("Platform returned unexpected status {status}.")]
	UnexpectedStatus {
		/// HTTP status code.
		status: u16,
	},
}
impl Error {
	/// Returns a stable label suitable for log fields or metric labels.
	pub const fn kind(&self) -> &'static str {
		match self {
			Self::Storage(_) => "storage",
			Self::Config(_) => "config",
			Self::Transport(_) => "network",
			Self::Decode(_) => "decode",
			Self::AuthServer { .. } => "auth_server",
			Self::TokenUnavailable => "token_unavailable",
			Self::Unauthorized => "unauthorized",
			Self::NotFound { .. } => "not_found",
			Self::RateLimited { .. } => "rate_limited",
			Self::UnexpectedStatus { .. } => "unexpected_status",
		}
	}

	/// Returns `true` for failures raised by the credential store.
	pub fn is_storage(&self) -> bool {
		matches!(self, Self::Storage(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// Endpoint URL cannot be parsed or joined.
	#[error("The {endpoint} endpoint is not a valid URL.")]
	InvalidEndpoint {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// Endpoint uses a scheme other than http or https.
	#[error("The {endpoint} endpoint must use http or https: {url}.")]
	UnsupportedScheme {
		/// Which endpoint failed validation.
		endpoint: &'static str,
		/// Endpoint URL that failed validation.
		url: String,
	},
	/// Client identifier failed validation.
	#[error("Client identifier is invalid.")]
	InvalidClientId(#[from] crate::auth::IdentifierError),
	/// Client secret is empty.
	#[error("Client secret cannot be empty.")]
	EmptyClientSecret,
	/// A required environment variable is missing.
	#[error("Environment variable `{name}` is not set.")]
	MissingVar {
		/// Variable name.
		name: &'static str,
	},
	/// An environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{name}` has an invalid value: {value}.")]
	InvalidVar {
		/// Variable name.
		name: &'static str,
		/// Raw value.
		value: String,
	},
	/// A duration setting must be positive.
	#[error("The {setting} setting must be a positive duration.")]
	NonPositiveDuration {
		/// Setting name.
		setting: &'static str,
	},
	/// Sync concurrency must be at least one.
	#[error("Sync concurrency must be at least one.")]
	ZeroConcurrency,
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}

/// Transport-level failures (network, timeout).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint label (token, resolve, users).
		endpoint: &'static str,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// The request exceeded its timeout bound.
	#[error("Request to the {endpoint} endpoint timed out.")]
	Timeout {
		/// Endpoint label (token, resolve, users).
		endpoint: &'static str,
	},
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(
		endpoint: &'static str,
		src: impl 'static + Send + Sync + std::error::Error,
	) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}

	/// Classifies a reqwest failure, separating timeouts from other network errors.
	pub fn from_reqwest(endpoint: &'static str, e: ReqwestError) -> Self {
		if e.is_timeout() { Self::Timeout { endpoint } } else { Self::network(endpoint, e) }
	}
}

/// Malformed response bodies.
#[derive(Debug, ThisError)]
pub enum DecodeError {
	/// Body is not valid JSON for the expected shape.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	Json {
		/// Endpoint label (token, resolve, users).
		endpoint: &'static str,
		/// Structured parsing failure including the field path.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// A required field was present but empty.
	#[error("The {endpoint} endpoint returned an empty {field}.")]
	EmptyField {
		/// Endpoint label.
		endpoint: &'static str,
		/// Field name.
		field: &'static str,
	},
	/// Token endpoint returned a non-positive lifetime.
	#[error("The expires_in value must be positive, got {value}.")]
	NonPositiveExpiresIn {
		/// Raw value.
		value: i64,
	},
	/// Token endpoint returned a lifetime that overflows the clock.
	#[error("The expires_in value exceeds the supported range.")]
	ExpiresInOutOfRange,
}

/// Decodes a JSON body with field-path aware errors.
pub(crate) fn decode_json<T>(endpoint: &'static str, bytes: &[u8]) -> Result<T, DecodeError>
where
	T: serde::de::DeserializeOwned,
{
	let mut de = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut de).map_err(|source| DecodeError::Json { endpoint, source })
}
