//! The singleton credential record, its lifecycle states, and its builder.

// self
use crate::{
	_prelude::*,
	auth::token::secret::TokenSecret,
	error::DecodeError,
	issuer::GrantResponse,
};

/// Position of a credential in its lifecycle relative to an instant and an expiry margin.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CredentialState {
	/// No credential has been persisted yet.
	Absent,
	/// Access token is valid beyond the expiry margin.
	Valid,
	/// Access token expires within the expiry margin.
	NearExpiry,
	/// Access token is past its expiry instant.
	Expired,
}
impl CredentialState {
	/// Returns `true` when a refresh should run before the credential is used.
	pub const fn needs_refresh(self) -> bool {
		matches!(self, Self::NearExpiry | Self::Expired)
	}

	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Absent => "absent",
			Self::Valid => "valid",
			Self::NearExpiry => "near_expiry",
			Self::Expired => "expired",
		}
	}
}
impl Display for CredentialState {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Errors produced by [`CredentialBuilder`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CredentialBuilderError {
	/// Issued when no access token value was provided.
	#[error("Access token is required.")]
	MissingAccessToken,
	/// Issued when no refresh token value was provided.
	#[error("Refresh token is required.")]
	MissingRefreshToken,
	/// Issued when no access token expiry (absolute or relative) was configured.
	#[error("Expiry must be supplied via access_token_expiry or expires_in.")]
	MissingExpiry,
}

/// The platform credential; exactly one is ever persisted.
///
/// Every field is replaced as a unit on refresh, so callers always observe a consistent
/// access/refresh pair.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
	/// Access token secret presented as `Authorization: OAuth <token>`.
	pub access_token: TokenSecret,
	/// Refresh token secret exchanged by the refresh grant.
	pub refresh_token: TokenSecret,
	/// Instant the access token stops being accepted.
	pub access_token_expiry: OffsetDateTime,
	/// Instant the refresh token stops being accepted.
	pub refresh_token_expiry: OffsetDateTime,
}
impl Credential {
	/// Returns a builder for assembling credentials.
	pub fn builder() -> CredentialBuilder {
		CredentialBuilder::default()
	}

	/// Builds a credential from a grant response received at `issued_at`.
	///
	/// Providers may omit the refresh token on the refresh grant; `previous_refresh` is kept in
	/// that case. The platform does not report a refresh-token lifetime, so both expiries share
	/// the access token's lifetime.
	pub fn from_grant(
		grant: GrantResponse,
		issued_at: OffsetDateTime,
		previous_refresh: Option<&TokenSecret>,
	) -> Result<Self, DecodeError> {
		if grant.access_token.is_empty() {
			return Err(DecodeError::EmptyField { endpoint: "token", field: "access_token" });
		}
		if grant.expires_in <= 0 {
			return Err(DecodeError::NonPositiveExpiresIn { value: grant.expires_in });
		}

		let expiry = issued_at
			.checked_add(Duration::seconds(grant.expires_in))
			.ok_or(DecodeError::ExpiresInOutOfRange)?;
		let refresh_token = grant
			.refresh_token
			.filter(|secret| !secret.is_empty())
			.or_else(|| previous_refresh.cloned())
			.ok_or(DecodeError::EmptyField { endpoint: "token", field: "refresh_token" })?;

		Ok(Self {
			access_token: grant.access_token,
			refresh_token,
			access_token_expiry: expiry,
			refresh_token_expiry: expiry,
		})
	}

	/// Computes the lifecycle state at `instant` for the provided expiry margin.
	///
	/// The margin boundary is inclusive: an expiry exactly `margin` away is near expiry.
	pub fn state_at(&self, instant: OffsetDateTime, margin: Duration) -> CredentialState {
		if instant >= self.access_token_expiry {
			return CredentialState::Expired;
		}
		if self.access_token_expiry <= instant + margin {
			return CredentialState::NearExpiry;
		}

		CredentialState::Valid
	}
}
impl Debug for Credential {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Credential")
			.field("access_token", &"<redacted>")
			.field("refresh_token", &"<redacted>")
			.field("access_token_expiry", &self.access_token_expiry)
			.field("refresh_token_expiry", &self.refresh_token_expiry)
			.finish()
	}
}

/// Builder for [`Credential`].
#[derive(Clone, Debug, Default)]
pub struct CredentialBuilder {
	access_token: Option<TokenSecret>,
	refresh_token: Option<TokenSecret>,
	issued_at: Option<OffsetDateTime>,
	access_token_expiry: Option<OffsetDateTime>,
	refresh_token_expiry: Option<OffsetDateTime>,
	expires_in: Option<Duration>,
}
impl CredentialBuilder {
	/// Provides the access token value.
	pub fn access_token(mut self, token: impl Into<String>) -> Self {
		self.access_token = Some(TokenSecret::new(token));

		self
	}

	/// Provides the refresh token value.
	pub fn refresh_token(mut self, token: impl Into<String>) -> Self {
		self.refresh_token = Some(TokenSecret::new(token));

		self
	}

	/// Sets the instant relative expiries are measured from (defaults to now).
	pub fn issued_at(mut self, instant: OffsetDateTime) -> Self {
		self.issued_at = Some(instant);

		self
	}

	/// Sets an absolute access token expiry.
	pub fn access_token_expiry(mut self, instant: OffsetDateTime) -> Self {
		self.access_token_expiry = Some(instant);

		self
	}

	/// Sets an absolute refresh token expiry (defaults to the access token expiry).
	pub fn refresh_token_expiry(mut self, instant: OffsetDateTime) -> Self {
		self.refresh_token_expiry = Some(instant);

		self
	}

	/// Sets a relative access token lifetime from the issued instant.
	pub fn expires_in(mut self, duration: Duration) -> Self {
		self.expires_in = Some(duration);

		self
	}

	/// Consumes the builder and produces a [`Credential`].
	pub fn build(self) -> Result<Credential, CredentialBuilderError> {
		let access_token = self.access_token.ok_or(CredentialBuilderError::MissingAccessToken)?;
		let refresh_token =
			self.refresh_token.ok_or(CredentialBuilderError::MissingRefreshToken)?;
		let issued_at = self.issued_at.unwrap_or_else(OffsetDateTime::now_utc);
		let access_token_expiry = match (self.access_token_expiry, self.expires_in) {
			(Some(instant), _) => instant,
			(None, Some(delta)) => issued_at + delta,
			(None, None) => return Err(CredentialBuilderError::MissingExpiry),
		};

		Ok(Credential {
			access_token,
			refresh_token,
			access_token_expiry,
			refresh_token_expiry: self.refresh_token_expiry.unwrap_or(access_token_expiry),
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	fn grant(access: &str, refresh: Option<&str>, expires_in: i64) -> GrantResponse {
		GrantResponse {
			access_token: TokenSecret::new(access),
			refresh_token: refresh.map(TokenSecret::new),
			expires_in,
			scope: None,
		}
	}

	#[test]
	fn state_transitions_follow_the_margin() {
		let expiry = macros::datetime!(2025-01-01 01:00 UTC);
		let credential = Credential::builder()
			.access_token("access")
			.refresh_token("refresh")
			.access_token_expiry(expiry)
			.build()
			.expect("Credential builder should succeed for state transitions.");
		let margin = Duration::minutes(10);

		assert_eq!(
			credential.state_at(macros::datetime!(2025-01-01 00:49 UTC), margin),
			CredentialState::Valid
		);
		assert_eq!(
			credential.state_at(macros::datetime!(2025-01-01 00:50 UTC), margin),
			CredentialState::NearExpiry
		);
		assert_eq!(
			credential.state_at(macros::datetime!(2025-01-01 00:59 UTC), margin),
			CredentialState::NearExpiry
		);
		assert_eq!(
			credential.state_at(macros::datetime!(2025-01-01 01:00 UTC), margin),
			CredentialState::Expired
		);
		assert!(CredentialState::Expired.needs_refresh());
		assert!(!CredentialState::Valid.needs_refresh());
	}

	#[test]
	fn from_grant_derives_both_expiries() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let credential = Credential::from_grant(grant("a-1", Some("r-1"), 3600), issued, None)
			.expect("A well-formed grant should convert into a credential.");

		assert_eq!(credential.access_token.expose(), "a-1");
		assert_eq!(credential.refresh_token.expose(), "r-1");
		assert_eq!(credential.access_token_expiry, macros::datetime!(2025-01-01 01:00 UTC));
		assert_eq!(credential.refresh_token_expiry, credential.access_token_expiry);
	}

	#[test]
	fn from_grant_keeps_previous_refresh_token_when_omitted() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);
		let previous = TokenSecret::new("r-old");
		let credential =
			Credential::from_grant(grant("a-2", None, 60), issued, Some(&previous))
				.expect("Missing refresh tokens should fall back to the previous one.");

		assert_eq!(credential.refresh_token.expose(), "r-old");

		let err = Credential::from_grant(grant("a-3", Some(""), 60), issued, None)
			.expect_err("A first grant without a refresh token cannot build a credential.");

		assert!(matches!(err, DecodeError::EmptyField { field: "refresh_token", .. }));
	}

	#[test]
	fn from_grant_rejects_malformed_lifetimes() {
		let issued = macros::datetime!(2025-01-01 00:00 UTC);

		assert!(matches!(
			Credential::from_grant(grant("a", Some("r"), 0), issued, None),
			Err(DecodeError::NonPositiveExpiresIn { value: 0 })
		));
		assert!(matches!(
			Credential::from_grant(grant("", Some("r"), 60), issued, None),
			Err(DecodeError::EmptyField { field: "access_token", .. })
		));
	}

	#[test]
	fn builder_requires_tokens_and_expiry() {
		assert_eq!(
			Credential::builder().refresh_token("r").expires_in(Duration::hours(1)).build(),
			Err(CredentialBuilderError::MissingAccessToken)
		);
		assert_eq!(
			Credential::builder().access_token("a").refresh_token("r").build(),
			Err(CredentialBuilderError::MissingExpiry)
		);

		let credential = Credential::builder()
			.access_token("a")
			.refresh_token("r")
			.issued_at(macros::datetime!(2025-01-01 00:00 UTC))
			.expires_in(Duration::minutes(30))
			.build()
			.expect("Relative expiries should build.");

		assert_eq!(credential.access_token_expiry, macros::datetime!(2025-01-01 00:30 UTC));
	}

	#[test]
	fn debug_output_redacts_tokens() {
		let credential = Credential::builder()
			.access_token("very-secret-access")
			.refresh_token("very-secret-refresh")
			.expires_in(Duration::hours(1))
			.build()
			.expect("Credential fixture should build.");
		let rendered = format!("{credential:?}");

		assert!(!rendered.contains("very-secret"));
	}
}
