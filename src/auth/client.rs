//! Application credentials presented to the token endpoint.

// self
use crate::{
	_prelude::*,
	auth::{ClientId, TokenSecret},
	error::ConfigError,
};

/// Client identifier + secret pair used by both grant exchanges.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientCredentials {
	/// OAuth client identifier.
	pub client_id: ClientId,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
}
impl ClientCredentials {
	/// Validates and wraps the provided identifier and secret.
	pub fn new(
		client_id: impl AsRef<str>,
		client_secret: impl Into<String>,
	) -> Result<Self, ConfigError> {
		let client_id = ClientId::new(client_id.as_ref())?;
		let client_secret = TokenSecret::new(client_secret);

		if client_secret.is_empty() {
			return Err(ConfigError::EmptyClientSecret);
		}

		Ok(Self { client_id, client_secret })
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &"<redacted>")
			.finish()
	}
}
