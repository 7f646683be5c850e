//! `authorized_user` credentials written by `gcloud auth application-default login`.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, TokenSecret},
	credential::{self, DEFAULT_TOKEN_URI},
	http::{HttpTransport, Transport},
	oauth::{self, RefreshGrant, TransportErrorMapper},
};

/// User credential redeemed through the OAuth refresh-token grant.
#[derive(Clone, Debug, Deserialize)]
pub struct AuthorizedUser {
	/// OAuth client identifier.
	pub client_id: String,
	/// OAuth client secret.
	pub client_secret: TokenSecret,
	/// Long-lived refresh token.
	pub refresh_token: TokenSecret,
	/// Token endpoint override.
	#[serde(default)]
	pub token_uri: Option<String>,
	/// Project billed for API calls.
	#[serde(default)]
	pub quota_project_id: Option<String>,
}
impl AuthorizedUser {
	/// `type` discriminator.
	pub const TYPE: &'static str = "authorized_user";

	/// Redeems the refresh token.
	pub async fn access_token<C, M>(&self, transport: &Transport<C, M>) -> Result<AccessToken>
	where
		C: ?Sized + HttpTransport,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		let token_uri = credential::parse_url(
			"token_uri",
			self.token_uri.as_deref().unwrap_or(DEFAULT_TOKEN_URI),
		)?;

		oauth::refresh_access_token(
			transport,
			RefreshGrant {
				token_uri: &token_uri,
				client_id: &self.client_id,
				client_secret: &self.client_secret,
				refresh_token: &self.refresh_token,
			},
		)
		.await
	}
}
