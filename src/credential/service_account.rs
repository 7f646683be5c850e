//! `service_account` JSON key files.
//!
//! The key signs an RS256 JWT assertion (RFC 7523) that the token endpoint trades for an
//! access token scoped to `cloud-platform`.

// crates.io
use jsonwebtoken::{Algorithm, EncodingKey, Header};
// self
use crate::{
	_prelude::*,
	auth::{AccessToken, ScopeSet, TokenSecret},
	credential::{self, DEFAULT_TOKEN_URI},
	error::ConfigError,
	http::{Endpoint, HttpTransport, Transport},
	oauth::TransportErrorMapper,
};

const JWT_BEARER_GRANT: &str = "urn:ietf:params:oauth:grant-type:jwt-bearer";
const ASSERTION_LIFETIME: Duration = Duration::hours(1);

/// Service account key material.
#[derive(Clone, Debug, Deserialize)]
pub struct ServiceAccountKey {
	/// Service account email; the assertion issuer.
	pub client_email: String,
	/// PEM-encoded RSA private key.
	pub private_key: TokenSecret,
	/// Key identifier, sent as the JWT `kid` header.
	#[serde(default)]
	pub private_key_id: Option<String>,
	/// Token endpoint and assertion audience.
	#[serde(default = "default_token_uri")]
	pub token_uri: String,
	/// Project that owns the service account.
	#[serde(default)]
	pub project_id: Option<String>,
	/// Project billed for API calls.
	#[serde(default)]
	pub quota_project_id: Option<String>,
}
impl ServiceAccountKey {
	/// `type` discriminator.
	pub const TYPE: &'static str = "service_account";

	/// Signs an assertion for `scopes`, issued at `now`.
	pub fn sign_assertion(&self, scopes: &ScopeSet, now: OffsetDateTime) -> Result<String> {
		let claims = AssertionClaims {
			iss: &self.client_email,
			scope: scopes.normalized(),
			aud: &self.token_uri,
			iat: now.unix_timestamp(),
			exp: (now + ASSERTION_LIFETIME).unix_timestamp(),
		};
		let mut header = Header::new(Algorithm::RS256);

		header.kid = self.private_key_id.clone();

		let key = EncodingKey::from_rsa_pem(self.private_key.expose().as_bytes())
			.map_err(|source| ConfigError::InvalidPrivateKey { source })?;

		jsonwebtoken::encode(&header, &claims, &key)
			.map_err(|source| ConfigError::AssertionSign { source }.into())
	}

	/// Exchanges a freshly signed assertion for an access token.
	pub async fn access_token<C, M>(&self, transport: &Transport<C, M>) -> Result<AccessToken>
	where
		C: ?Sized + HttpTransport,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		let token_uri = credential::parse_url("token_uri", &self.token_uri)?;
		let assertion = self.sign_assertion(&ScopeSet::cloud_platform(), OffsetDateTime::now_utc())?;
		let request = credential::form_request(
			&token_uri,
			&[("grant_type", JWT_BEARER_GRANT), ("assertion", &assertion)],
		)?;

		credential::exchange_form(transport, Endpoint::OAuthToken, request).await
	}
}

#[derive(Serialize)]
struct AssertionClaims<'a> {
	iss: &'a str,
	scope: String,
	aud: &'a str,
	iat: i64,
	exp: i64,
}

fn default_token_uri() -> String {
	DEFAULT_TOKEN_URI.into()
}
