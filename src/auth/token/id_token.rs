//! OIDC identity tokens minted by the IAM Credentials API.
//!
//! Claims are decoded without signature verification. They only feed logs and expiry
//! reporting; the receiving service is the party that validates the token.

// crates.io
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use serde::Deserializer;
// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Errors raised while decoding identity token claims.
#[derive(Debug, ThisError)]
pub enum ClaimsDecodeError {
	/// Token is not three dot-separated segments.
	#[error("Identity token is not a compact JWT.")]
	NotCompact,
	/// Payload segment is not base64url.
	#[error("Identity token payload is not base64url.")]
	Base64(#[from] base64::DecodeError),
	/// Payload segment is not a JSON claims object.
	#[error("Identity token payload is not a JSON claims object.")]
	Json(#[from] serde_json::Error),
}

/// Registered claims carried by a Google-signed identity token.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct IdTokenClaims {
	/// Issuer (`https://accounts.google.com`).
	pub iss: String,
	/// Subject: unique id of the service account.
	#[serde(default)]
	pub sub: Option<String>,
	/// Audience(s) the token was minted for.
	#[serde(deserialize_with = "one_or_many")]
	pub aud: Vec<String>,
	/// Service account email, present when `includeEmail` was requested.
	#[serde(default)]
	pub email: Option<String>,
	/// Whether the email is verified.
	#[serde(default)]
	pub email_verified: Option<bool>,
	/// Issued-at, seconds since the Unix epoch.
	#[serde(default)]
	pub iat: Option<i64>,
	/// Expiry, seconds since the Unix epoch.
	#[serde(default)]
	pub exp: Option<i64>,
}
impl IdTokenClaims {
	/// Decodes the payload segment of a compact JWT.
	pub fn decode(token: &str) -> Result<Self, ClaimsDecodeError> {
		let mut segments = token.split('.');
		let payload = match (segments.next(), segments.next(), segments.next(), segments.next()) {
			(Some(_), Some(payload), Some(_), None) => payload,
			_ => return Err(ClaimsDecodeError::NotCompact),
		};
		let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('='))?;

		Ok(serde_json::from_slice(&bytes)?)
	}

	/// Expiry instant, when present and representable.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.exp.and_then(|exp| OffsetDateTime::from_unix_timestamp(exp).ok())
	}

	/// Returns `true` if `audience` is among the token's audiences.
	pub fn has_audience(&self, audience: &str) -> bool {
		self.aud.iter().any(|value| value == audience)
	}
}

/// Identity token presented as a bearer credential to the target endpoint.
#[derive(Clone)]
pub struct IdToken {
	/// Compact JWT; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Decoded claims, or `None` when the payload could not be decoded.
	pub claims: Option<IdTokenClaims>,
}
impl IdToken {
	/// Wraps a raw token, decoding its claims on a best-effort basis.
	pub fn new(raw: impl Into<String>) -> Self {
		let secret = TokenSecret::new(raw);
		let claims = IdTokenClaims::decode(secret.expose()).ok();

		Self { secret, claims }
	}

	/// Expiry instant taken from the `exp` claim.
	pub fn expires_at(&self) -> Option<OffsetDateTime> {
		self.claims.as_ref().and_then(IdTokenClaims::expires_at)
	}

	/// Formats the `Authorization` header value.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
impl Debug for IdToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("IdToken")
			.field("fingerprint", &self.secret.fingerprint())
			.field("claims", &self.claims)
			.finish()
	}
}

fn one_or_many<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
	D: Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum OneOrMany {
		One(String),
		Many(Vec<String>),
	}

	Ok(match OneOrMany::deserialize(deserializer)? {
		OneOrMany::One(value) => vec![value],
		OneOrMany::Many(values) => values,
	})
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn jwt(payload: &str) -> String {
		format!(
			"{}.{}.signature",
			URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT"}"#),
			URL_SAFE_NO_PAD.encode(payload)
		)
	}

	#[test]
	fn decodes_google_claims() {
		let raw = jwt(
			r#"{"iss":"https://accounts.google.com","aud":"https://svc.a.run.app","sub":"1234","email":"sa@p.iam.gserviceaccount.com","email_verified":true,"iat":1700000000,"exp":1700003600}"#,
		);
		let token = IdToken::new(raw);
		let claims = token.claims.as_ref().expect("Claims should decode.");

		assert!(claims.has_audience("https://svc.a.run.app"));
		assert_eq!(claims.email.as_deref(), Some("sa@p.iam.gserviceaccount.com"));
		assert_eq!(
			token.expires_at(),
			Some(
				OffsetDateTime::from_unix_timestamp(1_700_003_600)
					.expect("Fixture timestamp should be valid.")
			)
		);
	}

	#[test]
	fn audience_may_be_a_list() {
		let claims = IdTokenClaims::decode(&jwt(r#"{"iss":"i","aud":["a","b"]}"#))
			.expect("List audiences should decode.");

		assert_eq!(claims.aud, vec!["a".to_owned(), "b".to_owned()]);
		assert_eq!(claims.expires_at(), None);
	}

	#[test]
	fn opaque_tokens_are_still_usable() {
		let token = IdToken::new("not-a-jwt");

		assert!(token.claims.is_none());
		assert_eq!(token.bearer_header(), "Bearer not-a-jwt");
		assert!(matches!(IdTokenClaims::decode("a.b"), Err(ClaimsDecodeError::NotCompact)));
		assert!(matches!(IdTokenClaims::decode("a.%%%.c"), Err(ClaimsDecodeError::Base64(_))));
		assert!(!format!("{token:?}").contains("not-a-jwt"));
	}
}
