//! OAuth access tokens produced by credential exchanges.

// self
use crate::{_prelude::*, auth::token::secret::TokenSecret};

/// Short-lived OAuth access token used to authorize IAM Credentials calls.
#[derive(Clone, PartialEq, Eq)]
pub struct AccessToken {
	/// Bearer secret; callers must avoid logging it.
	pub secret: TokenSecret,
	/// Local instant the token was received.
	pub issued_at: OffsetDateTime,
	/// Expiry instant, when the issuer reported one.
	pub expires_at: Option<OffsetDateTime>,
}
impl AccessToken {
	/// Wraps a token received now without expiry information.
	pub fn new(secret: impl Into<String>) -> Self {
		Self {
			secret: TokenSecret::new(secret),
			issued_at: OffsetDateTime::now_utc(),
			expires_at: None,
		}
	}

	/// Sets the expiry relative to [`AccessToken::issued_at`].
	///
	/// A lifetime that does not fit in the calendar leaves the expiry unknown.
	pub fn with_expires_in(mut self, expires_in: Duration) -> Self {
		self.expires_at = self.issued_at.checked_add(expires_in);

		self
	}

	/// Sets an absolute expiry.
	pub fn with_expires_at(mut self, expires_at: OffsetDateTime) -> Self {
		self.expires_at = Some(expires_at);

		self
	}

	/// Formats the `Authorization` header value.
	pub fn bearer_header(&self) -> String {
		format!("Bearer {}", self.secret.expose())
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("AccessToken")
			.field("secret", &"<redacted>")
			.field("issued_at", &self.issued_at)
			.field("expires_at", &self.expires_at)
			.finish()
	}
}
