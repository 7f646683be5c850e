//! Credential loading and identity token minting stages.

// self
use crate::{
	_prelude::*,
	auth::{AccessToken, IdToken},
	credential::Credential,
	flows::{self, Caller},
	http::HttpTransport,
	iam::{self, GenerateIdTokenRequest},
	oauth::TransportErrorMapper,
	obs::Stage,
};

impl<C, M> Caller<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Locates and parses the credential file.
	pub async fn load_credential(&self) -> Result<Credential> {
		flows::run_stage(Stage::LoadCredential, async { self.locator.load() }).await
	}

	/// Trades `credential` for a `cloud-platform` access token.
	pub async fn access_token(&self, credential: &Credential) -> Result<AccessToken> {
		flows::run_stage(Stage::AccessToken, credential.access_token(&self.transport)).await
	}

	/// Asks IAM Credentials for an identity token for the configured audience.
	pub async fn generate_id_token(
		&self,
		credential: &Credential,
		access_token: &AccessToken,
	) -> Result<IdToken> {
		flows::run_stage(Stage::GenerateIdToken, async {
			let url = self.config.generate_id_token_url()?;
			let request =
				GenerateIdTokenRequest::new(&self.config.audience, self.config.include_email)
					.with_delegates(&self.config.delegates);
			let token = iam::generate_id_token(
				&self.transport,
				&url,
				access_token,
				credential.quota_project_id(),
				&request,
			)
			.await?;

			if let Some(claims) = token
				.claims
				.as_ref()
				.filter(|claims| !claims.has_audience(&self.config.audience))
			{
				#[cfg(feature = "tracing")]
				tracing::warn!(
					expected = %self.config.audience,
					actual = ?claims.aud,
					"identity token audience differs from the configured audience"
				);
				#[cfg(not(feature = "tracing"))]
				let _ = claims;
			}

			Ok(token)
		})
		.await
	}

	/// Runs credential loading, the access token exchange, and `generateIdToken` in order.
	pub async fn fetch_id_token(&self) -> Result<IdToken> {
		let credential = self.load_credential().await?;
		let access_token = self.access_token(&credential).await?;

		self.generate_id_token(&credential, &access_token).await
	}
}
