//! Service account impersonation through `generateAccessToken`.

// crates.io
use time::format_description::well_known::Rfc3339;
// self
use crate::{
	_prelude::*,
	api,
	auth::{AccessToken, ScopeSet},
	credential::{self, CredentialKind},
	error::{ConfigError, TransientError},
	http::{Endpoint, HttpTransport, Transport},
	oauth::TransportErrorMapper,
};

/// Default lifetime requested for impersonated access tokens.
pub const DEFAULT_IMPERSONATION_LIFETIME: Duration = Duration::hours(1);

/// `impersonated_service_account` credential written by
/// `gcloud auth application-default login --impersonate-service-account`.
#[derive(Clone, Debug)]
pub struct ImpersonatedServiceAccount {
	/// `generateAccessToken` URL of the target service account.
	pub service_account_impersonation_url: String,
	/// Credential whose access token authorizes the impersonation call.
	pub source: Box<CredentialKind>,
	/// Delegation chain between the source principal and the target.
	pub delegates: Vec<String>,
	/// Project billed for API calls.
	pub quota_project_id: Option<String>,
}
impl ImpersonatedServiceAccount {
	/// `type` discriminator.
	pub const TYPE: &'static str = "impersonated_service_account";

	pub(crate) fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
		#[derive(Deserialize)]
		struct Raw {
			service_account_impersonation_url: String,
			source_credentials: serde_json::Value,
			#[serde(default)]
			delegates: Vec<String>,
			#[serde(default)]
			quota_project_id: Option<String>,
		}

		let mut deserializer = serde_json::Deserializer::from_slice(bytes);
		let raw: Raw = serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| ConfigError::CredentialParse { path: path.to_owned(), source })?;
		let source_bytes = serde_json::to_vec(&raw.source_credentials).map_err(ConfigError::from)?;
		let source = CredentialKind::parse(path, &source_bytes)?;

		// Only leaf credentials may act as the impersonation source.
		if let CredentialKind::ImpersonatedServiceAccount(_) = source {
			return Err(ConfigError::UnsupportedCredentialType {
				path: path.to_owned(),
				kind: format!("{} (nested source_credentials)", Self::TYPE),
			}
			.into());
		}

		Ok(Self {
			service_account_impersonation_url: raw.service_account_impersonation_url,
			source: Box::new(source),
			delegates: raw.delegates,
			quota_project_id: raw.quota_project_id,
		})
	}

	/// Obtains the source token, then impersonates the target service account.
	pub async fn access_token<C, M>(&self, transport: &Transport<C, M>) -> Result<AccessToken>
	where
		C: ?Sized + HttpTransport,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		let url = credential::parse_url(
			"service_account_impersonation_url",
			&self.service_account_impersonation_url,
		)?;
		let source_token = self.source.access_token(transport).await?;

		generate_access_token(
			transport,
			&url,
			&source_token,
			&ImpersonationRequest {
				scopes: &ScopeSet::cloud_platform(),
				delegates: &self.delegates,
				lifetime: DEFAULT_IMPERSONATION_LIFETIME,
			},
		)
		.await
	}
}

/// Parameters of a `generateAccessToken` call.
#[derive(Clone, Copy, Debug)]
pub struct ImpersonationRequest<'a> {
	/// Scopes requested for the impersonated token.
	pub scopes: &'a ScopeSet,
	/// Delegation chain.
	pub delegates: &'a [String],
	/// Requested token lifetime.
	pub lifetime: Duration,
}

/// Calls `generateAccessToken` at `url`, authorized by `source`.
pub async fn generate_access_token<C, M>(
	transport: &Transport<C, M>,
	url: &Url,
	source: &AccessToken,
	request: &ImpersonationRequest<'_>,
) -> Result<AccessToken>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	const ENDPOINT: Endpoint = Endpoint::Impersonation;

	let body = GenerateAccessTokenBody {
		scope: request.scopes.as_slice(),
		lifetime: format!("{}s", request.lifetime.whole_seconds()),
		delegates: request.delegates,
	};
	let http_request = credential::json_request(url, source, &body)?;
	let response = api::ensure_success(ENDPOINT, transport.send(ENDPOINT, http_request).await?)?;
	let parsed: GenerateAccessTokenResponse = api::parse_json(ENDPOINT, &response)?;

	if parsed.access_token.is_empty() {
		return Err(TransientError::Endpoint {
			endpoint: ENDPOINT,
			message: "response carried an empty accessToken".into(),
			status: Some(response.status().as_u16()),
			retry_after: None,
		}
		.into());
	}

	let token = AccessToken::new(parsed.access_token);

	Ok(match OffsetDateTime::parse(&parsed.expire_time, &Rfc3339) {
		Ok(expires_at) => token.with_expires_at(expires_at),
		Err(_) => token,
	})
}

#[derive(Serialize)]
struct GenerateAccessTokenBody<'a> {
	scope: &'a [String],
	lifetime: String,
	#[serde(skip_serializing_if = "<[String]>::is_empty")]
	delegates: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateAccessTokenResponse {
	access_token: String,
	#[serde(default)]
	expire_time: String,
}
