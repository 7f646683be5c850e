//! `external_account` credentials for workload and workforce identity federation.
//!
//! A subject token issued by a third-party identity provider is read from a file or fetched
//! from a URL, traded at the Security Token Service (RFC 8693), and optionally used to
//! impersonate a service account.

// crates.io
use base64::{Engine as _, engine::general_purpose::STANDARD};
use oauth2::http::{
	HeaderName, HeaderValue, Method, Request,
	header::{AUTHORIZATION, InvalidHeaderName, InvalidHeaderValue},
};
// self
use crate::{
	_prelude::*,
	api,
	auth::{AccessToken, ScopeSet, TokenSecret},
	credential::{
		self,
		impersonated::{self, DEFAULT_IMPERSONATION_LIFETIME, ImpersonationRequest},
	},
	error::ConfigError,
	http::{Endpoint, HttpTransport, Transport},
	oauth::TransportErrorMapper,
};

const TOKEN_EXCHANGE_GRANT: &str = "urn:ietf:params:oauth:grant-type:token-exchange";
const ACCESS_TOKEN_TYPE: &str = "urn:ietf:params:oauth:token-type:access_token";

/// Federated credential configuration.
#[derive(Clone, Debug, Deserialize)]
pub struct ExternalAccount {
	/// Workload or workforce pool provider resource name.
	pub audience: String,
	/// Type of the third-party subject token.
	pub subject_token_type: String,
	/// STS token endpoint.
	pub token_url: String,
	/// Where the subject token comes from.
	pub credential_source: CredentialSource,
	/// Optional `generateAccessToken` URL for impersonation after the exchange.
	#[serde(default)]
	pub service_account_impersonation_url: Option<String>,
	/// Impersonation tuning.
	#[serde(default)]
	pub service_account_impersonation: Option<ImpersonationOptions>,
	/// Scopes for the final access token; `cloud-platform` when absent.
	#[serde(default)]
	pub scopes: Option<ScopeSet>,
	/// Client id used to authenticate to the STS endpoint.
	#[serde(default)]
	pub client_id: Option<String>,
	/// Client secret used to authenticate to the STS endpoint.
	#[serde(default)]
	pub client_secret: Option<TokenSecret>,
	/// Workforce pool user project, sent as an STS option.
	#[serde(default)]
	pub workforce_pool_user_project: Option<String>,
	/// Project billed for API calls.
	#[serde(default)]
	pub quota_project_id: Option<String>,
}
impl ExternalAccount {
	/// `type` discriminator.
	pub const TYPE: &'static str = "external_account";

	/// Exchanges the subject token for an access token, impersonating when configured.
	pub async fn access_token<C, M>(&self, transport: &Transport<C, M>) -> Result<AccessToken>
	where
		C: ?Sized + HttpTransport,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		let scopes = match &self.scopes {
			Some(scopes) if !scopes.is_empty() => scopes.clone(),
			_ => ScopeSet::cloud_platform(),
		};
		let subject_token = self.credential_source.subject_token(transport).await?;
		let impersonation_url = self
			.service_account_impersonation_url
			.as_deref()
			.map(|raw| credential::parse_url("service_account_impersonation_url", raw))
			.transpose()?;
		// The STS token only needs to reach `generateAccessToken` when impersonating.
		let sts_scopes =
			if impersonation_url.is_some() { ScopeSet::cloud_platform() } else { scopes.clone() };
		let sts_token = self.exchange(transport, &subject_token, &sts_scopes).await?;
		let Some(url) = impersonation_url else {
			return Ok(sts_token);
		};
		let lifetime = self
			.service_account_impersonation
			.as_ref()
			.and_then(|options| options.token_lifetime_seconds)
			.filter(|secs| *secs > 0)
			.map(Duration::seconds)
			.unwrap_or(DEFAULT_IMPERSONATION_LIFETIME);

		impersonated::generate_access_token(
			transport,
			&url,
			&sts_token,
			&ImpersonationRequest { scopes: &scopes, delegates: &[], lifetime },
		)
		.await
	}

	async fn exchange<C, M>(
		&self,
		transport: &Transport<C, M>,
		subject_token: &str,
		scopes: &ScopeSet,
	) -> Result<AccessToken>
	where
		C: ?Sized + HttpTransport,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		let token_url = credential::parse_url("token_url", &self.token_url)?;
		let scope = scopes.normalized();
		let options = match (&self.workforce_pool_user_project, &self.service_account_impersonation_url)
		{
			(Some(project), None) =>
				Some(serde_json::json!({ "userProject": project }).to_string()),
			_ => None,
		};
		let mut form = vec![
			("grant_type", TOKEN_EXCHANGE_GRANT),
			("audience", self.audience.as_str()),
			("scope", scope.as_str()),
			("requested_token_type", ACCESS_TOKEN_TYPE),
			("subject_token", subject_token),
			("subject_token_type", self.subject_token_type.as_str()),
		];

		if let Some(options) = &options {
			form.push(("options", options.as_str()));
		}

		let mut request = credential::form_request(&token_url, &form)?;

		if let (Some(id), Some(secret)) = (&self.client_id, &self.client_secret) {
			let basic = STANDARD.encode(format!("{id}:{}", secret.expose()));
			let value = HeaderValue::from_str(&format!("Basic {basic}"))
				.map_err(|e| ConfigError::from(oauth2::http::Error::from(e)))?;

			request.headers_mut().insert(AUTHORIZATION, value);
		}

		credential::exchange_form(transport, Endpoint::Sts, request).await
	}
}

/// Impersonation tuning for external accounts.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ImpersonationOptions {
	/// Requested impersonated token lifetime in seconds.
	#[serde(default)]
	pub token_lifetime_seconds: Option<i64>,
}

/// Subject token source.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct CredentialSource {
	/// File holding the subject token.
	#[serde(default)]
	pub file: Option<PathBuf>,
	/// URL serving the subject token.
	#[serde(default)]
	pub url: Option<String>,
	/// Extra headers for the URL source.
	#[serde(default)]
	pub headers: BTreeMap<String, String>,
	/// Subject token encoding.
	#[serde(default)]
	pub format: SubjectTokenFormat,
	/// Executable source configuration (unsupported).
	#[serde(default)]
	pub executable: Option<serde_json::Value>,
	/// AWS environment identifier (unsupported).
	#[serde(default)]
	pub environment_id: Option<String>,
}
impl CredentialSource {
	/// Reads or fetches the subject token.
	pub async fn subject_token<C, M>(&self, transport: &Transport<C, M>) -> Result<String>
	where
		C: ?Sized + HttpTransport,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		if self.executable.is_some() {
			return Err(ConfigError::UnsupportedCredentialSource { kind: "executable" }.into());
		}
		if self.environment_id.is_some() {
			return Err(ConfigError::UnsupportedCredentialSource { kind: "environment_id" }.into());
		}

		let raw = match (&self.file, &self.url) {
			(Some(path), _) => std::fs::read_to_string(path).map_err(|source| {
				ConfigError::SubjectTokenRead { path: path.clone(), source }
			})?,
			(None, Some(url)) => self.fetch(transport, url).await?,
			(None, None) =>
				return Err(ConfigError::UnsupportedCredentialSource { kind: "empty" }.into()),
		};

		self.format.extract(&raw)
	}

	async fn fetch<C, M>(&self, transport: &Transport<C, M>, url: &str) -> Result<String>
	where
		C: ?Sized + HttpTransport,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		const ENDPOINT: Endpoint = Endpoint::SubjectToken;

		let url = credential::parse_url("credential_source.url", url)?;
		let mut builder = Request::builder().method(Method::GET).uri(url.as_str());

		for (name, value) in &self.headers {
			let name = HeaderName::from_bytes(name.as_bytes())
				.map_err(|e: InvalidHeaderName| ConfigError::from(oauth2::http::Error::from(e)))?;
			let value = HeaderValue::from_str(value)
				.map_err(|e: InvalidHeaderValue| ConfigError::from(oauth2::http::Error::from(e)))?;

			builder = builder.header(name, value);
		}

		let request = builder.body(Vec::new()).map_err(ConfigError::from)?;
		let response = api::ensure_success(ENDPOINT, transport.send(ENDPOINT, request).await?)?;

		Ok(String::from_utf8_lossy(response.body()).into_owned())
	}
}

/// Encoding of the subject token payload.
#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SubjectTokenFormat {
	/// Payload is the token itself.
	#[default]
	Text,
	/// Payload is a JSON object holding the token in a named field.
	Json {
		/// Field holding the token.
		subject_token_field_name: String,
	},
}
impl SubjectTokenFormat {
	/// Extracts the subject token from a raw payload.
	pub fn extract(&self, raw: &str) -> Result<String> {
		let token = match self {
			Self::Text => raw.trim().to_owned(),
			Self::Json { subject_token_field_name } => serde_json::from_str::<serde_json::Value>(raw)
				.ok()
				.as_ref()
				.and_then(|value| value.get(subject_token_field_name))
				.and_then(serde_json::Value::as_str)
				.map(str::to_owned)
				.ok_or_else(|| ConfigError::SubjectTokenField {
					field: subject_token_field_name.clone(),
				})?,
		};

		if token.is_empty() {
			return Err(ConfigError::EmptySubjectToken.into());
		}

		Ok(token)
	}
}
