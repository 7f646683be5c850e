//! Application Default Credentials: discovery, parsing, and access-token exchange.
//!
//! [`CredentialLocator`] resolves which file to use (explicit path, then
//! `GOOGLE_APPLICATION_CREDENTIALS`, then the gcloud well-known file). [`Credential::load`]
//! parses the file by its `type` discriminator into a [`CredentialKind`], and
//! [`Credential::access_token`] trades it for a short-lived OAuth access token that can call
//! the IAM Credentials API.

pub mod authorized_user;
pub mod external_account;
pub mod impersonated;
pub mod service_account;

pub use authorized_user::*;
pub use external_account::*;
pub use impersonated::*;
pub use service_account::*;

// std
use std::{env, ffi::OsString, fs};
// crates.io
use oauth2::{
	HttpRequest,
	http::{
		Method, Request,
		header::{ACCEPT, AUTHORIZATION, CONTENT_TYPE},
	},
};
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	api,
	auth::AccessToken,
	error::{ConfigError, TransientError},
	http::{Endpoint, HttpTransport, Transport},
	oauth::TransportErrorMapper,
};

/// Environment variable naming the credential file.
pub const CREDENTIALS_ENV: &str = "GOOGLE_APPLICATION_CREDENTIALS";
/// Default OAuth token endpoint for user and service account credentials.
pub const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

const WELL_KNOWN_FILE: &str = "application_default_credentials.json";

/// Boxed future returned by [`CredentialKind::access_token`].
pub type CredentialFuture<'a> = Pin<Box<dyn Future<Output = Result<AccessToken>> + 'a + Send>>;

/// Where a credential file path came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialOrigin {
	/// Supplied directly by configuration.
	Explicit,
	/// Read from [`CREDENTIALS_ENV`].
	Environment,
	/// The gcloud well-known application default credentials file.
	WellKnown,
}
impl Display for CredentialOrigin {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		match self {
			Self::Explicit => f.write_str("explicitly configured path"),
			Self::Environment =>
				write!(f, "please check the value of the environment variable {CREDENTIALS_ENV}"),
			Self::WellKnown => f.write_str("gcloud application default credentials"),
		}
	}
}

/// Candidate credential paths in discovery order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CredentialLocator {
	/// Path supplied by configuration; wins over everything else.
	pub explicit: Option<PathBuf>,
	/// Value of [`CREDENTIALS_ENV`], if set and non-empty.
	pub environment: Option<PathBuf>,
	/// gcloud well-known file location for this platform.
	pub well_known: Option<PathBuf>,
}
impl CredentialLocator {
	/// Snapshot of the process environment, with an optional explicit override.
	pub fn from_env(explicit: Option<PathBuf>) -> Self {
		Self::from_parts(explicit, env::var_os(CREDENTIALS_ENV), well_known_path())
	}

	/// An empty environment value counts as unset.
	fn from_parts(
		explicit: Option<PathBuf>,
		environment: Option<OsString>,
		well_known: Option<PathBuf>,
	) -> Self {
		let environment = environment.filter(|value| !value.is_empty()).map(PathBuf::from);

		Self { explicit, environment, well_known }
	}

	/// Picks the credential file to load.
	///
	/// Explicit and environment paths are returned even if they do not exist so the read
	/// failure can name them; the well-known file is only used when present.
	pub fn locate(&self) -> Result<(PathBuf, CredentialOrigin)> {
		if let Some(path) = &self.explicit {
			return Ok((path.clone(), CredentialOrigin::Explicit));
		}
		if let Some(path) = &self.environment {
			return Ok((path.clone(), CredentialOrigin::Environment));
		}
		if let Some(path) = self.well_known.as_ref().filter(|path| path.is_file()) {
			return Ok((path.clone(), CredentialOrigin::WellKnown));
		}

		Err(ConfigError::NoCredentialSource.into())
	}

	/// Locates and parses the credential file.
	pub fn load(&self) -> Result<Credential> {
		let (path, origin) = self.locate()?;

		Credential::load(path, origin)
	}
}

/// A parsed credential file.
#[derive(Clone, Debug)]
pub struct Credential {
	/// File the credential was read from.
	pub path: PathBuf,
	/// How the file was found.
	pub origin: CredentialOrigin,
	/// Parsed contents.
	pub kind: CredentialKind,
}
impl Credential {
	/// Reads and parses `path`.
	pub fn load(path: PathBuf, origin: CredentialOrigin) -> Result<Self> {
		let bytes = match fs::read(&path) {
			Ok(bytes) => bytes,
			Err(source) => return Err(ConfigError::CredentialFileRead { path, origin, source }.into()),
		};

		Self::from_slice(path, origin, &bytes)
	}

	/// Parses credential JSON that was read from `path`.
	pub fn from_slice(path: PathBuf, origin: CredentialOrigin, bytes: &[u8]) -> Result<Self> {
		let kind = CredentialKind::parse(&path, bytes)?;

		Ok(Self { path, origin, kind })
	}

	/// Project billed for API calls made with this credential, when the file names one.
	pub fn quota_project_id(&self) -> Option<&str> {
		self.kind.quota_project_id()
	}

	/// Exchanges the credential for an access token.
	pub fn access_token<'a, C, M>(&'a self, transport: &'a Transport<C, M>) -> CredentialFuture<'a>
	where
		C: ?Sized + HttpTransport,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		self.kind.access_token(transport)
	}
}

/// Supported credential file types.
#[derive(Clone, Debug)]
pub enum CredentialKind {
	/// `authorized_user`: gcloud user login with a refresh token.
	AuthorizedUser(AuthorizedUser),
	/// `service_account`: JSON key file.
	ServiceAccount(ServiceAccountKey),
	/// `external_account`: workload or workforce identity federation.
	ExternalAccount(ExternalAccount),
	/// `impersonated_service_account`: source credential plus impersonation.
	ImpersonatedServiceAccount(ImpersonatedServiceAccount),
}
impl CredentialKind {
	/// Parses credential JSON, dispatching on its `type` field.
	pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
		#[derive(Deserialize)]
		struct TypeProbe {
			#[serde(rename = "type", default)]
			kind: Option<String>,
		}

		let probe: TypeProbe = parse_credential_json(path, bytes)?;
		let kind = match probe.kind.as_deref() {
			Some(AuthorizedUser::TYPE) => Self::AuthorizedUser(parse_credential_json(path, bytes)?),
			Some(ServiceAccountKey::TYPE) =>
				Self::ServiceAccount(parse_credential_json(path, bytes)?),
			Some(ExternalAccount::TYPE) => Self::ExternalAccount(parse_credential_json(path, bytes)?),
			Some(ImpersonatedServiceAccount::TYPE) =>
				Self::ImpersonatedServiceAccount(ImpersonatedServiceAccount::parse(path, bytes)?),
			other =>
				return Err(ConfigError::UnsupportedCredentialType {
					path: path.to_owned(),
					kind: other.unwrap_or_default().to_owned(),
				}
				.into()),
		};

		Ok(kind)
	}

	/// The `type` discriminator of this credential.
	pub const fn type_label(&self) -> &'static str {
		match self {
			Self::AuthorizedUser(_) => AuthorizedUser::TYPE,
			Self::ServiceAccount(_) => ServiceAccountKey::TYPE,
			Self::ExternalAccount(_) => ExternalAccount::TYPE,
			Self::ImpersonatedServiceAccount(_) => ImpersonatedServiceAccount::TYPE,
		}
	}

	/// Project billed for API calls made with this credential, when the file names one.
	pub fn quota_project_id(&self) -> Option<&str> {
		match self {
			Self::AuthorizedUser(inner) => inner.quota_project_id.as_deref(),
			Self::ServiceAccount(inner) => inner.quota_project_id.as_deref(),
			Self::ExternalAccount(inner) => inner.quota_project_id.as_deref(),
			Self::ImpersonatedServiceAccount(inner) => inner.quota_project_id.as_deref(),
		}
	}

	/// Exchanges the credential for an access token.
	pub fn access_token<'a, C, M>(&'a self, transport: &'a Transport<C, M>) -> CredentialFuture<'a>
	where
		C: ?Sized + HttpTransport,
		M: ?Sized + TransportErrorMapper<C::TransportError>,
	{
		Box::pin(async move {
			match self {
				Self::AuthorizedUser(inner) => inner.access_token(transport).await,
				Self::ServiceAccount(inner) => inner.access_token(transport).await,
				Self::ExternalAccount(inner) => inner.access_token(transport).await,
				Self::ImpersonatedServiceAccount(inner) => inner.access_token(transport).await,
			}
		})
	}
}

/// Successful OAuth / STS token endpoint response.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenEndpointResponse {
	access_token: String,
	#[serde(default)]
	expires_in: Option<i64>,
}
impl TokenEndpointResponse {
	pub(crate) fn into_access_token(self, endpoint: Endpoint) -> Result<AccessToken> {
		if self.access_token.is_empty() {
			return Err(TransientError::Endpoint {
				endpoint,
				message: "response carried an empty access_token".into(),
				status: None,
				retry_after: None,
			}
			.into());
		}

		let token = AccessToken::new(self.access_token);

		Ok(match self.expires_in.filter(|secs| *secs > 0) {
			Some(secs) => token.with_expires_in(Duration::seconds(secs)),
			None => token,
		})
	}
}

/// Parses a credential URL field.
pub(crate) fn parse_url(field: &'static str, raw: &str) -> Result<Url> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { field, source }.into())
}

/// Builds a form-encoded POST.
pub(crate) fn form_request(url: &Url, form: &[(&str, &str)]) -> Result<HttpRequest> {
	let body = url::form_urlencoded::Serializer::new(String::new()).extend_pairs(form).finish();
	let request = Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, "application/x-www-form-urlencoded")
		.header(ACCEPT, "application/json")
		.body(body.into_bytes())
		.map_err(ConfigError::from)?;

	Ok(request)
}

/// Builds a JSON POST authorized with `bearer`.
pub(crate) fn json_request<T>(url: &Url, bearer: &AccessToken, body: &T) -> Result<HttpRequest>
where
	T: ?Sized + Serialize,
{
	let body = serde_json::to_vec(body).map_err(ConfigError::from)?;
	let request = Request::builder()
		.method(Method::POST)
		.uri(url.as_str())
		.header(CONTENT_TYPE, "application/json")
		.header(ACCEPT, "application/json")
		.header(AUTHORIZATION, bearer.bearer_header())
		.body(body)
		.map_err(ConfigError::from)?;

	Ok(request)
}

/// POSTs a form to an OAuth-style token endpoint and returns the access token it issues.
pub(crate) async fn exchange_form<C, M>(
	transport: &Transport<C, M>,
	endpoint: Endpoint,
	request: HttpRequest,
) -> Result<AccessToken>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let response = api::ensure_success(endpoint, transport.send(endpoint, request).await?)?;

	api::parse_json::<TokenEndpointResponse>(endpoint, &response)?.into_access_token(endpoint)
}

fn parse_credential_json<T>(path: &Path, bytes: &[u8]) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(bytes);

	serde_path_to_error::deserialize(&mut deserializer)
		.map_err(|source| ConfigError::CredentialParse { path: path.to_owned(), source }.into())
}

fn well_known_path() -> Option<PathBuf> {
	if cfg!(windows) {
		env::var_os("APPDATA").map(|dir| PathBuf::from(dir).join("gcloud").join(WELL_KNOWN_FILE))
	} else {
		env::var_os("HOME")
			.map(|dir| PathBuf::from(dir).join(".config").join("gcloud").join(WELL_KNOWN_FILE))
	}
}
