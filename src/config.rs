//! Validated run configuration for [`Caller`](crate::flows::Caller).

// std
use std::net::IpAddr;
// crates.io
use url::Host;
// self
use crate::{_prelude::*, auth::ServiceAccountName};

/// Default IAM Credentials API endpoint.
pub const DEFAULT_IAM_ENDPOINT: &str = "https://iamcredentials.googleapis.com";

/// Errors raised while building a [`CallerConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum CallerConfigError {
	/// Endpoints must use HTTPS unless they point at a loopback host.
	#[error("The {endpoint} URL must use HTTPS: {url}.")]
	InsecureEndpoint {
		/// Which URL failed validation.
		endpoint: &'static str,
		/// URL that failed validation.
		url: String,
	},
	/// Audience was explicitly set to an empty string.
	#[error("Audience cannot be empty.")]
	EmptyAudience,
	/// No audience was given and the target URL has no origin to derive one from.
	#[error("Cannot derive an audience from {url}; set one explicitly.")]
	OpaqueOrigin {
		/// Target URL.
		url: String,
	},
	/// The IAM endpoint must be a base URL without query or fragment.
	#[error("The IAM endpoint must be a plain base URL: {url}.")]
	InvalidIamEndpoint {
		/// Offending URL.
		url: String,
	},
}

/// Everything one run needs: target, audience, and the identity to mint tokens for.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallerConfig {
	/// URL fetched with the identity token.
	pub url: Url,
	/// Audience embedded in the identity token.
	pub audience: String,
	/// Service account whose identity the token carries.
	pub service_account: ServiceAccountName,
	/// Delegation chain for `generateIdToken`.
	pub delegates: Vec<ServiceAccountName>,
	/// Whether the token should carry the `email` claim.
	pub include_email: bool,
	/// IAM Credentials API base URL.
	pub iam_endpoint: Url,
	/// Credential file overriding Application Default Credentials discovery.
	pub credentials: Option<PathBuf>,
}
impl CallerConfig {
	/// Starts a builder for calling `url` as `service_account`.
	pub fn builder(url: Url, service_account: ServiceAccountName) -> CallerConfigBuilder {
		CallerConfigBuilder::new(url, service_account)
	}

	/// `generateIdToken` URL for the configured service account.
	pub fn generate_id_token_url(&self) -> Result<Url> {
		let path = format!(
			"{}/v1/{}:generateIdToken",
			self.iam_endpoint.as_str().trim_end_matches('/'),
			self.service_account
		);

		Url::parse(&path).map_err(|source| {
			crate::error::ConfigError::InvalidUrl { field: "iam_endpoint", source }.into()
		})
	}
}

/// Builder for [`CallerConfig`].
#[derive(Debug)]
pub struct CallerConfigBuilder {
	url: Url,
	service_account: ServiceAccountName,
	audience: Option<String>,
	delegates: Vec<ServiceAccountName>,
	include_email: bool,
	iam_endpoint: Option<Url>,
	credentials: Option<PathBuf>,
}
impl CallerConfigBuilder {
	fn new(url: Url, service_account: ServiceAccountName) -> Self {
		Self {
			url,
			service_account,
			audience: None,
			delegates: Vec::new(),
			include_email: true,
			iam_endpoint: None,
			credentials: None,
		}
	}

	/// Overrides the audience; defaults to the origin of the target URL.
	pub fn audience(mut self, audience: impl Into<String>) -> Self {
		self.audience = Some(audience.into());

		self
	}

	/// Appends one delegate to the chain.
	pub fn delegate(mut self, delegate: ServiceAccountName) -> Self {
		self.delegates.push(delegate);

		self
	}

	/// Appends several delegates to the chain.
	pub fn delegates<I>(mut self, delegates: I) -> Self
	where
		I: IntoIterator<Item = ServiceAccountName>,
	{
		self.delegates.extend(delegates);

		self
	}

	/// Sets whether the token carries the `email` claim (default `true`).
	pub fn include_email(mut self, include_email: bool) -> Self {
		self.include_email = include_email;

		self
	}

	/// Overrides the IAM Credentials API base URL.
	pub fn iam_endpoint(mut self, url: Url) -> Self {
		self.iam_endpoint = Some(url);

		self
	}

	/// Pins the credential file instead of running discovery.
	pub fn credentials(mut self, path: impl Into<PathBuf>) -> Self {
		self.credentials = Some(path.into());

		self
	}

	/// Validates and returns the configuration.
	pub fn build(self) -> Result<CallerConfig, CallerConfigError> {
		let iam_endpoint = match self.iam_endpoint {
			Some(url) => url,
			None => Url::parse(DEFAULT_IAM_ENDPOINT).map_err(|_| {
				CallerConfigError::InvalidIamEndpoint { url: DEFAULT_IAM_ENDPOINT.into() }
			})?,
		};

		validate_endpoint("target", &self.url)?;
		validate_endpoint("IAM", &iam_endpoint)?;

		if iam_endpoint.query().is_some() || iam_endpoint.fragment().is_some() {
			return Err(CallerConfigError::InvalidIamEndpoint { url: iam_endpoint.to_string() });
		}

		let audience = match self.audience {
			Some(audience) if audience.trim().is_empty() =>
				return Err(CallerConfigError::EmptyAudience),
			Some(audience) => audience,
			None => default_audience(&self.url)?,
		};

		Ok(CallerConfig {
			url: self.url,
			audience,
			service_account: self.service_account,
			delegates: self.delegates,
			include_email: self.include_email,
			iam_endpoint,
			credentials: self.credentials,
		})
	}
}

/// Origin of `url` (`scheme://host[:port]`), the audience used when none is set.
pub fn default_audience(url: &Url) -> Result<String, CallerConfigError> {
	let origin = url.origin();

	if !origin.is_tuple() {
		return Err(CallerConfigError::OpaqueOrigin { url: url.to_string() });
	}

	Ok(origin.ascii_serialization())
}

/// Returns `true` when `url` points at the local machine.
pub fn is_loopback(url: &Url) -> bool {
	match url.host() {
		Some(Host::Domain(domain)) => domain.eq_ignore_ascii_case("localhost"),
		Some(Host::Ipv4(ip)) => IpAddr::V4(ip).is_loopback(),
		Some(Host::Ipv6(ip)) => IpAddr::V6(ip).is_loopback(),
		None => false,
	}
}

fn validate_endpoint(endpoint: &'static str, url: &Url) -> Result<(), CallerConfigError> {
	match url.scheme() {
		"https" => Ok(()),
		"http" if is_loopback(url) => Ok(()),
		_ => Err(CallerConfigError::InsecureEndpoint { endpoint, url: url.to_string() }),
	}
}
