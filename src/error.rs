//! Crate-level error types shared by the credential loader, token exchanger, and invoker.

// self
use crate::{_prelude::*, credential::CredentialOrigin, http::Endpoint};

/// Crate-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Canonical error exposed by public APIs.
///
/// Every variant is terminal for a run; the taxonomy only exists so callers can report what
/// went wrong.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Upstream failure that may succeed on a later run.
	#[error(transparent)]
	Transient(#[from] TransientError),
	/// Transport failure (DNS, TCP, TLS).
	#[error(transparent)]
	Transport(#[from] TransportError),

	/// Upstream refused the caller's identity (401/403).
	#[error("The {endpoint} endpoint denied the request: {reason}.")]
	Denied {
		/// Endpoint that rejected the call.
		endpoint: Endpoint,
		/// Upstream-supplied reason string.
		reason: String,
	},
	/// Upstream could not find the referenced resource (404).
	#[error("The {endpoint} endpoint could not find the resource: {reason}.")]
	NotFound {
		/// Endpoint that rejected the call.
		endpoint: Endpoint,
		/// Upstream-supplied reason string.
		reason: String,
	},
	/// Upstream rejected the request as malformed (400).
	#[error("The {endpoint} endpoint rejected the request: {reason}.")]
	InvalidRequest {
		/// Endpoint that rejected the call.
		endpoint: Endpoint,
		/// Upstream-supplied reason string.
		reason: String,
	},
	/// Token endpoint rejected the grant or the client (bad refresh token, bad assertion).
	#[error("The {endpoint} endpoint rejected the grant: {reason}.")]
	InvalidGrant {
		/// Endpoint that rejected the call.
		endpoint: Endpoint,
		/// Upstream-supplied reason string.
		reason: String,
	},
}
impl Error {
	/// Returns the endpoint associated with the failure, when one is known.
	pub fn endpoint(&self) -> Option<Endpoint> {
		match self {
			Self::Denied { endpoint, .. }
			| Self::NotFound { endpoint, .. }
			| Self::InvalidRequest { endpoint, .. }
			| Self::InvalidGrant { endpoint, .. } => Some(*endpoint),
			Self::Transient(TransientError::Endpoint { endpoint, .. })
			| Self::Transient(TransientError::ResponseParse { endpoint, .. })
			| Self::Transport(TransportError::Network { endpoint, .. }) => Some(*endpoint),
			_ => None,
		}
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
	/// HTTP request construction failed.
	#[error(transparent)]
	HttpRequest(#[from] oauth2::http::Error),
	/// Caller configuration failed validation.
	#[error(transparent)]
	Caller(#[from] crate::config::CallerConfigError),
	/// Principal or project identifier failed validation.
	#[error(transparent)]
	InvalidIdentifier(#[from] crate::auth::IdentifierError),
	/// A URL taken from a credential file cannot be parsed.
	#[error("The {field} URL is invalid.")]
	InvalidUrl {
		/// Credential field holding the URL.
		field: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},

	/// No credential source could be located.
	#[error(
		"Could not find default credentials. Set GOOGLE_APPLICATION_CREDENTIALS or run `gcloud auth application-default login`."
	)]
	NoCredentialSource,
	/// Credential file could not be read.
	#[error("Error reading credential file from location {} ({origin}).", .path.display())]
	CredentialFileRead {
		/// Path that failed.
		path: PathBuf,
		/// Where the path came from.
		origin: CredentialOrigin,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Credential file is not valid JSON or misses required fields.
	#[error("Error creating credential from JSON in {}.", .path.display())]
	CredentialParse {
		/// Path that failed.
		path: PathBuf,
		/// Structured parsing failure naming the offending field.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
	},
	/// Credential file declares a type this crate cannot use.
	#[error("Unrecognized credential type `{kind}` in {}.", .path.display())]
	UnsupportedCredentialType {
		/// Path of the credential file.
		path: PathBuf,
		/// Declared `type` field (empty when absent).
		kind: String,
	},
	/// External account names a credential source this crate cannot use.
	#[error("External account credential source `{kind}` is not supported.")]
	UnsupportedCredentialSource {
		/// Source label.
		kind: &'static str,
	},
	/// Subject token file could not be read.
	#[error("Failed to read the subject token from {}.", .path.display())]
	SubjectTokenRead {
		/// Path that failed.
		path: PathBuf,
		/// Underlying IO failure.
		#[source]
		source: std::io::Error,
	},
	/// Subject token could not be extracted from its JSON envelope.
	#[error("Subject token JSON does not contain a string field `{field}`.")]
	SubjectTokenField {
		/// Configured `subject_token_field_name`.
		field: String,
	},
	/// Subject token source produced an empty token.
	#[error("Subject token is empty.")]
	EmptySubjectToken,
	/// Service account private key cannot be loaded.
	#[error("Service account private key is not a valid RSA PEM key.")]
	InvalidPrivateKey {
		/// Underlying key parsing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Service account assertion could not be signed.
	#[error("Unable to sign the service account assertion.")]
	AssertionSign {
		/// Underlying signing failure.
		#[source]
		source: jsonwebtoken::errors::Error,
	},
	/// Request body could not be serialized.
	#[error("Unable to serialize the request body.")]
	RequestBody(#[from] serde_json::Error),
}
impl ConfigError {
	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Upstream failures that are not the caller's fault.
#[derive(Debug, ThisError)]
pub enum TransientError {
	/// Endpoint returned an unexpected response.
	#[error("The {endpoint} endpoint returned an unexpected response: {message}.")]
	Endpoint {
		/// Endpoint that failed.
		endpoint: Endpoint,
		/// Upstream- or crate-supplied message summarizing the failure.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Endpoint responded with JSON that could not be parsed.
	#[error("The {endpoint} endpoint returned malformed JSON.")]
	ResponseParse {
		/// Endpoint that failed.
		endpoint: Endpoint,
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
}
impl TransientError {
	/// HTTP status attached to the failure, if any.
	pub fn status(&self) -> Option<u16> {
		match self {
			Self::Endpoint { status, .. } | Self::ResponseParse { status, .. } => *status,
		}
	}
}

/// Transport-level failures (network, IO).
#[derive(Debug, ThisError)]
pub enum TransportError {
	/// Underlying HTTP client reported a network failure.
	#[error("Network error occurred while calling the {endpoint} endpoint.")]
	Network {
		/// Endpoint being called.
		endpoint: Endpoint,
		/// Transport-specific network error.
		#[source]
		source: BoxError,
	},
	/// Underlying IO failure surfaced during transport.
	#[error("I/O error occurred during transport.")]
	Io(#[from] std::io::Error),
}
impl TransportError {
	/// Wraps a transport-specific network error.
	pub fn network(endpoint: Endpoint, src: impl 'static + Send + Sync + std::error::Error) -> Self {
		Self::Network { endpoint, source: Box::new(src) }
	}
}
