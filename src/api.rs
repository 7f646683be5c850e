//! Response handling shared by Google API and OAuth endpoints.
//!
//! Google APIs report failures as `{"error":{"code","message","status"}}` while OAuth and STS
//! endpoints use `{"error","error_description"}`. Both shapes feed an [`ApiErrorContext`] that
//! [`classify`] maps into the crate's error taxonomy, preferring the structured error code,
//! then the HTTP status.

// crates.io
use oauth2::HttpResponse;
use serde::de::DeserializeOwned;
// self
use crate::{
	_prelude::*,
	error::TransientError,
	http::{self, Endpoint},
};

/// Canonical error categories for non-success responses.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ApiErrorKind {
	/// Caller identity was rejected.
	Denied,
	/// Referenced resource does not exist.
	NotFound,
	/// Request was malformed.
	InvalidRequest,
	/// OAuth grant or client was rejected.
	InvalidGrant,
	/// Failure is upstream's and not attributable to the request.
	Transient,
}

/// Primitive facts about a failed response, independent of any HTTP client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiErrorContext {
	/// Endpoint that produced the response.
	pub endpoint: Endpoint,
	/// HTTP status code, when available.
	pub http_status: Option<u16>,
	/// Structured error code (Google `status` or OAuth `error`).
	pub error_code: Option<String>,
	/// Human-readable message (Google `message` or OAuth `error_description`).
	pub message: Option<String>,
	/// Preview of the response body for unstructured payloads.
	pub body_preview: Option<String>,
}
impl ApiErrorContext {
	const BODY_PREVIEW_LIMIT: usize = 256;

	/// Creates an empty context for `endpoint`.
	pub fn new(endpoint: Endpoint) -> Self {
		Self { endpoint, http_status: None, error_code: None, message: None, body_preview: None }
	}

	/// Adds an HTTP status code.
	pub fn with_http_status(mut self, status: u16) -> Self {
		self.http_status = Some(status);

		self
	}

	/// Adds the structured error code.
	pub fn with_error_code(mut self, code: impl Into<String>) -> Self {
		self.error_code = Some(code.into());

		self
	}

	/// Adds the human-readable message.
	pub fn with_message(mut self, message: impl Into<String>) -> Self {
		self.message = Some(message.into());

		self
	}

	/// Adds a (truncated) body preview.
	pub fn with_body_preview(mut self, body: impl Into<String>) -> Self {
		self.body_preview = Some(truncate_preview(body.into()));

		self
	}

	/// Builds a context from a raw response, parsing whichever error envelope it carries.
	pub fn from_response(endpoint: Endpoint, response: &HttpResponse) -> Self {
		let mut ctx = Self::new(endpoint).with_http_status(response.status().as_u16());

		match serde_json::from_slice::<ErrorEnvelope>(response.body()) {
			Ok(ErrorEnvelope::Google { error }) => {
				if let Some(status) = error.status {
					ctx = ctx.with_error_code(status);
				}
				if let Some(message) = error.message {
					ctx = ctx.with_message(message);
				}
			},
			Ok(ErrorEnvelope::OAuth { error, error_description }) => {
				ctx = ctx.with_error_code(error);

				if let Some(description) = error_description {
					ctx = ctx.with_message(description);
				}
			},
			Err(_) => {
				let body = String::from_utf8_lossy(response.body());

				if !body.trim().is_empty() {
					ctx = ctx.with_body_preview(body.trim());
				}
			},
		}

		ctx
	}

	/// Best available reason string for error messages.
	pub fn reason(&self) -> String {
		self.message
			.clone()
			.or_else(|| self.error_code.clone())
			.or_else(|| self.body_preview.clone())
			.unwrap_or_else(|| match self.http_status {
				Some(status) => format!("HTTP {status}"),
				None => "no details".into(),
			})
	}
}

/// Classifies a failed response, preferring structured error codes over the HTTP status.
pub fn classify(ctx: &ApiErrorContext) -> ApiErrorKind {
	if let Some(kind) = ctx.error_code.as_deref().and_then(classify_code) {
		return kind;
	}

	classify_status(ctx.http_status)
}

/// Converts a non-success response into a crate error.
pub(crate) fn error_from_response(endpoint: Endpoint, response: &HttpResponse) -> Error {
	let ctx = ApiErrorContext::from_response(endpoint, response);

	error_from_context(&ctx, http::parse_retry_after(response.headers()))
}

/// Converts a classified context into a crate error.
pub(crate) fn error_from_context(ctx: &ApiErrorContext, retry_after: Option<Duration>) -> Error {
	let endpoint = ctx.endpoint;
	let reason = ctx.reason();

	match classify(ctx) {
		ApiErrorKind::Denied => Error::Denied { endpoint, reason },
		ApiErrorKind::NotFound => Error::NotFound { endpoint, reason },
		ApiErrorKind::InvalidRequest => Error::InvalidRequest { endpoint, reason },
		ApiErrorKind::InvalidGrant => Error::InvalidGrant { endpoint, reason },
		ApiErrorKind::Transient => TransientError::Endpoint {
			endpoint,
			message: reason,
			status: ctx.http_status,
			retry_after,
		}
		.into(),
	}
}

/// Returns the response untouched when its status is 2xx, or the classified error otherwise.
pub(crate) fn ensure_success(endpoint: Endpoint, response: HttpResponse) -> Result<HttpResponse> {
	if response.status().is_success() {
		Ok(response)
	} else {
		Err(error_from_response(endpoint, &response))
	}
}

/// Parses a successful JSON body, keeping the path of the first mismatch.
pub(crate) fn parse_json<T>(endpoint: Endpoint, response: &HttpResponse) -> Result<T>
where
	T: DeserializeOwned,
{
	let mut deserializer = serde_json::Deserializer::from_slice(response.body());

	serde_path_to_error::deserialize(&mut deserializer).map_err(|source| {
		TransientError::ResponseParse {
			endpoint,
			source,
			status: Some(response.status().as_u16()),
		}
		.into()
	})
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorEnvelope {
	Google { error: GoogleError },
	OAuth { error: String, error_description: Option<String> },
}

#[derive(Deserialize)]
struct GoogleError {
	message: Option<String>,
	status: Option<String>,
}

fn classify_code(code: &str) -> Option<ApiErrorKind> {
	let kind = match code {
		"PERMISSION_DENIED" | "UNAUTHENTICATED" | "access_denied" => ApiErrorKind::Denied,
		"NOT_FOUND" => ApiErrorKind::NotFound,
		"INVALID_ARGUMENT" | "FAILED_PRECONDITION" | "OUT_OF_RANGE" | "invalid_request"
		| "invalid_scope" | "invalid_target" | "unsupported_grant_type" => ApiErrorKind::InvalidRequest,
		"invalid_grant" | "invalid_client" | "unauthorized_client" => ApiErrorKind::InvalidGrant,
		"UNAVAILABLE" | "RESOURCE_EXHAUSTED" | "INTERNAL" | "DEADLINE_EXCEEDED"
		| "server_error" | "temporarily_unavailable" => ApiErrorKind::Transient,
		_ => return None,
	};

	Some(kind)
}

fn classify_status(status: Option<u16>) -> ApiErrorKind {
	match status {
		Some(400) => ApiErrorKind::InvalidRequest,
		Some(401 | 403) => ApiErrorKind::Denied,
		Some(404) => ApiErrorKind::NotFound,
		_ => ApiErrorKind::Transient,
	}
}

fn truncate_preview(body: String) -> String {
	if body.chars().count() <= ApiErrorContext::BODY_PREVIEW_LIMIT {
		return body;
	}

	let mut buf = body.chars().take(ApiErrorContext::BODY_PREVIEW_LIMIT).collect::<String>();

	buf.push('…');

	buf
}
