//! Bearer-authenticated call to the target endpoint.

// crates.io
use oauth2::http::{
	Method, Request, StatusCode,
	header::{AUTHORIZATION, CONTENT_TYPE},
};
// self
use crate::{
	_prelude::*,
	auth::IdToken,
	error::ConfigError,
	http::{Endpoint, HttpTransport, Transport},
	oauth::TransportErrorMapper,
};

/// Status and body returned by the target, whatever the status.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InvocationResponse {
	/// HTTP status code.
	pub status: StatusCode,
	/// `Content-Type` header, when present.
	pub content_type: Option<String>,
	/// Raw body bytes.
	pub body: Vec<u8>,
}
impl InvocationResponse {
	/// Returns `true` for a 2xx status.
	pub fn is_success(&self) -> bool {
		self.status.is_success()
	}

	/// Body decoded as UTF-8, replacing invalid sequences.
	pub fn body_text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}

/// Sends `GET url` with `Authorization: Bearer <token>`.
///
/// Non-success statuses are returned as [`InvocationResponse`] values; only transport and
/// request-building failures become errors.
pub async fn invoke<C, M>(
	transport: &Transport<C, M>,
	url: &Url,
	token: &IdToken,
) -> Result<InvocationResponse>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	let request = Request::builder()
		.method(Method::GET)
		.uri(url.as_str())
		.header(AUTHORIZATION, token.bearer_header())
		.body(Vec::new())
		.map_err(ConfigError::from)?;
	let response = transport.send(Endpoint::Target, request).await?;
	let content_type = response
		.headers()
		.get(CONTENT_TYPE)
		.and_then(|value| value.to_str().ok())
		.map(str::to_owned);
	let status = response.status();

	Ok(InvocationResponse { status, content_type, body: response.into_body() })
}
