//! OAuth 2.0 plumbing: transport error mapping and the refresh-token grant.

pub use oauth2;

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, HttpClientError, RefreshToken, RequestTokenError,
	TokenResponse, TokenUrl,
	basic::{BasicClient, BasicErrorResponse, BasicRequestTokenError},
};
// self
use crate::{
	_prelude::*,
	api::{self, ApiErrorContext},
	auth::{AccessToken, TokenSecret},
	error::{ConfigError, TransientError, TransportError},
	http::{Endpoint, HttpTransport, ResponseMetadata, ResponseMetadataSlot, Transport},
};

/// Maps HTTP transport failures into crate [`Error`] values.
pub trait TransportErrorMapper<E>
where
	Self: 'static + Send + Sync,
	E: 'static + Send + Sync + StdError,
{
	/// Converts an [`HttpClientError`] emitted by the transport into a crate error.
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		metadata: Option<&ResponseMetadata>,
		error: HttpClientError<E>,
	) -> Error;
}

/// Default mapper for reqwest-backed transports.
#[cfg(feature = "reqwest")]
#[derive(Clone, Debug, Default)]
pub struct ReqwestTransportErrorMapper;
#[cfg(feature = "reqwest")]
impl TransportErrorMapper<ReqwestError> for ReqwestTransportErrorMapper {
	fn map_transport_error(
		&self,
		endpoint: Endpoint,
		meta: Option<&ResponseMetadata>,
		err: HttpClientError<ReqwestError>,
	) -> Error {
		match err {
			HttpClientError::Reqwest(inner) => map_reqwest_error(endpoint, meta, *inner),
			HttpClientError::Http(inner) => ConfigError::from(inner).into(),
			HttpClientError::Io(inner) => TransportError::Io(inner).into(),
			HttpClientError::Other(message) => TransientError::Endpoint {
				endpoint,
				message: format!("HTTP client error: {message}"),
				status: meta_status(meta),
				retry_after: meta_retry_after(meta),
			}
			.into(),
			_ => TransientError::Endpoint {
				endpoint,
				message: "HTTP client error".into(),
				status: meta_status(meta),
				retry_after: meta_retry_after(meta),
			}
			.into(),
		}
	}
}

/// Fields needed to redeem an `authorized_user` refresh token.
#[derive(Clone, Debug)]
pub struct RefreshGrant<'a> {
	/// Token endpoint.
	pub token_uri: &'a Url,
	/// OAuth client identifier.
	pub client_id: &'a str,
	/// OAuth client secret.
	pub client_secret: &'a TokenSecret,
	/// Long-lived refresh token.
	pub refresh_token: &'a TokenSecret,
}

/// Redeems a refresh token at the OAuth token endpoint.
///
/// Client credentials travel in the request body, which Google's token endpoint accepts for
/// both installed and web clients.
pub async fn refresh_access_token<C, M>(
	transport: &Transport<C, M>,
	grant: RefreshGrant<'_>,
) -> Result<AccessToken>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	const ENDPOINT: Endpoint = Endpoint::OAuthToken;

	let token_url = TokenUrl::new(grant.token_uri.to_string())
		.map_err(|source| ConfigError::InvalidUrl { field: "token_uri", source })?;
	let client = BasicClient::new(ClientId::new(grant.client_id.to_owned()))
		.set_client_secret(ClientSecret::new(grant.client_secret.expose().to_owned()))
		.set_auth_type(AuthType::RequestBody)
		.set_token_uri(token_url);
	let refresh_token = RefreshToken::new(grant.refresh_token.expose().to_owned());
	let slot = ResponseMetadataSlot::default();
	let handle = transport.http_client.with_metadata(slot.clone());
	let response = client
		.exchange_refresh_token(&refresh_token)
		.request_async(&handle)
		.await
		.map_err(|err| {
			map_request_error(ENDPOINT, slot.take(), err, transport.error_mapper.as_ref())
		})?;
	let mut token = AccessToken::new(response.access_token().secret().to_owned());

	if token.secret.is_empty() {
		return Err(TransientError::Endpoint {
			endpoint: ENDPOINT,
			message: "response carried an empty access_token".into(),
			status: meta_status(slot.take().as_ref()),
			retry_after: None,
		}
		.into());
	}
	if let Some(lifetime) = response
		.expires_in()
		.and_then(|expires_in| Duration::try_from(expires_in).ok())
		.filter(|lifetime| lifetime.is_positive())
	{
		token = token.with_expires_in(lifetime);
	}

	Ok(token)
}

fn map_request_error<E, M>(
	endpoint: Endpoint,
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<E>>,
	mapper: &M,
) -> Error
where
	E: 'static + Send + Sync + StdError,
	M: ?Sized + TransportErrorMapper<E>,
{
	let meta_ref = meta.as_ref();

	match err {
		RequestTokenError::ServerResponse(response) =>
			map_server_response_error(endpoint, response, meta_ref),
		RequestTokenError::Request(error) => mapper.map_transport_error(endpoint, meta_ref, error),
		RequestTokenError::Parse(error, _body) =>
			TransientError::ResponseParse { endpoint, source: error, status: meta_status(meta_ref) }
				.into(),
		RequestTokenError::Other(message) => TransientError::Endpoint {
			endpoint,
			message,
			status: meta_status(meta_ref),
			retry_after: meta_retry_after(meta_ref),
		}
		.into(),
	}
}

fn map_server_response_error(
	endpoint: Endpoint,
	response: BasicErrorResponse,
	meta: Option<&ResponseMetadata>,
) -> Error {
	let mut ctx = ApiErrorContext::new(endpoint).with_error_code(response.error().as_ref());

	if let Some(description) = response.error_description() {
		ctx = ctx.with_message(description.clone());
	}
	if let Some(status) = meta_status(meta) {
		ctx = ctx.with_http_status(status);
	}

	api::error_from_context(&ctx, meta_retry_after(meta))
}

#[cfg(feature = "reqwest")]
fn map_reqwest_error(endpoint: Endpoint, meta: Option<&ResponseMetadata>, err: ReqwestError) -> Error {
	if err.is_builder() {
		return ConfigError::from(err).into();
	}
	if err.is_timeout() {
		return TransientError::Endpoint {
			endpoint,
			message: "request timed out".into(),
			status: meta_status(meta).or_else(|| err.status().map(|code| code.as_u16())),
			retry_after: meta_retry_after(meta),
		}
		.into();
	}

	TransportError::network(endpoint, err).into()
}

fn meta_status(meta: Option<&ResponseMetadata>) -> Option<u16> {
	meta.and_then(|value| value.status)
}

fn meta_retry_after(meta: Option<&ResponseMetadata>) -> Option<Duration> {
	meta.and_then(|value| value.retry_after)
}
