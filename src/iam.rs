//! IAM Credentials `generateIdToken` exchange.

// crates.io
use oauth2::http::{HeaderValue, header::HeaderName};
// self
use crate::{
	_prelude::*,
	api,
	auth::{AccessToken, IdToken, ServiceAccountName},
	credential,
	error::{ConfigError, TransientError},
	http::{Endpoint, HttpTransport, Transport},
	oauth::TransportErrorMapper,
};

/// Header naming the project billed for the call.
pub const USER_PROJECT_HEADER: &str = "x-goog-user-project";

/// Request for an identity token.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateIdTokenRequest {
	/// Audience embedded in the token.
	pub audience: String,
	/// Whether to include the `email` and `email_verified` claims.
	pub include_email: bool,
	/// Delegation chain, each entry a full service account resource name.
	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub delegates: Vec<String>,
}
impl GenerateIdTokenRequest {
	/// Creates a request for `audience`.
	pub fn new(audience: impl Into<String>, include_email: bool) -> Self {
		Self { audience: audience.into(), include_email, delegates: Vec::new() }
	}

	/// Sets the delegation chain.
	pub fn with_delegates<'a, I>(mut self, delegates: I) -> Self
	where
		I: IntoIterator<Item = &'a ServiceAccountName>,
	{
		self.delegates = delegates.into_iter().map(ToString::to_string).collect();

		self
	}
}

#[derive(Deserialize)]
struct GenerateIdTokenResponse {
	#[serde(default)]
	token: String,
}

/// Mints an identity token by POSTing `request` to `url` (a `...:generateIdToken` URL).
///
/// `quota_project` is forwarded as [`USER_PROJECT_HEADER`] when the credential names one.
pub async fn generate_id_token<C, M>(
	transport: &Transport<C, M>,
	url: &Url,
	access_token: &AccessToken,
	quota_project: Option<&str>,
	request: &GenerateIdTokenRequest,
) -> Result<IdToken>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	const ENDPOINT: Endpoint = Endpoint::GenerateIdToken;

	let mut http_request = credential::json_request(url, access_token, request)?;

	if let Some(project) = quota_project {
		let value = HeaderValue::from_str(project)
			.map_err(|e| ConfigError::from(oauth2::http::Error::from(e)))?;

		http_request.headers_mut().insert(HeaderName::from_static(USER_PROJECT_HEADER), value);
	}

	let response = api::ensure_success(ENDPOINT, transport.send(ENDPOINT, http_request).await?)?;
	let parsed: GenerateIdTokenResponse = api::parse_json(ENDPOINT, &response)?;

	if parsed.token.is_empty() {
		return Err(TransientError::Endpoint {
			endpoint: ENDPOINT,
			message: "response did not contain a token".into(),
			status: Some(response.status().as_u16()),
			retry_after: None,
		}
		.into());
	}

	Ok(IdToken::new(parsed.token))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn body_uses_camel_case_and_skips_empty_delegates() {
		let request = GenerateIdTokenRequest::new("https://svc.example.com", true);

		assert_eq!(
			serde_json::to_value(&request).expect("Request should serialize."),
			serde_json::json!({ "audience": "https://svc.example.com", "includeEmail": true })
		);

		let hop = ServiceAccountName::parse("hop@p.iam.gserviceaccount.com")
			.expect("Fixture account should parse.");
		let request = request.with_delegates([&hop]);

		assert_eq!(
			serde_json::to_value(&request).expect("Request should serialize.")["delegates"],
			serde_json::json!(["projects/-/serviceAccounts/hop@p.iam.gserviceaccount.com"])
		);
	}
}
