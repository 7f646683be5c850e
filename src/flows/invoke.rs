//! Target invocation stage and the full run.

// self
use crate::{
	_prelude::*,
	auth::IdToken,
	flows::{self, Caller},
	http::HttpTransport,
	invoke::{self, InvocationResponse},
	oauth::TransportErrorMapper,
	obs::Stage,
};

/// Result of a complete run.
#[derive(Clone, Debug)]
pub struct RunOutcome {
	/// Identity token presented to the target.
	pub id_token: IdToken,
	/// Target response, successful or not.
	pub response: InvocationResponse,
}

impl<C, M> Caller<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Calls the configured URL with `id_token` as the bearer credential.
	pub async fn invoke(&self, id_token: &IdToken) -> Result<InvocationResponse> {
		flows::run_stage(Stage::Invoke, invoke::invoke(&self.transport, &self.config.url, id_token))
			.await
	}

	/// Mints an identity token, then calls the target with it.
	///
	/// Any failure before the call prevents the call.
	pub async fn run(&self) -> Result<RunOutcome> {
		let id_token = self.fetch_id_token().await?;
		let response = self.invoke(&id_token).await?;

		Ok(RunOutcome { id_token, response })
	}
}
