//! The caller: one credential → identity token → HTTP call run.

mod exchange;
mod invoke;

pub use invoke::*;

// self
use crate::{
	_prelude::*,
	config::CallerConfig,
	credential::CredentialLocator,
	http::{HttpTransport, Transport},
	oauth::TransportErrorMapper,
	obs::{self, Stage, StageOutcome, StageSpan},
};
#[cfg(feature = "reqwest")]
use crate::{http::ReqwestHttpClient, oauth::ReqwestTransportErrorMapper};

#[cfg(feature = "reqwest")]
/// Caller specialized for the crate's default reqwest transport stack.
pub type ReqwestCaller = Caller<ReqwestHttpClient, ReqwestTransportErrorMapper>;

/// Runs the credential → identity token → HTTP call sequence for one [`CallerConfig`].
///
/// Stages execute strictly in order and the first failure ends the run, so the target is
/// never contacted without a freshly minted token.
pub struct Caller<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Validated run configuration.
	pub config: CallerConfig,
	/// Transport shared by every outbound request.
	pub transport: Transport<C, M>,
	/// Credential discovery inputs.
	pub locator: CredentialLocator,
}
impl<C, M> Caller<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	/// Creates a caller over a caller-provided transport.
	///
	/// Credential discovery reads the process environment once, here.
	pub fn with_transport(config: CallerConfig, transport: Transport<C, M>) -> Self {
		let locator = CredentialLocator::from_env(config.credentials.clone());

		Self { config, transport, locator }
	}

	/// Replaces the credential discovery inputs.
	pub fn with_locator(mut self, locator: CredentialLocator) -> Self {
		self.locator = locator;

		self
	}
}
#[cfg(feature = "reqwest")]
impl Caller<ReqwestHttpClient, ReqwestTransportErrorMapper> {
	/// Creates a caller backed by a reqwest client that does not follow redirects.
	pub fn new(config: CallerConfig) -> Result<Self> {
		let transport =
			Transport::new(ReqwestHttpClient::without_redirects()?, ReqwestTransportErrorMapper);

		Ok(Self::with_transport(config, transport))
	}
}
impl<C, M> Debug for Caller<C, M>
where
	C: ?Sized + HttpTransport,
	M: ?Sized + TransportErrorMapper<C::TransportError>,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Caller")
			.field("config", &self.config)
			.field("locator", &self.locator)
			.finish()
	}
}

/// Runs `fut` as `stage`: inside its span, with attempt and outcome counters.
pub(crate) async fn run_stage<T, Fut>(stage: Stage, fut: Fut) -> Result<T>
where
	Fut: Future<Output = Result<T>>,
{
	let span = StageSpan::new(stage);

	obs::record_stage_outcome(stage, StageOutcome::Attempt);

	let result = span.instrument(fut).await;

	let outcome = if result.is_ok() { StageOutcome::Success } else { StageOutcome::Failure };

	span.record_outcome(outcome);
	obs::record_stage_outcome(stage, outcome);

	result
}
