//! Optional observability hooks for the caller stages.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to run each stage inside a span named `federated_id_token.stage` carrying
//!   `stage` and, once the stage settles, `outcome`.
//! - Enable `metrics` to increment the `federated_id_token_stage_total` counter for every
//!   attempt/success/failure, labeled by `stage` + `outcome`.

mod metrics;
mod tracing;

pub use metrics::*;
pub use tracing::*;

// self
use crate::_prelude::*;

/// Stages of one run, in execution order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// Locating and parsing the credential file.
	LoadCredential,
	/// Trading the credential for an OAuth access token.
	AccessToken,
	/// Minting the identity token through IAM Credentials.
	GenerateIdToken,
	/// Calling the target endpoint.
	Invoke,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::LoadCredential => "load_credential",
			Stage::AccessToken => "access_token",
			Stage::GenerateIdToken => "generate_id_token",
			Stage::Invoke => "invoke",
		}
	}
}
impl Display for Stage {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Outcome labels recorded for each stage.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageOutcome {
	/// Stage started.
	Attempt,
	/// Stage completed.
	Success,
	/// Stage failed and ended the run.
	Failure,
}
impl StageOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			StageOutcome::Attempt => "attempt",
			StageOutcome::Success => "success",
			StageOutcome::Failure => "failure",
		}
	}
}
impl Display for StageOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
