// self
use crate::{
	_prelude::*,
	obs::{Stage, StageOutcome},
};

/// Future type returned by [`StageSpan::instrument`].
#[cfg(feature = "tracing")]
pub type InstrumentedStage<F> = tracing::instrument::Instrumented<F>;
/// Passthrough future type when tracing is disabled.
#[cfg(not(feature = "tracing"))]
pub type InstrumentedStage<F> = F;

/// Span wrapping one stage of a run.
///
/// The span is opened with an empty `outcome` field that [`StageSpan::record_outcome`] fills
/// once the stage settles, so a single span line tells whether the stage passed.
#[derive(Clone, Debug)]
pub struct StageSpan {
	#[cfg(feature = "tracing")]
	span: tracing::Span,
}
impl StageSpan {
	/// Creates a span for `stage`.
	pub fn new(stage: Stage) -> Self {
		#[cfg(feature = "tracing")]
		{
			let span = tracing::info_span!(
				"federated_id_token.stage",
				stage = stage.as_str(),
				outcome = tracing::field::Empty,
			);

			Self { span }
		}
		#[cfg(not(feature = "tracing"))]
		{
			let _ = stage;

			Self {}
		}
	}

	/// Runs `fut` inside the span.
	pub fn instrument<Fut>(&self, fut: Fut) -> InstrumentedStage<Fut>
	where
		Fut: Future,
	{
		#[cfg(feature = "tracing")]
		{
			use tracing::Instrument;

			fut.instrument(self.span.clone())
		}
		#[cfg(not(feature = "tracing"))]
		{
			fut
		}
	}

	/// Fills the span's `outcome` field.
	pub fn record_outcome(&self, outcome: StageOutcome) {
		#[cfg(feature = "tracing")]
		self.span.record("outcome", outcome.as_str());
		#[cfg(not(feature = "tracing"))]
		let _ = outcome;
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[tokio::test]
	async fn instrumented_stage_yields_its_output() {
		let span = StageSpan::new(Stage::Invoke);
		let value = span.instrument(async { 7 }).await;

		span.record_outcome(StageOutcome::Success);

		assert_eq!(value, 7);
	}
}
