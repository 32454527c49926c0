// self
use crate::obs::{Outcome, Stage};

/// Records a stage outcome via the global metrics recorder and tracing (when enabled).
pub fn record_outcome(stage: Stage, outcome: Outcome) {
	#[cfg(feature = "metrics")]
	{
		metrics::counter!(
			"reauth_pipeline_total",
			"stage" => stage.as_str(),
			"outcome" => outcome.as_str()
		)
		.increment(1);
	}
	#[cfg(feature = "tracing")]
	{
		tracing::debug!(stage = stage.as_str(), outcome = outcome.as_str(), "pipeline outcome");
	}

	#[cfg(not(any(feature = "metrics", feature = "tracing")))]
	{
		let _ = (stage, outcome);
	}
}

/// Records an unexpected-but-handled condition, such as an unparsable refresh response.
pub fn record_anomaly(stage: Stage, detail: &dyn std::fmt::Display) {
	#[cfg(feature = "tracing")]
	{
		tracing::warn!(stage = stage.as_str(), %detail, "pipeline anomaly");
	}

	#[cfg(not(feature = "tracing"))]
	{
		let _ = (stage, detail);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn recorders_noop_without_features() {
		record_outcome(Stage::Refresh, Outcome::Failure);
		record_anomaly(Stage::Refresh, &"refresh body was not JSON");
	}
}
