//! Optional observability helpers for pipeline calls.
//!
//! # Feature Flags
//!
//! - Enable `tracing` to emit structured spans named `reauth.pipeline` with the `stage` and
//!   scrubbed `url` fields, plus a debug event for every recorded outcome.
//! - Enable `metrics` to increment the `reauth_pipeline_total` counter for every outcome,
//!   labeled by `stage` + `outcome`.
//!
//! URLs are always passed through [`scrub_url`] before they reach a span.

mod metrics;
mod scrub;
mod tracing;

pub use self::{metrics::*, scrub::*, tracing::*};

// self
use crate::_prelude::*;

/// Pipeline stages observed by the instrumentation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
	/// A caller request entering the pipeline.
	Request,
	/// The single-flight refresh call.
	Refresh,
	/// A re-send after a refresh cycle.
	Retry,
}
impl Stage {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Stage::Request => "request",
			Stage::Refresh => "refresh",
			Stage::Retry => "retry",
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
pub enum Outcome {
	/// Entry to a stage.
	Attempt,
	/// Successful completion.
	Success,
	/// Failure propagated back to the caller.
	Failure,
	/// The request parked behind another request's refresh.
	Waited,
	/// The session was cleared.
	LoggedOut,
}
impl Outcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			Outcome::Attempt => "attempt",
			Outcome::Success => "success",
			Outcome::Failure => "failure",
			Outcome::Waited => "waited",
			Outcome::LoggedOut => "logged_out",
		}
	}
}
impl Display for Outcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
