//! Response classification hooks that decide when a refresh is warranted.
//!
//! The pipeline never treats a non-2xx status as an error by itself; a [`FailureClassifier`]
//! only decides whether a completed response signals an invalid or expired token.

// self
use crate::{_prelude::*, http::ApiResponse};

/// Canonical response categories used by the pipeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FailureKind {
	/// 2xx response; returned as-is.
	Success,
	/// The token was rejected; triggers refresh-or-wait.
	AuthFailure,
	/// Any other failure; passed through unchanged.
	Ordinary,
}

/// Strategy hook that classifies completed responses.
///
/// Implementors must be `Send + Sync`; override it when a backend signals expired tokens
/// differently (custom status codes, error envelopes, headers).
pub trait FailureClassifier
where
	Self: Send + Sync,
{
	/// Classifies a completed response.
	fn classify(&self, response: &ApiResponse) -> FailureKind;
}

/// Default classifier: 401, or 500 whose `errorMessage` mentions a token.
#[derive(Debug, Default)]
pub struct DefaultFailureClassifier;
impl Display for DefaultFailureClassifier {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("default-failure-classifier")
	}
}
impl FailureClassifier for DefaultFailureClassifier {
	fn classify(&self, response: &ApiResponse) -> FailureKind {
		if response.is_success() {
			return FailureKind::Success;
		}

		match response.status {
			401 => FailureKind::AuthFailure,
			500 if mentions_token(response) => FailureKind::AuthFailure,
			_ => FailureKind::Ordinary,
		}
	}
}

fn mentions_token(response: &ApiResponse) -> bool {
	response.error_message().is_some_and(|message| message.to_lowercase().contains("token"))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn classify(status: u16, body: &str) -> FailureKind {
		DefaultFailureClassifier.classify(&ApiResponse::new(status, body))
	}

	#[test]
	fn unauthorized_is_always_an_auth_failure() {
		assert_eq!(classify(401, ""), FailureKind::AuthFailure);
		assert_eq!(classify(401, r#"{"errorMessage":"nope"}"#), FailureKind::AuthFailure);
	}

	#[test]
	fn server_errors_mentioning_tokens_are_auth_failures() {
		assert_eq!(classify(500, r#"{"errorMessage":"Invalid TOKEN"}"#), FailureKind::AuthFailure);
		assert_eq!(classify(500, r#"{"errorMessage":"jwt token expired"}"#), FailureKind::AuthFailure);
		assert_eq!(classify(500, r#"{"errorMessage":"database down"}"#), FailureKind::Ordinary);
		assert_eq!(classify(500, "token"), FailureKind::Ordinary);
		assert_eq!(classify(502, r#"{"errorMessage":"token"}"#), FailureKind::Ordinary);
	}

	#[test]
	fn other_statuses_pass_through() {
		assert_eq!(classify(200, ""), FailureKind::Success);
		assert_eq!(classify(204, ""), FailureKind::Success);
		assert_eq!(classify(403, ""), FailureKind::Ordinary);
		assert_eq!(classify(404, r#"{"errorMessage":"token"}"#), FailureKind::Ordinary);
	}
}
