//! Authenticated send with single-flight token refresh.
//!
//! [`Pipeline::send`] dispatches a request once and, when the classifier reports an auth
//! failure, serializes recovery behind the pipeline's [`RefreshGuard`](super::RefreshGuard).
//! The first request to take the guard calls the refresh endpoint; every request that failed
//! with the replaced token re-sends once with the new one. A missing refresh token or a failed
//! refresh call ends the session and hands back the original failure.

// self
use crate::{
	_prelude::*,
	auth::TokenSecret,
	classify::FailureKind,
	error::ConfigError,
	http::{ApiHttpClient, ApiResponse},
	obs::{self, Outcome, PipelineSpan, Stage},
	pipeline::{Pipeline, REFRESH_MARKER_HEADER},
	request::ApiRequest,
};

#[derive(Serialize)]
struct RefreshTokenRequest<'a> {
	refresh_token: &'a str,
}

#[derive(Debug, Deserialize)]
struct RefreshTokenResponse {
	#[serde(default)]
	access_token: Option<String>,
	#[serde(default)]
	fresh_token: Option<String>,
	#[serde(default)]
	refresh_token: Option<String>,
}
impl RefreshTokenResponse {
	fn into_tokens(self) -> Option<(TokenSecret, Option<TokenSecret>)> {
		let access_token = self.access_token.filter(|token| !token.is_empty())?;
		let refresh_token =
			self.fresh_token.or(self.refresh_token).filter(|token| !token.is_empty());

		Some((TokenSecret::new(access_token), refresh_token.map(TokenSecret::new)))
	}
}

impl<C> Pipeline<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Sends `request`, refreshing the session at most once if it fails authentication.
	///
	/// Every completed exchange comes back as `Ok`, including the original failure when the
	/// session could not be recovered. Errors are reserved for transport failures, local
	/// misconfiguration, and session store failures.
	pub async fn send(&self, request: ApiRequest) -> Result<ApiResponse> {
		const STAGE: Stage = Stage::Request;

		let span = PipelineSpan::new(STAGE, &request.path);

		obs::record_outcome(STAGE, Outcome::Attempt);

		let result = span.instrument(self.send_guarded(&request)).await;

		match &result {
			Ok(response) if response.is_success() => obs::record_outcome(STAGE, Outcome::Success),
			_ => obs::record_outcome(STAGE, Outcome::Failure),
		}

		result
	}

	async fn send_guarded(&self, request: &ApiRequest) -> Result<ApiResponse> {
		if self.api_url.get().is_none() {
			return Err(ConfigError::MissingApiUrl.into());
		}

		// Requests issued while a refresh is in flight would only carry the outgoing token.
		self.refresh_guard.wait_unlocked().await;

		let seen = self.refresh_guard.generation();
		let response = self.dispatch(request, self.config.request_timeout_std()).await?;

		if self.classifier.classify(&response) != FailureKind::AuthFailure {
			return Ok(response);
		}

		let (mut permit, waited) = self.refresh_guard.acquire().await;

		if permit.is_stale(seen) {
			drop(permit);

			// Parking behind another request's pre-send check is not a refresh wait.
			if waited {
				self.metrics.record_wait();

				obs::record_outcome(Stage::Request, Outcome::Waited);
			}

			return self.resend(request).await;
		}

		let session = self.store.snapshot();
		let Some(refresh_token) = session.refresh_token else {
			if session.access_token.is_some() {
				self.logout(Stage::Request)?;
				permit.complete();
			}

			return Ok(response);
		};
		let refreshed = self.refresh_tokens(&refresh_token).await;

		permit.complete();
		// The re-send has no timeout by default and must not run under the guard.
		drop(permit);

		if !refreshed? {
			return Ok(response);
		}

		self.resend(request).await
	}

	async fn resend(&self, request: &ApiRequest) -> Result<ApiResponse> {
		const STAGE: Stage = Stage::Retry;

		let span = PipelineSpan::new(STAGE, &request.path);

		self.metrics.record_retry();
		obs::record_outcome(STAGE, Outcome::Attempt);

		let result = span.instrument(self.dispatch(request, self.config.request_timeout_std())).await;

		match &result {
			Ok(response) if response.is_success() => obs::record_outcome(STAGE, Outcome::Success),
			_ => obs::record_outcome(STAGE, Outcome::Failure),
		}

		result
	}

	/// Exchanges `refresh_token` for a new token pair.
	///
	/// Returns `Ok(true)` once the store holds the new pair and `Ok(false)` after a forced
	/// logout.
	async fn refresh_tokens(&self, refresh_token: &TokenSecret) -> Result<bool> {
		const STAGE: Stage = Stage::Refresh;

		let span = PipelineSpan::new(STAGE, &self.config.refresh_path);

		obs::record_outcome(STAGE, Outcome::Attempt);
		self.metrics.record_refresh_attempt();

		let result = span.instrument(self.exchange_refresh_token(refresh_token)).await;

		match &result {
			Ok(true) => {
				self.metrics.record_refresh_success();

				obs::record_outcome(STAGE, Outcome::Success);
			},
			_ => {
				self.metrics.record_refresh_failure();

				obs::record_outcome(STAGE, Outcome::Failure);
			},
		}

		result
	}

	async fn exchange_refresh_token(&self, refresh_token: &TokenSecret) -> Result<bool> {
		let request = ApiRequest::post(self.config.refresh_path.as_str())
			.header(REFRESH_MARKER_HEADER, "true")
			.json(&RefreshTokenRequest { refresh_token: refresh_token.expose() })?;
		let tokens = match self.dispatch(&request, self.config.refresh_timeout_std()).await {
			Ok(response) => parse_refresh_response(&response),
			Err(Error::Transport(err)) => {
				obs::record_anomaly(Stage::Refresh, &err);

				None
			},
			Err(err) => return Err(err),
		};
		let Some((access_token, rotated)) = tokens else {
			self.logout(Stage::Refresh)?;

			return Ok(false);
		};

		// Backends that do not rotate refresh tokens omit the field; keep the current one.
		self.store.update_tokens(access_token, rotated.or_else(|| Some(refresh_token.clone())))?;

		Ok(true)
	}
}

fn parse_refresh_response(response: &ApiResponse) -> Option<(TokenSecret, Option<TokenSecret>)> {
	if !response.is_success() {
		obs::record_anomaly(
			Stage::Refresh,
			&format_args!("refresh endpoint answered with HTTP {}", response.status),
		);

		return None;
	}

	let tokens = match response.json::<RefreshTokenResponse>() {
		Ok(body) => body.into_tokens(),
		Err(err) => {
			obs::record_anomaly(Stage::Refresh, &err);

			return None;
		},
	};

	if tokens.is_none() {
		obs::record_anomaly(Stage::Refresh, &"refresh response carried no access token");
	}

	tokens
}
