//! Authenticated request pipeline powered by a pluggable transport and session store.

pub mod guard;

mod dispatch;
mod metrics;
mod refresh;

pub use self::{
	dispatch::{LOCALE_HEADER, REFRESH_MARKER_HEADER},
	guard::{RefreshGuard, RefreshPermit},
	metrics::PipelineMetrics,
};

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret},
	classify::{DefaultFailureClassifier, FailureClassifier},
	config::{ApiUrl, PipelineConfig},
	http::{ApiHttpClient, ApiResponse},
	locale::{DEFAULT_LOCALE, LocaleProvider},
	obs::{self, Outcome, Stage},
	request::ApiRequest,
	store::SessionStore,
};
#[cfg(feature = "reqwest")] use crate::http::ReqwestHttpClient;

#[cfg(feature = "reqwest")]
/// Pipeline specialized for the crate's default reqwest transport.
pub type ReqwestPipeline = Pipeline<ReqwestHttpClient>;

/// Sends API requests with injected headers and transparent single-flight token refresh.
///
/// The pipeline owns the transport, the session store, the API URL slot and the refresh
/// guard, so every clone shares one refresh lock and one session. Callers describe requests
/// with [`ApiRequest`] and receive every completed exchange, successful or not, as an
/// [`ApiResponse`]; only transport and local failures surface as [`Error`].
pub struct Pipeline<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// HTTP client used for every outbound request, including the refresh call.
	pub http_client: Arc<C>,
	/// Store holding the current session.
	pub store: Arc<dyn SessionStore>,
	/// Base URL that relative request paths are joined onto.
	pub api_url: ApiUrl,
	/// Source of the `x-locale` header.
	pub locale: Arc<dyn LocaleProvider>,
	/// Decides which responses warrant a refresh.
	pub classifier: Arc<dyn FailureClassifier>,
	/// Validated tunables.
	pub config: PipelineConfig,
	/// Shared counters for refresh and retry outcomes.
	pub metrics: Arc<PipelineMetrics>,
	refresh_guard: Arc<RefreshGuard>,
}
impl<C> Pipeline<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Creates a pipeline that reuses the caller-provided transport.
	pub fn with_http_client(
		store: Arc<dyn SessionStore>,
		api_url: ApiUrl,
		http_client: impl Into<Arc<C>>,
	) -> Self {
		Self {
			http_client: http_client.into(),
			store,
			api_url,
			locale: Arc::new(DEFAULT_LOCALE),
			classifier: Arc::new(DefaultFailureClassifier),
			config: PipelineConfig::default(),
			metrics: Default::default(),
			refresh_guard: Default::default(),
		}
	}

	/// Sets the provider of the current UI language.
	pub fn with_locale(mut self, locale: impl 'static + LocaleProvider) -> Self {
		self.locale = Arc::new(locale);

		self
	}

	/// Replaces the response classifier.
	pub fn with_classifier(mut self, classifier: impl 'static + FailureClassifier) -> Self {
		self.classifier = Arc::new(classifier);

		self
	}

	/// Replaces the pipeline config.
	pub fn with_config(mut self, config: PipelineConfig) -> Self {
		self.config = config;

		self
	}

	/// Guard serializing refresh calls across every clone of this pipeline.
	pub fn refresh_guard(&self) -> &RefreshGuard {
		&self.refresh_guard
	}

	/// Returns a snapshot of the current session.
	pub fn session(&self) -> Session {
		self.store.snapshot()
	}

	/// Returns `true` when an access token is held.
	pub fn is_authenticated(&self) -> bool {
		self.store.current_token().is_some()
	}

	/// Populates the session after a successful login.
	pub fn sign_in(
		&self,
		access_token: impl Into<TokenSecret>,
		refresh_token: Option<TokenSecret>,
	) -> Result<()> {
		self.store.update_tokens(access_token.into(), refresh_token)?;

		Ok(())
	}

	/// Clears the session on an explicit user logout.
	pub fn sign_out(&self) -> Result<()> {
		self.store.clear_session()?;

		Ok(())
	}

	/// Sends `request` and decodes a 2xx body as `T`.
	///
	/// Non-2xx responses come back untouched in the inner `Err` so callers can inspect them.
	pub async fn send_json<T>(&self, request: ApiRequest) -> Result<Result<T, ApiResponse>>
	where
		T: for<'de> Deserialize<'de>,
	{
		let response = self.send(request).await?;

		if !response.is_success() {
			return Ok(Err(response));
		}

		response.json().map(Ok)
	}

	/// Forced logout: the session cannot be recovered.
	fn logout(&self, stage: Stage) -> Result<()> {
		self.store.clear_session()?;
		self.metrics.record_logout();

		obs::record_outcome(stage, Outcome::LoggedOut);

		Ok(())
	}
}
#[cfg(feature = "reqwest")]
impl Pipeline<ReqwestHttpClient> {
	/// Creates a new pipeline backed by a default reqwest transport.
	pub fn new(store: Arc<dyn SessionStore>, api_url: ApiUrl) -> Self {
		Self::with_http_client(store, api_url, ReqwestHttpClient::default())
	}
}
impl<C> Clone for Pipeline<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn clone(&self) -> Self {
		Self {
			http_client: self.http_client.clone(),
			store: self.store.clone(),
			api_url: self.api_url.clone(),
			locale: self.locale.clone(),
			classifier: self.classifier.clone(),
			config: self.config.clone(),
			metrics: self.metrics.clone(),
			refresh_guard: self.refresh_guard.clone(),
		}
	}
}
impl<C> Debug for Pipeline<C>
where
	C: ?Sized + ApiHttpClient,
{
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Pipeline")
			.field("api_url", &self.api_url.get().map(|url| url.to_string()))
			.field("config", &self.config)
			.field("authenticated", &self.is_authenticated())
			.finish()
	}
}
