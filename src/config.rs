//! Pipeline configuration: validated tunables and the runtime API URL slot.

// self
use crate::{_prelude::*, error::ConfigError, locale::DEFAULT_LOCALE, request::is_absolute_url};

/// Refresh endpoint path used by the backend (the misspelling is part of the API).
pub const DEFAULT_REFRESH_PATH: &str = "/auth/refesh-token/";

/// Errors raised while validating a [`PipelineConfig`].
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum PipelineConfigError {
	/// Refresh endpoint path must not be empty.
	#[error("Refresh path must not be empty.")]
	EmptyRefreshPath,
	/// Refresh endpoint path must be relative to the API URL.
	#[error("Refresh path must be relative to the API URL: {path}.")]
	AbsoluteRefreshPath {
		/// Offending path.
		path: String,
	},
	/// Timeouts must be strictly positive.
	#[error("The {field} timeout must be positive.")]
	NonPositiveTimeout {
		/// Which timeout failed validation.
		field: &'static str,
	},
	/// Fallback locale must be a non-empty token without whitespace.
	#[error("Default locale `{locale}` is invalid.")]
	InvalidDefaultLocale {
		/// Offending locale.
		locale: String,
	},
}

/// Immutable tunables consumed by the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
	/// API-relative path of the refresh endpoint.
	pub refresh_path: String,
	/// Upper bound on the refresh call; it also bounds how long waiters stay parked.
	pub refresh_timeout: Duration,
	/// Optional bound applied to every regular request.
	pub request_timeout: Option<Duration>,
	/// Locale code sent when the UI language has no mapping.
	pub default_locale: String,
}
impl PipelineConfig {
	const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::seconds(30);

	/// Creates a builder seeded with the defaults.
	pub fn builder() -> PipelineConfigBuilder {
		PipelineConfigBuilder::default()
	}

	pub(crate) fn refresh_timeout_std(&self) -> Option<StdDuration> {
		StdDuration::try_from(self.refresh_timeout).ok()
	}

	pub(crate) fn request_timeout_std(&self) -> Option<StdDuration> {
		self.request_timeout.and_then(|timeout| StdDuration::try_from(timeout).ok())
	}

	fn validate(&self) -> Result<(), PipelineConfigError> {
		if self.refresh_path.trim().is_empty() {
			return Err(PipelineConfigError::EmptyRefreshPath);
		}
		if is_absolute_url(&self.refresh_path) {
			return Err(PipelineConfigError::AbsoluteRefreshPath {
				path: self.refresh_path.clone(),
			});
		}
		if !self.refresh_timeout.is_positive() {
			return Err(PipelineConfigError::NonPositiveTimeout { field: "refresh" });
		}
		if self.request_timeout.is_some_and(|timeout| !timeout.is_positive()) {
			return Err(PipelineConfigError::NonPositiveTimeout { field: "request" });
		}
		if self.default_locale.is_empty() || self.default_locale.contains(char::is_whitespace) {
			return Err(PipelineConfigError::InvalidDefaultLocale {
				locale: self.default_locale.clone(),
			});
		}

		Ok(())
	}
}
impl Default for PipelineConfig {
	fn default() -> Self {
		Self {
			refresh_path: DEFAULT_REFRESH_PATH.into(),
			refresh_timeout: Self::DEFAULT_REFRESH_TIMEOUT,
			request_timeout: None,
			default_locale: DEFAULT_LOCALE.into(),
		}
	}
}

/// Builder for [`PipelineConfig`] values.
#[derive(Debug, Default)]
pub struct PipelineConfigBuilder {
	config: PipelineConfig,
}
impl PipelineConfigBuilder {
	/// Overrides the refresh endpoint path.
	pub fn refresh_path(mut self, path: impl Into<String>) -> Self {
		self.config.refresh_path = path.into();

		self
	}

	/// Overrides the refresh call timeout (defaults to 30 seconds).
	pub fn refresh_timeout(mut self, timeout: Duration) -> Self {
		self.config.refresh_timeout = timeout;

		self
	}

	/// Bounds every regular request.
	pub fn request_timeout(mut self, timeout: Duration) -> Self {
		self.config.request_timeout = Some(timeout);

		self
	}

	/// Overrides the fallback locale code (defaults to `en`).
	pub fn default_locale(mut self, locale: impl Into<String>) -> Self {
		self.config.default_locale = locale.into();

		self
	}

	/// Consumes the builder and validates the resulting config.
	pub fn build(self) -> Result<PipelineConfig, PipelineConfigError> {
		self.config.validate()?;

		Ok(self.config)
	}
}

/// Runtime slot holding the base API URL.
///
/// Applications typically resolve the URL from a remote config endpoint at startup, after
/// the pipeline already exists; clones share the same slot.
#[derive(Clone, Debug, Default)]
pub struct ApiUrl(Arc<RwLock<Option<Url>>>);
impl ApiUrl {
	/// Creates an empty slot; relative requests fail until [`set`](Self::set) is called.
	pub fn unset() -> Self {
		Self::default()
	}

	/// Creates a slot holding `raw` after validation.
	pub fn parse(raw: &str) -> Result<Self, ConfigError> {
		let slot = Self::unset();

		slot.set_str(raw)?;

		Ok(slot)
	}

	/// Replaces the API URL.
	pub fn set(&self, url: Url) -> Result<(), ConfigError> {
		if !matches!(url.scheme(), "http" | "https") {
			return Err(ConfigError::UnsupportedScheme { url: url.to_string() });
		}

		*self.0.write() = Some(url);

		Ok(())
	}

	/// Parses and replaces the API URL.
	pub fn set_str(&self, raw: &str) -> Result<(), ConfigError> {
		let url = Url::parse(raw)
			.map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })?;

		self.set(url)
	}

	/// Returns the current API URL.
	pub fn get(&self) -> Option<Url> {
		self.0.read().clone()
	}

	/// Forgets the API URL.
	pub fn clear(&self) {
		*self.0.write() = None;
	}
}
