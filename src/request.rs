//! Caller-facing request description and URL resolution.

// self
use crate::{
	_prelude::*,
	error::ConfigError,
	http::{CONTENT_TYPE, Headers, JSON_CONTENT_TYPE, Method},
};

/// Outbound call as described by the caller, before the pipeline injects anything.
///
/// `path` is either an absolute `http(s)` URL, used verbatim, or a path relative to the
/// configured API URL.
#[derive(Clone, Debug)]
pub struct ApiRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute URL or API-relative path.
	pub path: String,
	/// Caller-provided header overrides.
	pub headers: Headers,
	/// Encoded request body.
	pub body: Option<Vec<u8>>,
	/// Query pairs appended to the resolved URL.
	pub query: Vec<(String, String)>,
}
impl ApiRequest {
	/// Creates a request without body, headers, or query parameters.
	pub fn new(method: Method, path: impl Into<String>) -> Self {
		Self { method, path: path.into(), headers: Headers::new(), body: None, query: Vec::new() }
	}

	/// Shorthand for a `GET` request.
	pub fn get(path: impl Into<String>) -> Self {
		Self::new(Method::Get, path)
	}

	/// Shorthand for a `POST` request.
	pub fn post(path: impl Into<String>) -> Self {
		Self::new(Method::Post, path)
	}

	/// Shorthand for a `PUT` request.
	pub fn put(path: impl Into<String>) -> Self {
		Self::new(Method::Put, path)
	}

	/// Shorthand for a `PATCH` request.
	pub fn patch(path: impl Into<String>) -> Self {
		Self::new(Method::Patch, path)
	}

	/// Shorthand for a `DELETE` request.
	pub fn delete(path: impl Into<String>) -> Self {
		Self::new(Method::Delete, path)
	}

	/// Sets a header; caller headers win over the pipeline's defaults except `authorization`.
	pub fn header(mut self, name: impl AsRef<str>, value: impl Into<String>) -> Self {
		self.headers.insert(name, value);

		self
	}

	/// Encodes `body` as the JSON request body.
	pub fn json<T>(mut self, body: &T) -> Result<Self, ConfigError>
	where
		T: ?Sized + Serialize,
	{
		self.body = Some(serde_json::to_vec(body).map_err(ConfigError::EncodeBody)?);

		Ok(self)
	}

	/// Sets a raw body together with its content type.
	pub fn body(mut self, body: impl Into<Vec<u8>>, content_type: impl Into<String>) -> Self {
		self.headers.insert(CONTENT_TYPE, content_type);
		self.body = Some(body.into());

		self
	}

	/// Appends a query parameter.
	///
	/// `null` and unserializable values are dropped, strings are sent raw, numbers and
	/// booleans are stringified, and arrays or objects are sent as compact JSON.
	pub fn query(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
		if let Some(value) = query_value(value) {
			self.query.push((key.into(), value));
		}

		self
	}

	/// Resolves the absolute URL against `api_url` and appends query parameters.
	///
	/// An API URL is required even for absolute paths: without one the pipeline is not
	/// configured and nothing is sent.
	pub fn resolve_url(&self, api_url: Option<&Url>) -> Result<Url, ConfigError> {
		let base = api_url.ok_or(ConfigError::MissingApiUrl)?;
		let mut url = if is_absolute_url(&self.path) {
			parse_url(&self.path)?
		} else {
			parse_url(&join_url(base, &self.path))?
		};

		if !self.query.is_empty() {
			url.query_pairs_mut()
				.extend_pairs(self.query.iter().map(|(k, v)| (k.as_str(), v.as_str())));
		}

		Ok(url)
	}

	/// Returns `true` when the body is JSON (or unset, which defaults to JSON).
	pub fn is_json(&self) -> bool {
		self.headers.get(CONTENT_TYPE).is_none_or(|value| value.starts_with(JSON_CONTENT_TYPE))
	}
}

/// Returns `true` when `path` is already an absolute `http` or `https` URL.
pub fn is_absolute_url(path: &str) -> bool {
	Url::parse(path).map(|url| matches!(url.scheme(), "http" | "https")).unwrap_or(false)
}

/// Joins `path` onto `base` with exactly one `/` between them.
pub fn join_url(base: &Url, path: &str) -> String {
	format!("{}/{}", base.as_str().trim_end_matches('/'), path.trim_start_matches('/'))
}

fn parse_url(raw: &str) -> Result<Url, ConfigError> {
	Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { url: raw.to_owned(), source })
}

fn query_value(value: impl Serialize) -> Option<String> {
	match serde_json::to_value(value).ok()? {
		serde_json::Value::Null => None,
		serde_json::Value::String(text) => Some(text),
		serde_json::Value::Bool(flag) => Some(flag.to_string()),
		serde_json::Value::Number(number) => Some(number.to_string()),
		composite => Some(composite.to_string()),
	}
}
