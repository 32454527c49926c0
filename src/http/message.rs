//! Transport-neutral request and response messages.

// self
use crate::_prelude::*;

/// `content-type` header name.
pub const CONTENT_TYPE: &str = "content-type";
/// `authorization` header name.
pub const AUTHORIZATION: &str = "authorization";
/// Content type applied to requests that do not set one.
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP methods supported by the pipeline.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Method {
	#[default]
	/// `GET`.
	Get,
	/// `POST`.
	Post,
	/// `PUT`.
	Put,
	/// `PATCH`.
	Patch,
	/// `DELETE`.
	Delete,
	/// `HEAD`.
	Head,
}
impl Method {
	/// Returns the canonical upper-case method token.
	pub const fn as_str(self) -> &'static str {
		match self {
			Method::Get => "GET",
			Method::Post => "POST",
			Method::Put => "PUT",
			Method::Patch => "PATCH",
			Method::Delete => "DELETE",
			Method::Head => "HEAD",
		}
	}
}
impl Display for Method {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}

/// Case-insensitive header map; names are stored lower-cased.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers(BTreeMap<String, String>);
impl Headers {
	/// Creates an empty header map.
	pub fn new() -> Self {
		Self::default()
	}

	/// Sets `name` to `value`, replacing any previous value.
	pub fn insert(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
		self.0.insert(name.as_ref().to_ascii_lowercase(), value.into());
	}

	/// Sets `name` to `value` only when the header is not present yet.
	pub fn insert_if_absent(&mut self, name: impl AsRef<str>, value: impl Into<String>) {
		self.0.entry(name.as_ref().to_ascii_lowercase()).or_insert_with(|| value.into());
	}

	/// Looks up a header value.
	pub fn get(&self, name: &str) -> Option<&str> {
		self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
	}

	/// Returns `true` when the header is present.
	pub fn contains(&self, name: &str) -> bool {
		self.0.contains_key(&name.to_ascii_lowercase())
	}

	/// Removes a header, returning its previous value.
	pub fn remove(&mut self, name: &str) -> Option<String> {
		self.0.remove(&name.to_ascii_lowercase())
	}

	/// Iterates over `(name, value)` pairs in name order.
	pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
		self.0.iter().map(|(name, value)| (name.as_str(), value.as_str()))
	}

	/// Number of headers.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no header is set.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}
}
impl Debug for Headers {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_map()
			.entries(self.0.iter().map(|(name, value)| {
				let shown = if name == AUTHORIZATION { "<redacted>" } else { value.as_str() };

				(name, shown)
			}))
			.finish()
	}
}
impl<K, V> FromIterator<(K, V)> for Headers
where
	K: AsRef<str>,
	V: Into<String>,
{
	fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
		let mut headers = Self::new();

		for (name, value) in iter {
			headers.insert(name, value);
		}

		headers
	}
}

/// Fully resolved request handed to an [`ApiHttpClient`](crate::http::ApiHttpClient).
///
/// Everything the pipeline computes (absolute URL, injected headers, timeout) is already
/// applied; transports send it verbatim.
#[derive(Clone, Debug)]
pub struct WireRequest {
	/// HTTP method.
	pub method: Method,
	/// Absolute request URL.
	pub url: Url,
	/// Outbound headers.
	pub headers: Headers,
	/// Raw request body.
	pub body: Option<Vec<u8>>,
	/// Per-request timeout, when bounded.
	pub timeout: Option<StdDuration>,
}

/// Completed HTTP exchange, successful or not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ApiResponse {
	/// HTTP status code.
	pub status: u16,
	/// Response headers.
	pub headers: Headers,
	/// Raw response body.
	pub body: Vec<u8>,
}
impl ApiResponse {
	/// Creates a response with an empty header map.
	pub fn new(status: u16, body: impl Into<Vec<u8>>) -> Self {
		Self { status, headers: Headers::new(), body: body.into() }
	}

	/// Returns `true` for 2xx statuses.
	pub fn is_success(&self) -> bool {
		(200..300).contains(&self.status)
	}

	/// Decodes the body as JSON, reporting the failing path on mismatch.
	pub fn json<T>(&self) -> Result<T>
	where
		T: for<'de> Deserialize<'de>,
	{
		let mut deserializer = serde_json::Deserializer::from_slice(&self.body);

		serde_path_to_error::deserialize(&mut deserializer)
			.map_err(|source| Error::Decode { source, status: self.status })
	}

	/// Returns the backend's `errorMessage` field when the body carries one.
	pub fn error_message(&self) -> Option<String> {
		#[derive(Deserialize)]
		struct ErrorEnvelope {
			#[serde(rename = "errorMessage")]
			error_message: Option<String>,
		}

		serde_json::from_slice::<ErrorEnvelope>(&self.body).ok()?.error_message
	}

	/// Returns the body as UTF-8 text, replacing invalid sequences.
	pub fn text(&self) -> String {
		String::from_utf8_lossy(&self.body).into_owned()
	}
}
