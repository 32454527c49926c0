//! Request preparation: URL resolution and header injection.

// self
use crate::{
	_prelude::*,
	http::{AUTHORIZATION, ApiHttpClient, ApiResponse, CONTENT_TYPE, JSON_CONTENT_TYPE, WireRequest},
	locale,
	pipeline::Pipeline,
	request::ApiRequest,
};

/// Local-only marker that suppresses bearer injection; it never reaches the wire.
pub const REFRESH_MARKER_HEADER: &str = "doRefresh";
/// Header carrying the backend locale code.
pub const LOCALE_HEADER: &str = "x-locale";

impl<C> Pipeline<C>
where
	C: ?Sized + ApiHttpClient,
{
	/// Resolves the URL and computes the outbound headers for `request`.
	///
	/// Caller headers win for `content-type` and `x-locale`. `authorization` always carries the
	/// current access token unless the request is marked with [`REFRESH_MARKER_HEADER`], in
	/// which case it carries whatever the caller set (usually nothing).
	pub fn prepare(&self, request: &ApiRequest, timeout: Option<StdDuration>) -> Result<WireRequest> {
		let url = request.resolve_url(self.api_url.get().as_ref())?;
		let mut headers = request.headers.clone();

		headers.insert_if_absent(CONTENT_TYPE, JSON_CONTENT_TYPE);
		headers.insert_if_absent(LOCALE_HEADER, self.locale_code());

		let bearer_suppressed = headers.remove(REFRESH_MARKER_HEADER).is_some();
		let token = if bearer_suppressed { None } else { self.store.current_token() };

		if let Some(token) = token {
			headers.insert(AUTHORIZATION, token.bearer());
		}

		Ok(WireRequest { method: request.method, url, headers, body: request.body.clone(), timeout })
	}

	pub(crate) async fn dispatch(
		&self,
		request: &ApiRequest,
		timeout: Option<StdDuration>,
	) -> Result<ApiResponse> {
		let wire = self.prepare(request, timeout)?;

		self.http_client.execute(wire).await
	}

	fn locale_code(&self) -> String {
		let language = self.locale.language();

		locale::locale_code(&language)
			.map(str::to_owned)
			.unwrap_or_else(|| self.config.default_locale.clone())
	}
}
