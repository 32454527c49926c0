// std
use std::{
	sync::{
		Arc,
		atomic::{AtomicUsize, Ordering},
	},
	time::Duration as StdDuration,
};
// crates.io
use parking_lot::Mutex;
// self
use reauth::{
	auth::{Session, SessionStatus, TokenSecret},
	config::{ApiUrl, DEFAULT_REFRESH_PATH, PipelineConfig},
	error::{ConfigError, Error, TransportError},
	http::{ApiHttpClient, ApiResponse, HttpFuture, WireRequest},
	pipeline::{LOCALE_HEADER, Pipeline},
	request::ApiRequest,
	store::{MemorySessionStore, SessionStore, StoreError},
};

#[derive(Clone, Copy)]
enum RefreshReply {
	Rotate,
	Unreachable,
	TimedOut,
}

/// Scripted backend: accepts only `Bearer <accepted>` and rotates to `new` on refresh.
struct ScriptedBackend {
	accepted: &'static str,
	refresh_reply: RefreshReply,
	refresh_delay: StdDuration,
	response_delay: StdDuration,
	// Requests to this path never answer once they carry the rotated token.
	hang_on: Option<&'static str>,
	refresh_calls: AtomicUsize,
	sent: Mutex<Vec<WireRequest>>,
}
impl ScriptedBackend {
	fn new(accepted: &'static str) -> Self {
		Self {
			accepted,
			refresh_reply: RefreshReply::Rotate,
			refresh_delay: StdDuration::from_millis(50),
			response_delay: StdDuration::ZERO,
			hang_on: None,
			refresh_calls: AtomicUsize::new(0),
			sent: Mutex::new(Vec::new()),
		}
	}

	fn with_refresh_reply(mut self, reply: RefreshReply) -> Self {
		self.refresh_reply = reply;

		self
	}

	fn with_response_delay(mut self, delay: StdDuration) -> Self {
		self.response_delay = delay;

		self
	}

	fn hanging_on(mut self, path: &'static str) -> Self {
		self.hang_on = Some(path);

		self
	}

	fn refresh_calls(&self) -> usize {
		self.refresh_calls.load(Ordering::SeqCst)
	}

	fn sent_to(&self, path: &str) -> Vec<WireRequest> {
		self.sent.lock().iter().filter(|request| request.url.path() == path).cloned().collect()
	}
}
impl ApiHttpClient for ScriptedBackend {
	fn execute(&self, request: WireRequest) -> HttpFuture<'_> {
		Box::pin(async move {
			self.sent.lock().push(request.clone());

			if request.url.path() == DEFAULT_REFRESH_PATH {
				self.refresh_calls.fetch_add(1, Ordering::SeqCst);
				tokio::time::sleep(self.refresh_delay).await;

				return match self.refresh_reply {
					RefreshReply::Rotate => Ok(ApiResponse::new(
						200,
						r#"{"access_token":"new","fresh_token":"rtok2"}"#,
					)),
					RefreshReply::Unreachable => Err(Error::Transport(TransportError::network(
						std::io::Error::other("connection reset"),
					))),
					RefreshReply::TimedOut => Err(Error::Transport(TransportError::timeout(
						std::io::Error::other("refresh deadline elapsed"),
					))),
				};
			}
			if self.hang_on == Some(request.url.path())
				&& request.headers.get("authorization") == Some("Bearer new")
			{
				std::future::pending::<()>().await;
			}

			tokio::time::sleep(self.response_delay).await;

			let expected = format!("Bearer {}", self.accepted);

			if request.headers.get("authorization") == Some(expected.as_str()) {
				Ok(ApiResponse::new(200, "ok"))
			} else {
				Ok(ApiResponse::new(401, r#"{"errorMessage":"Unauthorized"}"#))
			}
		})
	}
}

fn build_pipeline(
	backend: ScriptedBackend,
	session: Session,
) -> (Pipeline<ScriptedBackend>, Arc<ScriptedBackend>) {
	let backend = Arc::new(backend);
	let store = Arc::new(MemorySessionStore::with_session(session));
	let api_url = ApiUrl::parse("https://api.example.com").expect("API URL fixture should parse.");

	(Pipeline::with_http_client(store, api_url, backend.clone()), backend)
}

fn refreshable(access: &str, refresh: &str) -> Session {
	Session::new(TokenSecret::new(access), Some(TokenSecret::new(refresh)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_concurrent_failures_trigger_one_refresh() {
	let (pipeline, backend) =
		build_pipeline(ScriptedBackend::new("new"), refreshable("old", "rtok"));
	let tasks = (0..8)
		.map(|i| {
			let pipeline = pipeline.clone();

			tokio::spawn(async move { pipeline.send(ApiRequest::get(format!("/items/{i}/"))).await })
		})
		.collect::<Vec<_>>();

	for task in tasks {
		let response =
			task.await.expect("Request task should not panic.").expect("Request should complete.");

		assert_eq!(response.status, 200);
	}

	assert_eq!(backend.refresh_calls(), 1);
	assert_eq!(pipeline.metrics.refresh_attempts(), 1);
	assert!(pipeline.metrics.waits() <= pipeline.metrics.retries());

	let refresh = backend.sent_to(DEFAULT_REFRESH_PATH);

	assert_eq!(refresh.len(), 1);
	assert!(!refresh[0].headers.contains("authorization"));
	assert!(!refresh[0].headers.contains("doRefresh"));
	assert_eq!(refresh[0].body.as_deref(), Some(br#"{"refresh_token":"rtok"}"#.as_slice()));
	assert_eq!(pipeline.session().refresh_token.as_ref().map(TokenSecret::expose), Some("rtok2"));
}

#[tokio::test]
async fn requests_issued_during_refresh_wait_and_use_new_token() {
	let (pipeline, backend) =
		build_pipeline(ScriptedBackend::new("new"), refreshable("old", "rtok"));
	let first = {
		let pipeline = pipeline.clone();

		tokio::spawn(async move { pipeline.send(ApiRequest::get("/first/")).await })
	};

	tokio::time::sleep(StdDuration::from_millis(20)).await;

	let second =
		pipeline.send(ApiRequest::get("/second/")).await.expect("Second request should complete.");
	let first = first
		.await
		.expect("First request task should not panic.")
		.expect("First request should complete.");

	assert_eq!(first.status, 200);
	assert_eq!(second.status, 200);
	assert_eq!(backend.refresh_calls(), 1);

	let second_sent = backend.sent_to("/second/");

	assert_eq!(second_sent.len(), 1);
	assert_eq!(second_sent[0].headers.get("authorization"), Some("Bearer new"));
}

#[tokio::test]
async fn retry_is_bounded_to_one_attempt() {
	let (pipeline, backend) =
		build_pipeline(ScriptedBackend::new("never"), refreshable("old", "rtok"));
	let response =
		pipeline.send(ApiRequest::get("/me/")).await.expect("Retried failure should be returned.");

	assert_eq!(response.status, 401);
	assert_eq!(backend.refresh_calls(), 1);
	assert_eq!(backend.sent_to("/me/").len(), 2);
	assert_eq!(pipeline.metrics.retries(), 1);
	// The refresh itself succeeded, so the session is kept.
	assert_eq!(pipeline.session().status(), SessionStatus::Refreshable);
}

#[tokio::test]
async fn unreachable_refresh_endpoint_logs_out() {
	let (pipeline, backend) = build_pipeline(
		ScriptedBackend::new("new").with_refresh_reply(RefreshReply::Unreachable),
		refreshable("old", "rtok"),
	);
	let response =
		pipeline.send(ApiRequest::get("/me/")).await.expect("Original failure should be returned.");

	assert_eq!(response.status, 401);
	assert_eq!(backend.sent_to("/me/").len(), 1);
	assert!(!pipeline.is_authenticated());
	assert_eq!(pipeline.metrics.logouts(), 1);
	assert_eq!(pipeline.metrics.refresh_failures(), 1);
}

#[tokio::test]
async fn anonymous_requests_are_not_refreshed() {
	let (pipeline, backend) = build_pipeline(ScriptedBackend::new("new"), Session::default());
	let response =
		pipeline.send(ApiRequest::get("/me/")).await.expect("Anonymous failure should be returned.");

	assert_eq!(response.status, 401);
	assert_eq!(backend.refresh_calls(), 0);
	assert!(!backend.sent_to("/me/")[0].headers.contains("authorization"));
	assert_eq!(pipeline.metrics.logouts(), 0);
}

#[tokio::test]
async fn refresh_only_session_recovers_on_first_failure() {
	let session = Session { refresh_token: Some(TokenSecret::new("rtok")), ..Session::default() };
	let (pipeline, backend) = build_pipeline(ScriptedBackend::new("new"), session);
	let response = pipeline.send(ApiRequest::get("/me/")).await.expect("Request should complete.");

	assert_eq!(response.status, 200);
	assert_eq!(backend.refresh_calls(), 1);
	assert_eq!(pipeline.session().status(), SessionStatus::Refreshable);
}

#[tokio::test]
async fn sign_in_and_sign_out_drive_bearer_injection() {
	let (pipeline, backend) = build_pipeline(ScriptedBackend::new("tok"), Session::default());

	pipeline.sign_in("tok", Some(TokenSecret::new("rtok"))).expect("Sign-in should persist.");

	let response = pipeline.send(ApiRequest::get("/me/")).await.expect("Request should complete.");

	assert_eq!(response.status, 200);

	let sent = backend.sent_to("/me/");

	assert_eq!(sent[0].headers.get("authorization"), Some("Bearer tok"));
	assert_eq!(sent[0].headers.get(LOCALE_HEADER), Some("en"));
	assert_eq!(sent[0].headers.get("content-type"), Some("application/json"));

	pipeline.sign_out().expect("Sign-out should persist.");

	assert!(!pipeline.is_authenticated());
	assert_eq!(pipeline.metrics.logouts(), 0);
}

#[tokio::test]
async fn missing_api_url_fails_before_dispatch() {
	let (pipeline, backend) = build_pipeline(ScriptedBackend::new("new"), Session::default());

	pipeline.api_url.clear();

	let err = pipeline
		.send(ApiRequest::get("/me/"))
		.await
		.expect_err("Relative request must fail without an API URL.");

	assert!(matches!(err, Error::Config(ConfigError::MissingApiUrl)));
	assert!(backend.sent.lock().is_empty());
}

#[tokio::test]
async fn store_failures_during_refresh_propagate() {
	struct ReadOnlyStore(MemorySessionStore);
	impl SessionStore for ReadOnlyStore {
		fn snapshot(&self) -> Session {
			self.0.snapshot()
		}

		fn update_tokens(&self, _: TokenSecret, _: Option<TokenSecret>) -> Result<(), StoreError> {
			Err(StoreError::Backend { message: "read-only".into() })
		}

		fn clear_session(&self) -> Result<(), StoreError> {
			Err(StoreError::Backend { message: "read-only".into() })
		}
	}

	let backend = Arc::new(ScriptedBackend::new("new"));
	let store = Arc::new(ReadOnlyStore(MemorySessionStore::with_session(refreshable("old", "rtok"))));
	let api_url = ApiUrl::parse("https://api.example.com").expect("API URL fixture should parse.");
	let pipeline: Pipeline<ScriptedBackend> =
		Pipeline::with_http_client(store, api_url, backend.clone());
	let err = pipeline
		.send(ApiRequest::get("/me/"))
		.await
		.expect_err("Store failures must surface to the caller.");

	assert!(matches!(err, Error::Storage(StoreError::Backend { .. })));
	assert_eq!(backend.refresh_calls(), 1);
	assert_eq!(pipeline.refresh_guard().generation(), 1);
}

#[tokio::test]
async fn absolute_url_without_api_url_fails() {
	let (pipeline, backend) = build_pipeline(ScriptedBackend::new("new"), Session::default());

	pipeline.api_url.clear();

	let err = pipeline
		.send(ApiRequest::get("https://cdn.example.com/banner.png"))
		.await
		.expect_err("Absolute request must also fail without an API URL.");

	assert!(matches!(err, Error::Config(ConfigError::MissingApiUrl)));
	assert!(backend.sent.lock().is_empty());
}

#[tokio::test]
async fn hung_resend_does_not_block_other_requests() {
	let (pipeline, backend) =
		build_pipeline(ScriptedBackend::new("new").hanging_on("/slow/"), refreshable("old", "rtok"));
	let slow = {
		let pipeline = pipeline.clone();

		tokio::spawn(async move { pipeline.send(ApiRequest::get("/slow/")).await })
	};

	tokio::time::timeout(StdDuration::from_secs(2), async {
		while backend.sent_to("/slow/").len() < 2 {
			tokio::time::sleep(StdDuration::from_millis(5)).await;
		}
	})
	.await
	.expect("Slow request should be re-sent with the new token.");

	let fast = pipeline.send(ApiRequest::get("/fast/"));
	let fast = tokio::time::timeout(StdDuration::from_secs(2), fast)
		.await
		.expect("A stalled re-send must not hold up other requests.")
		.expect("Fast request should complete.");

	assert_eq!(fast.status, 200);
	assert_eq!(backend.refresh_calls(), 1);
	assert!(!slow.is_finished());

	slow.abort();
}

#[tokio::test]
async fn timed_out_refresh_logs_out_and_returns_original_failure() {
	let (pipeline, backend) = build_pipeline(
		ScriptedBackend::new("new").with_refresh_reply(RefreshReply::TimedOut),
		refreshable("old", "rtok"),
	);
	let config = PipelineConfig::builder()
		.refresh_timeout(time::Duration::milliseconds(250))
		.build()
		.expect("Refresh timeout should validate.");
	let pipeline = pipeline.with_config(config);
	let response =
		pipeline.send(ApiRequest::get("/me/")).await.expect("Original failure should be returned.");

	assert_eq!(response.status, 401);
	assert_eq!(response.error_message().as_deref(), Some("Unauthorized"));
	assert_eq!(backend.sent_to("/me/").len(), 1);

	let refresh = backend.sent_to(DEFAULT_REFRESH_PATH);

	assert_eq!(refresh.len(), 1);
	assert_eq!(refresh[0].timeout, Some(StdDuration::from_millis(250)));
	assert!(!pipeline.is_authenticated());
	assert_eq!(pipeline.metrics.refresh_failures(), 1);
	assert_eq!(pipeline.metrics.logouts(), 1);
}

#[tokio::test]
async fn pre_send_wait_is_not_counted_as_refresh_wait() {
	let (pipeline, backend) = build_pipeline(
		ScriptedBackend::new("new").with_response_delay(StdDuration::from_millis(50)),
		Session::default(),
	);
	let request = {
		let pipeline = pipeline.clone();

		tokio::spawn(async move { pipeline.send(ApiRequest::get("/me/")).await })
	};

	tokio::time::sleep(StdDuration::from_millis(20)).await;

	// Held across the 401 without completing a refresh cycle.
	let (permit, _) = pipeline.refresh_guard().acquire().await;

	tokio::time::sleep(StdDuration::from_millis(80)).await;
	drop(permit);

	let response = request
		.await
		.expect("Request task should not panic.")
		.expect("Anonymous failure should be returned.");

	assert_eq!(response.status, 401);
	assert_eq!(backend.refresh_calls(), 0);
	assert_eq!(pipeline.refresh_guard().generation(), 0);
	assert_eq!(pipeline.metrics.waits(), 0);
	assert_eq!(pipeline.metrics.retries(), 0);
}
