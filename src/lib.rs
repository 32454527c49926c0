//! Authenticated HTTP request pipeline with single-flight bearer-token refresh.
//!
//! Every request sent through a [`pipeline::Pipeline`] gets its base URL, locale and bearer
//! headers injected, and authentication failures trigger at most one refresh call no matter
//! how many requests observe them concurrently.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod classify;
pub mod config;
pub mod error;
pub mod http;
pub mod locale;
pub mod obs;
pub mod pipeline;
pub mod request;
pub mod store;
#[cfg(all(any(test, feature = "test"), feature = "reqwest"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// self
	use crate::{
		config::ApiUrl,
		http::ReqwestHttpClient,
		pipeline::Pipeline,
		store::{MemorySessionStore, SessionStore},
	};

	/// Pipeline type alias used by reqwest-backed integration tests.
	pub type ReqwestTestPipeline = Pipeline<ReqwestHttpClient>;

	/// Builds a reqwest HTTP client that accepts the self-signed certificates produced by
	/// `httpmock` during tests.
	pub fn test_reqwest_http_client() -> ReqwestHttpClient {
		let client = ReqwestClient::builder()
			.danger_accept_invalid_certs(true)
			.danger_accept_invalid_hostnames(true)
			.build()
			.expect("Failed to build insecure Reqwest client for tests.");

		ReqwestHttpClient::with_client(client)
	}

	/// Constructs a [`Pipeline`] backed by an in-memory session store and the reqwest transport,
	/// pointed at `base_url`.
	pub fn build_reqwest_test_pipeline(
		base_url: &str,
	) -> (ReqwestTestPipeline, Arc<MemorySessionStore>) {
		let store_backend = Arc::new(MemorySessionStore::default());
		let store: Arc<dyn SessionStore> = store_backend.clone();
		let api_url = ApiUrl::parse(base_url).expect("Failed to parse test API URL.");
		let pipeline = Pipeline::with_http_client(store, api_url, test_reqwest_http_client());

		(pipeline, store_backend)
	}
}

mod _prelude {
	pub use std::{
		collections::BTreeMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
		time::Duration as StdDuration,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::RwLock;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::{Duration, OffsetDateTime};
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(all(test, feature = "reqwest"))] use httpmock as _;
