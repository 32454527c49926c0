//! Session storage contract and built-in store implementations.

pub mod file;
pub mod memory;

pub use file::FileSessionStore;
pub use memory::MemorySessionStore;

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret},
};

/// Application-scoped owner of the current [`Session`].
///
/// The pipeline reads tokens on every request and mutates them only from the lock-protected
/// refresh step; sign-in and sign-out happen outside the pipeline through the same contract.
/// Implementations must make each call atomic with respect to the others.
pub trait SessionStore
where
	Self: Send + Sync,
{
	/// Returns a consistent copy of both tokens.
	fn snapshot(&self) -> Session;

	/// Returns the current access token, if any.
	fn current_token(&self) -> Option<TokenSecret> {
		self.snapshot().access_token
	}

	/// Returns the current refresh token, if any.
	fn current_refresh_token(&self) -> Option<TokenSecret> {
		self.snapshot().refresh_token
	}

	/// Overwrites both tokens.
	fn update_tokens(
		&self,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
	) -> Result<(), StoreError>;

	/// Drops every token (logout).
	fn clear_session(&self) -> Result<(), StoreError>;
}

/// Error type produced by [`SessionStore`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum StoreError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
