//! Thread-safe in-memory [`SessionStore`] implementation.

// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret},
	store::{SessionStore, StoreError},
};

/// Session store that keeps tokens in-process; the default for tests and ephemeral clients.
#[derive(Clone, Debug, Default)]
pub struct MemorySessionStore(Arc<RwLock<Session>>);
impl MemorySessionStore {
	/// Creates a store seeded with an existing session.
	pub fn with_session(session: Session) -> Self {
		Self(Arc::new(RwLock::new(session)))
	}
}
impl SessionStore for MemorySessionStore {
	fn snapshot(&self) -> Session {
		self.0.read().clone()
	}

	fn current_token(&self) -> Option<TokenSecret> {
		self.0.read().access_token.clone()
	}

	fn current_refresh_token(&self) -> Option<TokenSecret> {
		self.0.read().refresh_token.clone()
	}

	fn update_tokens(
		&self,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
	) -> Result<(), StoreError> {
		*self.0.write() = Session::new(access_token, refresh_token);

		Ok(())
	}

	fn clear_session(&self) -> Result<(), StoreError> {
		*self.0.write() = Session::default();

		Ok(())
	}
}
