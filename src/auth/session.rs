//! Session snapshot shared between the pipeline and its store.

// self
use crate::{_prelude::*, auth::TokenSecret};

/// Coarse authentication state derived from a [`Session`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
	/// No tokens are held.
	Anonymous,
	/// An access token is held but it cannot be refreshed.
	AccessOnly,
	/// Both an access token and a refresh token are held.
	Refreshable,
	/// Only a refresh token is held; the next auth failure will refresh.
	RefreshOnly,
}

/// Bearer credentials for the current user.
///
/// Created empty at startup, populated on sign-in and refresh, and cleared on sign-out or
/// when a refresh cannot recover the session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
	/// Short-lived credential sent as `Authorization: Bearer <token>`.
	pub access_token: Option<TokenSecret>,
	/// Longer-lived credential exchanged for a new access token.
	pub refresh_token: Option<TokenSecret>,
	/// Instant of the last token update, if any.
	pub updated_at: Option<OffsetDateTime>,
}
impl Session {
	/// Creates a session holding the provided tokens, stamped with the current instant.
	pub fn new(access_token: TokenSecret, refresh_token: Option<TokenSecret>) -> Self {
		Self {
			access_token: Some(access_token),
			refresh_token,
			updated_at: Some(OffsetDateTime::now_utc()),
		}
	}

	/// Computes the coarse status of the session.
	pub fn status(&self) -> SessionStatus {
		match (self.access_token.is_some(), self.refresh_token.is_some()) {
			(false, false) => SessionStatus::Anonymous,
			(true, false) => SessionStatus::AccessOnly,
			(true, true) => SessionStatus::Refreshable,
			(false, true) => SessionStatus::RefreshOnly,
		}
	}

	/// Returns `true` when an access token is present.
	pub fn is_authenticated(&self) -> bool {
		self.access_token.is_some()
	}

	/// Returns `true` when the session holds no tokens.
	pub fn is_empty(&self) -> bool {
		matches!(self.status(), SessionStatus::Anonymous)
	}
}
