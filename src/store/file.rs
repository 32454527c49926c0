//! File-backed [`SessionStore`] that survives process restarts.

// std
use std::{
	fs::{self, File},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{Session, TokenSecret},
	store::{SessionStore, StoreError},
};

/// Persists the session to a JSON file after each mutation.
///
/// The file is loaded eagerly on [`open`](FileSessionStore::open); reads are served from
/// memory and every write replaces the file through a temporary sibling plus rename.
#[derive(Clone, Debug)]
pub struct FileSessionStore {
	path: PathBuf,
	inner: Arc<RwLock<Session>>,
}
impl FileSessionStore {
	/// Opens (or creates) a store at the provided path, eagerly loading an existing session.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let session = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(session)) })
	}

	/// Location of the backing file.
	pub fn path(&self) -> &Path {
		&self.path
	}

	fn load_snapshot(path: &Path) -> Result<Session, StoreError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Session::default()),
			Err(e) => return Err(backend_error("read", path)(e)),
		};

		// A freshly created file counts as an anonymous session.
		if bytes.iter().all(u8::is_ascii_whitespace) {
			return Ok(Session::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| StoreError::Serialization {
			message: format!("Session file {} is not valid JSON: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), StoreError> {
		match path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
			Some(dir) => fs::create_dir_all(dir).map_err(backend_error("create directory", dir)),
			None => Ok(()),
		}
	}

	/// Writes `session` to a sibling temp file, then renames it over the session file.
	fn persist(&self, session: &Session) -> Result<(), StoreError> {
		let json = serde_json::to_vec_pretty(session).map_err(|e| StoreError::Serialization {
			message: format!("Session snapshot could not be encoded: {e}"),
		})?;
		let staging = self.path.with_extension("tmp");

		Self::ensure_parent_exists(&self.path)?;

		let mut file = File::create(&staging).map_err(backend_error("create", &staging))?;

		file.write_all(&json).map_err(backend_error("write", &staging))?;
		file.sync_all().map_err(backend_error("sync", &staging))?;
		drop(file);

		fs::rename(&staging, &self.path).map_err(backend_error("replace", &self.path))
	}

	fn replace(&self, session: Session) -> Result<(), StoreError> {
		let mut current = self.inner.write();

		// Memory only moves once the file holds the new snapshot.
		self.persist(&session)?;

		*current = session;

		Ok(())
	}
}
impl SessionStore for FileSessionStore {
	fn snapshot(&self) -> Session {
		self.inner.read().clone()
	}

	fn update_tokens(
		&self,
		access_token: TokenSecret,
		refresh_token: Option<TokenSecret>,
	) -> Result<(), StoreError> {
		self.replace(Session::new(access_token, refresh_token))
	}

	fn clear_session(&self) -> Result<(), StoreError> {
		self.replace(Session::default())
	}
}

fn backend_error<'a>(
	action: &'static str,
	path: &'a Path,
) -> impl 'a + FnOnce(std::io::Error) -> StoreError {
	move |e| StoreError::Backend { message: format!("Failed to {action} {}: {e}", path.display()) }
}
