//! UI language to `x-locale` code mapping.

// self
use crate::_prelude::*;

/// Locale code sent when the UI language has no mapping.
pub const DEFAULT_LOCALE: &str = "en";

/// Supplies the current UI language code (for example `vn`, `en`, `jp`).
pub trait LocaleProvider
where
	Self: Send + Sync,
{
	/// Returns the active UI language.
	fn language(&self) -> String;
}
impl LocaleProvider for &'static str {
	fn language(&self) -> String {
		(*self).to_owned()
	}
}
impl LocaleProvider for String {
	fn language(&self) -> String {
		self.clone()
	}
}

/// Runtime-switchable language shared between the UI and the pipeline.
#[derive(Clone, Debug)]
pub struct SharedLanguage(Arc<RwLock<String>>);
impl SharedLanguage {
	/// Creates a handle starting at `language`.
	pub fn new(language: impl Into<String>) -> Self {
		Self(Arc::new(RwLock::new(language.into())))
	}

	/// Switches the active language; subsequent requests pick it up.
	pub fn set(&self, language: impl Into<String>) {
		*self.0.write() = language.into();
	}
}
impl Default for SharedLanguage {
	fn default() -> Self {
		Self::new(DEFAULT_LOCALE)
	}
}
impl LocaleProvider for SharedLanguage {
	fn language(&self) -> String {
		self.0.read().clone()
	}
}

/// Maps a UI language to the locale code the backend understands.
pub fn locale_code(language: &str) -> Option<&'static str> {
	match language {
		"vn" => Some("vi"),
		"en" => Some("en"),
		"jp" => Some("ja"),
		_ => None,
	}
}
