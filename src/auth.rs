//! Session model and secret wrappers for bearer credentials.

pub mod secret;
pub mod session;

pub use secret::*;
pub use session::*;
