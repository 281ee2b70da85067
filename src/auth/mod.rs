//! Authentication module
//!
//! Bearer tokens are obtained from the source's auth endpoint and carried in a
//! `Session` value. `TokenRenewer` performs a single renewal request; retrying
//! a failed renewal is left to the fetch layer.

mod authenticator;
mod types;

pub(crate) use authenticator::join_path;
pub use authenticator::{TokenRenewer, AUTH_TOKEN_PATH};
pub use types::Session;
