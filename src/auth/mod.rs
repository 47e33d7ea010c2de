//! The auth gate: accounts, opaque bearer tokens, and the middleware that
//! turns a token into a trusted [`AuthUser`] before any bookmark handler runs.

pub mod handlers;
pub mod middleware;
pub mod types;

pub use handlers::*;
pub use middleware::{extract_bearer, require_auth, AuthUser};
pub use types::*;
