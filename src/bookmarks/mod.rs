//! Owner-scoped bookmark API. The owner always comes from the verified
//! token, never from the request body or path.

pub mod handlers;
pub mod types;

pub use handlers::*;
pub use types::*;
