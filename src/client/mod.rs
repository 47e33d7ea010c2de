//! Typed client for the bookmark API, for front-ends and tools written in
//! Rust.

mod session;
mod shelf;

pub use session::{ApiClient, ClientError, Session};
pub use shelf::BookmarkShelf;
