//! HTTP surface: registry listing and file content.

mod error;
mod http_server;

pub use error::ServeError;
pub use http_server::{AppState, router, serve_http};
