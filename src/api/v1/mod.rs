//! HTTP API (`/api`)
//!
//! Thin handlers over the service layer. Every response uses the
//! `{code, message, data}` envelope.

mod content;
mod engagement;
pub mod error_code;
pub mod helpers;
pub mod routes;
mod stats;
pub mod types;

pub use error_code::ErrorCode;
pub use routes::api_routes;
pub use types::ApiResponse;
