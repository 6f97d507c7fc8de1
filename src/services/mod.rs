//! Service layer
//!
//! Shared by the HTTP handlers, the CLI commands and the maintenance task.

mod content_service;
mod engagement_service;
pub mod identity;
mod statistics_service;

pub use content_service::*;
pub use engagement_service::*;
pub use identity::{ClientInfo, IdentityResolver};
pub use statistics_service::*;
