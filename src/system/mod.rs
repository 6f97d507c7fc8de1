//! System-level modules
//!
//! - Logging initialization
//! - Background maintenance (statistics retention, counter reconciliation)

pub mod logging;
pub mod maintenance;

pub use maintenance::{MaintenanceReport, MaintenanceTask};
