//! engagement-core - engagement tracking for a community content platform
//!
//! Deduplicated like/share toggles backed by an engagement ledger, the
//! denormalized counters they maintain on content rows, and an append-only
//! statistics log with daily, top-content and geographic aggregations.
//!
//! # Architecture
//! - `storage`: SeaORM backend (ledger, counters, content tables, statistics)
//! - `services`: identity resolution, toggle protocol, statistics, content
//! - `api`: actix-web handlers under `/api`
//! - `config`: TOML + environment configuration
//! - `runtime`: server startup/shutdown and CLI commands
//! - `system`: logging and background maintenance

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod runtime;
pub mod services;
pub mod storage;
pub mod system;
pub mod utils;
