//! Command-line interface definitions using clap

use clap::{Parser, Subcommand};

/// engagement-core - like/share tracking and engagement analytics
#[derive(Parser)]
#[command(name = "engagement-core")]
#[command(version)]
#[command(about = "Engagement tracking backend (likes, shares, views, statistics)", long_about = None)]
pub struct Cli {
    /// Path to the TOML configuration file
    #[arg(long, short = 'c', global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available commands
#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Start the HTTP server (default)
    Serve,

    /// Delete statistics events older than N days
    CleanStats {
        /// Days to keep (default: statistics.retention_days)
        #[arg(long)]
        days: Option<u64>,
    },

    /// Recompute like/share counters from the engagement ledger
    Reconcile {
        /// Only this content type (post, article, comment, video, event)
        #[arg(long)]
        content_type: Option<String>,
    },

    /// Generate example configuration file
    GenerateConfig {
        /// Output path (default: stdout)
        output_path: Option<String>,
    },
}
