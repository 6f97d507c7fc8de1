//! SeaORM storage backend
//!
//! One relational store (SQLite, MySQL/MariaDB or PostgreSQL) holds the content
//! tables, the engagement ledger and the statistics log.
//!
//! - `ledger`: like/share rows keyed by the natural key
//! - `counters`: conditional single-row updates of the denormalized counters
//! - `content`: minimal content table access used by the content repository
//! - `statistics`: append-only event log and its aggregations

mod connection;
mod content;
mod counters;
mod ledger;
pub mod retry;
mod statistics;

use sea_orm::{DatabaseConnection, DbBackend};
use tracing::warn;

use crate::errors::{EngagementError, Result};

pub use connection::{connect_generic, connect_sqlite, run_migrations};
pub use counters::ReconcileReport;
pub use ledger::{InsertOutcome, NaturalKey};
pub(crate) use statistics::{day_bounds, days_before};
pub use statistics::{DailySummaryRow, GeoRow, StatisticsEvent, StatisticsRecord, TopContentRow};

/// 从数据库 URL 推断数据库类型
pub fn infer_backend_from_url(database_url: &str) -> Result<String> {
    if database_url.starts_with("sqlite:")
        || database_url.ends_with(".db")
        || database_url.ends_with(".sqlite")
        || database_url == ":memory:"
    {
        Ok("sqlite".to_string())
    } else if database_url.starts_with("mysql://") || database_url.starts_with("mariadb://") {
        Ok("mysql".to_string())
    } else if database_url.starts_with("postgres://") || database_url.starts_with("postgresql://") {
        Ok("postgres".to_string())
    } else {
        Err(EngagementError::database_config(format!(
            "Cannot infer database type from URL: {}. Supported: sqlite://, mysql://, mariadb://, postgres://",
            database_url
        )))
    }
}

/// SeaORM-based storage backend
#[derive(Clone)]
pub struct SeaOrmStorage {
    db: DatabaseConnection,
    backend_name: String,
    /// 只读查询的重试配置
    retry_config: retry::RetryConfig,
}

impl SeaOrmStorage {
    pub async fn new(database_url: &str, backend_name: &str) -> Result<Self> {
        if database_url.is_empty() {
            return Err(EngagementError::database_config("DATABASE_URL is empty"));
        }

        let db = if backend_name == "sqlite" {
            connect_sqlite(database_url).await?
        } else {
            connect_generic(database_url, backend_name).await?
        };

        let storage = Self::from_connection(db, backend_name);
        run_migrations(&storage.db).await?;

        warn!(
            "{} Storage initialized.",
            storage.backend_name.to_uppercase()
        );
        Ok(storage)
    }

    /// 包装已有连接（不运行迁移）
    pub fn from_connection(db: DatabaseConnection, backend_name: &str) -> Self {
        let config = crate::config::get_config();
        Self {
            db,
            backend_name: backend_name.to_string(),
            retry_config: retry::RetryConfig::from(&config.database),
        }
    }

    pub fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn get_backend_name(&self) -> &str {
        &self.backend_name
    }

    pub(crate) fn db_backend(&self) -> DbBackend {
        match self.backend_name.as_str() {
            "sqlite" => DbBackend::Sqlite,
            "mysql" | "mariadb" => DbBackend::MySql,
            _ => DbBackend::Postgres,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_backend_from_url() {
        assert_eq!(infer_backend_from_url("sqlite://data.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("engagement.db").unwrap(), "sqlite");
        assert_eq!(infer_backend_from_url("mariadb://u@h/db").unwrap(), "mysql");
        assert_eq!(
            infer_backend_from_url("postgresql://u@h/db").unwrap(),
            "postgres"
        );
        assert!(matches!(
            infer_backend_from_url("redis://localhost"),
            Err(EngagementError::DatabaseConfig(_))
        ));
    }
}
