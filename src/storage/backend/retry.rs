//! Retry helper for read-only store calls
//!
//! Only idempotent reads and the retention sweep go through [`with_retry`].
//! Ledger, counter and statistics writes are executed once and surface their
//! error to the caller.

use std::future::Future;
use std::time::Duration;

use rand::RngExt;
use sea_orm::DbErr;
use sea_orm::error::RuntimeErr;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::DatabaseConfig;

/// 锁冲突类错误码
///
/// MySQL 1213/1205（死锁、锁等待超时），PostgreSQL 40001/40P01（序列化失败、死锁），
/// SQLite 5/6（BUSY、LOCKED）
const LOCK_CONFLICT_CODES: [&str; 6] = ["1213", "1205", "40001", "40P01", "5", "6"];

/// sea-orm 把部分驱动错误折叠成文本时的兜底匹配
const LOCK_CONFLICT_MESSAGES: [&str; 3] = ["deadlock", "database is locked", "lock wait timeout"];

/// 连接抖动或锁冲突：同一条只读语句稍后重跑可能成功
pub fn is_transient(err: &DbErr) -> bool {
    match err {
        DbErr::ConnectionAcquire(_) | DbErr::Conn(_) => true,
        DbErr::Exec(runtime) | DbErr::Query(runtime) => match runtime {
            RuntimeErr::SqlxError(sqlx_err) => sqlx_err
                .as_database_error()
                .and_then(|db_err| db_err.code())
                .is_some_and(|code| LOCK_CONFLICT_CODES.iter().any(|known| *known == &*code)),
            RuntimeErr::Internal(message) => {
                let message = message.to_lowercase();
                LOCK_CONFLICT_MESSAGES
                    .iter()
                    .any(|needle| message.contains(needle))
            }
            #[allow(unreachable_patterns)]
            _ => false,
        },
        _ => false,
    }
}

/// `database.retry_*` 配置
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self::from(&DatabaseConfig::default())
    }
}

impl From<&DatabaseConfig> for RetryConfig {
    fn from(config: &DatabaseConfig) -> Self {
        Self {
            max_retries: config.retry_count,
            base_delay: Duration::from_millis(config.retry_base_delay_ms),
            max_delay: Duration::from_millis(config.retry_max_delay_ms),
        }
    }
}

impl RetryConfig {
    /// 第 n 次重试前的等待：base * 2^(n-1)，封顶 max_delay，再加至多 25% 抖动
    fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32.checked_shl(retry.saturating_sub(1)).unwrap_or(u32::MAX);
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);
        let jitter_ms = rand::rng().random_range(0..=capped.as_millis() as u64 / 4);
        capped.saturating_add(Duration::from_millis(jitter_ms))
    }
}

/// 对瞬时错误按指数退避重跑 `operation`，其它错误立即返回
pub async fn with_retry<T, F, Fut>(
    operation_name: &str,
    config: RetryConfig,
    mut operation: F,
) -> Result<T, DbErr>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, DbErr>>,
{
    let mut retries = 0;
    loop {
        let err = match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => err,
        };

        if retries >= config.max_retries || !is_transient(&err) {
            if retries > 0 {
                warn!(
                    "'{}' still failing after {} retries: {}",
                    operation_name, retries, err
                );
            }
            return Err(err);
        }

        retries += 1;
        let delay = config.backoff(retries);
        debug!(
            "'{}' hit a transient error ({}), retry {}/{} in {:?}",
            operation_name, err, retries, config.max_retries, delay
        );
        sleep(delay).await;
    }
}
