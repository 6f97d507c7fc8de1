use serde::{Deserialize, Serialize};

/// 默认配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config.toml";

/// 日志输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// 静态配置（从 TOML 加载，启动时使用）
///
/// - server: 监听地址与可信代理
/// - database: 数据库连接与读操作重试
/// - logging: 日志配置
/// - engagement: 身份指纹截断长度、是否写统计日志
/// - statistics: 保留期、汇总窗口、对账开关
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StaticConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub engagement: EngagementConfig,
    #[serde(default)]
    pub statistics: StatisticsConfig,
}

impl StaticConfig {
    /// 从 TOML 文件和环境变量加载配置
    ///
    /// 优先级：ENV > config.toml > 默认值
    /// ENV 前缀：EC，分隔符：__
    /// 示例：EC__SERVER__PORT=9999
    pub fn load(path: Option<&str>) -> Self {
        use config::{Config, Environment, File};

        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let builder = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("EC")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("server.trusted_proxies")
                    .try_parsing(true),
            );

        match builder.build() {
            Ok(settings) => match settings.try_deserialize::<StaticConfig>() {
                Ok(config) => {
                    if std::path::Path::new(path).exists() {
                        eprintln!("[INFO] Configuration loaded from: {}", path);
                    }
                    config
                }
                Err(e) => {
                    eprintln!("[ERROR] Failed to deserialize config: {}", e);
                    Self::default()
                }
            },
            Err(e) => {
                eprintln!("[ERROR] Failed to build config: {}", e);
                Self::default()
            }
        }
    }

    /// 生成示例 TOML 配置文件
    pub fn generate_sample_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|e| format!("Error generating sample config: {}", e))
    }
}

/// 服务器配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_server_host")]
    pub host: String,
    #[serde(default = "default_server_port")]
    pub port: u16,
    /// 可信反向代理（IP 或 CIDR），只有来自这些地址的请求才采信 X-Forwarded-For
    #[serde(default)]
    pub trusted_proxies: Vec<String>,
}

/// 数据库连接配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub database_url: String,
    #[serde(default = "default_database_pool_size")]
    pub pool_size: u32,
    #[serde(default = "default_retry_count")]
    pub retry_count: u32,
    #[serde(default = "default_retry_base_delay_ms")]
    pub retry_base_delay_ms: u64,
    #[serde(default = "default_retry_max_delay_ms")]
    pub retry_max_delay_ms: u64,
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default)]
    pub file: Option<String>,
    #[serde(default = "default_max_backups")]
    pub max_backups: u32,
    #[serde(default = "default_enable_rotation")]
    pub enable_rotation: bool,
}

/// 互动（点赞/分享）配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngagementConfig {
    /// identity_key 存储长度上限（列宽 45）
    #[serde(default = "default_identity_max_len")]
    pub identity_max_len: usize,
    /// user_agent 存储长度上限（列宽 255）
    #[serde(default = "default_user_agent_max_len")]
    pub user_agent_max_len: usize,
    /// toggle 时是否同时写入统计日志
    #[serde(default = "default_true")]
    pub record_statistics: bool,
}

/// 统计日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatisticsConfig {
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,
    /// 0 表示不启动后台清理任务
    #[serde(default = "default_cleanup_interval_hours")]
    pub cleanup_interval_hours: u64,
    /// getDailySummary 未指定日期时的回溯天数
    #[serde(default = "default_summary_days")]
    pub summary_days: u64,
    /// 清理任务中顺带执行计数器对账
    #[serde(default = "default_true")]
    pub reconcile_counters: bool,
}

// ============================================================
// Default value functions
// ============================================================

fn default_server_host() -> String {
    "127.0.0.1".to_string()
}

fn default_server_port() -> u16 {
    8080
}

fn default_database_url() -> String {
    "engagement.db".to_string()
}

fn default_database_pool_size() -> u32 {
    10
}

fn default_retry_count() -> u32 {
    3
}

fn default_retry_base_delay_ms() -> u64 {
    100
}

fn default_retry_max_delay_ms() -> u64 {
    2000
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_backups() -> u32 {
    5
}

fn default_enable_rotation() -> bool {
    true
}

fn default_identity_max_len() -> usize {
    45
}

fn default_user_agent_max_len() -> usize {
    255
}

fn default_true() -> bool {
    true
}

fn default_retention_days() -> u64 {
    90
}

fn default_cleanup_interval_hours() -> u64 {
    24
}

fn default_summary_days() -> u64 {
    30
}

// ============================================================
// Default implementations
// ============================================================

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_server_host(),
            port: default_server_port(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            database_url: default_database_url(),
            pool_size: default_database_pool_size(),
            retry_count: default_retry_count(),
            retry_base_delay_ms: default_retry_base_delay_ms(),
            retry_max_delay_ms: default_retry_max_delay_ms(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            file: None,
            max_backups: default_max_backups(),
            enable_rotation: default_enable_rotation(),
        }
    }
}

impl Default for EngagementConfig {
    fn default() -> Self {
        Self {
            identity_max_len: default_identity_max_len(),
            user_agent_max_len: default_user_agent_max_len(),
            record_statistics: true,
        }
    }
}

impl Default for StatisticsConfig {
    fn default() -> Self {
        Self {
            retention_days: default_retention_days(),
            cleanup_interval_hours: default_cleanup_interval_hours(),
            summary_days: default_summary_days(),
            reconcile_counters: true,
        }
    }
}
