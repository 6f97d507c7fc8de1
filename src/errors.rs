use std::fmt;

use actix_web::http::StatusCode;

#[derive(Debug, Clone)]
pub enum EngagementError {
    Config(String),
    DatabaseConfig(String),
    DatabaseConnection(String),
    DatabaseOperation(String),
    FileOperation(String),
    Validation(String),
    NotFound(String),
    Serialization(String),
    DateParse(String),
}

impl EngagementError {
    /// 获取错误代码
    pub fn code(&self) -> &'static str {
        match self {
            EngagementError::Config(_) => "E001",
            EngagementError::DatabaseConfig(_) => "E003",
            EngagementError::DatabaseConnection(_) => "E004",
            EngagementError::DatabaseOperation(_) => "E005",
            EngagementError::FileOperation(_) => "E006",
            EngagementError::Validation(_) => "E007",
            EngagementError::NotFound(_) => "E008",
            EngagementError::Serialization(_) => "E009",
            EngagementError::DateParse(_) => "E012",
        }
    }

    /// 获取错误类型名称
    pub fn error_type(&self) -> &'static str {
        match self {
            EngagementError::Config(_) => "Configuration Error",
            EngagementError::DatabaseConfig(_) => "Database Configuration Error",
            EngagementError::DatabaseConnection(_) => "Database Connection Error",
            EngagementError::DatabaseOperation(_) => "Database Operation Error",
            EngagementError::FileOperation(_) => "File Operation Error",
            EngagementError::Validation(_) => "Validation Error",
            EngagementError::NotFound(_) => "Resource Not Found",
            EngagementError::Serialization(_) => "Serialization Error",
            EngagementError::DateParse(_) => "Date Parse Error",
        }
    }

    /// 获取错误详情
    pub fn message(&self) -> &str {
        match self {
            EngagementError::Config(msg)
            | EngagementError::DatabaseConfig(msg)
            | EngagementError::DatabaseConnection(msg)
            | EngagementError::DatabaseOperation(msg)
            | EngagementError::FileOperation(msg)
            | EngagementError::Validation(msg)
            | EngagementError::NotFound(msg)
            | EngagementError::Serialization(msg)
            | EngagementError::DateParse(msg) => msg,
        }
    }

    /// HTTP 状态码映射（由 API 层使用）
    pub fn http_status(&self) -> StatusCode {
        match self {
            EngagementError::Validation(_) | EngagementError::DateParse(_) => {
                StatusCode::BAD_REQUEST
            }
            EngagementError::NotFound(_) => StatusCode::NOT_FOUND,
            EngagementError::DatabaseConnection(_) => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// 格式化为简洁输出
    pub fn format_simple(&self) -> String {
        format!("{}: {}", self.error_type(), self.message())
    }
}

impl fmt::Display for EngagementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.format_simple())
    }
}

impl std::error::Error for EngagementError {}

// 便捷的构造函数
impl EngagementError {
    pub fn config<T: Into<String>>(msg: T) -> Self {
        EngagementError::Config(msg.into())
    }

    pub fn database_config<T: Into<String>>(msg: T) -> Self {
        EngagementError::DatabaseConfig(msg.into())
    }

    pub fn database_connection<T: Into<String>>(msg: T) -> Self {
        EngagementError::DatabaseConnection(msg.into())
    }

    pub fn database_operation<T: Into<String>>(msg: T) -> Self {
        EngagementError::DatabaseOperation(msg.into())
    }

    pub fn file_operation<T: Into<String>>(msg: T) -> Self {
        EngagementError::FileOperation(msg.into())
    }

    pub fn validation<T: Into<String>>(msg: T) -> Self {
        EngagementError::Validation(msg.into())
    }

    pub fn not_found<T: Into<String>>(msg: T) -> Self {
        EngagementError::NotFound(msg.into())
    }

    pub fn serialization<T: Into<String>>(msg: T) -> Self {
        EngagementError::Serialization(msg.into())
    }

    pub fn date_parse<T: Into<String>>(msg: T) -> Self {
        EngagementError::DateParse(msg.into())
    }
}

impl From<sea_orm::DbErr> for EngagementError {
    fn from(err: sea_orm::DbErr) -> Self {
        EngagementError::DatabaseOperation(err.to_string())
    }
}

impl From<std::io::Error> for EngagementError {
    fn from(err: std::io::Error) -> Self {
        EngagementError::FileOperation(err.to_string())
    }
}

impl From<serde_json::Error> for EngagementError {
    fn from(err: serde_json::Error) -> Self {
        EngagementError::Serialization(err.to_string())
    }
}

impl From<chrono::ParseError> for EngagementError {
    fn from(err: chrono::ParseError) -> Self {
        EngagementError::DateParse(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, EngagementError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_maps_to_bad_request() {
        let err = EngagementError::validation("missing identity");
        assert_eq!(err.code(), "E007");
        assert_eq!(err.http_status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.to_string(), "Validation Error: missing identity");
    }

    #[test]
    fn test_db_err_becomes_database_operation() {
        let err: EngagementError = sea_orm::DbErr::Custom("boom".to_string()).into();
        assert!(matches!(err, EngagementError::DatabaseOperation(_)));
        assert!(err.message().contains("boom"));
        assert_eq!(err.http_status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
