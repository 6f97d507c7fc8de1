//! API 错误码定义
//!
//! 按千位分域：
//! - 0: 成功
//! - 1000-1099: 通用错误
//! - 3000-3099: 内容/互动错误
//! - 6000-6099: 统计错误

use crate::errors::EngagementError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ErrorCode {
    // 成功
    Success = 0,

    // 通用错误 1000-1099
    BadRequest = 1000,
    NotFound = 1004,
    InternalServerError = 1005,
    InvalidDateFormat = 1012,
    ServiceUnavailable = 1030,

    // 内容/互动错误 3000-3099
    ContentNotFound = 3000,
    InvalidContentType = 3001,
    EngagementDatabaseError = 3005,

    // 统计错误 6000-6099
    StatisticsQueryFailed = 6000,
}

impl From<&EngagementError> for ErrorCode {
    fn from(err: &EngagementError) -> Self {
        match err {
            EngagementError::Validation(_) => ErrorCode::BadRequest,
            EngagementError::DateParse(_) => ErrorCode::InvalidDateFormat,
            EngagementError::NotFound(_) => ErrorCode::ContentNotFound,
            EngagementError::DatabaseConnection(_) => ErrorCode::ServiceUnavailable,
            EngagementError::DatabaseOperation(_) => ErrorCode::EngagementDatabaseError,
            _ => ErrorCode::InternalServerError,
        }
    }
}
