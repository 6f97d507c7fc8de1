//! API 帮助函数

use actix_web::HttpResponse;
use actix_web::http::StatusCode;
use serde::Serialize;
use tracing::error;

use crate::errors::EngagementError;

use super::error_code::ErrorCode;
use super::types::ApiResponse;

/// 构建 JSON 响应
pub fn json_response<T: Serialize>(
    status: StatusCode,
    code: ErrorCode,
    message: impl Into<String>,
    data: Option<T>,
) -> HttpResponse {
    HttpResponse::build(status)
        .append_header(("Content-Type", "application/json; charset=utf-8"))
        .json(ApiResponse {
            code: code as i32,
            message: message.into(),
            data,
        })
}

/// 构建成功响应
pub fn success_response<T: Serialize>(data: T) -> HttpResponse {
    json_response(StatusCode::OK, ErrorCode::Success, "OK", Some(data))
}

/// 构建错误响应
pub fn error_response(status: StatusCode, error_code: ErrorCode, message: &str) -> HttpResponse {
    json_response::<()>(status, error_code, message, None)
}

/// 从 EngagementError 构建错误响应（自动映射 HTTP 状态码和 ErrorCode）
pub fn error_from_engagement(err: &EngagementError) -> HttpResponse {
    let status = err.http_status();
    if status.is_server_error() {
        error!("API request failed: {}", err);
    }
    error_response(status, ErrorCode::from(err), err.message())
}

/// 统一 Result → HttpResponse 转换
pub fn api_result<T: Serialize>(result: Result<T, EngagementError>) -> HttpResponse {
    match result {
        Ok(data) => success_response(data),
        Err(e) => error_from_engagement(&e),
    }
}

pub fn not_found(what: &str) -> HttpResponse {
    error_response(StatusCode::NOT_FOUND, ErrorCode::ContentNotFound, what)
}
