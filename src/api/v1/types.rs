//! API 请求/响应类型

use serde::{Deserialize, Serialize};

/// 统一响应外壳 `{code, message, data}`
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ApiResponse<T> {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// 创建内容返回
#[derive(Serialize, Debug)]
pub struct CreatedResponse {
    pub id: i64,
}

/// GET /{type}/{id}/like
#[derive(Serialize, Debug)]
pub struct LikeStatus {
    pub liked: bool,
    pub like_count: i64,
}

/// GET /{type}/{id}/share
#[derive(Serialize, Debug)]
pub struct ShareStatus {
    pub shared: bool,
    pub shared_count: i64,
}

/// POST /{type}/{id}/share/external
#[derive(Serialize, Debug)]
pub struct ExternalShareResponse {
    pub shared_count: i64,
}

/// GET /{type}/{id} 之外的删除结果
#[derive(Serialize, Debug)]
pub struct DeletedResponse {
    pub deleted: bool,
}

#[derive(Deserialize, Debug, Default)]
pub struct DailySummaryQuery {
    /// YYYY-MM-DD，缺省为最近 summary_days 天
    pub date: Option<String>,
    pub entity_type: Option<String>,
}

#[derive(Deserialize, Debug)]
pub struct TopContentQuery {
    pub entity_type: String,
    /// 缺省 `<entity_type>_view`
    pub action: Option<String>,
    pub limit: Option<u64>,
    pub days: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct GeoQuery {
    pub entity_type: Option<String>,
    pub days: Option<u64>,
}

#[derive(Deserialize, Debug, Default)]
pub struct EntityStatsQuery {
    pub limit: Option<u64>,
}
