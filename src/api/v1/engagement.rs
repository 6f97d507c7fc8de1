//! Like / share 接口

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use std::sync::Arc;
use tracing::trace;

use crate::errors::EngagementError;
use crate::services::{ClientInfo, ContentService, EngagementService};
use crate::storage::{ContentRecord, ContentType};

use super::helpers::{api_result, error_from_engagement, not_found, success_response};
use super::types::{ExternalShareResponse, LikeStatus, ShareStatus};

/// 解析路径并确认内容存在
async fn load_content(
    content: &ContentService,
    content_type: &str,
    id: i64,
) -> Result<(ContentType, ContentRecord), EngagementError> {
    let content_type = ContentType::parse(content_type)?;
    let record = content.get(content_type, id).await?.ok_or_else(|| {
        EngagementError::not_found(format!("{} #{} not found", content_type, id))
    })?;
    Ok((content_type, record))
}

/// POST /{content_type}/{id}/like
pub async fn toggle_like(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    engagement: web::Data<Arc<EngagementService>>,
    content: web::Data<Arc<ContentService>>,
) -> ActixResult<HttpResponse> {
    let (content_type, id) = path.into_inner();
    trace!("API: toggle like on {}/{}", content_type, id);

    let (content_type, _) = match load_content(&content, &content_type, id).await {
        Ok(found) => found,
        Err(e) => return Ok(error_from_engagement(&e)),
    };
    let client = ClientInfo::from_request(&req);
    Ok(api_result(
        engagement.toggle_like(content_type, id, &client).await,
    ))
}

/// GET /{content_type}/{id}/like
pub async fn like_status(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    engagement: web::Data<Arc<EngagementService>>,
    content: web::Data<Arc<ContentService>>,
) -> ActixResult<HttpResponse> {
    let (content_type, id) = path.into_inner();
    let (content_type, record) = match load_content(&content, &content_type, id).await {
        Ok(found) => found,
        Err(e) => return Ok(error_from_engagement(&e)),
    };
    let client = ClientInfo::from_request(&req);
    Ok(api_result(
        engagement
            .has_user_liked(content_type, id, &client)
            .await
            .map(|liked| LikeStatus {
                liked,
                like_count: record.like_count,
            }),
    ))
}

/// POST /{content_type}/{id}/share
pub async fn toggle_share(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    engagement: web::Data<Arc<EngagementService>>,
    content: web::Data<Arc<ContentService>>,
) -> ActixResult<HttpResponse> {
    let (content_type, id) = path.into_inner();
    trace!("API: toggle share on {}/{}", content_type, id);

    let (content_type, _) = match load_content(&content, &content_type, id).await {
        Ok(found) => found,
        Err(e) => return Ok(error_from_engagement(&e)),
    };
    let client = ClientInfo::from_request(&req);
    Ok(api_result(
        engagement.toggle_share(content_type, id, &client).await,
    ))
}

/// GET /{content_type}/{id}/share
pub async fn share_status(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    engagement: web::Data<Arc<EngagementService>>,
    content: web::Data<Arc<ContentService>>,
) -> ActixResult<HttpResponse> {
    let (content_type, id) = path.into_inner();
    let (content_type, record) = match load_content(&content, &content_type, id).await {
        Ok(found) => found,
        Err(e) => return Ok(error_from_engagement(&e)),
    };
    let client = ClientInfo::from_request(&req);
    Ok(api_result(
        engagement
            .has_user_shared(content_type, id, &client)
            .await
            .map(|shared| ShareStatus {
                shared,
                shared_count: record.shared_count,
            }),
    ))
}

/// POST /{content_type}/{id}/share/external
///
/// 匿名外部分享，不去重
pub async fn external_share(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    engagement: web::Data<Arc<EngagementService>>,
    content: web::Data<Arc<ContentService>>,
) -> ActixResult<HttpResponse> {
    let (content_type, id) = path.into_inner();
    let content_type = match ContentType::parse(&content_type) {
        Ok(t) => t,
        Err(e) => return Ok(error_from_engagement(&e)),
    };
    let client = ClientInfo::from_request(&req);

    match engagement
        .record_external_share(content_type, id, &client)
        .await
    {
        Ok(true) => {}
        Ok(false) => return Ok(not_found("Content not found")),
        Err(e) => return Ok(error_from_engagement(&e)),
    }

    Ok(match content.get(content_type, id).await {
        Ok(Some(record)) => success_response(ExternalShareResponse {
            shared_count: record.shared_count,
        }),
        Ok(None) => not_found("Content not found"),
        Err(e) => error_from_engagement(&e),
    })
}
