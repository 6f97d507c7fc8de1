//! 内容接口（最小 CRUD）

use actix_web::{HttpRequest, HttpResponse, Result as ActixResult, web};
use std::sync::Arc;
use tracing::info;

use crate::services::{ClientInfo, ContentService};
use crate::storage::{ContentType, NewContent};

use super::helpers::{error_from_engagement, not_found, success_response};
use super::types::{CreatedResponse, DeletedResponse};

/// POST /{content_type}
pub async fn create_content(
    req: HttpRequest,
    path: web::Path<String>,
    body: web::Json<NewContent>,
    content: web::Data<Arc<ContentService>>,
) -> ActixResult<HttpResponse> {
    let content_type = match ContentType::parse(&path) {
        Ok(t) => t,
        Err(e) => return Ok(error_from_engagement(&e)),
    };
    let client = ClientInfo::from_request(&req);

    Ok(
        match content.create(content_type, &body, Some(&client)).await {
            Ok(id) => {
                info!("API: created {} #{}", content_type, id);
                success_response(CreatedResponse { id })
            }
            Err(e) => error_from_engagement(&e),
        },
    )
}

/// GET /{content_type}/{id}
///
/// 每次读取都会增加 view_count
pub async fn view_content(
    req: HttpRequest,
    path: web::Path<(String, i64)>,
    content: web::Data<Arc<ContentService>>,
) -> ActixResult<HttpResponse> {
    let (content_type, id) = path.into_inner();
    let content_type = match ContentType::parse(&content_type) {
        Ok(t) => t,
        Err(e) => return Ok(error_from_engagement(&e)),
    };
    let client = ClientInfo::from_request(&req);

    Ok(match content.view(content_type, id, &client).await {
        Ok(Some(view)) => success_response(view),
        Ok(None) => not_found("Content not found"),
        Err(e) => error_from_engagement(&e),
    })
}

/// DELETE /{content_type}/{id}
pub async fn delete_content(
    path: web::Path<(String, i64)>,
    content: web::Data<Arc<ContentService>>,
) -> ActixResult<HttpResponse> {
    let (content_type, id) = path.into_inner();
    let content_type = match ContentType::parse(&content_type) {
        Ok(t) => t,
        Err(e) => return Ok(error_from_engagement(&e)),
    };

    Ok(match content.delete(content_type, id).await {
        Ok(true) => success_response(DeletedResponse { deleted: true }),
        Ok(false) => not_found("Content not found"),
        Err(e) => error_from_engagement(&e),
    })
}
