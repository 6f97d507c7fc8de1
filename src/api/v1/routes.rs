//! API 路由配置

use actix_web::web;

use super::content::{create_content, delete_content, view_content};
use super::engagement::{external_share, like_status, share_status, toggle_like, toggle_share};
use super::stats::{daily_summary, entity_stats, geographic_stats, top_content};

/// 统计路由 `/stats`
pub fn stats_routes() -> actix_web::Scope {
    web::scope("/stats")
        .route("/daily", web::get().to(daily_summary))
        .route("/top", web::get().to(top_content))
        .route("/geo", web::get().to(geographic_stats))
        .route("/{entity_type}/{entity_id}", web::get().to(entity_stats))
}

/// `/api` 下的全部路由
///
/// `/stats` 必须在 `/{content_type}/{id}` 之前注册
pub fn api_routes() -> actix_web::Scope {
    web::scope("/api")
        .service(stats_routes())
        .route("/{content_type}/{id}/like", web::post().to(toggle_like))
        .route("/{content_type}/{id}/like", web::get().to(like_status))
        .route(
            "/{content_type}/{id}/share/external",
            web::post().to(external_share),
        )
        .route("/{content_type}/{id}/share", web::post().to(toggle_share))
        .route("/{content_type}/{id}/share", web::get().to(share_status))
        .route("/{content_type}/{id}", web::get().to(view_content))
        .route("/{content_type}/{id}", web::delete().to(delete_content))
        .route("/{content_type}", web::post().to(create_content))
}
